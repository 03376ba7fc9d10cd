use std::time::Duration;

/// Where the loader looks for its documents.
///
/// Locations are relative to the [`JsonSource`](crate::fetch::JsonSource)'s
/// base (a URL or a directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Index document. `None` (or blank) skips the network and lists the
    /// embedded sample countries instead.
    pub index_location: Option<String>,
    /// Directory holding `<slug>.json` files.
    pub data_dir: String,
    /// Per-fetch bound. `None` defers to the source's own default.
    pub timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            index_location: Some("data/index.json".into()),
            data_dir: "data".into(),
            timeout: None,
        }
    }
}

impl LoaderConfig {
    /// The index location if it is usable.
    pub fn index(&self) -> Option<&str> {
        self.index_location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Location of one country's file.
    pub fn country_location(&self, slug: &str) -> String {
        let dir = self.data_dir.trim().trim_end_matches('/');
        if dir.is_empty() {
            format!("{}.json", slug)
        } else {
            format!("{}/{}.json", dir, slug)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = LoaderConfig::default();
        assert_eq!(c.index(), Some("data/index.json"));
        assert_eq!(c.country_location("france"), "data/france.json");
        assert_eq!(c.timeout, None);
    }

    #[test]
    fn blank_index_is_absent() {
        let c = LoaderConfig {
            index_location: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(c.index(), None);
    }

    #[test]
    fn data_dir_variants() {
        let mut c = LoaderConfig::default();
        c.data_dir = "static/data/".into();
        assert_eq!(c.country_location("japan"), "static/data/japan.json");
        c.data_dir = String::new();
        assert_eq!(c.country_location("japan"), "japan.json");
    }
}
