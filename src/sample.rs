//! Embedded fallback dataset.
//!
//! Used when the index cannot be located or fetched, and per country when
//! its file fails to load. Same shape as a per-country file, keyed by the
//! exact country display name.

use crate::index::locale_sorted;
use crate::models::CountryDataset;
use ahash::AHashMap;
use serde_json::Value;

const BUILTIN: &str = include_str!("../data/sample.json");

#[derive(Debug, Clone, Default)]
pub struct SampleData {
    countries: AHashMap<String, CountryDataset>,
}

impl SampleData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The sample compiled into the crate.
    pub fn builtin() -> Self {
        match serde_json::from_str::<Value>(BUILTIN) {
            Ok(v) => Self::from_value(v),
            Err(e) => {
                log::error!("embedded sample data is not valid JSON: {}", e);
                Self::empty()
            }
        }
    }

    /// Build from a `{ country: { year: [problem, ...] } }` document.
    /// Entries whose value is not an object are skipped.
    pub fn from_value(v: Value) -> Self {
        let mut countries = AHashMap::new();
        if let Value::Object(map) = v {
            for (name, data) in map {
                match CountryDataset::from_value(data) {
                    Some(d) => {
                        countries.insert(name, d);
                    }
                    None => log::warn!("sample entry for {} is not an object, skipped", name),
                }
            }
        }
        Self { countries }
    }

    pub fn get(&self, country: &str) -> Option<&CountryDataset> {
        self.countries.get(country)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Country names in display order.
    pub fn countries_sorted(&self) -> Vec<String> {
        locale_sorted(self.countries.keys().cloned().collect())
    }
}
