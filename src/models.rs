use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// One country's data: year key -> problems, stored exactly as fetched.
///
/// The loader only checks that the payload is a JSON object. A year whose
/// value is not an array simply has no problems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryDataset(Map<String, Value>);

impl CountryDataset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Accept a payload as a dataset if (and only if) it is a JSON object.
    pub fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Year keys, newest first.
    pub fn years(&self) -> Vec<String> {
        let mut years: Vec<String> = self.0.keys().cloned().collect();
        years.sort_by(|a, b| compare_years_desc(a, b));
        years
    }

    pub fn problems(&self, year: &str) -> &[Value] {
        match self.0.get(year) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    pub fn total_problems(&self) -> usize {
        self.0
            .values()
            .map(|v| v.as_array().map_or(0, |a| a.len()))
            .sum()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Descending year order: numeric when both keys are integers, otherwise
/// plain string order. Numeric keys sort ahead of non-numeric ones.
pub fn compare_years_desc(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => y.cmp(&x).then_with(|| b.cmp(a)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}

/// How a country's dataset was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Already in the cache; no I/O happened.
    Cached(Arc<CountryDataset>),
    /// Joined a load another caller had already started; no extra I/O.
    Shared(Arc<CountryDataset>),
    /// Fetched from the source and accepted.
    Fetched(Arc<CountryDataset>),
    /// The fetch failed or was malformed; the embedded sample entry was used.
    FallbackUsed(Arc<CountryDataset>),
    /// The fetch failed and no sample entry exists; cached as empty for the session.
    Empty(Arc<CountryDataset>),
}

impl LoadOutcome {
    pub fn dataset(&self) -> &Arc<CountryDataset> {
        match self {
            LoadOutcome::Cached(d)
            | LoadOutcome::Shared(d)
            | LoadOutcome::Fetched(d)
            | LoadOutcome::FallbackUsed(d)
            | LoadOutcome::Empty(d) => d,
        }
    }

    pub fn into_dataset(self) -> Arc<CountryDataset> {
        match self {
            LoadOutcome::Cached(d)
            | LoadOutcome::Shared(d)
            | LoadOutcome::Fetched(d)
            | LoadOutcome::FallbackUsed(d)
            | LoadOutcome::Empty(d) => d,
        }
    }
}

/// How the country index was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    AlreadyLoaded,
    Fetched,
    FallbackUsed,
}

/// Counts across everything loaded so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStats {
    pub countries: usize,
    pub years: usize,
    pub problems: usize,
}

/// Solution attached to a problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Solution {
    pub latex: Option<String>,
    pub status: Option<String>,
    pub pages: Vec<Value>,
    pub images: Vec<Value>,
}

/// Read-only typed view over a problem record.
///
/// Records come from hand-curated JSON, so every field is optional and
/// unknown fields are preserved in `extra`. The loader itself never builds
/// this view; it exists for callers that want to display problems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Problem {
    #[serde(deserialize_with = "de_opt_string_lenient")]
    pub id: Option<String>,
    pub statement_latex: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "competition name")]
    pub competition_name: Option<String>,
    #[serde(rename = "booklet title")]
    pub booklet_title: Option<String>,
    pub booklet_url: Option<String>,
    pub solutions: Vec<Solution>,
    pub statement_images: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Problem {
    /// Lenient conversion; anything that does not fit yields an empty view.
    pub fn from_value(v: &Value) -> Self {
        serde_json::from_value(v.clone()).unwrap_or_default()
    }

    pub fn has_solutions(&self) -> bool {
        !self.solutions.is_empty()
    }

    /// Booklet link, treating the dataset's `"NULL"` placeholder as absent.
    pub fn booklet_link(&self) -> Option<&str> {
        self.booklet_url
            .as_deref()
            .filter(|u| !u.is_empty() && *u != "NULL")
    }
}

/// Serde helper: accept an id given as a string or a number.
fn de_opt_string_lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
