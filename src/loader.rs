//! Lazy, de-duplicated loading of the country index and per-country files.
//!
//! A single [`DataLoader`] is built at startup and shared by reference (or
//! behind an `Arc`) with everything that needs problem data. Loads never
//! fail from the caller's point of view: fetch errors are logged and turned
//! into fallback data, so there is always something to show, even if empty.
//!
//! Failed countries are cached as their fallback (possibly empty) for the
//! lifetime of the loader and are not retried.

use crate::config::LoaderConfig;
use crate::error::FetchError;
use crate::fetch::JsonSource;
use crate::index::parse_index;
use crate::models::{CountryDataset, DataStats, IndexOutcome, LoadOutcome};
use crate::sample::SampleData;
use crate::slug::slugify;
use crate::stats;
use ahash::AHashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for a country load that is still running. Joiners block on it
/// until the leading caller settles it.
#[derive(Default)]
struct InFlight {
    slot: Mutex<Option<Arc<CountryDataset>>>,
    ready: Condvar,
    joiners: AtomicUsize,
}

impl InFlight {
    fn wait(&self) -> Arc<CountryDataset> {
        self.joiners.fetch_add(1, Ordering::SeqCst);
        let mut slot = lock(&self.slot);
        loop {
            if let Some(d) = slot.as_ref() {
                return Arc::clone(d);
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn settle(&self, dataset: Arc<CountryDataset>) {
        *lock(&self.slot) = Some(dataset);
        self.ready.notify_all();
    }
}

#[derive(Default)]
struct LoaderState {
    index: Option<Vec<String>>,
    cache: AHashMap<String, Arc<CountryDataset>>,
    in_flight: AHashMap<String, Arc<InFlight>>,
}

enum Role {
    Lead(Arc<InFlight>),
    Join(Arc<InFlight>),
}

/// Runs on every exit path of a leading load: publishes the result, drops
/// the in-flight entry and wakes joiners. If the load panicked, nothing is
/// cached and joiners get an empty dataset.
struct Settle<'a> {
    state: &'a Mutex<LoaderState>,
    country: &'a str,
    handle: Arc<InFlight>,
    result: Option<Arc<CountryDataset>>,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let dataset = {
            let mut st = lock(self.state);
            st.in_flight.remove(self.country);
            match self.result.take() {
                Some(d) => {
                    st.cache.insert(self.country.to_string(), Arc::clone(&d));
                    d
                }
                None => Arc::new(CountryDataset::empty()),
            }
        };
        self.handle.settle(dataset);
    }
}

pub struct DataLoader {
    source: Box<dyn JsonSource>,
    config: LoaderConfig,
    sample: SampleData,
    state: Mutex<LoaderState>,
    // Serializes first-time index loads; never held by country loads.
    index_gate: Mutex<()>,
}

impl DataLoader {
    pub fn new(
        source: impl JsonSource + 'static,
        config: LoaderConfig,
        sample: SampleData,
    ) -> Self {
        Self::from_boxed(Box::new(source), config, sample)
    }

    pub fn from_boxed(
        source: Box<dyn JsonSource>,
        config: LoaderConfig,
        sample: SampleData,
    ) -> Self {
        Self {
            source,
            config,
            sample,
            state: Mutex::new(LoaderState::default()),
            index_gate: Mutex::new(()),
        }
    }

    /// Default locations, builtin sample data.
    pub fn with_defaults(source: impl JsonSource + 'static) -> Self {
        Self::new(source, LoaderConfig::default(), SampleData::builtin())
    }

    /// Bound applied to every fetch: the configured one, else the source's default.
    pub fn timeout(&self) -> Duration {
        self.config
            .timeout
            .unwrap_or_else(|| self.source.default_timeout())
    }

    // ---------- index ----------

    /// Load the country index once; later calls return the same list without I/O.
    pub fn load_index(&self) -> Vec<String> {
        self.load_index_outcome().0
    }

    pub fn load_index_outcome(&self) -> (Vec<String>, IndexOutcome) {
        if let Some(list) = lock(&self.state).index.clone() {
            return (list, IndexOutcome::AlreadyLoaded);
        }

        let _gate = lock(&self.index_gate);
        // Another caller may have finished while we waited at the gate.
        if let Some(list) = lock(&self.state).index.clone() {
            return (list, IndexOutcome::AlreadyLoaded);
        }

        let (list, outcome) = match self.config.index() {
            None => {
                log::warn!("index location is missing, falling back to sample countries");
                (self.sample.countries_sorted(), IndexOutcome::FallbackUsed)
            }
            Some(location) => {
                log::info!("loading country index: {}", location);
                match self.source.fetch_json(location, self.timeout()) {
                    Ok(payload) => {
                        let list = parse_index(&payload);
                        log::info!("index loaded ({} countries)", list.len());
                        (list, IndexOutcome::Fetched)
                    }
                    Err(e) => {
                        log::warn!("index load failed, using sample countries: {}", e);
                        (self.sample.countries_sorted(), IndexOutcome::FallbackUsed)
                    }
                }
            }
        };

        lock(&self.state).index = Some(list.clone());
        (list, outcome)
    }

    /// Known country names; empty until the index has been loaded.
    pub fn countries(&self) -> Vec<String> {
        lock(&self.state).index.clone().unwrap_or_default()
    }

    pub fn is_index_loaded(&self) -> bool {
        lock(&self.state).index.is_some()
    }

    // ---------- countries ----------

    /// Make sure `country` is cached and return its dataset.
    pub fn ensure_loaded(&self, country: &str) -> Arc<CountryDataset> {
        self.ensure_loaded_outcome(country).into_dataset()
    }

    pub fn ensure_country_loaded(&self, country: &str) -> Arc<CountryDataset> {
        self.ensure_loaded(country)
    }

    /// Like [`DataLoader::ensure_loaded`], reporting which path produced the data.
    pub fn ensure_loaded_outcome(&self, country: &str) -> LoadOutcome {
        let role = {
            let mut st = lock(&self.state);
            if let Some(d) = st.cache.get(country) {
                log::debug!("cache hit for {}", country);
                return LoadOutcome::Cached(Arc::clone(d));
            }
            match st.in_flight.get(country) {
                Some(h) => Role::Join(Arc::clone(h)),
                None => {
                    let h = Arc::new(InFlight::default());
                    st.in_flight.insert(country.to_string(), Arc::clone(&h));
                    Role::Lead(h)
                }
            }
        };

        match role {
            Role::Join(handle) => {
                log::debug!("joining in-flight load for {}", country);
                LoadOutcome::Shared(handle.wait())
            }
            Role::Lead(handle) => {
                let mut settle = Settle {
                    state: &self.state,
                    country,
                    handle,
                    result: None,
                };
                let outcome = self.resolve(country);
                settle.result = Some(Arc::clone(outcome.dataset()));
                drop(settle);
                outcome
            }
        }
    }

    /// Fetch one country, falling back to sample data and then to empty.
    fn resolve(&self, country: &str) -> LoadOutcome {
        let location = self.config.country_location(&slugify(country));
        log::info!("loading country file: {}", location);

        let failure = match self.source.fetch_json(&location, self.timeout()) {
            Ok(payload) => match CountryDataset::from_value(payload) {
                Some(d) => {
                    log::info!("{} loaded ({} problems)", country, d.total_problems());
                    return LoadOutcome::Fetched(Arc::new(d));
                }
                None => FetchError::InvalidShape(format!("{} is not a JSON object", location)),
            },
            Err(e) => e,
        };

        log::warn!(
            "country load failed for {}, attempting sample data: {}",
            country,
            failure
        );
        match self.sample.get(country) {
            Some(d) => LoadOutcome::FallbackUsed(Arc::new(d.clone())),
            None => LoadOutcome::Empty(Arc::new(CountryDataset::empty())),
        }
    }

    /// Load `country` if needed and return its years.
    pub fn years_lazy(&self, country: &str) -> Vec<String> {
        self.ensure_loaded(country).years()
    }

    pub fn is_country_loaded(&self, country: &str) -> bool {
        lock(&self.state).cache.contains_key(country)
    }

    /// Whether a load for `country` is currently running.
    pub fn is_in_flight(&self, country: &str) -> bool {
        lock(&self.state).in_flight.contains_key(country)
    }

    /// Callers currently waiting on the running load for `country`.
    pub fn joiners(&self, country: &str) -> usize {
        lock(&self.state)
            .in_flight
            .get(country)
            .map_or(0, |h| h.joiners.load(Ordering::SeqCst))
    }

    // ---------- queries ----------

    fn cached(&self, country: &str) -> Option<Arc<CountryDataset>> {
        lock(&self.state).cache.get(country).cloned()
    }

    /// Years for a loaded country, newest first.
    pub fn years(&self, country: &str) -> Vec<String> {
        self.cached(country).map(|d| d.years()).unwrap_or_default()
    }

    pub fn problems(&self, country: &str, year: &str) -> Vec<Value> {
        self.cached(country)
            .map(|d| d.problems(year).to_vec())
            .unwrap_or_default()
    }

    pub fn total_problems_count(&self, country: &str) -> usize {
        self.cached(country).map_or(0, |d| d.total_problems())
    }

    pub fn year_problems_count(&self, country: &str, year: &str) -> usize {
        self.cached(country).map_or(0, |d| d.problems(year).len())
    }

    /// Snapshot of every cached country.
    pub fn loaded_data(&self) -> BTreeMap<String, Arc<CountryDataset>> {
        lock(&self.state)
            .cache
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Counts over what has been loaded so far, not the whole index.
    pub fn data_stats(&self) -> DataStats {
        let loaded = self.loaded_data();
        stats::summarize(loaded.values().map(|d| &**d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// In-memory source that counts calls per location.
    #[derive(Default)]
    struct MapSource {
        docs: AHashMap<String, Value>,
        calls: Mutex<Vec<String>>,
        hits: AtomicUsize,
    }

    impl MapSource {
        fn with(docs: &[(&str, Value)]) -> Self {
            Self {
                docs: docs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl JsonSource for MapSource {
        fn fetch_json(&self, location: &str, _timeout: Duration) -> Result<Value, FetchError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            lock(&self.calls).push(location.to_string());
            self.docs
                .get(location)
                .cloned()
                .ok_or_else(|| FetchError::HttpError {
                    status: 404,
                    url: location.to_string(),
                })
        }
    }

    fn loader(src: Arc<MapSource>) -> DataLoader {
        DataLoader::new(src, LoaderConfig::default(), SampleData::builtin())
    }

    #[test]
    fn index_is_loaded_once() {
        let src = Arc::new(MapSource::with(&[(
            "data/index.json",
            json!(["Japan", {"name": "France"}]),
        )]));
        let dl = loader(Arc::clone(&src));
        assert!(!dl.is_index_loaded());
        let (first, o1) = dl.load_index_outcome();
        let (second, o2) = dl.load_index_outcome();
        assert_eq!(first, vec!["France", "Japan"]);
        assert_eq!(first, second);
        assert_eq!(o1, IndexOutcome::Fetched);
        assert_eq!(o2, IndexOutcome::AlreadyLoaded);
        assert_eq!(src.hits.load(Ordering::SeqCst), 1);
        assert_eq!(dl.countries(), first);
    }

    #[test]
    fn index_failure_uses_sample_keys() {
        let src = Arc::new(MapSource::default());
        let dl = loader(Arc::clone(&src));
        let (list, outcome) = dl.load_index_outcome();
        assert_eq!(outcome, IndexOutcome::FallbackUsed);
        assert_eq!(list, vec!["France", "Japan"]);
        assert!(dl.is_index_loaded());
        // not retried
        dl.load_index();
        assert_eq!(src.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_index_location_skips_network() {
        let src = Arc::new(MapSource::default());
        let config = LoaderConfig {
            index_location: None,
            ..Default::default()
        };
        let dl = DataLoader::new(Arc::clone(&src), config, SampleData::builtin());
        let (list, outcome) = dl.load_index_outcome();
        assert_eq!(outcome, IndexOutcome::FallbackUsed);
        assert_eq!(list, vec!["France", "Japan"]);
        assert_eq!(src.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn timeout_defers_to_source_unless_configured() {
        let dl = loader(Arc::new(MapSource::default()));
        assert_eq!(dl.timeout(), crate::fetch::DEFAULT_TIMEOUT);

        let config = LoaderConfig {
            timeout: Some(Duration::from_millis(750)),
            ..Default::default()
        };
        let dl = DataLoader::new(Arc::new(MapSource::default()), config, SampleData::empty());
        assert_eq!(dl.timeout(), Duration::from_millis(750));
    }

    #[test]
    fn fetched_country_is_cached() {
        let src = Arc::new(MapSource::with(&[(
            "data/saudi-arabia.json",
            json!({"2022": [{"id": "a"}]}),
        )]));
        let dl = loader(Arc::clone(&src));
        let first = dl.ensure_loaded_outcome("Saudi Arabia");
        assert!(matches!(first, LoadOutcome::Fetched(_)));
        let second = dl.ensure_loaded_outcome("Saudi Arabia");
        assert!(matches!(second, LoadOutcome::Cached(_)));
        assert!(Arc::ptr_eq(first.dataset(), second.dataset()));
        assert_eq!(*lock(&src.calls), vec!["data/saudi-arabia.json"]);
        assert!(!dl.is_in_flight("Saudi Arabia"));
    }

    #[test]
    fn failure_prefers_sample_then_empty() {
        let src = Arc::new(MapSource::default());
        let dl = loader(Arc::clone(&src));

        let japan = dl.ensure_loaded_outcome("Japan");
        assert!(matches!(japan, LoadOutcome::FallbackUsed(_)));
        assert_eq!(japan.dataset().total_problems(), 2);

        let peru = dl.ensure_loaded_outcome("Peru");
        assert!(matches!(peru, LoadOutcome::Empty(_)));
        assert!(peru.dataset().is_empty());

        // terminal: no refetch
        assert!(matches!(dl.ensure_loaded_outcome("Peru"), LoadOutcome::Cached(_)));
        assert_eq!(src.hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn array_payload_is_rejected() {
        let src = Arc::new(MapSource::with(&[("data/france.json", json!([1, 2, 3]))]));
        let dl = loader(src);
        let out = dl.ensure_loaded_outcome("France");
        assert!(matches!(out, LoadOutcome::FallbackUsed(_)));
        assert_eq!(dl.years("France"), vec!["2019"]);
    }

    #[test]
    fn queries_default_to_empty() {
        let dl = loader(Arc::new(MapSource::default()));
        assert!(dl.years("Unknown").is_empty());
        assert!(dl.problems("Unknown", "2020").is_empty());
        assert_eq!(dl.total_problems_count("Unknown"), 0);
        assert_eq!(dl.year_problems_count("Unknown", "2020"), 0);
        assert_eq!(dl.data_stats(), DataStats::default());
    }

    #[test]
    fn panicking_source_releases_handle() {
        struct Boom;
        impl JsonSource for Boom {
            fn fetch_json(&self, _: &str, _: Duration) -> Result<Value, FetchError> {
                panic!("source exploded");
            }
        }
        let dl = DataLoader::new(Boom, LoaderConfig::default(), SampleData::empty());
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| dl.ensure_loaded("X")));
        assert!(r.is_err());
        assert!(!dl.is_in_flight("X"));
        assert!(!dl.is_country_loaded("X"));
    }
}
