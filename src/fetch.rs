//! JSON sources for the index document and the per-country files.
//!
//! The loader only ever asks for a *location* such as `data/index.json` or
//! `data/france.json`; a [`JsonSource`] resolves it against its own base and
//! returns the decoded `serde_json::Value`.
//!
//! ### Notes
//! - [`HttpSource`] resolves locations against a base URL and bounds every
//!   request with a timeout (12s by default). Responses are requested with
//!   `Cache-Control: no-cache` so a republished dataset is picked up.
//! - [`DirSource`] reads the same layout from a local directory. A missing
//!   file is reported as HTTP 404 so both sources fail the same way.
//!
//! Typical usage:
//! ```no_run
//! # use mathnet_loader::fetch::{HttpSource, JsonSource};
//! let src = HttpSource::new("https://example.org/mathnet/")?;
//! let index = src.fetch("data/index.json")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
use crate::error::FetchError;
use reqwest::Url;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CACHE_CONTROL;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default bound on a single fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(12_000);

/// Something that can turn a location into a JSON document.
pub trait JsonSource: Send + Sync {
    /// Fetch and decode the document at `location`, giving up after `timeout`.
    fn fetch_json(&self, location: &str, timeout: Duration) -> Result<Value, FetchError>;

    /// Timeout used by [`JsonSource::fetch`].
    fn default_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn fetch(&self, location: &str) -> Result<Value, FetchError> {
        self.fetch_json(location, self.default_timeout())
    }
}

impl<T: JsonSource + ?Sized> JsonSource for std::sync::Arc<T> {
    fn fetch_json(&self, location: &str, timeout: Duration) -> Result<Value, FetchError> {
        (**self).fetch_json(location, timeout)
    }

    fn default_timeout(&self) -> Duration {
        (**self).default_timeout()
    }
}

fn check_location(location: &str) -> Result<&str, FetchError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(location.to_string()));
    }
    Ok(trimmed)
}

/// Blocking HTTP(S) source.
#[derive(Debug, Clone)]
pub struct HttpSource {
    pub base_url: Url,
    pub timeout: Duration,
    http: HttpClient,
}

impl HttpSource {
    /// Build a source rooted at `base`. A trailing `/` is added when missing so
    /// that relative locations land *inside* the base path.
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|_| FetchError::InvalidUrl(base.clone()))?;
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("mathnet-loader/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a location against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, location: &str) -> Result<Url, FetchError> {
        let loc = check_location(location)?;
        self.base_url
            .join(loc)
            .map_err(|_| FetchError::InvalidUrl(location.to_string()))
    }
}

impl JsonSource for HttpSource {
    fn fetch_json(&self, location: &str, timeout: Duration) -> Result<Value, FetchError> {
        let url = self.resolve(location)?;
        let shown = url.to_string();

        // The per-request timeout lives and dies with the request, whatever the outcome.
        let resp = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .timeout(timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout { url: shown.clone() }
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpError {
                status: status.as_u16(),
                url: shown,
            });
        }

        let body = resp.text().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: shown.clone() }
            } else {
                FetchError::Network(e.to_string())
            }
        })?;
        serde_json::from_str(&body).map_err(|e| FetchError::ParseError(e.to_string()))
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }
}

/// Local directory laid out like the published dataset.
#[derive(Debug, Clone)]
pub struct DirSource {
    pub root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a location to a path under `root`. Absolute paths and `..` are refused.
    pub fn resolve(&self, location: &str) -> Result<PathBuf, FetchError> {
        let loc = check_location(location)?;
        let rel = Path::new(loc);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(FetchError::InvalidUrl(location.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl JsonSource for DirSource {
    // Local reads are not interruptible; the timeout is accepted for API symmetry.
    fn fetch_json(&self, location: &str, _timeout: Duration) -> Result<Value, FetchError> {
        let path = self.resolve(location)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::HttpError {
                    status: 404,
                    url: path.display().to_string(),
                });
            }
            Err(e) => return Err(FetchError::Network(format!("{}: {}", path.display(), e))),
        };
        serde_json::from_str(&text).map_err(|e| FetchError::ParseError(e.to_string()))
    }
}

/// Pick a source for a user-supplied location: `http(s)://` goes over the
/// network with `timeout` as its default bound, anything else is treated as
/// a directory.
pub fn source_for(
    location: &str,
    timeout: Duration,
) -> Result<Box<dyn JsonSource>, FetchError> {
    let loc = check_location(location)?;
    if loc.starts_with("http://") || loc.starts_with("https://") {
        Ok(Box::new(HttpSource::new(loc)?.with_timeout(timeout)))
    } else {
        Ok(Box::new(DirSource::new(loc)))
    }
}
