use thiserror::Error;

/// Failures raised by a [`JsonSource`](crate::fetch::JsonSource).
///
/// These never escape the loader's public entry points: `DataLoader` logs
/// them and falls back to embedded data instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid location {0:?}")]
    InvalidUrl(String),
    #[error("request timed out for {url}")]
    Timeout { url: String },
    #[error("HTTP {status} for {url}")]
    HttpError { status: u16, url: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("decode json: {0}")]
    ParseError(String),
    #[error("unexpected payload shape: {0}")]
    InvalidShape(String),
}

impl FetchError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
