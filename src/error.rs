use thiserror::Error;

/// Failures surfaced by the session, job and feedback layers.
///
/// The feedback extractor never produces one of these: malformed AI output
/// degrades to empty sections instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad credentials, a missing or expired token, or a corrupted stored session.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Connectivity, timeout, non-2xx status or a response body that does not
    /// match the expected schema.
    #[error("request failed: {0}")]
    Network(String),

    /// Input rejected before any request was made.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("local storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl Error {
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            Error::Network(format!("malformed response: {}", err))
        } else {
            Error::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
