use std::fmt;

use thiserror::Error;

/// Failure of one pull request. The session logs it and retries on the next
/// tick; only the one-shot path hands it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PullError {
    pub kind: FailureKind,
    pub message: String,
}

impl PullError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MalformedBody,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedBody => write!(f, "malformed body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Push subscription failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("live update stream failed: {0}")]
    Stream(String),
}

/// A push frame that is not a well-formed message.
#[derive(Debug, Error)]
#[error("malformed message: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// Errors `SessionController::start` can return to its caller.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("search failed: {0}")]
    Pull(#[from] PullError),
}
