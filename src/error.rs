use reqwest::StatusCode;
use thiserror::Error;

/// Why a single outbound HTTP call did not produce a usable value.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("JSON parse failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response is missing `{0}`")]
    Missing(&'static str),

    #[error("request cancelled")]
    Cancelled,
}

impl RequestFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestFailure::Status { status, .. } => Some(*status),
            RequestFailure::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// The metadata service was unreachable, answered non-2xx, or sent an unexpected body.
#[derive(Debug, Error)]
#[error("metadata {operation} failed: {failure}")]
pub struct MetadataFetchError {
    pub operation: &'static str,
    #[source]
    pub failure: RequestFailure,
}

impl MetadataFetchError {
    pub fn new(operation: &'static str, failure: impl Into<RequestFailure>) -> Self {
        Self {
            operation,
            failure: failure.into(),
        }
    }
}

/// Any application server call that did not succeed.
#[derive(Debug, Error)]
#[error("application server {operation} failed: {failure}")]
pub struct ApplicationServerError {
    pub operation: &'static str,
    #[source]
    pub failure: RequestFailure,
}

impl ApplicationServerError {
    pub fn new(operation: &'static str, failure: impl Into<RequestFailure>) -> Self {
        Self {
            operation,
            failure: failure.into(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.failure.status()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("rejected by server: {0}")]
    Rejected(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("admin rights required")]
    Forbidden,

    #[error(transparent)]
    Server(#[from] ApplicationServerError),

    #[error("token storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Metadata(#[from] MetadataFetchError),

    #[error(transparent)]
    Server(#[from] ApplicationServerError),
}
