use clubhouse_api::ServiceError;
use thiserror::Error;

/// Failure of a call against the hosted backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The service answered with an error; `message` is its own wording.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The call could not complete (connect, TLS, timeout).
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The service answered with a body we could not read.
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// HTTP status the service answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<BackendError> for ServiceError {
    fn from(e: BackendError) -> Self {
        let message = e.to_string();
        match e {
            BackendError::Rejected { status, .. } => match status {
                401 => ServiceError::Unauthorized(message),
                403 => ServiceError::Forbidden(message),
                404 => ServiceError::NotFound(message),
                409 => ServiceError::Conflict(message),
                400..=499 => ServiceError::BadRequest(message),
                _ => ServiceError::Unavailable(message),
            },
            BackendError::Transport(_) | BackendError::Decode(_) => {
                ServiceError::Unavailable(message)
            }
        }
    }
}
