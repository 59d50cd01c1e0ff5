use std::borrow::Cow;

use thiserror::Error;

/// Failure reported by the messaging service or the transport reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{resource} not found: {message}")]
    NotFound {
        resource: String,
        message: Cow<'static, str>,
    },
    #[error("{status} (HTTP {code}): {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response from service: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn not_found(
        resource: impl Into<String>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::NotFound {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }

    /// HTTP status for API-level failures.
    pub fn http_code(&self) -> Option<u16> {
        match self {
            ServiceError::NotFound { .. } => Some(404),
            ServiceError::Api { code, .. } => Some(*code),
            ServiceError::Transport(_) | ServiceError::Decode(_) => None,
        }
    }
}
