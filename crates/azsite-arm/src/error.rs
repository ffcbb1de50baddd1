//! Error types for the ARM client.

use thiserror::Error;

/// Result type alias for ARM operations.
pub type ArmResult<T> = Result<T, ArmError>;

/// Errors raised while talking to Entra ID or the ARM API.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("token request failed with status {status}: {message}")]
    Auth { status: u16, message: String },

    #[error("request failed with status {status}: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("http transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("long-running operation did not succeed: {0}")]
    Operation(String),

    #[error("list paging stopped: {0}")]
    Paging(String),
}

impl ArmError {
    /// HTTP status of a rejected request, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ArmError::Auth { status, .. } | ArmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
