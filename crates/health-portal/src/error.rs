//! Portal error taxonomy
//!
//! Validation failures are caught locally before a request is built.
//! Remote rejections keep the server's message so it can be shown verbatim.
//! Network failures only ever surface a generic message.

use health_validation::ValidationResult;

use crate::profile::EditError;

pub type Result<T, E = PortalError> = std::result::Result<T, E>;

/// Shown when the server rejects a request without saying why
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Shown when no response arrived at all
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error, please try again.";

/// The central error type of the portal core.
#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    /// Locally detected, field-specific; never sent to the server
    #[error("validation failed: {0}")]
    Validation(ValidationResult),

    /// The server answered with an error status
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// No response (offline, DNS, connection reset, timeout)
    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("local storage error")]
    Storage(
        #[source]
        #[from]
        std::io::Error,
    ),

    #[error("malformed JSON")]
    Decode(
        #[source]
        #[from]
        serde_json::Error,
    ),

    #[error("invalid configuration")]
    Config(
        #[source]
        #[from]
        config::ConfigError,
    ),
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::Network(err.to_string())
    }
}

impl From<ValidationResult> for PortalError {
    fn from(result: ValidationResult) -> Self {
        PortalError::Validation(result)
    }
}

impl PortalError {
    /// The text a notification shows for this error.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation(result) => result.message(),
            PortalError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            PortalError::Rejected { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            PortalError::Network(_) => NETWORK_FAILURE_MESSAGE.to_string(),
            PortalError::Edit(err) => err.to_string(),
            PortalError::Storage(_) | PortalError::Decode(_) | PortalError::Config(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }

    /// Whether the failure happened before anything left the machine
    pub fn is_local(&self) -> bool {
        matches!(self, PortalError::Validation(_) | PortalError::Edit(_))
    }
}
