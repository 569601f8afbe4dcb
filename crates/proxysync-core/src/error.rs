//! Error types for the reconciliation system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation system
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory-related errors (fatal to the run)
    #[error("inventory error: {0}")]
    Inventory(String),

    /// Public-IP resolution errors (fatal to the run)
    #[error("IP resolution error: {0}")]
    IpResolution(String),

    /// State store-related errors
    #[error("state store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-2xx response from an upstream API, with status and body captured
    #[error("{provider} API returned {status}: {body}")]
    Api {
        /// Upstream service name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body as returned by the upstream
        body: String,
    },

    /// Provider-specific error outside the HTTP status path
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an inventory error
    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::Inventory(msg.into())
    }

    /// Create an IP resolution error
    pub fn ip_resolution(msg: impl Into<String>) -> Self {
        Self::IpResolution(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API error carrying the upstream status and body
    pub fn api(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
