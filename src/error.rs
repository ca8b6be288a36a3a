//! Error types for the tracking bot
//!
//! Cart capacity and duplicate items are not errors here: they are ordinary
//! outcomes of the cart service and reach the user as canned replies. The
//! types below cover the failures that abort a request.

use thiserror::Error;

/// Failures raised by a [`crate::cart::CartStore`] backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("corrupt cart document for client '{client_id}': {message}")]
    Corrupt { client_id: String, message: String },
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(error.to_string())
            }
            other => StoreError::Backend(anyhow::Error::new(other)),
        }
    }
}

/// Errors surfaced by the cart service and event router
#[derive(Error, Debug)]
pub enum CartError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

impl CartError {
    /// Every storage failure is a hard failure of the request
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Store(_) => 500,
        }
    }
}
