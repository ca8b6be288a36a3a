//! Runtime configuration
//!
//! Read from environment variables (after `dotenvy` has loaded any `.env`):
//!   EZBUY_PAGE_ACCESS_TOKEN Graph API page token (required)
//!   EZBUY_VERIFY_TOKEN      webhook verification token (required)
//!   DATABASE_URL            Postgres URL; in-memory store when unset
//!   DATABASE_POOL_SIZE      pool size (default: 10)
//!   EZBUY_BIND_ADDR         listen address (default: 0.0.0.0:2236)
//!   EZBUY_GRAPH_API_BASE    Graph API base URL
//!   EZBUY_FEEDBACK_URL      target of the "Feedback" button

use std::fmt;

use crate::error::ConfigError;
use crate::messenger::client::DEFAULT_GRAPH_API_BASE;
use crate::replies::DEFAULT_FEEDBACK_URL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:2236";
pub const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Clone)]
pub struct AppConfig {
    pub page_access_token: String,
    pub verify_token: String,
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub bind_addr: String,
    pub graph_api_base: String,
    pub feedback_url: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("page_access_token", &"***")
            .field("verify_token", &"***")
            .field("database_url", &self.database_url.as_ref().map(|_| "***"))
            .field("database_pool_size", &self.database_pool_size)
            .field("bind_addr", &self.bind_addr)
            .field("graph_api_base", &self.graph_api_base)
            .field("feedback_url", &self.feedback_url)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let database_pool_size = match get("DATABASE_POOL_SIZE") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "DATABASE_POOL_SIZE",
                message: format!("{}", e),
            })?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            page_access_token: required("EZBUY_PAGE_ACCESS_TOKEN")?,
            verify_token: required("EZBUY_VERIFY_TOKEN")?,
            database_url: get("DATABASE_URL"),
            database_pool_size,
            bind_addr: get("EZBUY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            graph_api_base: get("EZBUY_GRAPH_API_BASE")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            feedback_url: get("EZBUY_FEEDBACK_URL")
                .unwrap_or_else(|| DEFAULT_FEEDBACK_URL.to_string()),
        })
    }
}
