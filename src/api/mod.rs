//! HTTP surface for the Messenger webhook

#[cfg(feature = "server")]
pub mod webhook_routes;

#[cfg(feature = "server")]
pub use webhook_routes::{create_webhook_router, WebhookState};
