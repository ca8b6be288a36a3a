//! Messenger platform integration
//!
//! - `types`: inbound webhook payloads
//! - `client`: outbound Send API and profile lookups

pub mod client;
pub mod types;

pub use client::{GraphApiClient, MessengerClient, MessengerError, SenderAction};
pub use types::{MessagingEvent, WebhookPayload};
