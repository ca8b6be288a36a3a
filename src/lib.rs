//! EZBuy - Messenger tracking-list bot
//!
//! Users message the bot with the names of items they want from the
//! second-hand board; the bot keeps a per-user tracking list (up to
//! [`cart::ITEM_LIMIT`] items) and pings them when a matching post appears.
//!
//! ## Call chain
//! Webhook event -> [`routing::classify`] -> [`routing::EventRouter`]
//! -> [`cart::CartService`] -> [`cart::CartStore`] -> canned [`replies::Reply`]
//! -> [`messenger::MessengerClient`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ezbuy_bot::cart::{CartService, MemoryCartStore};
//! use ezbuy_bot::routing::{Action, EventRouter};
//! use ezbuy_bot::replies::DEFAULT_FEEDBACK_URL;
//!
//! # async fn run() -> Result<(), ezbuy_bot::error::CartError> {
//! let carts = CartService::new(Arc::new(MemoryCartStore::new()));
//! let router = EventRouter::new(carts, DEFAULT_FEEDBACK_URL);
//! let reply = router.dispatch("U1", "Jotaro", Action::Track("racket".into())).await?;
//! println!("{}", reply.unwrap().text());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod config;

// Tracking list model, store port and business rules
pub mod cart;

// Canned replies and outbound message descriptors
pub mod replies;

// Messenger platform payloads and Send API client
pub mod messenger;

// Event classification and dispatch
pub mod routing;

// Marketplace post matching
pub mod listings;

// Database integration (when enabled)
#[cfg(feature = "database")]
pub mod database;

// Webhook HTTP surface (when enabled)
pub mod api;

pub use cart::{Cart, CartService, CartStore, MemoryCartStore, ITEM_LIMIT};
pub use config::AppConfig;
pub use error::{CartError, ConfigError, StoreError};
pub use replies::{Reply, ReplyMessage};
pub use routing::{Action, EventRouter};

#[cfg(feature = "database")]
pub use database::{DatabaseConfig, DatabaseManager, PgCartStore};
