//! Per-client tracking list ("shopping cart")
//!
//! - [`Cart`] is the persisted document, one per Messenger client
//! - [`CartStore`] is the persistence port, with an in-memory backend here
//!   and a Postgres backend in `database::cart_repository`
//! - [`CartService`] holds the business rules: capacity, idempotent add,
//!   indexed remove and "remove all"

pub mod service;
pub mod store;

use serde::{Deserialize, Serialize};

pub use service::{AddOutcome, AddResult, CartService, RemoveOutcome, RemoveSelector, ShowOutcome};
pub use store::{AddedItem, CartStore, MemoryCartStore, RemovedItem};

/// Maximum number of items a client may track at once
pub const ITEM_LIMIT: usize = 9;

/// Tracking list for a single client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub client_id: String,
    pub client_name: String,
    /// Item names in display order, unique by exact name
    pub items: Vec<String>,
    /// Listing post ids already sent to this client
    #[serde(default)]
    pub posts_notified: Vec<String>,
}

impl Cart {
    pub fn new(client_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            items: Vec::new(),
            posts_notified: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= ITEM_LIMIT
    }

    pub fn contains(&self, item_name: &str) -> bool {
        self.items.iter().any(|i| i == item_name)
    }

    pub fn was_notified(&self, post_id: &str) -> bool {
        self.posts_notified.iter().any(|p| p == post_id)
    }
}
