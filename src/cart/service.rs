//! Cart business rules
//!
//! One short state machine per request; nothing is kept between requests
//! except what the store holds.

use std::sync::Arc;
use tracing::{debug, info};

use super::{AddedItem, CartStore, ITEM_LIMIT};
use crate::error::{CartError, StoreError};

/// What happened to an add request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Success,
    /// Cart already at [`ITEM_LIMIT`]; nothing changed
    Full,
    /// Item was already tracked; only the display name was refreshed
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddResult {
    pub outcome: AddOutcome,
    pub item_name: String,
    /// Item count after the request
    pub new_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowOutcome {
    Empty,
    /// Items in display order (shown 1-based)
    Listing(Vec<String>),
}

/// Which item(s) a remove request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveSelector {
    /// 0-based position in the current listing
    Index(usize),
    All,
    /// Pure acknowledgement, never touches the store
    None,
}

impl RemoveSelector {
    /// Map the signed quick-reply code: `n >= 0` index, `-1` all, `-2` none
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::All),
            -2 => Some(Self::None),
            n if n >= 0 => usize::try_from(n).ok().map(Self::Index),
            _ => None,
        }
    }

    /// Inverse of [`RemoveSelector::from_code`]
    pub fn code(&self) -> i64 {
        match self {
            Self::Index(i) => *i as i64,
            Self::All => -1,
            Self::None => -2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    RemovedOne { item_name: String },
    RemovedAll,
    NoOp,
    /// Client has no cart record
    NotFound,
    /// Index is past the end of the current listing
    IndexOutOfRange { index: usize, len: usize },
}

/// Tracking list operations on top of a [`CartStore`]
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CartStore> {
        &self.store
    }

    pub async fn add_to_cart(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<AddResult, CartError> {
        let result = |outcome, new_count| AddResult {
            outcome,
            item_name: item_name.to_string(),
            new_count,
        };

        let prior = match self.store.find(client_id).await? {
            Some(cart) => cart,
            None => {
                if let Some(cart) = self
                    .store
                    .create_with_first_item(client_id, client_name, item_name)
                    .await?
                {
                    info!(client_id, item_name, "created tracking list");
                    return Ok(result(AddOutcome::Success, cart.len()));
                }
                // Lost a creation race; carts are never deleted, so it exists now
                self.store.find(client_id).await?.ok_or_else(|| {
                    StoreError::Backend(anyhow::anyhow!(
                        "cart for client '{}' missing after create conflict",
                        client_id
                    ))
                })?
            }
        };

        if prior.is_full() {
            debug!(client_id, item_name, "tracking list full");
            return Ok(result(AddOutcome::Full, prior.len()));
        }

        match self
            .store
            .add_item_if_room(client_id, client_name, item_name)
            .await?
        {
            None => {
                debug!(client_id, item_name, "tracking list filled concurrently");
                Ok(result(AddOutcome::Full, ITEM_LIMIT))
            }
            Some(AddedItem {
                cart,
                inserted: false,
            }) => Ok(result(AddOutcome::AlreadyExists, cart.len())),
            Some(AddedItem {
                cart,
                inserted: true,
            }) => {
                info!(client_id, item_name, count = cart.len(), "item tracked");
                Ok(result(AddOutcome::Success, cart.len()))
            }
        }
    }

    pub async fn show_cart(&self, client_id: &str) -> Result<ShowOutcome, CartError> {
        Ok(match self.store.find(client_id).await? {
            Some(cart) if !cart.is_empty() => ShowOutcome::Listing(cart.items),
            _ => ShowOutcome::Empty,
        })
    }

    pub async fn remove_from_cart(
        &self,
        client_id: &str,
        selector: RemoveSelector,
    ) -> Result<RemoveOutcome, CartError> {
        if selector == RemoveSelector::None {
            return Ok(RemoveOutcome::NoOp);
        }

        let Some(cart) = self.store.find(client_id).await? else {
            debug!(client_id, ?selector, "remove on missing tracking list");
            return Ok(RemoveOutcome::NotFound);
        };

        match selector {
            RemoveSelector::Index(index) => {
                if index >= cart.len() {
                    debug!(client_id, index, len = cart.len(), "remove index out of range");
                    return Ok(RemoveOutcome::IndexOutOfRange {
                        index,
                        len: cart.len(),
                    });
                }
                match self.store.remove_item_at(client_id, index).await? {
                    Some(removed) => {
                        info!(client_id, item_name = %removed.item_name, "item untracked");
                        Ok(RemoveOutcome::RemovedOne {
                            item_name: removed.item_name,
                        })
                    }
                    // The list changed between the lookup and the update
                    None => match self.store.find(client_id).await? {
                        Some(current) => Ok(RemoveOutcome::IndexOutOfRange {
                            index,
                            len: current.len(),
                        }),
                        None => Ok(RemoveOutcome::NotFound),
                    },
                }
            }
            RemoveSelector::All => match self.store.clear_all(client_id).await? {
                Some(_) => {
                    info!(client_id, "tracking list cleared");
                    Ok(RemoveOutcome::RemovedAll)
                }
                None => Ok(RemoveOutcome::NotFound),
            },
            RemoveSelector::None => Ok(RemoveOutcome::NoOp),
        }
    }
}
