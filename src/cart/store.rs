//! Cart persistence port
//!
//! Every mutating operation is a single conditional update: backends must
//! apply the check and the write atomically per client record, so two
//! concurrent adds for the same client can never both pass the item cap.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::Cart;
use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of a successful [`CartStore::remove_item_at`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedItem {
    /// Name resolved at the requested index before removal
    pub item_name: String,
    /// Cart after every entry with that name was removed
    pub cart: Cart,
}

/// Outcome of a successful [`CartStore::add_item_if_room`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedItem {
    /// Cart after the update
    pub cart: Cart,
    /// False when the item was already on the list
    pub inserted: bool,
}

/// Storage for tracking lists, keyed by client id
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find(&self, client_id: &str) -> Result<Option<Cart>>;

    /// Create a cart holding only `item_name`.
    /// Returns `None` if a cart for `client_id` already exists.
    async fn create_with_first_item(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<Option<Cart>>;

    /// Add `item_name` if absent and refresh `client_name`, but only while the
    /// cart holds fewer than [`ITEM_LIMIT`](super::ITEM_LIMIT) items.
    /// Returns `None` if the cart is missing or already full.
    async fn add_item_if_room(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<Option<AddedItem>>;

    /// Resolve the item at `index` and remove every entry with that name.
    /// Returns `None` if the cart is missing or `index` is out of range.
    async fn remove_item_at(&self, client_id: &str, index: usize) -> Result<Option<RemovedItem>>;

    /// Empty the item list. Returns `None` if the cart is missing.
    async fn clear_all(&self, client_id: &str) -> Result<Option<Cart>>;

    /// All carts tracking at least one item
    async fn list_carts(&self) -> Result<Vec<Cart>>;

    /// Append listing post ids to `posts_notified`, skipping known ids
    async fn record_notified(&self, client_id: &str, post_ids: &[String]) -> Result<()>;
}

/// In-memory cart store (tests and database-less deployments)
#[derive(Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<RwLock<HashMap<String, Cart>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn find(&self, client_id: &str) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts.get(client_id).cloned())
    }

    async fn create_with_first_item(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<Option<Cart>> {
        let mut carts = self.carts.write().await;
        if carts.contains_key(client_id) {
            return Ok(None);
        }
        let mut cart = Cart::new(client_id, client_name);
        cart.items.push(item_name.to_string());
        carts.insert(client_id.to_string(), cart.clone());
        Ok(Some(cart))
    }

    async fn add_item_if_room(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<Option<AddedItem>> {
        let mut carts = self.carts.write().await;
        let Some(cart) = carts.get_mut(client_id) else {
            return Ok(None);
        };
        if cart.is_full() {
            return Ok(None);
        }
        let inserted = !cart.contains(item_name);
        if inserted {
            cart.items.push(item_name.to_string());
        }
        cart.client_name = client_name.to_string();
        Ok(Some(AddedItem {
            cart: cart.clone(),
            inserted,
        }))
    }

    async fn remove_item_at(&self, client_id: &str, index: usize) -> Result<Option<RemovedItem>> {
        let mut carts = self.carts.write().await;
        let Some(cart) = carts.get_mut(client_id) else {
            return Ok(None);
        };
        let Some(item_name) = cart.items.get(index).cloned() else {
            return Ok(None);
        };
        cart.items.retain(|i| *i != item_name);
        Ok(Some(RemovedItem {
            item_name,
            cart: cart.clone(),
        }))
    }

    async fn clear_all(&self, client_id: &str) -> Result<Option<Cart>> {
        let mut carts = self.carts.write().await;
        Ok(carts.get_mut(client_id).map(|cart| {
            cart.items.clear();
            cart.clone()
        }))
    }

    async fn list_carts(&self) -> Result<Vec<Cart>> {
        let carts = self.carts.read().await;
        let mut listed: Vec<Cart> = carts.values().filter(|c| !c.is_empty()).cloned().collect();
        listed.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        Ok(listed)
    }

    async fn record_notified(&self, client_id: &str, post_ids: &[String]) -> Result<()> {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts.get_mut(client_id) {
            for post_id in post_ids {
                if !cart.was_notified(post_id) {
                    cart.posts_notified.push(post_id.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ITEM_LIMIT;

    #[tokio::test]
    async fn test_create_only_once() {
        let store = MemoryCartStore::new();
        let created = store
            .create_with_first_item("U1", "Jotaro", "racket")
            .await
            .unwrap();
        assert_eq!(created.unwrap().items, vec!["racket"]);

        let again = store
            .create_with_first_item("U1", "Jotaro", "shoes")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(store.find("U1").await.unwrap().unwrap().items, vec!["racket"]);
    }

    #[tokio::test]
    async fn test_add_if_room_is_set_like_and_updates_name() {
        let store = MemoryCartStore::new();
        store
            .create_with_first_item("U1", "Jotaro", "racket")
            .await
            .unwrap();

        let added = store
            .add_item_if_room("U1", "Kujo Jotaro", "racket")
            .await
            .unwrap()
            .unwrap();
        assert!(!added.inserted);
        assert_eq!(added.cart.items, vec!["racket"]);
        assert_eq!(added.cart.client_name, "Kujo Jotaro");

        let added = store
            .add_item_if_room("U1", "Kujo Jotaro", "shoes")
            .await
            .unwrap()
            .unwrap();
        assert!(added.inserted);
        assert_eq!(added.cart.items, vec!["racket", "shoes"]);
    }

    #[tokio::test]
    async fn test_add_if_room_refuses_full_or_missing() {
        let store = MemoryCartStore::new();
        assert!(store
            .add_item_if_room("nobody", "x", "racket")
            .await
            .unwrap()
            .is_none());

        store.create_with_first_item("U1", "J", "item-0").await.unwrap();
        for i in 1..ITEM_LIMIT {
            store
                .add_item_if_room("U1", "J", &format!("item-{i}"))
                .await
                .unwrap()
                .unwrap();
        }
        assert!(store
            .add_item_if_room("U1", "J", "one-too-many")
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.find("U1").await.unwrap().unwrap().len(), ITEM_LIMIT);
    }

    #[tokio::test]
    async fn test_concurrent_adds_never_pass_the_cap() {
        let store = MemoryCartStore::new();
        store.create_with_first_item("U1", "J", "seed").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add_item_if_room("U1", "J", &format!("item-{i}"))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.find("U1").await.unwrap().unwrap().len(), ITEM_LIMIT);
    }

    #[tokio::test]
    async fn test_remove_item_at_resolves_name() {
        let store = MemoryCartStore::new();
        store.create_with_first_item("U1", "J", "a").await.unwrap();
        store.add_item_if_room("U1", "J", "b").await.unwrap();
        store.add_item_if_room("U1", "J", "c").await.unwrap();

        let removed = store.remove_item_at("U1", 1).await.unwrap().unwrap();
        assert_eq!(removed.item_name, "b");
        assert_eq!(removed.cart.items, vec!["a", "c"]);

        assert!(store.remove_item_at("U1", 2).await.unwrap().is_none());
        assert!(store.remove_item_at("nobody", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_notified_skips_known_ids() {
        let store = MemoryCartStore::new();
        store.create_with_first_item("U1", "J", "a").await.unwrap();
        store
            .record_notified("U1", &["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();
        store
            .record_notified("U1", &["p2".to_string(), "p3".to_string()])
            .await
            .unwrap();

        let cart = store.find("U1").await.unwrap().unwrap();
        assert_eq!(cart.posts_notified, vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_list_carts_skips_empty() {
        let store = MemoryCartStore::new();
        store.create_with_first_item("U2", "B", "b").await.unwrap();
        store.create_with_first_item("U1", "A", "a").await.unwrap();
        store.create_with_first_item("U3", "C", "c").await.unwrap();
        store.clear_all("U3").await.unwrap();

        let ids: Vec<String> = store
            .list_carts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.client_id)
            .collect();
        assert_eq!(ids, vec!["U1", "U2"]);
    }
}
