//! Cart service behaviour over the in-memory store.
//!
//! Run with: cargo test --test cart_service_test

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ezbuy_bot::cart::store::Result as StoreResult;
use ezbuy_bot::cart::{
    AddOutcome, AddedItem, Cart, CartService, CartStore, MemoryCartStore, RemoveOutcome,
    RemoveSelector, RemovedItem, ShowOutcome, ITEM_LIMIT,
};
use ezbuy_bot::messenger::MessagingEvent;
use ezbuy_bot::replies::{Reply, DEFAULT_FEEDBACK_URL};
use ezbuy_bot::routing::EventRouter;

// ── Call-counting store ────────────────────────────────────────

/// Delegates to a memory store and counts every call.
///
/// `interleaved_add` is applied right before each conditional append and
/// `clear_before_remove` empties the list right before each indexed remove,
/// standing in for another request landing between lookup and update.
#[derive(Default)]
struct CountingStore {
    inner: MemoryCartStore,
    calls: AtomicUsize,
    interleaved_add: Option<&'static str>,
    clear_before_remove: bool,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CartStore for CountingStore {
    async fn find(&self, client_id: &str) -> StoreResult<Option<Cart>> {
        self.tick();
        self.inner.find(client_id).await
    }

    async fn create_with_first_item(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> StoreResult<Option<Cart>> {
        self.tick();
        self.inner
            .create_with_first_item(client_id, client_name, item_name)
            .await
    }

    async fn add_item_if_room(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> StoreResult<Option<AddedItem>> {
        self.tick();
        if let Some(other) = self.interleaved_add {
            self.inner
                .add_item_if_room(client_id, client_name, other)
                .await?;
        }
        self.inner
            .add_item_if_room(client_id, client_name, item_name)
            .await
    }

    async fn remove_item_at(
        &self,
        client_id: &str,
        index: usize,
    ) -> StoreResult<Option<RemovedItem>> {
        self.tick();
        if self.clear_before_remove {
            self.inner.clear_all(client_id).await?;
        }
        self.inner.remove_item_at(client_id, index).await
    }

    async fn clear_all(&self, client_id: &str) -> StoreResult<Option<Cart>> {
        self.tick();
        self.inner.clear_all(client_id).await
    }

    async fn list_carts(&self) -> StoreResult<Vec<Cart>> {
        self.tick();
        self.inner.list_carts().await
    }

    async fn record_notified(&self, client_id: &str, post_ids: &[String]) -> StoreResult<()> {
        self.tick();
        self.inner.record_notified(client_id, post_ids).await
    }
}

fn service() -> CartService {
    CartService::new(Arc::new(MemoryCartStore::new()))
}

async fn listing(svc: &CartService, client_id: &str) -> Vec<String> {
    match svc.show_cart(client_id).await.unwrap() {
        ShowOutcome::Listing(items) => items,
        ShowOutcome::Empty => Vec::new(),
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_same_item_twice_keeps_count_one() {
    let svc = service();

    let first = svc.add_to_cart("U1", "Jotaro", "racket").await.unwrap();
    let second = svc.add_to_cart("U1", "Jotaro", "racket").await.unwrap();

    assert_eq!(first.outcome, AddOutcome::Success);
    assert_eq!(second.outcome, AddOutcome::AlreadyExists);
    assert_eq!(second.new_count, 1);
    assert_eq!(listing(&svc, "U1").await, vec!["racket"]);
}

#[tokio::test]
async fn test_tenth_item_is_rejected() {
    let svc = service();

    for i in 0..ITEM_LIMIT {
        let res = svc
            .add_to_cart("U1", "Jotaro", &format!("item-{}", i))
            .await
            .unwrap();
        assert_eq!(res.outcome, AddOutcome::Success);
        assert_eq!(res.new_count, i + 1);
    }

    let tenth = svc.add_to_cart("U1", "Jotaro", "item-9").await.unwrap();
    assert_eq!(tenth.outcome, AddOutcome::Full);
    assert_eq!(tenth.new_count, ITEM_LIMIT);
    assert_eq!(listing(&svc, "U1").await.len(), ITEM_LIMIT);
}

#[tokio::test]
async fn test_duplicate_of_tracked_item_when_full_reports_full() {
    let svc = service();
    for i in 0..ITEM_LIMIT {
        svc.add_to_cart("U1", "J", &format!("item-{}", i))
            .await
            .unwrap();
    }
    let res = svc.add_to_cart("U1", "J", "item-0").await.unwrap();
    assert_eq!(res.outcome, AddOutcome::Full);
}

#[tokio::test]
async fn test_remove_by_index_keeps_relative_order() {
    let svc = service();
    for item in ["a", "b", "c", "d"] {
        svc.add_to_cart("U1", "J", item).await.unwrap();
    }

    let outcome = svc
        .remove_from_cart("U1", RemoveSelector::Index(1))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RemoveOutcome::RemovedOne {
            item_name: "b".into()
        }
    );
    assert_eq!(listing(&svc, "U1").await, vec!["a", "c", "d"]);

    svc.remove_from_cart("U1", RemoveSelector::Index(0))
        .await
        .unwrap();
    assert_eq!(listing(&svc, "U1").await, vec!["c", "d"]);
}

#[tokio::test]
async fn test_remove_none_never_touches_store() {
    let store = Arc::new(CountingStore::default());
    let svc = CartService::new(store.clone());

    let outcome = svc
        .remove_from_cart("U1", RemoveSelector::None)
        .await
        .unwrap();

    assert_eq!(outcome, RemoveOutcome::NoOp);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_full_cart_add_does_not_mutate() {
    let store = Arc::new(CountingStore::default());
    let svc = CartService::new(store.clone());
    for i in 0..ITEM_LIMIT {
        svc.add_to_cart("U1", "J", &format!("item-{}", i))
            .await
            .unwrap();
    }

    let before = store.calls();
    let res = svc.add_to_cart("U1", "J", "extra").await.unwrap();
    assert_eq!(res.outcome, AddOutcome::Full);
    // Only the lookup
    assert_eq!(store.calls() - before, 1);
}

#[tokio::test]
async fn test_duplicate_add_with_concurrent_add_is_already_exists() {
    let store = Arc::new(CountingStore {
        interleaved_add: Some("kindle"),
        ..Default::default()
    });
    let svc = CartService::new(store.clone());
    svc.add_to_cart("U1", "J", "switch").await.unwrap();

    let res = svc.add_to_cart("U1", "J", "switch").await.unwrap();

    assert_eq!(res.outcome, AddOutcome::AlreadyExists);
    assert_eq!(res.new_count, 2);
    assert_eq!(listing(&svc, "U1").await, vec!["switch", "kindle"]);
}

#[tokio::test]
async fn test_remove_racing_a_clear_reports_current_length() {
    let store = Arc::new(CountingStore {
        clear_before_remove: true,
        ..Default::default()
    });
    let svc = CartService::new(store.clone());
    for item in ["a", "b", "c"] {
        svc.add_to_cart("U1", "J", item).await.unwrap();
    }

    let outcome = svc
        .remove_from_cart("U1", RemoveSelector::Index(1))
        .await
        .unwrap();

    assert_eq!(outcome, RemoveOutcome::IndexOutOfRange { index: 1, len: 0 });
}

#[tokio::test]
async fn test_remove_all_then_show_is_empty() {
    let svc = service();
    svc.add_to_cart("U1", "J", "a").await.unwrap();
    svc.add_to_cart("U1", "J", "b").await.unwrap();

    let outcome = svc
        .remove_from_cart("U1", RemoveSelector::All)
        .await
        .unwrap();
    assert_eq!(outcome, RemoveOutcome::RemovedAll);
    assert_eq!(svc.show_cart("U1").await.unwrap(), ShowOutcome::Empty);
}

#[tokio::test]
async fn test_out_of_range_and_missing_cart_do_not_mutate() {
    let svc = service();
    svc.add_to_cart("U1", "J", "a").await.unwrap();

    assert_eq!(
        svc.remove_from_cart("U1", RemoveSelector::Index(3))
            .await
            .unwrap(),
        RemoveOutcome::IndexOutOfRange { index: 3, len: 1 }
    );
    assert_eq!(listing(&svc, "U1").await, vec!["a"]);

    assert_eq!(
        svc.remove_from_cart("U2", RemoveSelector::Index(0))
            .await
            .unwrap(),
        RemoveOutcome::NotFound
    );
    assert!(svc.store().find("U2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_refreshes_display_name() {
    let svc = service();
    svc.add_to_cart("U1", "Jotaro", "a").await.unwrap();
    svc.add_to_cart("U1", "Kujo Jotaro", "b").await.unwrap();

    let cart = svc.store().find("U1").await.unwrap().unwrap();
    assert_eq!(cart.client_name, "Kujo Jotaro");
}

#[tokio::test]
async fn test_concurrent_adds_stop_at_limit() {
    let svc = service();
    svc.add_to_cart("U1", "J", "seed").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.add_to_cart("U1", "J", &format!("item-{}", i))
                .await
                .unwrap()
                .outcome
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() == AddOutcome::Success {
            successes += 1;
        }
    }
    assert_eq!(successes, ITEM_LIMIT - 1);
    assert_eq!(listing(&svc, "U1").await.len(), ITEM_LIMIT);
}

#[tokio::test]
async fn test_track_list_remove_scenario() {
    let router = EventRouter::new(service(), DEFAULT_FEEDBACK_URL);
    let event = |value: serde_json::Value| -> MessagingEvent {
        serde_json::from_value(value).unwrap()
    };

    // Free text tracks the item
    let added = router
        .handle(
            &event(serde_json::json!({"sender": {"id": "U1"}, "message": {"text": "shoes"}})),
            "Jotaro",
        )
        .await
        .unwrap()
        .unwrap();
    assert!(added.text.contains("shoes"));
    assert!(added.text.contains("1/9"));

    // Postback lists it
    let listed = router
        .handle(
            &event(serde_json::json!({
                "sender": {"id": "U1"},
                "postback": {"payload": "SHOW_SHOPPING_CART"}
            })),
            "",
        )
        .await
        .unwrap()
        .unwrap();
    assert!(listed.text.contains("1. shoes"));
    assert_eq!(listed.text.matches(". ").count(), 1);

    // Quick reply removes it
    let removed = router
        .handle(
            &event(serde_json::json!({
                "sender": {"id": "U1"},
                "message": {"text": "Item 1", "quick_reply": {"payload": "REMOVE_ITEM,0"}}
            })),
            "",
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        removed.text,
        Reply::RemovedOne {
            item_name: "shoes".into()
        }
        .text()
    );

    assert_eq!(
        router.carts().show_cart("U1").await.unwrap(),
        ShowOutcome::Empty
    );
}
