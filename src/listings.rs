//! Marketplace listing notifications
//!
//! Incoming second-hand board posts are matched against every tracking list.
//! A post matches a cart when one of its item names appears in the post
//! message; each client hears about a given post at most once.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cart::{Cart, CartStore};
use crate::error::CartError;
use crate::messenger::MessengerClient;
use crate::replies::Reply;

const POST_URL_BASE: &str = "https://www.facebook.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPost {
    pub id: String,
    pub message: String,
}

impl ListingPost {
    pub fn url(&self) -> String {
        format!("{}/{}", POST_URL_BASE, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingMatch {
    pub client_id: String,
    pub item_name: String,
    pub post_id: String,
    pub post_url: String,
}

/// Posts in `posts` that match `cart` and were not sent to this client yet.
/// Each post id matches at most once per call, even if repeated in `posts`,
/// on the first item (in display order) contained in its message.
pub fn match_cart(cart: &Cart, posts: &[ListingPost]) -> Vec<ListingMatch> {
    let mut seen: HashSet<&str> = HashSet::new();
    posts
        .iter()
        .filter(|post| !cart.was_notified(&post.id))
        .filter(|post| seen.insert(post.id.as_str()))
        .filter_map(|post| {
            cart.items
                .iter()
                .find(|item| post.message.contains(item.as_str()))
                .map(|item| ListingMatch {
                    client_id: cart.client_id.clone(),
                    item_name: item.clone(),
                    post_id: post.id.clone(),
                    post_url: post.url(),
                })
        })
        .collect()
}

pub struct ListingNotifier {
    store: Arc<dyn CartStore>,
    messenger: Arc<dyn MessengerClient>,
    feedback_url: String,
}

impl ListingNotifier {
    pub fn new(
        store: Arc<dyn CartStore>,
        messenger: Arc<dyn MessengerClient>,
        feedback_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            messenger,
            feedback_url: feedback_url.into(),
        }
    }

    /// Notify every client about matching posts. Returns notifications sent.
    pub async fn notify(&self, posts: &[ListingPost]) -> Result<usize, CartError> {
        let mut sent = 0;
        for cart in self.store.list_carts().await? {
            let matches = match_cart(&cart, posts);
            if matches.is_empty() {
                continue;
            }

            let mut delivered = Vec::with_capacity(matches.len());
            for m in matches {
                let message = Reply::ListingMatch {
                    item_name: m.item_name.clone(),
                    post_url: m.post_url.clone(),
                }
                .to_message(&self.feedback_url);

                match self.messenger.send_reply(&m.client_id, &message).await {
                    Ok(()) => delivered.push(m.post_id),
                    Err(e) => warn!(
                        client_id = %m.client_id,
                        post_id = %m.post_id,
                        error = %e,
                        "failed to send listing notification"
                    ),
                }
            }

            if !delivered.is_empty() {
                self.store
                    .record_notified(&cart.client_id, &delivered)
                    .await?;
                sent += delivered.len();
            }
        }
        info!(posts = posts.len(), sent, "listing notification run finished");
        Ok(sent)
    }
}
