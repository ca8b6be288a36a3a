//! Webhook event routing
//!
//! Classification order, first match wins:
//! 1. postback payload: get started / help / show tracking list
//! 2. quick-reply payload `REMOVE_ITEM,<n>`: remove by index, all, or none
//! 3. free text: track the text as an item name
//! 4. anything else is ignored

use tracing::debug;

use crate::cart::{AddOutcome, CartService, RemoveOutcome, RemoveSelector, ShowOutcome};
use crate::error::CartError;
use crate::messenger::MessagingEvent;
use crate::replies::{
    Reply, ReplyMessage, PAYLOAD_GET_STARTED, PAYLOAD_SHOW_HELP, PAYLOAD_SHOW_SHOPPING_CART,
    REMOVE_ITEM_PREFIX,
};

/// What an inbound event asks the bot to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    GetStarted,
    ShowHelp,
    ShowCart,
    Remove(RemoveSelector),
    Track(String),
    Ignore,
}

impl Action {
    /// Only tracking needs the sender's display name
    pub fn needs_client_name(&self) -> bool {
        matches!(self, Action::Track(_))
    }
}

pub fn classify(event: &MessagingEvent) -> Action {
    if let Some(payload) = event.postback_payload() {
        return classify_postback(payload);
    }
    if let Some(payload) = event.quick_reply_payload() {
        return parse_remove_payload(payload)
            .map(Action::Remove)
            .unwrap_or(Action::Ignore);
    }
    match event.text().map(str::trim) {
        Some(text) if !text.is_empty() => Action::Track(text.to_string()),
        _ => Action::Ignore,
    }
}

fn classify_postback(payload: &str) -> Action {
    match payload {
        PAYLOAD_GET_STARTED => Action::GetStarted,
        PAYLOAD_SHOW_HELP => Action::ShowHelp,
        PAYLOAD_SHOW_SHOPPING_CART | "SHOW_CART" => Action::ShowCart,
        other => {
            debug!(payload = other, "unknown postback payload");
            Action::Ignore
        }
    }
}

/// Parse `REMOVE_ITEM,<n>` into a selector
pub fn parse_remove_payload(payload: &str) -> Option<RemoveSelector> {
    let code = payload
        .strip_prefix(REMOVE_ITEM_PREFIX)?
        .trim()
        .parse::<i64>()
        .ok()?;
    RemoveSelector::from_code(code)
}

/// Maps classified events onto cart operations and canned replies
#[derive(Clone)]
pub struct EventRouter {
    carts: CartService,
    feedback_url: String,
}

impl EventRouter {
    pub fn new(carts: CartService, feedback_url: impl Into<String>) -> Self {
        Self {
            carts,
            feedback_url: feedback_url.into(),
        }
    }

    pub fn carts(&self) -> &CartService {
        &self.carts
    }

    pub fn feedback_url(&self) -> &str {
        &self.feedback_url
    }

    /// Run an action for a client. `None` means nothing should be sent.
    pub async fn dispatch(
        &self,
        client_id: &str,
        client_name: &str,
        action: Action,
    ) -> Result<Option<Reply>, CartError> {
        let reply = match action {
            Action::GetStarted => Reply::GetStarted,
            Action::ShowHelp => Reply::Help,
            Action::ShowCart => match self.carts.show_cart(client_id).await? {
                ShowOutcome::Empty => Reply::CartEmpty,
                ShowOutcome::Listing(items) => Reply::CartListing { items },
            },
            Action::Remove(selector) => {
                match self.carts.remove_from_cart(client_id, selector).await? {
                    RemoveOutcome::RemovedOne { item_name } => Reply::RemovedOne { item_name },
                    RemoveOutcome::RemovedAll => Reply::RemovedAll,
                    RemoveOutcome::NoOp => Reply::RemovedNone,
                    RemoveOutcome::NotFound | RemoveOutcome::IndexOutOfRange { .. } => {
                        Reply::NothingToRemove
                    }
                }
            }
            Action::Track(item_name) => {
                let added = self
                    .carts
                    .add_to_cart(client_id, client_name, &item_name)
                    .await?;
                match added.outcome {
                    AddOutcome::Success => Reply::AddSuccess {
                        item_name: added.item_name,
                        item_count: added.new_count,
                    },
                    AddOutcome::Full => Reply::AddFull,
                    AddOutcome::AlreadyExists => Reply::AddExisted,
                }
            }
            Action::Ignore => return Ok(None),
        };
        Ok(Some(reply))
    }

    pub fn render(&self, reply: &Reply) -> ReplyMessage {
        reply.to_message(&self.feedback_url)
    }

    /// Classify, dispatch and render one event
    pub async fn handle(
        &self,
        event: &MessagingEvent,
        client_name: &str,
    ) -> Result<Option<ReplyMessage>, CartError> {
        let action = classify(event);
        let reply = self
            .dispatch(event.sender_id(), client_name, action)
            .await?;
        Ok(reply.map(|r| self.render(&r)))
    }
}
