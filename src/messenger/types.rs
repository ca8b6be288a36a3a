//! Webhook payload shapes delivered by the Messenger platform
//!
//! Only the fields the bot reads are modelled; everything else in the
//! platform's JSON is ignored.

use serde::{Deserialize, Serialize};

/// Body of a `POST /messenger_webhook` delivery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
}

/// A single messaging event for one sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    #[serde(default)]
    pub recipient: Option<Participant>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub postback: Option<Postback>,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub title: Option<String>,
    pub payload: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub quick_reply: Option<QuickReplyPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickReplyPayload {
    pub payload: String,
}

impl MessagingEvent {
    pub fn sender_id(&self) -> &str {
        &self.sender.id
    }

    pub fn postback_payload(&self) -> Option<&str> {
        self.postback.as_ref().map(|p| p.payload.as_str())
    }

    pub fn quick_reply_payload(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.quick_reply.as_ref())
            .map(|q| q.payload.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.text.as_deref())
    }
}

impl WebhookPayload {
    /// All messaging events across every entry, in delivery order
    pub fn events(&self) -> impl Iterator<Item = &MessagingEvent> {
        self.entry.iter().flat_map(|e| e.messaging.iter())
    }
}
