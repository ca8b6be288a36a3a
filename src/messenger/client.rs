//! Messenger Send API client
//!
//! Thin wrapper over the Graph API endpoints the bot needs: sending replies,
//! sender actions, and looking up a sender's display name.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::replies::{ButtonAction, ReplyMessage};

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// Error type for Graph API calls
#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected Graph API response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
}

impl SenderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderAction::MarkSeen => "mark_seen",
            SenderAction::TypingOn => "typing_on",
        }
    }
}

/// Outbound side of the messaging platform
#[async_trait]
pub trait MessengerClient: Send + Sync {
    async fn send_reply(&self, recipient_id: &str, message: &ReplyMessage)
        -> Result<(), MessengerError>;

    async fn send_sender_action(
        &self,
        recipient_id: &str,
        action: SenderAction,
    ) -> Result<(), MessengerError>;

    /// Display name of a page-scoped user id
    async fn fetch_display_name(&self, psid: &str) -> Result<String, MessengerError>;
}

/// Build the Send API body for a reply.
///
/// Buttons become a button-template attachment, quick replies ride on a
/// text message, anything else is sent as plain text.
pub fn message_body(recipient_id: &str, message: &ReplyMessage) -> Value {
    let payload = if let Some(buttons) = &message.buttons {
        let buttons: Vec<Value> = buttons
            .iter()
            .map(|b| match &b.action {
                ButtonAction::Postback { payload } => json!({
                    "type": "postback",
                    "title": b.label,
                    "payload": payload,
                }),
                ButtonAction::WebUrl { url } => json!({
                    "type": "web_url",
                    "title": b.label,
                    "url": url,
                }),
            })
            .collect();
        json!({
            "attachment": {
                "type": "template",
                "payload": {
                    "template_type": "button",
                    "text": message.text,
                    "buttons": buttons,
                }
            }
        })
    } else if let Some(quick_replies) = &message.quick_replies {
        let quick_replies: Vec<Value> = quick_replies
            .iter()
            .map(|q| {
                json!({
                    "content_type": "text",
                    "title": q.label,
                    "payload": q.payload,
                })
            })
            .collect();
        json!({ "text": message.text, "quick_replies": quick_replies })
    } else {
        json!({ "text": message.text })
    };

    json!({
        "recipient": { "id": recipient_id },
        "messaging_type": "RESPONSE",
        "message": payload,
    })
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    name: Option<String>,
}

/// [`MessengerClient`] backed by the Facebook Graph API
pub struct GraphApiClient {
    client: Client,
    api_base: String,
    access_token: String,
}

impl GraphApiClient {
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, MessengerError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn post_messages(&self, body: &Value) -> Result<(), MessengerError> {
        let url = format!("{}/me/messages", self.api_base);
        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessengerClient for GraphApiClient {
    async fn send_reply(
        &self,
        recipient_id: &str,
        message: &ReplyMessage,
    ) -> Result<(), MessengerError> {
        debug!(recipient_id, "sending reply");
        self.post_messages(&message_body(recipient_id, message))
            .await
    }

    async fn send_sender_action(
        &self,
        recipient_id: &str,
        action: SenderAction,
    ) -> Result<(), MessengerError> {
        let body = json!({
            "recipient": { "id": recipient_id },
            "sender_action": action.as_str(),
        });
        self.post_messages(&body).await
    }

    async fn fetch_display_name(&self, psid: &str) -> Result<String, MessengerError> {
        let url = format!("{}/{}", self.api_base, psid);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", "name"), ("access_token", self.access_token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .map_err(|e| MessengerError::Decode(e.to_string()))?;
        profile
            .name
            .ok_or_else(|| MessengerError::Decode(format!("profile for {} has no name", psid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replies::{Reply, DEFAULT_FEEDBACK_URL};

    #[test]
    fn button_replies_become_a_button_template() {
        let msg = Reply::AddFull.to_message(DEFAULT_FEEDBACK_URL);
        let body = message_body("U1", &msg);

        assert_eq!(body["recipient"]["id"], "U1");
        let payload = &body["message"]["attachment"]["payload"];
        assert_eq!(payload["template_type"], "button");
        assert_eq!(payload["text"], msg.text);
        assert_eq!(payload["buttons"][0]["type"], "postback");
        assert_eq!(payload["buttons"][0]["payload"], "SHOW_SHOPPING_CART");
        assert_eq!(payload["buttons"][2]["type"], "web_url");
        assert_eq!(payload["buttons"][2]["url"], DEFAULT_FEEDBACK_URL);
    }

    #[test]
    fn listing_sends_quick_replies() {
        let msg = Reply::CartListing {
            items: vec!["shoes".into()],
        }
        .to_message(DEFAULT_FEEDBACK_URL);
        let body = message_body("U1", &msg);

        let quick = body["message"]["quick_replies"].as_array().unwrap();
        assert_eq!(quick.len(), 3);
        assert_eq!(quick[0]["content_type"], "text");
        assert_eq!(quick[0]["payload"], "REMOVE_ITEM,0");
        assert!(body["message"]["attachment"].is_null());
    }

    #[test]
    fn plain_text_without_extras() {
        let msg = ReplyMessage {
            text: "hello".into(),
            buttons: None,
            quick_replies: None,
        };
        let body = message_body("U1", &msg);
        assert_eq!(body["message"], json!({ "text": "hello" }));
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client = GraphApiClient::new("https://graph.example.test/v19.0/", "token").unwrap();
        assert_eq!(client.api_base, "https://graph.example.test/v19.0");
    }
}
