//! Canned replies
//!
//! Every user-facing message is one of the [`Reply`] kinds below. Each kind
//! maps to a fixed template through [`TEMPLATES`]; named parameters are
//! substituted into `{{name}}` placeholders by [`render_template`].

use serde::{Deserialize, Serialize};

use crate::cart::{RemoveSelector, ITEM_LIMIT};

pub const PAYLOAD_GET_STARTED: &str = "GET_STARTED";
pub const PAYLOAD_SHOW_HELP: &str = "SHOW_HELP";
pub const PAYLOAD_SHOW_SHOPPING_CART: &str = "SHOW_SHOPPING_CART";
pub const REMOVE_ITEM_PREFIX: &str = "REMOVE_ITEM,";

pub const DEFAULT_FEEDBACK_URL: &str = "https://www.facebook.com/EZBuy-245463649459051/";

/// Template identifiers, one per reply kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    GetStarted,
    Help,
    AddSuccess,
    AddFull,
    AddExisted,
    CartHead,
    CartLine,
    CartEmpty,
    RemovedOne,
    RemovedAll,
    RemovedNone,
    NothingToRemove,
    ListingMatch,
}

pub static TEMPLATES: &[(TemplateKind, &str)] = &[
    (
        TemplateKind::GetStarted,
        "Hi! I'm EZBuy. Type the name of anything you're hunting for and I'll keep an eye on the second-hand board for you.",
    ),
    (
        TemplateKind::Help,
        "Type an item name to start tracking it (up to {{item_limit}} items).\nTap \"My tracking list\" to see what you're tracking or to stop tracking something.",
    ),
    (
        TemplateKind::AddSuccess,
        "Now tracking \"{{item_name}}\"! We'll keep watching the second-hand board for it.\n(You're tracking {{item_count}}/{{item_limit}} items)",
    ),
    (
        TemplateKind::AddFull,
        "Sorry, your tracking list is full > <\nRemove something you no longer need before adding a new item!",
    ),
    (
        TemplateKind::AddExisted,
        "You're already tracking this item ^^\nWant to try adding something else?",
    ),
    (TemplateKind::CartHead, "Here's what you're tracking:\n"),
    (TemplateKind::CartLine, "{{index}}. {{item_name}}\n"),
    (
        TemplateKind::CartEmpty,
        "Your tracking list is empty. Type an item name to start tracking it!",
    ),
    (
        TemplateKind::RemovedOne,
        "Stopped tracking \"{{item_name}}\"!\n(Tip: to track something else, just type its name.)",
    ),
    (
        TemplateKind::RemovedAll,
        "Cleared your whole tracking list!\n(Tip: to track something else, just type its name.)",
    ),
    (
        TemplateKind::RemovedNone,
        "Thanks for using EZBuy, stay tuned for new posts > <",
    ),
    (
        TemplateKind::NothingToRemove,
        "That item isn't on your tracking list anymore. Tap \"My tracking list\" to see the current one.",
    ),
    (
        TemplateKind::ListingMatch,
        "Found a new post for \"{{item_name}}\":\n{{post_url}}",
    ),
];

/// Look up the raw template text for a kind
pub fn template(kind: TemplateKind) -> &'static str {
    TEMPLATES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, text)| *text)
        .unwrap_or_default()
}

/// Substitute `{{name}}` placeholders with the given parameters
pub fn render_template(kind: TemplateKind, params: &[(&str, String)]) -> String {
    let mut result = template(kind).to_string();
    for (name, value) in params {
        let placeholder = format!("{{{{{}}}}}", name);
        result = result.replace(&placeholder, value);
    }
    result
}

/// Every reply the bot can send, with its parameters spelled out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    GetStarted,
    Help,
    AddSuccess { item_name: String, item_count: usize },
    AddFull,
    AddExisted,
    CartListing { items: Vec<String> },
    CartEmpty,
    RemovedOne { item_name: String },
    RemovedAll,
    RemovedNone,
    NothingToRemove,
    ListingMatch { item_name: String, post_url: String },
}

/// Outbound message descriptor handed to the messenger client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<QuickReply>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ButtonAction {
    Postback { payload: String },
    WebUrl { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub payload: String,
}

/// The three buttons attached to every reply except the cart listing
pub fn usual_buttons(feedback_url: &str) -> Vec<Button> {
    vec![
        Button {
            label: "My tracking list".to_string(),
            action: ButtonAction::Postback {
                payload: PAYLOAD_SHOW_SHOPPING_CART.to_string(),
            },
        },
        Button {
            label: "How to use".to_string(),
            action: ButtonAction::Postback {
                payload: PAYLOAD_SHOW_HELP.to_string(),
            },
        },
        Button {
            label: "Feedback".to_string(),
            action: ButtonAction::WebUrl {
                url: feedback_url.to_string(),
            },
        },
    ]
}

pub fn remove_item_payload(selector: RemoveSelector) -> String {
    format!("{}{}", REMOVE_ITEM_PREFIX, selector.code())
}

fn limit_param() -> (&'static str, String) {
    ("item_limit", ITEM_LIMIT.to_string())
}

impl Reply {
    pub fn text(&self) -> String {
        match self {
            Reply::GetStarted => render_template(TemplateKind::GetStarted, &[]),
            Reply::Help => render_template(TemplateKind::Help, &[limit_param()]),
            Reply::AddSuccess {
                item_name,
                item_count,
            } => render_template(
                TemplateKind::AddSuccess,
                &[
                    ("item_name", item_name.clone()),
                    ("item_count", item_count.to_string()),
                    limit_param(),
                ],
            ),
            Reply::AddFull => render_template(TemplateKind::AddFull, &[]),
            Reply::AddExisted => render_template(TemplateKind::AddExisted, &[]),
            Reply::CartListing { items } => {
                let mut text = render_template(TemplateKind::CartHead, &[]);
                for (idx, item) in items.iter().enumerate() {
                    text.push_str(&render_template(
                        TemplateKind::CartLine,
                        &[("index", (idx + 1).to_string()), ("item_name", item.clone())],
                    ));
                }
                text
            }
            Reply::CartEmpty => render_template(TemplateKind::CartEmpty, &[]),
            Reply::RemovedOne { item_name } => render_template(
                TemplateKind::RemovedOne,
                &[("item_name", item_name.clone())],
            ),
            Reply::RemovedAll => render_template(TemplateKind::RemovedAll, &[]),
            Reply::RemovedNone => render_template(TemplateKind::RemovedNone, &[]),
            Reply::NothingToRemove => render_template(TemplateKind::NothingToRemove, &[]),
            Reply::ListingMatch {
                item_name,
                post_url,
            } => render_template(
                TemplateKind::ListingMatch,
                &[
                    ("item_name", item_name.clone()),
                    ("post_url", post_url.clone()),
                ],
            ),
        }
    }

    /// Render into an outbound message with its buttons or quick replies
    pub fn to_message(&self, feedback_url: &str) -> ReplyMessage {
        let text = self.text();
        match self {
            Reply::CartListing { items } => {
                let mut quick_replies: Vec<QuickReply> = (0..items.len())
                    .map(|idx| QuickReply {
                        label: format!("Item {}", idx + 1),
                        payload: remove_item_payload(RemoveSelector::Index(idx)),
                    })
                    .collect();
                quick_replies.push(QuickReply {
                    label: "Remove all".to_string(),
                    payload: remove_item_payload(RemoveSelector::All),
                });
                quick_replies.push(QuickReply {
                    label: "Nothing, thanks".to_string(),
                    payload: remove_item_payload(RemoveSelector::None),
                });
                ReplyMessage {
                    text,
                    buttons: None,
                    quick_replies: Some(quick_replies),
                }
            }
            _ => ReplyMessage {
                text,
                buttons: Some(usual_buttons(feedback_url)),
                quick_replies: None,
            },
        }
    }
}
