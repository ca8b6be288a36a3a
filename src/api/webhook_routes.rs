//! Messenger webhook endpoints
//!
//! - GET  /messenger_webhook  platform verification handshake
//! - POST /messenger_webhook  event delivery
//! - POST /listings/notify    match new marketplace posts against carts
//! - GET  /health             liveness check

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::error::CartError;
use crate::listings::{ListingNotifier, ListingPost};
use crate::messenger::{MessagingEvent, MessengerClient, SenderAction, WebhookPayload};
use crate::routing::{classify, EventRouter};

#[derive(Clone)]
pub struct WebhookState {
    pub router: EventRouter,
    pub messenger: Arc<dyn MessengerClient>,
    pub notifier: Arc<ListingNotifier>,
    pub verify_token: String,
}

impl WebhookState {
    pub fn new(
        router: EventRouter,
        messenger: Arc<dyn MessengerClient>,
        verify_token: impl Into<String>,
    ) -> Self {
        let notifier = Arc::new(ListingNotifier::new(
            Arc::clone(router.carts().store()),
            Arc::clone(&messenger),
            router.feedback_url(),
        ));
        Self {
            router,
            messenger,
            notifier,
            verify_token: verify_token.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub posts: Vec<ListingPost>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub notified: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP-facing wrapper for request failures
pub struct AppError(CartError);

impl From<CartError> for AppError {
    fn from(error: CartError) -> Self {
        Self(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error!(error = %self.0, "webhook request failed");
        (
            status,
            Json(ErrorResponse {
                error: "request failed".to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /messenger_webhook
async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let token_ok = params.verify_token.as_deref() == Some(state.verify_token.as_str());
    let mode_ok = params.mode.as_deref() == Some("subscribe");

    match params.challenge {
        Some(challenge) if token_ok && mode_ok => {
            info!("webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!("webhook verification rejected");
            (StatusCode::FORBIDDEN, "Invalid verification token").into_response()
        }
    }
}

/// POST /messenger_webhook
async fn receive_events(
    State(state): State<WebhookState>,
    Json(payload): Json<WebhookPayload>,
) -> Result<(StatusCode, &'static str), AppError> {
    for event in payload.events() {
        process_event(&state, event).await?;
    }
    Ok((StatusCode::OK, "ok"))
}

async fn process_event(state: &WebhookState, event: &MessagingEvent) -> Result<(), CartError> {
    let client_id = event.sender_id();

    if let Err(e) = state
        .messenger
        .send_sender_action(client_id, SenderAction::MarkSeen)
        .await
    {
        warn!(client_id, error = %e, "failed to mark message seen");
    }

    let action = classify(event);
    debug!(client_id, ?action, "classified webhook event");

    let client_name = if action.needs_client_name() {
        if let Err(e) = state
            .messenger
            .send_sender_action(client_id, SenderAction::TypingOn)
            .await
        {
            warn!(client_id, error = %e, "failed to send typing indicator");
        }
        match state.messenger.fetch_display_name(client_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(client_id, error = %e, "display name lookup failed");
                String::new()
            }
        }
    } else {
        String::new()
    };

    let Some(reply) = state.router.dispatch(client_id, &client_name, action).await? else {
        return Ok(());
    };

    let message = state.router.render(&reply);
    if let Err(e) = state.messenger.send_reply(client_id, &message).await {
        warn!(client_id, error = %e, "failed to send reply");
    }
    Ok(())
}

/// POST /listings/notify
async fn notify_listings(
    State(state): State<WebhookState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, AppError> {
    let notified = state.notifier.notify(&req.posts).await?;
    Ok(Json(NotifyResponse { notified }))
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Create router for the webhook endpoints
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route(
            "/messenger_webhook",
            get(verify_webhook).post(receive_events),
        )
        .route("/listings/notify", post(notify_listings))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
