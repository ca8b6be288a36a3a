//! EZBuy Messenger webhook server
//!
//! ## Usage
//!
//! ```bash
//! EZBUY_PAGE_ACCESS_TOKEN=... EZBUY_VERIFY_TOKEN=... \
//! DATABASE_URL=postgresql://localhost/ezbuy \
//!   cargo run --bin webhook_server
//!
//! curl "http://localhost:2236/messenger_webhook?hub.mode=subscribe&hub.verify_token=...&hub.challenge=42"
//! curl http://localhost:2236/health
//! ```
//!
//! TLS is expected to be terminated in front of this process.

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ezbuy_bot::api::{create_webhook_router, WebhookState};
use ezbuy_bot::cart::{CartService, CartStore, MemoryCartStore};
use ezbuy_bot::database::{DatabaseConfig, DatabaseManager};
use ezbuy_bot::messenger::{GraphApiClient, MessengerClient};
use ezbuy_bot::routing::EventRouter;
use ezbuy_bot::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ezbuy_bot=debug,tower_http=debug".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(?config, "starting EZBuy webhook server");

    let database = match &config.database_url {
        Some(url) => {
            let db_config =
                DatabaseConfig::new(url.clone()).with_max_connections(config.database_pool_size);
            let manager = DatabaseManager::new(db_config)
                .await
                .context("failed to connect to database")?;
            manager
                .test_connection()
                .await
                .context("database connectivity check failed")?;
            manager
                .ensure_schema()
                .await
                .context("failed to prepare cart schema")?;
            Some(manager)
        }
        None => {
            warn!("DATABASE_URL not set; carts are kept in memory and lost on restart");
            None
        }
    };

    let store: Arc<dyn CartStore> = match &database {
        Some(manager) => Arc::new(manager.cart_store()),
        None => Arc::new(MemoryCartStore::new()),
    };

    let messenger: Arc<dyn MessengerClient> = Arc::new(
        GraphApiClient::new(&config.graph_api_base, &config.page_access_token)
            .context("failed to build Graph API client")?,
    );

    let router = EventRouter::new(CartService::new(store), &config.feedback_url);
    let state = WebhookState::new(router, messenger, &config.verify_token);
    let app = create_webhook_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    info!("webhook server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(manager) = database {
        manager.close().await;
    }
    info!("webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
