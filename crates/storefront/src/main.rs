//! MSgrocery Storefront - Public grocery API.
//!
//! This binary serves the storefront API on port 3000 and runs the order
//! consumer in the same process.
//!
//! # Architecture
//!
//! - Axum JSON API, authenticated by identity provider session tokens
//! - `PostgreSQL` for users, products, addresses and orders
//! - Cloudinary for product images
//! - In-process bounded queue between order intake and the order consumer

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use msgrocery_storefront::config::{ConfigError, StorefrontConfig};
use msgrocery_storefront::db::{self, PgOrderRepository};
use msgrocery_storefront::events::consumer::{BatchPolicy, OrderConsumer, run_consumer};
use msgrocery_storefront::events::identity::{WebhookError, WebhookVerifier};
use msgrocery_storefront::events;
use msgrocery_storefront::services::auth::{AuthError, RoleAuthorizer, SessionVerifier};
use msgrocery_storefront::services::media::CloudinaryClient;
use msgrocery_storefront::state::{AppState, Repositories, Services};

/// How long to wait for the order consumer to drain on shutdown.
const CONSUMER_DRAIN_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session verifier: {0}")]
    Auth(#[from] AuthError),
    #[error("webhook verifier: {0}")]
    Webhook(#[from] WebhookError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "msgrocery_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p msgrocery-cli -- migrate

    let (bus, stream) = events::channel(config.orders.queue_capacity);
    let consumer = tokio::spawn(run_consumer(
        stream,
        OrderConsumer::new(Arc::new(PgOrderRepository::new(pool.clone()))),
        BatchPolicy::from(&config.orders),
    ));

    let repositories = Repositories::postgres(&pool);
    let state = AppState::new(Services {
        sellers: Arc::new(RoleAuthorizer::new(Arc::clone(&repositories.users))),
        repositories,
        events: Arc::new(bus),
        media: Arc::new(CloudinaryClient::new(config.cloudinary.clone())),
        sessions: SessionVerifier::new(&config.auth)?,
        webhooks: WebhookVerifier::new(&config.identity_webhook_secret)?,
        line_item_policy: config.orders.line_item_policy,
    });

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // The router owns the last handle to the event bus; once the server
    // returns the queue closes and the consumer drains.
    axum::serve(listener, msgrocery_storefront::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match tokio::time::timeout(CONSUMER_DRAIN_TIMEOUT, consumer).await {
        Ok(Ok(())) => tracing::info!("Order consumer drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Order consumer task failed"),
        Err(_) => tracing::warn!("Order consumer did not drain in time"),
    }

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
