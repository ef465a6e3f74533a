//! MotoSwap Backend Server
//!
//! HTTP API for the vehicle marketplace: listings, dealer negotiation, rentals and
//! trade-in exchanges.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderName, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use motoswap_server::app_state::AppState;
use motoswap_server::config::AppConfig;
use motoswap_server::files::PublicFileStore;
use motoswap_server::listing::{ListingStateMachine, TransitionPolicy};
use motoswap_server::listing_service::ListingService;
use motoswap_server::middleware::{USER_ID_HEADER, USER_ROLE_HEADER};
use motoswap_server::notifier::{EventDispatcher, LogNotifier, Notifier, WebhookNotifier};
use motoswap_server::routes;
use motoswap_server::store::{
    ListingStore, MemoryListingStore, MemoryValuationRuleStore, PgListingStore,
    PgValuationRuleStore, ValuationRuleStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("motoswap_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();

    let (listings, rules) = build_stores(&config).await?;
    let notifier = build_notifier(&config)?;
    let dispatcher = EventDispatcher::new(
        notifier,
        Arc::new(PublicFileStore::new(config.file_base_url.clone())),
    );
    let machine = ListingStateMachine::new(TransitionPolicy {
        strict: config.strict_transitions,
    });
    if config.strict_transitions {
        info!("strict listing transitions enabled");
    }

    let listing_service = Arc::new(ListingService::new(listings, rules, dispatcher, machine));

    // Create the app router
    let app = routes::app_router(AppState::new(listing_service))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config));

    let addr = config.socket_addr();
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn build_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn ListingStore>, Arc<dyn ValuationRuleStore>)> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
        return Ok((
            Arc::new(MemoryListingStore::new()),
            Arc::new(MemoryValuationRuleStore::new()),
        ));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("database ready");

    Ok((
        Arc::new(PgListingStore::new(pool.clone())),
        Arc::new(PgValuationRuleStore::new(pool)),
    ))
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.notify_webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(url.clone(), config.notify_timeout)
                .context("failed to build notification client")?;
            info!(url = %url, "notifications go to webhook");
            Ok(Arc::new(notifier))
        }
        None => {
            info!("NOTIFY_WEBHOOK_URL not set; notifications are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ])
        .allow_credentials(false)
}
