//! FireSentinel Collector
//!
//! Receives escalated alerts from field devices, stores their images,
//! re-validates them with the external vision model and places the voice
//! alert when fire is confirmed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  FIRESENTINEL COLLECTOR                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  HTTP     │  │  Validation   │  │  Voice notifier     │ │
//! │  │  (Axum)   │─▶│  cascade      │─▶│  (telephony API)    │ │
//! │  └─────┬─────┘  └───────────────┘  └─────────────────────┘ │
//! │        ▼                                                    │
//! │  ┌─────────────┐                                           │
//! │  │ Artifact    │  alert_*.jpg + alert_*.json               │
//! │  │ store       │                                           │
//! │  └─────────────┘                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod storage;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use firesentinel_core::logic::dispatch::{Dispatcher, Notifier, VoiceCallNotifier};
use firesentinel_core::logic::validation::{ValidationCascade, VisionValidatorStage};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "firesentinel_collector=debug,firesentinel_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env().context("invalid configuration")?;

    tracing::info!("FireSentinel Collector starting...");
    for var in config.missing_settings() {
        tracing::warn!("{} not set; validation or voice alerts will be unavailable", var);
    }

    let store = storage::ArtifactStore::open(&config.save_dir)
        .context("cannot open artifact directory")?;
    tracing::info!("Alerts will be saved to: {}", store.dir().display());

    // Build application state
    let state = AppState::from_config(&config, store);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Collector listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("cannot bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<storage::ArtifactStore>,
    pub cascade: Arc<ValidationCascade>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Server tier runs the external validator only
    fn from_config(config: &config::Config, store: storage::ArtifactStore) -> Self {
        let cascade = ValidationCascade::new(config.fail_policy)
            .with_stage(Arc::new(VisionValidatorStage::new(config.vision.clone())));

        let notifier = config.voice.is_complete().then(|| {
            Arc::new(VoiceCallNotifier::new(
                config.voice.clone(),
                std::time::Duration::from_secs(firesentinel_core::constants::DISPATCH_TIMEOUT_SECS),
            )) as Arc<dyn Notifier>
        });

        Self {
            store: Arc::new(store),
            cascade: Arc::new(cascade),
            dispatcher: Dispatcher::notify_only(notifier),
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home::index))
        .route("/health", get(handlers::health::check))
        .route("/alert", post(handlers::alert::receive))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
