//! `EcoVoice` - `WhatsApp` intake bot for citizen waste reports
//!
//! Citizens report waste over `WhatsApp` with a photo or voice note; an AI
//! model extracts what it is, the sender's location is geocoded and the
//! scored report lands in the store that the dashboard reads.

mod api;
mod config;
mod db;
mod extraction;
mod geocode;
mod llm;
mod media;
mod replies;
mod report;
mod runtime;
mod session;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use extraction::{LlmExtractor, UnavailableExtractor};
use geocode::{CoordinateGeocoder, GoogleGeocoder};
use media::HttpMediaFetcher;
use runtime::{
    ConversationEngine, DatabaseStorage, Geocoder, MediaExtractor, MediaFetcher, ReportStore,
};
use session::{spawn_expiry_sweeper, SessionStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecovoice=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    // Configuration
    let config = AppConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;
    let store: Arc<dyn ReportStore> = Arc::new(DatabaseStorage::new(db));

    // Media extraction
    let extractor: Arc<dyn MediaExtractor> = match config.llm.build_service()? {
        Some(llm) => {
            tracing::info!(model = %llm.model_id(), "Media extraction enabled");
            Arc::new(LlmExtractor::new(llm))
        }
        None => {
            tracing::warn!(
                "No extraction model configured. Set GEMINI_API_KEY; media reports will be asked to resend."
            );
            Arc::new(UnavailableExtractor)
        }
    };

    // Geocoding
    let geocoder: Arc<dyn Geocoder> = match &config.maps_api_key {
        Some(key) => Arc::new(GoogleGeocoder::new(key.clone())?),
        None => {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set; only \"lat,lng\" locations will resolve");
            Arc::new(CoordinateGeocoder)
        }
    };

    // Media download
    if config.twilio_auth.is_none() {
        tracing::warn!("Twilio credentials not set; media is downloaded without authentication");
    }
    let fetcher: Arc<dyn MediaFetcher> = Arc::new(HttpMediaFetcher::new(config.twilio_auth.clone())?);

    // Sessions
    let sessions = Arc::new(SessionStore::new(config.session_ttl));
    if let Some(ttl) = config.session_ttl {
        tracing::info!(ttl_secs = ttl.as_secs(), "Session expiry enabled");
        spawn_expiry_sweeper(sessions.clone(), ttl.min(MAX_SWEEP_INTERVAL));
    }

    // Create application state
    let engine = ConversationEngine::new(sessions, fetcher, extractor, geocoder, store);
    let state = AppState::new(engine);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("EcoVoice server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
