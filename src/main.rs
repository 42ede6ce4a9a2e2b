//! babel-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use babel_gateway::api;
use babel_gateway::app_state::AppState;
use babel_gateway::config::GatewayConfig;
use babel_gateway::domain::{EventBus, EventRegistry};
use babel_gateway::providers::{ScriptedRecognizer, ScriptedSynthesizer, ScriptedTranslator};
use babel_gateway::room::{LocalRoomRouter, RoomTransport, TokenIssuer};
use babel_gateway::service::{EventService, RegistryLookup};
use babel_gateway::worker::WorkerCoordinator;
use babel_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting babel-gateway");

    // Build domain layer
    let registry = Arc::new(EventRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let token_issuer = TokenIssuer::new(config.token_secret.as_bytes());

    // Build transport and worker layers
    let transport: Arc<dyn RoomTransport> = Arc::new(LocalRoomRouter::new(
        token_issuer.clone(),
        config.room_channel_capacity,
    ));
    let lookup = Arc::new(RegistryLookup::new(Arc::clone(&registry)));
    let coordinator = Arc::new(WorkerCoordinator::new(
        Arc::clone(&transport),
        token_issuer.clone(),
        Arc::new(ScriptedRecognizer),
        Arc::new(ScriptedTranslator),
        Arc::new(ScriptedSynthesizer),
        lookup,
        event_bus.clone(),
        config.worker_settings(),
    ));

    // Build service layer
    let event_service = Arc::new(EventService::new(
        registry,
        Arc::clone(&transport),
        coordinator,
        token_issuer.clone(),
        event_bus.clone(),
        config.attendee_token_ttl_secs,
    ));

    // Build application state
    let app_state = AppState {
        event_service,
        event_bus,
        transport,
        token_issuer,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
