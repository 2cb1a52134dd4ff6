//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression,
//! and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use shahr_core::{Result, ShahrConfig, ShahrError};

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Dashboard served from the API port or the dev server on port + 1.
    let port = state.config.general.port;
    let dev_port = port.saturating_add(1);
    let origins = [port, dev_port].into_iter().flat_map(|p| {
        [
            format!("http://127.0.0.1:{}", p),
            format!("http://localhost:{}", p),
        ]
    });
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            origins.filter_map(|o| o.parse::<HeaderValue>().ok()),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Routes that do NOT require authentication.
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/modules", get(handlers::modules))
        .route("/documents", get(handlers::documents))
        .route("/chat/state", get(handlers::chat_state))
        .route(
            "/chat/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route("/chat/active", put(handlers::switch_active))
        .route(
            "/chat/conversations/{id}/messages",
            get(handlers::conversation_messages),
        )
        .route("/chat/draft", put(handlers::set_draft))
        .route("/chat/messages", post(handlers::submit_message))
        .route("/chat/events", get(handlers::chat_events))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to 127.0.0.1 (localhost only) on the port from config.
pub async fn start_server(config: &ShahrConfig, state: AppState) -> Result<()> {
    let addr = format!("127.0.0.1:{}", config.general.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ShahrError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| ShahrError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
