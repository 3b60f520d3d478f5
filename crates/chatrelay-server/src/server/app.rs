use crate::server::{routes, static_files, websocket};
use crate::state::AppState;
use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

/// Build the Axum application
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new().route("/rooms", get(routes::list_rooms));

    Router::new()
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .nest("/api", api_routes)
        .route("/ws", get(websocket::websocket_handler))
        .fallback(static_files::serve_static)
        .layer(cors)
        .with_state(state)
}

/// Run the server until `shutdown` resolves
pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_app(state);

    tracing::info!("Starting chatrelay server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
