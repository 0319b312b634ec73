mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::location::LinkResolver;

pub fn build_router(resolver: LinkResolver) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/resolve", get(handlers::resolve))
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

pub async fn start(resolver: LinkResolver, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("geolink server listening on http://{}", addr);
    eprintln!("  geolink server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
