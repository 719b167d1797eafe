//! HTTP endpoint.
//!
//! `POST /sync-images` runs one sync with the request's bearer credential
//! and answers with the report (200) or `{"error": "<message>"}` (500).

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use libimgsync::ImageSync;
use serde_json::json;
use tracing::{error, info};


pub const SYNC_ROUTE: &str = "/sync-images";

/// Builds the application router.
pub fn router(sync: ImageSync) -> Router {
    Router::new()
        .route(SYNC_ROUTE, post(sync_images))
        .with_state(sync)
}

/// Serves until interrupted.
pub async fn serve(sync: ImageSync) -> anyhow::Result<()> {
    let listen = sync.config().server.listen.clone();
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;

    info!(listen = %listen, route = SYNC_ROUTE, "listening");
    axum::serve(listener, router(sync))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn sync_images(State(sync): State<ImageSync>, headers: HeaderMap) -> Response {
    let bearer = bearer_token(&headers);
    match sync.run(bearer).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!(error = %e, "image sync failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}
