use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::location::{ResolveError, ResolveOptions, ResolvedLink};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    kind: &'static str,
    code: u16,
}

pub struct ApiError(StatusCode, &'static str, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.2,
            kind: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        let status = match &e {
            ResolveError::EmptyInput => StatusCode::BAD_REQUEST,
            ResolveError::ShortLinkUnresolvable { .. } => StatusCode::BAD_GATEWAY,
            ResolveError::NoCoordinatesOrName { .. } | ResolveError::CoordinatesOutOfRange { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ResolveError::GeocodeNotFound { .. } => StatusCode::NOT_FOUND,
        };
        ApiError(status, e.kind(), e.to_string())
    }
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub input: Option<String>,
    #[serde(default)]
    pub free_text: bool,
    #[serde(default = "default_true")]
    pub reverse: bool,
}

fn default_true() -> bool {
    true
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<ResolvedLink>, ApiError> {
    let start = Instant::now();

    let input = params.input.unwrap_or_default();
    let opts = ResolveOptions {
        geocode_free_text: params.free_text,
        reverse_geocode: params.reverse,
    };

    let resolver = Arc::clone(&state);
    let logged_input = input.clone();
    let outcome = tokio::task::spawn_blocking(move || resolver.resolver.resolve_with_opts(&input, &opts))
        .await
        .map_err(|e| {
            ApiError(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                format!("resolver task failed: {}", e),
            )
        })?;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match outcome {
        Ok(link) => {
            info!(input = %logged_input, coordinates = %link.coordinates(), elapsed_ms, "GET /api/resolve");
            Ok(Json(link))
        }
        Err(e) => {
            warn!(input = %logged_input, kind = e.kind(), elapsed_ms, "GET /api/resolve failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ResolveError::EmptyInput, StatusCode::BAD_REQUEST),
            (
                ResolveError::ShortLinkUnresolvable { url: "u".into(), blocked: true },
                StatusCode::BAD_GATEWAY,
            ),
            (ResolveError::NoCoordinatesOrName { resolved_url: None }, StatusCode::UNPROCESSABLE_ENTITY),
            (
                ResolveError::CoordinatesOutOfRange { lat: 999.0, lng: 0.0 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ResolveError::GeocodeNotFound { name: "x".into() }, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            let kind = err.kind();
            let api: ApiError = err.into();
            assert_eq!(api.0, status);
            assert_eq!(api.1, kind);
        }
    }
}
