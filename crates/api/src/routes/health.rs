use axum::{
    extract::State,
    http::{header, StatusCode},
    routing::get,
    Extension, Json, Router,
};
use prometheus::TEXT_FORMAT;
use serde::Serialize;

use crate::{
    error::{ApiResult, AppError},
    state::{AppState, RequestId, METRICS},
};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "up",
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store: "down",
                }),
            )
        }
    }
}

async fn metrics(
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<([(header::HeaderName, &'static str); 1], String)> {
    let body = METRICS.gather().map_err(|err| {
        tracing::error!(error = %err, "metrics encoding failed");
        AppError::Internal.with_request_id(&request_id.0)
    })?;
    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
