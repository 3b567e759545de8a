pub mod admin;
pub mod categories;
pub mod channels;
pub mod health;
pub mod languages;

use std::collections::HashMap;

use axum::{
    extract::{rejection::QueryRejection, Query},
    middleware::from_fn,
    Router,
};
use tower_http::trace::TraceLayer;
use tvstream_core::payload::NON_FIELD_ERRORS;

use crate::error::{ApiError, ApiResult, AppError};
use crate::middleware::{metrics::metrics, request_id::request_id};
use crate::state::{AppState, RequestId};

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(categories::router(state.clone()))
        .merge(languages::router(state.clone()))
        .merge(channels::router(state))
}

pub fn admin_router(state: AppState) -> Router {
    admin::router(state)
}

pub fn health_router(state: AppState) -> Router {
    health::router(state)
}

/// Assembles the full application with request ids, metrics and tracing.
pub fn app(state: AppState, admin_enabled: bool) -> Router {
    let mut router = Router::new()
        .merge(health_router(state.clone()))
        .merge(api_router(state.clone()));
    if admin_enabled {
        router = router.merge(admin_router(state));
    }

    router
        .route_layer(from_fn(metrics))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
}

/// Numeric path ids. Anything else cannot name a record, so it is a 404.
pub(crate) fn parse_id(raw: &str, entity: &str, request_id: &RequestId) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| not_found(entity, request_id))
}

/// Raw query string pairs, in order.
pub(crate) type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Query parameters by name. A repeated name keeps its last value.
pub(crate) fn query_params(
    query: QueryPairs,
    request_id: &RequestId,
) -> ApiResult<HashMap<String, String>> {
    let Query(pairs) = query.map_err(|rejection| {
        AppError::Validation {
            field: NON_FIELD_ERRORS.to_string(),
            message: rejection.body_text(),
        }
        .with_request_id(&request_id.0)
    })?;
    Ok(pairs.into_iter().collect())
}

pub(crate) fn not_found(entity: &str, request_id: &RequestId) -> ApiError {
    AppError::NotFound(format!("{entity} not found")).with_request_id(&request_id.0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body, Bytes},
        http::{HeaderMap, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tvstream_db::MemoryStore;

    use crate::state::AppState;

    pub fn test_app() -> Router {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
        };
        super::app(state, true)
    }

    pub async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let body = match body {
            Some(value) => Body::from(serde_json::to_vec(&value).unwrap()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes)
    }

    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = send_raw(app, method, uri, body).await;
        if bytes.is_empty() {
            return (status, Value::Null);
        }
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn seed_category(app: &Router, name: &str, slug: &str) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/categories/",
            Some(json!({ "name": name, "slug": slug })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn seed_language(app: &Router, name: &str, code: &str) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/languages/",
            Some(json!({ "name": name, "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn seed_channel(app: &Router, name: &str, category: i64, language: i64) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/channels/",
            Some(json!({
                "name": name,
                "category": category,
                "language": language,
                "stream_url": format!("https://streams.example.com/{}", name.to_lowercase().replace(' ', "-")),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}
