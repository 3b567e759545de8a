use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use tracing::info;
use tvstream_core::payload::{self, CategoryPayload, WriteMode};
use tvstream_core::types::Category;

use super::not_found;
use crate::{
    error::{ApiResult, MapApiErr},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/categories/",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/categories/{slug}/",
            get(get_category)
                .put(replace_category)
                .patch(patch_category)
                .delete(delete_category),
        )
        .with_state(state)
}

async fn list_categories(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = state.store.list_categories().await.map_api_err(&request_id)?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let new = payload::decode::<CategoryPayload>(&body)
        .and_then(CategoryPayload::into_new)
        .map_api_err(&request_id)?;
    let category = state
        .store
        .create_category(&new)
        .await
        .map_api_err(&request_id)?;

    info!(category_id = category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Category>> {
    let category = find_category(&state, &slug, &request_id).await?;
    Ok(Json(category))
}

async fn replace_category(
    state: State<AppState>,
    request_id: Extension<RequestId>,
    slug: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Category>> {
    update_category(state, request_id, slug, body, WriteMode::Replace).await
}

async fn patch_category(
    state: State<AppState>,
    request_id: Extension<RequestId>,
    slug: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Category>> {
    update_category(state, request_id, slug, body, WriteMode::Partial).await
}

async fn update_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(slug): Path<String>,
    body: Bytes,
    mode: WriteMode,
) -> ApiResult<Json<Category>> {
    let existing = find_category(&state, &slug, &request_id).await?;
    let changes = payload::decode::<CategoryPayload>(&body)
        .and_then(|payload| payload.into_changes(mode))
        .map_api_err(&request_id)?;
    let category = state
        .store
        .update_category(existing.id, &changes)
        .await
        .map_api_err(&request_id)?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    let existing = find_category(&state, &slug, &request_id).await?;
    state
        .store
        .delete_category(existing.id)
        .await
        .map_api_err(&request_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_category(
    state: &AppState,
    slug: &str,
    request_id: &RequestId,
) -> ApiResult<Category> {
    state
        .store
        .category_by_slug(slug)
        .await
        .map_api_err(request_id)?
        .ok_or_else(|| not_found("category", request_id))
}
