use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use tracing::info;
use tvstream_core::payload::{self, LanguagePayload, WriteMode};
use tvstream_core::types::Language;

use super::not_found;
use crate::{
    error::{ApiResult, MapApiErr},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/languages/", get(list_languages).post(create_language))
        .route(
            "/api/languages/{code}/",
            get(get_language)
                .put(replace_language)
                .patch(patch_language)
                .delete(delete_language),
        )
        .with_state(state)
}

async fn list_languages(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<Vec<Language>>> {
    let languages = state.store.list_languages().await.map_api_err(&request_id)?;
    Ok(Json(languages))
}

async fn create_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Language>)> {
    let new = payload::decode::<LanguagePayload>(&body)
        .and_then(LanguagePayload::into_new)
        .map_api_err(&request_id)?;
    let language = state
        .store
        .create_language(&new)
        .await
        .map_api_err(&request_id)?;

    info!(language_id = language.id, code = %language.code, "language created");
    Ok((StatusCode::CREATED, Json(language)))
}

async fn get_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(code): Path<String>,
) -> ApiResult<Json<Language>> {
    let language = find_language(&state, &code, &request_id).await?;
    Ok(Json(language))
}

async fn replace_language(
    state: State<AppState>,
    request_id: Extension<RequestId>,
    code: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Language>> {
    update_language(state, request_id, code, body, WriteMode::Replace).await
}

async fn patch_language(
    state: State<AppState>,
    request_id: Extension<RequestId>,
    code: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Language>> {
    update_language(state, request_id, code, body, WriteMode::Partial).await
}

async fn update_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(code): Path<String>,
    body: Bytes,
    mode: WriteMode,
) -> ApiResult<Json<Language>> {
    let existing = find_language(&state, &code, &request_id).await?;
    let changes = payload::decode::<LanguagePayload>(&body)
        .and_then(|payload| payload.into_changes(mode))
        .map_api_err(&request_id)?;
    let language = state
        .store
        .update_language(existing.id, &changes)
        .await
        .map_api_err(&request_id)?;
    Ok(Json(language))
}

async fn delete_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    let existing = find_language(&state, &code, &request_id).await?;
    state
        .store
        .delete_language(existing.id)
        .await
        .map_api_err(&request_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_language(
    state: &AppState,
    code: &str,
    request_id: &RequestId,
) -> ApiResult<Language> {
    state
        .store
        .language_by_code(code)
        .await
        .map_api_err(request_id)?
        .ok_or_else(|| not_found("language", request_id))
}
