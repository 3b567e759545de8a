use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use tracing::info;
use tvstream_core::payload::{self, ChannelPayload, WriteMode};
use tvstream_core::types::{Channel, ChannelFilter};

use super::{not_found, parse_id, query_params, QueryPairs};
use crate::{
    error::{ApiResult, MapApiErr},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/channels/", get(list_channels).post(create_channel))
        .route(
            "/api/channels/{id}/",
            get(get_channel)
                .put(replace_channel)
                .patch(patch_channel)
                .delete(delete_channel),
        )
        .with_state(state)
}

#[derive(Debug, Default)]
struct ChannelQuery {
    category_slug: Option<String>,
    language_code: Option<String>,
}

impl ChannelQuery {
    fn from_params(mut params: HashMap<String, String>) -> Self {
        Self {
            category_slug: params.remove("category_slug"),
            language_code: params.remove("language_code"),
        }
    }

    fn into_filter(self) -> ChannelFilter {
        ChannelFilter {
            category_slug: non_empty(self.category_slug),
            language_code: non_empty(self.language_code),
            ..ChannelFilter::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn list_channels(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: QueryPairs,
) -> ApiResult<Json<Vec<Channel>>> {
    let filter = ChannelQuery::from_params(query_params(query, &request_id)?).into_filter();
    let channels = state
        .store
        .list_channels(&filter)
        .await
        .map_api_err(&request_id)?;
    Ok(Json(channels))
}

async fn create_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Channel>)> {
    let new = payload::decode::<ChannelPayload>(&body)
        .and_then(ChannelPayload::into_new)
        .map_api_err(&request_id)?;
    let channel = state
        .store
        .create_channel(&new)
        .await
        .map_api_err(&request_id)?;

    info!(
        channel_id = channel.id,
        category = %channel.category.slug,
        language = %channel.language.code,
        "channel created"
    );
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn get_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<Json<Channel>> {
    let channel = find_channel(&state, &id, &request_id).await?;
    Ok(Json(channel))
}

async fn replace_channel(
    state: State<AppState>,
    request_id: Extension<RequestId>,
    id: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Channel>> {
    update_channel(state, request_id, id, body, WriteMode::Replace).await
}

async fn patch_channel(
    state: State<AppState>,
    request_id: Extension<RequestId>,
    id: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Channel>> {
    update_channel(state, request_id, id, body, WriteMode::Partial).await
}

async fn update_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Bytes,
    mode: WriteMode,
) -> ApiResult<Json<Channel>> {
    let existing = find_channel(&state, &id, &request_id).await?;
    let changes = payload::decode::<ChannelPayload>(&body)
        .and_then(|payload| payload.into_changes(mode))
        .map_api_err(&request_id)?;
    let channel = state
        .store
        .update_channel(existing.id, &changes)
        .await
        .map_api_err(&request_id)?;
    Ok(Json(channel))
}

async fn delete_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "channel", &request_id)?;
    state
        .store
        .delete_channel(id)
        .await
        .map_api_err(&request_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolves a channel path id, treating malformed ids as missing.
pub(super) async fn find_channel(
    state: &AppState,
    raw_id: &str,
    request_id: &RequestId,
) -> ApiResult<Channel> {
    let id = parse_id(raw_id, "channel", request_id)?;
    state
        .store
        .channel_by_id(id)
        .await
        .map_api_err(request_id)?
        .ok_or_else(|| not_found("channel", request_id))
}
