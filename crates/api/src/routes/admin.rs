use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use tracing::info;
use tvstream_core::payload::{
    self, CategoryPayload, ChannelPayload, LanguagePayload, PayloadError, WriteMode,
};
use tvstream_core::slug::slugify;
use tvstream_core::types::{Category, Channel, ChannelFilter, Language};

use super::channels::find_channel;
use super::{not_found, parse_id, query_params, QueryPairs};
use crate::{
    error::{ApiResult, MapApiErr},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/admin/categories/",
            get(list_categories).post(create_category),
        )
        .route(
            "/admin/categories/{id}/",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/admin/categories/{id}/delete/", get(preview_category_delete))
        .route("/admin/languages/", get(list_languages).post(create_language))
        .route(
            "/admin/languages/{id}/",
            get(get_language)
                .patch(update_language)
                .delete(delete_language),
        )
        .route("/admin/channels/", get(list_channels).post(create_channel))
        .route(
            "/admin/channels/{id}/",
            get(get_channel)
                .patch(update_channel)
                .delete(delete_channel),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct AdminList<T> {
    items: Vec<T>,
    total: usize,
}

impl<T> AdminList<T> {
    fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
}

#[derive(Debug, Serialize)]
struct LanguageRow {
    id: i64,
    name: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct ChannelRow {
    id: i64,
    name: String,
    category: String,
    language: String,
    is_live: bool,
}

#[derive(Debug, Serialize)]
struct FilterChoice {
    value: String,
    label: String,
}

#[derive(Debug, Serialize)]
struct ChannelFilters {
    category: Vec<FilterChoice>,
    language: Vec<FilterChoice>,
    is_live: Vec<FilterChoice>,
}

#[derive(Debug, Serialize)]
struct ChannelListResponse {
    items: Vec<ChannelRow>,
    total: usize,
    filters: ChannelFilters,
}

#[derive(Debug, Serialize)]
struct CategoryDeleteResponse {
    channels_removed: u64,
}

/// What deleting a category would cascade to. Nothing is removed.
#[derive(Debug, Serialize)]
struct CategoryDeletePreview {
    category: CategoryRow,
    channels: Vec<ChannelRow>,
    channels_to_remove: usize,
}

#[derive(Debug, Default)]
struct ChannelSearch {
    q: Option<String>,
    category: Option<String>,
    language: Option<String>,
    is_live: Option<String>,
}

impl ChannelSearch {
    fn from_params(mut params: HashMap<String, String>) -> Self {
        Self {
            q: params.remove("q"),
            category: params.remove("category"),
            language: params.remove("language"),
            is_live: params.remove("is_live"),
        }
    }

    fn into_filter(self) -> Result<ChannelFilter, PayloadError> {
        Ok(ChannelFilter {
            category_id: parse_choice("category", self.category)?,
            language_id: parse_choice("language", self.language)?,
            is_live: parse_flag("is_live", self.is_live)?,
            search: self.q.filter(|q| !q.trim().is_empty()),
            ..ChannelFilter::default()
        })
    }
}

fn parse_choice<T: FromStr>(field: &str, raw: Option<String>) -> Result<Option<T>, PayloadError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| PayloadError::new(field, "Select a valid choice.")),
    }
}

fn parse_flag(field: &str, raw: Option<String>) -> Result<Option<bool>, PayloadError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") => Ok(Some(true)),
        Some("0") | Some("false") => Ok(Some(false)),
        Some(_) => Err(PayloadError::new(field, "Select a valid choice.")),
    }
}

/// Fills in `slug` from `name` when the operator left it out or blank.
fn prepopulate_slug(payload: &mut CategoryPayload) {
    if !payload.slug_missing() {
        return;
    }
    if let Some(name) = payload.name.as_deref() {
        payload.slug = Some(slugify(name));
    }
}

async fn list_categories(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<AdminList<CategoryRow>>> {
    let categories = state.store.list_categories().await.map_api_err(&request_id)?;
    Ok(Json(AdminList::new(
        categories
            .into_iter()
            .map(|category| CategoryRow {
                id: category.id,
                name: category.name,
                slug: category.slug,
            })
            .collect(),
    )))
}

async fn create_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let mut category = payload::decode::<CategoryPayload>(&body).map_api_err(&request_id)?;
    prepopulate_slug(&mut category);
    let new = category.into_new().map_api_err(&request_id)?;
    let category = state
        .store
        .create_category(&new)
        .await
        .map_api_err(&request_id)?;

    info!(category_id = category.id, slug = %category.slug, "admin created category");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn find_category(
    state: &AppState,
    raw_id: &str,
    request_id: &RequestId,
) -> ApiResult<Category> {
    let id = parse_id(raw_id, "category", request_id)?;
    state
        .store
        .category_by_id(id)
        .await
        .map_api_err(request_id)?
        .ok_or_else(|| not_found("category", request_id))
}

async fn get_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    let category = find_category(&state, &id, &request_id).await?;
    Ok(Json(category))
}

async fn preview_category_delete(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<Json<CategoryDeletePreview>> {
    let category = find_category(&state, &id, &request_id).await?;
    let filter = ChannelFilter {
        category_id: Some(category.id),
        ..ChannelFilter::default()
    };
    let channels: Vec<ChannelRow> = state
        .store
        .list_channels(&filter)
        .await
        .map_api_err(&request_id)?
        .into_iter()
        .map(channel_row)
        .collect();

    Ok(Json(CategoryDeletePreview {
        category: CategoryRow {
            id: category.id,
            name: category.name,
            slug: category.slug,
        },
        channels_to_remove: channels.len(),
        channels,
    }))
}

async fn update_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Category>> {
    let existing = find_category(&state, &id, &request_id).await?;
    let changes = payload::decode::<CategoryPayload>(&body)
        .and_then(|payload| payload.into_changes(WriteMode::Partial))
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
    Path(id): Path<String>,
) -> ApiResult<Json<CategoryDeleteResponse>> {
    let id = parse_id(&id, "category", &request_id)?;
    let channels_removed = state
        .store
        .delete_category(id)
        .await
        .map_api_err(&request_id)?;

    info!(category_id = id, channels_removed, "admin deleted category");
    Ok(Json(CategoryDeleteResponse { channels_removed }))
}

async fn list_languages(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<AdminList<LanguageRow>>> {
    let languages = state.store.list_languages().await.map_api_err(&request_id)?;
    Ok(Json(AdminList::new(
        languages
            .into_iter()
            .map(|language| LanguageRow {
                id: language.id,
                name: language.name,
                code: language.code,
            })
            .collect(),
    )))
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

    info!(language_id = language.id, code = %language.code, "admin created language");
    Ok((StatusCode::CREATED, Json(language)))
}

async fn get_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<Json<Language>> {
    let id = parse_id(&id, "language", &request_id)?;
    let language = state
        .store
        .language_by_id(id)
        .await
        .map_api_err(&request_id)?
        .ok_or_else(|| not_found("language", &request_id))?;
    Ok(Json(language))
}

async fn update_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Language>> {
    let id = parse_id(&id, "language", &request_id)?;
    state
        .store
        .language_by_id(id)
        .await
        .map_api_err(&request_id)?
        .ok_or_else(|| not_found("language", &request_id))?;
    let changes = payload::decode::<LanguagePayload>(&body)
        .and_then(|payload| payload.into_changes(WriteMode::Partial))
        .map_api_err(&request_id)?;
    let language = state
        .store
        .update_language(id, &changes)
        .await
        .map_api_err(&request_id)?;
    Ok(Json(language))
}

async fn delete_language(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "language", &request_id)?;
    state
        .store
        .delete_language(id)
        .await
        .map_api_err(&request_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_channels(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: QueryPairs,
) -> ApiResult<Json<ChannelListResponse>> {
    let search = ChannelSearch::from_params(query_params(query, &request_id)?);
    let filter = search.into_filter().map_api_err(&request_id)?;
    let channels = state
        .store
        .list_channels(&filter)
        .await
        .map_api_err(&request_id)?;
    let filters = filter_choices(&state, &request_id).await?;

    let items: Vec<ChannelRow> = channels.into_iter().map(channel_row).collect();
    Ok(Json(ChannelListResponse {
        total: items.len(),
        items,
        filters,
    }))
}

fn channel_row(channel: Channel) -> ChannelRow {
    ChannelRow {
        id: channel.id,
        name: channel.name,
        category: channel.category.name,
        language: channel.language.name,
        is_live: channel.is_live,
    }
}

async fn filter_choices(state: &AppState, request_id: &RequestId) -> ApiResult<ChannelFilters> {
    let categories = state.store.list_categories().await.map_api_err(request_id)?;
    let languages = state.store.list_languages().await.map_api_err(request_id)?;
    Ok(ChannelFilters {
        category: categories
            .into_iter()
            .map(|category| FilterChoice {
                value: category.id.to_string(),
                label: category.name,
            })
            .collect(),
        language: languages
            .into_iter()
            .map(|language| FilterChoice {
                value: language.id.to_string(),
                label: language.name,
            })
            .collect(),
        is_live: vec![
            FilterChoice {
                value: "1".to_string(),
                label: "Yes".to_string(),
            },
            FilterChoice {
                value: "0".to_string(),
                label: "No".to_string(),
            },
        ],
    })
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

    info!(channel_id = channel.id, "admin created channel");
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

async fn update_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Channel>> {
    let existing = find_channel(&state, &id, &request_id).await?;
    let changes = payload::decode::<ChannelPayload>(&body)
        .and_then(|payload| payload.into_changes(WriteMode::Partial))
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde_json::json;

    use crate::routes::test_support::*;

    #[test]
    fn test_prepopulate_slug() {
        let mut category: CategoryPayload =
            payload::decode(r#"{"name": "Notícias & Esportes"}"#.as_bytes()).unwrap();
        prepopulate_slug(&mut category);
        assert_eq!(category.slug.as_deref(), Some("noticias-esportes"));

        let mut category: CategoryPayload =
            payload::decode(br#"{"name": "News", "slug": "headlines"}"#).unwrap();
        prepopulate_slug(&mut category);
        assert_eq!(category.slug.as_deref(), Some("headlines"));

        let mut category: CategoryPayload =
            payload::decode(br#"{"name": "Kids & Family", "slug": "  "}"#).unwrap();
        prepopulate_slug(&mut category);
        assert_eq!(category.slug.as_deref(), Some("kids-family"));
    }

    #[test]
    fn test_search_params() {
        let filter = ChannelSearch {
            q: Some("  ".to_string()),
            category: Some("3".to_string()),
            language: None,
            is_live: Some("0".to_string()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.category_id, Some(3));
        assert_eq!(filter.is_live, Some(false));
        assert_eq!(filter.search, None);

        let err = ChannelSearch {
            category: Some("news".to_string()),
            ..ChannelSearch::default()
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(err.field, "category");

        let err = ChannelSearch {
            is_live: Some("maybe".to_string()),
            ..ChannelSearch::default()
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(err.field, "is_live");
    }

    #[tokio::test]
    async fn test_admin_category_create_derives_slug() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/categories/",
            Some(json!({ "name": "Music Videos" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["slug"], "music-videos");

        let (status, list) = send(&app, Method::GET, "/admin/categories/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);
        assert_eq!(
            list["items"][0],
            json!({ "id": body["id"], "name": "Music Videos", "slug": "music-videos" })
        );
    }

    #[tokio::test]
    async fn test_admin_channel_list_columns_and_filters() {
        let app = test_app();
        let news = seed_category(&app, "News", "news").await;
        let sports = seed_category(&app, "Sports", "sports").await;
        let en = seed_language(&app, "English", "en").await;
        let fr = seed_language(&app, "French", "fr").await;
        seed_channel(&app, "BBC News", news, en).await;
        seed_channel(&app, "France 24", news, fr).await;
        let espn = seed_channel(&app, "ESPN", sports, en).await;

        let uri = format!("/admin/channels/{}/", espn["id"]);
        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "is_live": false }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, list) = send(&app, Method::GET, "/admin/channels/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 3);
        assert_eq!(
            list["items"][0],
            json!({
                "id": list["items"][0]["id"],
                "name": "BBC News",
                "category": "News",
                "language": "English",
                "is_live": true,
            })
        );
        assert_eq!(list["filters"]["category"].as_array().unwrap().len(), 2);
        assert_eq!(list["filters"]["language"][1]["label"], "French");
        assert_eq!(list["filters"]["is_live"][0]["value"], "1");

        let uri = format!("/admin/channels/?language={en}&is_live=1");
        let (_, list) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(list["total"], 1);
        assert_eq!(list["items"][0]["name"], "BBC News");

        let uri = format!("/admin/channels/?category={sports}");
        let (_, list) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(list["items"][0]["name"], "ESPN");
        assert_eq!(list["items"][0]["is_live"], false);
    }

    #[tokio::test]
    async fn test_admin_search_requires_every_term() {
        let app = test_app();
        let news = seed_category(&app, "News", "news").await;
        let en = seed_language(&app, "English", "en").await;
        seed_channel(&app, "BBC News", news, en).await;
        seed_channel(&app, "BBC World", news, en).await;
        seed_channel(&app, "Sky News", news, en).await;

        let (_, list) = send(&app, Method::GET, "/admin/channels/?q=bbc+NEWS", None).await;
        assert_eq!(list["total"], 1);
        assert_eq!(list["items"][0]["name"], "BBC News");

        let (_, list) = send(&app, Method::GET, "/admin/channels/?q=news", None).await;
        assert_eq!(list["total"], 2);

        let (status, body) =
            send(&app, Method::GET, "/admin/channels/?is_live=sometimes", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "is_live");
    }

    #[tokio::test]
    async fn test_admin_category_delete_reports_cascade() {
        let app = test_app();
        let news = seed_category(&app, "News", "news").await;
        let en = seed_language(&app, "English", "en").await;
        seed_channel(&app, "BBC News", news, en).await;
        seed_channel(&app, "Sky News", news, en).await;

        let preview = format!("/admin/categories/{news}/delete/");
        let (status, body) = send(&app, Method::GET, &preview, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"]["slug"], "news");
        assert_eq!(body["channels_to_remove"], 2);
        assert_eq!(body["channels"][0]["name"], "BBC News");

        let (_, list) = send(&app, Method::GET, "/admin/channels/", None).await;
        assert_eq!(list["total"], 2);

        let uri = format!("/admin/categories/{news}/");
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["channels_removed"], 2);

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, &preview, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_patch_missing_channel_is_not_found() {
        let app = test_app();
        let news = seed_category(&app, "News", "news").await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/admin/channels/999/",
            Some(json!({ "category": news, "language": 12345 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_admin_repeated_query_params_keep_last() {
        let app = test_app();
        let news = seed_category(&app, "News", "news").await;
        let sports = seed_category(&app, "Sports", "sports").await;
        let en = seed_language(&app, "English", "en").await;
        seed_channel(&app, "BBC News", news, en).await;
        seed_channel(&app, "ESPN", sports, en).await;

        let uri = format!("/admin/channels/?category={news}&category={sports}");
        let (status, list) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);
        assert_eq!(list["items"][0]["name"], "ESPN");
    }

    #[tokio::test]
    async fn test_admin_language_delete_protected() {
        let app = test_app();
        let news = seed_category(&app, "News", "news").await;
        let en = seed_language(&app, "English", "en").await;
        seed_channel(&app, "BBC News", news, en).await;

        let uri = format!("/admin/languages/{en}/");
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], "en");
    }
}
