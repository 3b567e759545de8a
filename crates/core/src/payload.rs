//! Decoding and validation of JSON write bodies.
//!
//! Each resource has a typed payload with an explicit field list. Unknown
//! fields are rejected, and every failure names the field it belongs to.

use serde::de::{DeserializeOwned, Error as _, IgnoredAny};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

use crate::slug::is_valid_slug;
use crate::types::{
    CategoryChanges, ChannelChanges, LanguageChanges, NewCategory, NewChannel, NewLanguage,
};

/// Field name used for errors that are not tied to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

const NULL_MESSAGE: &str = "This field may not be null.";
const REQUIRED_MESSAGE: &str = "This field is required.";
const BLANK_MESSAGE: &str = "This field may not be blank.";
const INVALID_URL_MESSAGE: &str = "Enter a valid URL.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct PayloadError {
    pub field: String,
    pub message: String,
}

impl PayloadError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

type PayloadResult<T> = Result<T, PayloadError>;

/// `Replace` (create, PUT) requires every required field; `Partial` (PATCH)
/// requires none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Partial,
}

/// Decodes a request body into a typed payload. Read-only fields (`id`,
/// `created_at`, `updated_at`) are accepted and dropped.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> PayloadResult<T> {
    let mut de = serde_json::Deserializer::from_slice(body);
    let payload = serde_path_to_error::deserialize(&mut de).map_err(decode_error)?;
    de.end().map_err(parse_error)?;
    Ok(payload)
}

fn decode_error(err: serde_path_to_error::Error<serde_json::Error>) -> PayloadError {
    let field = match err.path().iter().last() {
        Some(serde_path_to_error::Segment::Map { key }) => Some(key.clone()),
        _ => None,
    };
    let inner = err.into_inner();
    if inner.is_syntax() || inner.is_eof() {
        return parse_error(inner);
    }
    let message = strip_location(&inner);
    match field {
        Some(field) if message.starts_with("unknown field") => {
            PayloadError::new(&field, "Unknown field.")
        }
        Some(field) => PayloadError::new(&field, message),
        None => PayloadError::new(NON_FIELD_ERRORS, "Invalid data. Expected a dictionary."),
    }
}

fn parse_error(err: serde_json::Error) -> PayloadError {
    PayloadError::new(
        NON_FIELD_ERRORS,
        format!("JSON parse error - {}", strip_location(&err)),
    )
}

fn strip_location(err: &serde_json::Error) -> String {
    let text = err.to_string();
    match text.rsplit_once(" at line ") {
        Some((message, _)) => message.to_string(),
        None => text,
    }
}

/// First validation failure, by field name.
fn first_invalid(errors: ValidationErrors) -> PayloadError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|err| {
                let message = err.message.as_deref().unwrap_or("Invalid value.");
                PayloadError::new(&field, message)
            })
        })
        .unwrap_or_else(|| PayloadError::new(NON_FIELD_ERRORS, "Invalid data."))
}

fn validated<T: Validate>(payload: &T) -> PayloadResult<()> {
    payload.validate().map_err(first_invalid)
}

/// Missing is fine (absent or null rejected at decode); blank is not.
fn required(value: Option<String>, field: &str, mode: WriteMode) -> PayloadResult<Option<String>> {
    match value {
        Some(text) if text.is_empty() => Err(PayloadError::new(field, BLANK_MESSAGE)),
        None if mode == WriteMode::Replace => Err(PayloadError::new(field, REQUIRED_MESSAGE)),
        other => Ok(other),
    }
}

fn present<T>(value: Option<T>, field: &str) -> PayloadResult<T> {
    value.ok_or_else(|| PayloadError::new(field, REQUIRED_MESSAGE))
}

fn trim(value: &mut Option<String>) {
    if let Some(text) = value {
        let trimmed = text.trim();
        if trimmed.len() != text.len() {
            *text = trimmed.to_string();
        }
    }
}

/// Present fields may not be `null`.
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<T>::deserialize(deserializer)? {
        Some(value) => Ok(Some(value)),
        None => Err(D::Error::custom(NULL_MESSAGE)),
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Primary keys arrive as integers or numeric strings.
fn pk<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let id = match &value {
        Value::Null => return Err(D::Error::custom(NULL_MESSAGE)),
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    id.map(Some).ok_or_else(|| {
        D::Error::custom(format!(
            "Incorrect type. Expected pk value, received {}.",
            type_name(&value)
        ))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CategoryPayload {
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub description: Option<String>,
    #[serde(default, rename = "id")]
    _id: Option<IgnoredAny>,
    #[serde(default, rename = "created_at")]
    _created_at: Option<IgnoredAny>,
    #[serde(default, rename = "updated_at")]
    _updated_at: Option<IgnoredAny>,
}

impl CategoryPayload {
    pub fn into_new(self) -> PayloadResult<NewCategory> {
        let changes = self.into_changes(WriteMode::Replace)?;
        Ok(NewCategory {
            name: present(changes.name, "name")?,
            slug: present(changes.slug, "slug")?,
            description: changes.description.unwrap_or_default(),
        })
    }

    pub fn into_changes(mut self, mode: WriteMode) -> PayloadResult<CategoryChanges> {
        trim(&mut self.name);
        trim(&mut self.slug);
        trim(&mut self.description);
        validated(&self)?;

        let name = required(self.name, "name", mode)?;
        let slug = required(self.slug, "slug", mode)?;
        if slug.as_deref().is_some_and(|slug| !is_valid_slug(slug)) {
            return Err(PayloadError::new(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ));
        }
        Ok(CategoryChanges {
            name,
            slug,
            description: self.description,
        })
    }

    /// True when `slug` is absent or blank.
    pub fn slug_missing(&self) -> bool {
        self.slug.as_deref().map_or(true, |slug| slug.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LanguagePayload {
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(max = 10, message = "Ensure this field has no more than 10 characters."))]
    pub code: Option<String>,
    #[serde(default, rename = "id")]
    _id: Option<IgnoredAny>,
    #[serde(default, rename = "created_at")]
    _created_at: Option<IgnoredAny>,
    #[serde(default, rename = "updated_at")]
    _updated_at: Option<IgnoredAny>,
}

impl LanguagePayload {
    pub fn into_new(self) -> PayloadResult<NewLanguage> {
        let changes = self.into_changes(WriteMode::Replace)?;
        Ok(NewLanguage {
            name: present(changes.name, "name")?,
            code: present(changes.code, "code")?,
        })
    }

    pub fn into_changes(mut self, mode: WriteMode) -> PayloadResult<LanguageChanges> {
        trim(&mut self.name);
        trim(&mut self.code);
        validated(&self)?;

        Ok(LanguageChanges {
            name: required(self.name, "name", mode)?,
            code: required(self.code, "code", mode)?,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ChannelPayload {
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "pk")]
    pub category: Option<i64>,
    #[serde(default, deserialize_with = "pk")]
    pub language: Option<i64>,
    #[serde(default, deserialize_with = "non_null")]
    #[validate(
        length(max = 200, message = "Ensure this field has no more than 200 characters."),
        url(message = "Enter a valid URL.")
    )]
    pub stream_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub thumbnail: Option<Option<String>>,
    #[serde(default, deserialize_with = "non_null")]
    pub is_live: Option<bool>,
    #[serde(default, rename = "id")]
    _id: Option<IgnoredAny>,
    #[serde(default, rename = "created_at")]
    _created_at: Option<IgnoredAny>,
    #[serde(default, rename = "updated_at")]
    _updated_at: Option<IgnoredAny>,
}

impl ChannelPayload {
    pub fn into_new(self) -> PayloadResult<NewChannel> {
        let changes = self.into_changes(WriteMode::Replace)?;
        Ok(NewChannel {
            name: present(changes.name, "name")?,
            description: changes.description.unwrap_or_default(),
            category_id: present(changes.category_id, "category")?,
            language_id: present(changes.language_id, "language")?,
            stream_url: present(changes.stream_url, "stream_url")?,
            thumbnail: changes.thumbnail.flatten(),
            is_live: changes.is_live.unwrap_or(true),
        })
    }

    pub fn into_changes(mut self, mode: WriteMode) -> PayloadResult<ChannelChanges> {
        trim(&mut self.name);
        trim(&mut self.description);
        trim(&mut self.stream_url);
        validated(&self)?;

        let stream_url = required(self.stream_url, "stream_url", mode)?;
        if stream_url.as_deref().is_some_and(|url| !is_valid_stream_url(url)) {
            return Err(PayloadError::new("stream_url", INVALID_URL_MESSAGE));
        }
        let category_id = match self.category {
            None if mode == WriteMode::Replace => {
                return Err(PayloadError::new("category", REQUIRED_MESSAGE))
            }
            id => id,
        };
        let language_id = match self.language {
            None if mode == WriteMode::Replace => {
                return Err(PayloadError::new("language", REQUIRED_MESSAGE))
            }
            id => id,
        };

        Ok(ChannelChanges {
            name: required(self.name, "name", mode)?,
            description: self.description,
            category_id,
            language_id,
            stream_url,
            thumbnail: self
                .thumbnail
                .map(|path| path.filter(|path| !path.is_empty())),
            is_live: self.is_live,
        })
    }
}

/// Accepts absolute http(s)/ftp(s) URLs with a host and no surrounding
/// whitespace.
pub fn is_valid_stream_url(value: &str) -> bool {
    if value.is_empty() || value.trim() != value || value.chars().any(char::is_whitespace) {
        return false;
    }
    match url::Url::parse(value) {
        Ok(parsed) => {
            URL_SCHEMES.contains(&parsed.scheme())
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn category(value: Value) -> PayloadResult<NewCategory> {
        decode::<CategoryPayload>(&body(value))?.into_new()
    }

    fn language(value: Value) -> PayloadResult<NewLanguage> {
        decode::<LanguagePayload>(&body(value))?.into_new()
    }

    fn channel(value: Value) -> PayloadResult<NewChannel> {
        decode::<ChannelPayload>(&body(value))?.into_new()
    }

    fn channel_changes(value: Value) -> PayloadResult<ChannelChanges> {
        decode::<ChannelPayload>(&body(value))?.into_changes(WriteMode::Partial)
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        let err = decode::<CategoryPayload>(b"[1, 2]").unwrap_err();
        assert_eq!(err.field, NON_FIELD_ERRORS);
        assert_eq!(err.message, "Invalid data. Expected a dictionary.");

        let err = decode::<CategoryPayload>(b"{not json").unwrap_err();
        assert_eq!(err.field, NON_FIELD_ERRORS);
        assert!(err.message.starts_with("JSON parse error"));

        let err = decode::<CategoryPayload>(b"").unwrap_err();
        assert_eq!(err.field, NON_FIELD_ERRORS);

        let err = decode::<CategoryPayload>(br#"{"name": "News"} trailing"#).unwrap_err();
        assert_eq!(err.field, NON_FIELD_ERRORS);

        assert!(decode::<CategoryPayload>(br#"{"name": "News"}"#).is_ok());
    }

    #[test]
    fn test_new_category() {
        let category = category(json!({ "name": " News ", "slug": "news" })).unwrap();
        assert_eq!(category.name, "News");
        assert_eq!(category.slug, "news");
        assert_eq!(category.description, "");
    }

    #[test]
    fn test_new_category_missing_slug() {
        let err = category(json!({ "name": "News" })).unwrap_err();
        assert_eq!(err.field, "slug");
        assert_eq!(err.message, "This field is required.");
    }

    #[test]
    fn test_category_invalid_slug() {
        let err = category(json!({ "name": "World News", "slug": "world news" })).unwrap_err();
        assert_eq!(err.field, "slug");
    }

    #[test]
    fn test_category_name_too_long() {
        let err = category(json!({ "name": "x".repeat(101), "slug": "x" })).unwrap_err();
        assert_eq!(err.field, "name");
        assert!(err.message.contains("100"));
    }

    #[test]
    fn test_length_counts_characters() {
        let name = "é".repeat(100);
        assert_eq!(category(json!({ "name": name, "slug": "e" })).unwrap().name, name);
    }

    #[test]
    fn test_unknown_field_is_named() {
        let err = language(json!({ "name": "English", "code": "en", "iso": "eng" })).unwrap_err();
        assert_eq!(err.field, "iso");
        assert_eq!(err.message, "Unknown field.");
    }

    #[test]
    fn test_read_only_fields_are_ignored() {
        let language = language(json!({
            "id": 99,
            "name": "English",
            "code": "en",
            "created_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(language.code, "en");
    }

    #[test]
    fn test_blank_required_field() {
        let err = language(json!({ "name": "  ", "code": "en" })).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.message, "This field may not be blank.");
    }

    #[test]
    fn test_null_field() {
        let err = decode::<CategoryPayload>(br#"{"description": null}"#).unwrap_err();
        assert_eq!(err.field, "description");
        assert_eq!(err.message, "This field may not be null.");
    }

    #[test]
    fn test_wrong_type_is_named() {
        let err = decode::<LanguagePayload>(br#"{"name": 5}"#).unwrap_err();
        assert_eq!(err.field, "name");
        assert!(!err.message.contains("line"));
    }

    #[test]
    fn test_description_is_trimmed() {
        let category = category(json!({
            "name": "News",
            "slug": "news",
            "description": "  Current affairs \n",
        }))
        .unwrap();
        assert_eq!(category.description, "Current affairs");
    }

    #[test]
    fn test_partial_changes_require_nothing() {
        let changes = decode::<LanguagePayload>(br#"{"name": "British English"}"#)
            .unwrap()
            .into_changes(WriteMode::Partial)
            .unwrap();
        assert_eq!(changes.name.as_deref(), Some("British English"));
        assert_eq!(changes.code, None);

        assert_eq!(channel_changes(json!({})).unwrap(), ChannelChanges::default());
    }

    #[test]
    fn test_replace_requires_fields() {
        let err = decode::<LanguagePayload>(br#"{"name": "English"}"#)
            .unwrap()
            .into_changes(WriteMode::Replace)
            .unwrap_err();
        assert_eq!(err.field, "code");
    }

    #[test]
    fn test_new_channel_defaults() {
        let channel = channel(json!({
            "name": "CGTN",
            "category": 1,
            "language": 2,
            "stream_url": "https://news.cgtn.com/resource/live/english/cgtn-news.m3u8",
        }))
        .unwrap();
        assert_eq!(channel.category_id, 1);
        assert_eq!(channel.language_id, 2);
        assert!(channel.is_live);
        assert_eq!(channel.thumbnail, None);
        assert_eq!(channel.description, "");
    }

    #[test]
    fn test_channel_accepts_numeric_string_pks() {
        let channel = channel(json!({
            "name": "CGTN",
            "category": "1",
            "language": " 2 ",
            "stream_url": "https://example.com/live.m3u8",
        }))
        .unwrap();
        assert_eq!(channel.category_id, 1);
        assert_eq!(channel.language_id, 2);
    }

    #[test]
    fn test_channel_missing_language() {
        let err = channel(json!({
            "name": "CGTN",
            "category": 1,
            "stream_url": "https://example.com/live.m3u8",
        }))
        .unwrap_err();
        assert_eq!(err.field, "language");
    }

    #[test]
    fn test_channel_nested_reference_rejected() {
        let err = channel(json!({
            "name": "CGTN",
            "category": { "id": 1 },
            "language": 2,
            "stream_url": "https://example.com/live.m3u8",
        }))
        .unwrap_err();
        assert_eq!(err.field, "category");
        assert_eq!(err.message, "Incorrect type. Expected pk value, received dict.");
    }

    #[test]
    fn test_channel_invalid_stream_url() {
        for url in ["not a url", "rtmp://example.com/live"] {
            let err = channel(json!({
                "name": "CGTN",
                "category": 1,
                "language": 2,
                "stream_url": url,
            }))
            .unwrap_err();
            assert_eq!(err.field, "stream_url");
            assert_eq!(err.message, "Enter a valid URL.");
        }
    }

    #[test]
    fn test_channel_thumbnail_and_is_live() {
        let changes = channel_changes(json!({ "thumbnail": "", "is_live": false })).unwrap();
        assert_eq!(changes.thumbnail, Some(None));
        assert_eq!(changes.is_live, Some(false));

        let changes = channel_changes(json!({ "thumbnail": null })).unwrap();
        assert_eq!(changes.thumbnail, Some(None));

        let err = channel_changes(json!({ "thumbnail": "x".repeat(101) })).unwrap_err();
        assert_eq!(err.field, "thumbnail");

        let err = channel_changes(json!({ "is_live": "yes" })).unwrap_err();
        assert_eq!(err.field, "is_live");
    }

    #[test]
    fn test_stream_url_validation() {
        assert!(is_valid_stream_url("https://example.com/live/index.m3u8"));
        assert!(is_valid_stream_url("http://10.0.0.5:8080/hls/stream.m3u8"));
        assert!(is_valid_stream_url("ftp://media.example.org/feed"));
        assert!(!is_valid_stream_url("rtmp://example.com/live"));
        assert!(!is_valid_stream_url("example.com/live.m3u8"));
        assert!(!is_valid_stream_url(" https://example.com/live.m3u8"));
        assert!(!is_valid_stream_url("https://exa mple.com/"));
        assert!(!is_valid_stream_url(""));
    }
}
