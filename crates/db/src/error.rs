use tvstream_core::payload::PayloadError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    ReferenceConflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn unique(entity: &str, field: &str) -> Self {
        Self::validation(field, format!("{entity} with this {field} already exists."))
    }

    pub fn invalid_reference(field: &str, id: i64) -> Self {
        Self::validation(field, format!("Invalid pk \"{id}\" - object does not exist."))
    }
}

impl From<PayloadError> for StoreError {
    fn from(err: PayloadError) -> Self {
        StoreError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps constraint violations raised by a write onto validation errors.
pub(crate) fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default();
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                if let Some((entity, field)) = unique_field(constraint) {
                    return StoreError::unique(entity, field);
                }
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                if let Some(field) = reference_field(constraint) {
                    return StoreError::validation(field, "Referenced object does not exist.");
                }
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION),
        _ => false,
    }
}

fn unique_field(constraint: &str) -> Option<(&'static str, &'static str)> {
    match constraint {
        "categories_name_key" => Some(("category", "name")),
        "categories_slug_key" => Some(("category", "slug")),
        "languages_code_key" => Some(("language", "code")),
        _ => None,
    }
}

fn reference_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "channels_category_id_fkey" => Some("category"),
        "channels_language_id_fkey" => Some("language"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_mapping() {
        assert_eq!(unique_field("categories_name_key"), Some(("category", "name")));
        assert_eq!(unique_field("categories_slug_key"), Some(("category", "slug")));
        assert_eq!(unique_field("languages_code_key"), Some(("language", "code")));
        assert_eq!(unique_field("channels_pkey"), None);
    }

    #[test]
    fn test_reference_field_mapping() {
        assert_eq!(reference_field("channels_category_id_fkey"), Some("category"));
        assert_eq!(reference_field("channels_language_id_fkey"), Some("language"));
        assert_eq!(reference_field("other"), None);
    }

    #[test]
    fn test_messages() {
        let err = StoreError::unique("category", "name");
        assert_eq!(err.to_string(), "name: category with this name already exists.");

        let err = StoreError::invalid_reference("language", 42);
        assert_eq!(
            err.to_string(),
            "language: Invalid pk \"42\" - object does not exist."
        );

        assert_eq!(StoreError::NotFound("channel").to_string(), "channel not found");
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = map_write_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }
}
