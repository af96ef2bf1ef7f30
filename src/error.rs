//! Domain errors shared by the page and API surfaces.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::error::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlogError>;

/// Field-level validation messages, keyed by form/serializer field name.
///
/// Errors that do not belong to a single field go under
/// [`FieldErrors::NON_FIELD`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BlogError::Validation(self))
        }
    }
}

/// Which storage constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Unique,
    Check,
    ForeignKey,
    NotNull,
}

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("not allowed: {0}")]
    Forbidden(&'static str),

    #[error("constraint violation ({0:?}): {1}")]
    Constraint(Constraint, String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for BlogError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation => Some(Constraint::Unique),
                ErrorKind::CheckViolation => Some(Constraint::Check),
                ErrorKind::ForeignKeyViolation => Some(Constraint::ForeignKey),
                ErrorKind::NotNullViolation => Some(Constraint::NotNull),
                _ => None,
            },
            _ => None,
        };

        match kind {
            Some(kind) => BlogError::Constraint(kind, err.to_string()),
            None => BlogError::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("text", "This field is required.");
        errors.add("text", "Too short.");
        errors.add(FieldErrors::NON_FIELD, "Duplicate.");

        assert_eq!(errors.get("text").len(), 2);
        assert!(errors.contains(FieldErrors::NON_FIELD));
        assert!(errors.get("group").is_empty());

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["text"][0], "This field is required.");
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(matches!(
            FieldErrors::single("text", "x").into_result(),
            Err(BlogError::Validation(_))
        ));
    }
}
