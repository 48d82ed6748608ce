//! Business operations.
//!
//! Handlers resolve the [`Actor`](crate::domain::Actor) and hand it to a
//! service; services authorize, run the queries (in a transaction when more
//! than one row changes), write the audit entry and fan out notifications
//! after commit.

pub mod audit;
pub mod buckets;
pub mod calendar;
pub mod impersonation;
pub mod notifications;
pub mod organizations;
pub mod push;
pub mod realtime;
pub mod sessions;
pub mod sweep;
pub mod tasks;
pub mod uploads;
pub mod users;

use serde::Serialize;
use std::collections::HashMap;

use crate::auth::password::PasswordError;
use crate::auth::JwtError;
use crate::database::{DatabaseError, Page};
use crate::domain::{AccessError, TransitionError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(DatabaseError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), problem.clone());
        ServiceError::Validation {
            message: format!("{}: {}", field, problem),
            field_errors,
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ServiceError::NotFound(msg),
            DatabaseError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Database(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::MissingSecret | JwtError::Signing(_) => ServiceError::Internal(err.to_string()),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// One page of a listing plus the total across all pages.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// Trim and bound a required text field.
pub(crate) fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(field, "is required"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ServiceError::invalid(field, format!("must be at most {} characters", max_chars)));
    }
    Ok(trimmed.to_string())
}

/// Empty strings after trimming count as absent.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_bounds() {
        assert_eq!(required_text("title", "  Fix it  ", 10).unwrap(), "Fix it");
        assert!(matches!(
            required_text("title", "   ", 10),
            Err(ServiceError::Validation { .. })
        ));
        let err = required_text("title", "abcdefghijk", 10).unwrap_err();
        match err {
            ServiceError::Validation { field_errors, .. } => {
                assert_eq!(field_errors["title"], "must be at most 10 characters")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn database_conflicts_stay_conflicts() {
        let err: ServiceError = DatabaseError::Conflict("taken".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg == "taken"));
    }

    #[test]
    fn blank_optional_text_is_none() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" hi ")).as_deref(), Some("hi"));
        assert_eq!(optional_text(None), None);
    }
}
