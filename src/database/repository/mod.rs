//! Query functions, one module per table.
//!
//! Everything takes an `impl PgExecutor` so the same call works against the
//! pool or inside a transaction (`&mut *tx`). Tenant tables always take the
//! organization id; nothing here reads across tenants unless its name says so.

pub mod audit;
pub mod buckets;
pub mod devices;
pub mod impersonation;
pub mod notifications;
pub mod organizations;
pub mod revoked_tokens;
pub mod tasks;
pub mod users;

use super::DatabaseError;

/// Turn a unique violation into `Conflict` with a caller-facing message.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> DatabaseError {
    let err = DatabaseError::from(err);
    if err.is_unique_violation() {
        DatabaseError::Conflict(message.to_string())
    } else {
        err
    }
}
