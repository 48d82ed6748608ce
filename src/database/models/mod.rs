pub mod audit;
pub mod bucket;
pub mod device;
pub mod impersonation;
pub mod notification;
pub mod organization;
pub mod task;
pub mod user;

pub use audit::{AuditAction, AuditEntry};
pub use bucket::Bucket;
pub use device::{DevicePlatform, DeviceToken};
pub use impersonation::ImpersonationSession;
pub use notification::{Notification, NotificationKind};
pub use organization::Organization;
pub use task::{Task, TaskAssignee};
pub use user::User;

use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;

/// Read a TEXT column into one of the domain enums.
pub(crate) fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn decode_optional_text<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        value.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}
