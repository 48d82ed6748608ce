use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Administrative actions that land in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    OrganizationCreated,
    OrganizationUpdated,
    UserCreated,
    UserUpdated,
    UserDeactivated,
    BucketCreated,
    BucketUpdated,
    BucketDeleted,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskApproved,
    TaskRejected,
    ImpersonationStarted,
    ImpersonationEnded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrganizationCreated => "ORGANIZATION_CREATED",
            AuditAction::OrganizationUpdated => "ORGANIZATION_UPDATED",
            AuditAction::UserCreated => "USER_CREATED",
            AuditAction::UserUpdated => "USER_UPDATED",
            AuditAction::UserDeactivated => "USER_DEACTIVATED",
            AuditAction::BucketCreated => "BUCKET_CREATED",
            AuditAction::BucketUpdated => "BUCKET_UPDATED",
            AuditAction::BucketDeleted => "BUCKET_DELETED",
            AuditAction::TaskCreated => "TASK_CREATED",
            AuditAction::TaskUpdated => "TASK_UPDATED",
            AuditAction::TaskDeleted => "TASK_DELETED",
            AuditAction::TaskApproved => "TASK_APPROVED",
            AuditAction::TaskRejected => "TASK_REJECTED",
            AuditAction::ImpersonationStarted => "IMPERSONATION_STARTED",
            AuditAction::ImpersonationEnded => "IMPERSONATION_ENDED",
        }
    }

    /// Entity type recorded alongside the action.
    pub fn target_type(&self) -> &'static str {
        match self {
            AuditAction::OrganizationCreated | AuditAction::OrganizationUpdated => "organization",
            AuditAction::UserCreated | AuditAction::UserUpdated | AuditAction::UserDeactivated => "user",
            AuditAction::BucketCreated | AuditAction::BucketUpdated | AuditAction::BucketDeleted => "bucket",
            AuditAction::TaskCreated
            | AuditAction::TaskUpdated
            | AuditAction::TaskDeleted
            | AuditAction::TaskApproved
            | AuditAction::TaskRejected => "task",
            AuditAction::ImpersonationStarted | AuditAction::ImpersonationEnded => "impersonation_session",
        }
    }
}

/// Stored audit row. `action` stays a plain string so entries written by
/// older releases still load.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub impersonator_id: Option<Uuid>,
    pub impersonation_session_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_name_matches_stored_name() {
        for action in [
            AuditAction::OrganizationCreated,
            AuditAction::UserDeactivated,
            AuditAction::TaskRejected,
            AuditAction::ImpersonationEnded,
        ] {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, action.as_str());
        }
    }
}
