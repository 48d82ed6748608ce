//! Authorization overlay.
//!
//! Every request resolves to exactly one [`Actor`]. Handlers never inspect
//! roles directly: they ask the actor for a [`TenantScope`] (which every
//! tenant query takes) or call [`Actor::authorize`] against the permission
//! table below.

use serde::Serialize;
use uuid::Uuid;

use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Actor {
    Employee {
        user_id: Uuid,
        organization_id: Uuid,
    },
    OrgAdmin {
        user_id: Uuid,
        organization_id: Uuid,
    },
    /// A super-admin acting as an admin of one organization.
    Impersonating {
        super_admin_id: Uuid,
        organization_id: Uuid,
        session_id: Uuid,
    },
    SuperAdmin {
        user_id: Uuid,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    All,
    AssignedTo(Uuid),
}

/// Organization scope applied to every tenant query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    pub organization_id: Uuid,
    pub visibility: Visibility,
}

impl TenantScope {
    /// Assignee restriction for task queries; `None` means the whole tenant.
    pub fn assignee_filter(&self) -> Option<Uuid> {
        match self.visibility {
            Visibility::All => None,
            Visibility::AssignedTo(user_id) => Some(user_id),
        }
    }

    pub fn sees_everything(&self) -> bool {
        self.visibility == Visibility::All
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    // tenant
    ViewTasks,
    WorkOnTask,
    ViewBuckets,
    ViewNotifications,
    UploadFiles,
    ManageTasks,
    ReviewTasks,
    ManageBuckets,
    ManageUsers,
    ViewAudit,
    // platform
    ManageOrganizations,
    Impersonate,
    ViewPlatformAudit,
    RunSweep,
}

impl Permission {
    pub fn name(&self) -> &'static str {
        match self {
            Permission::ViewTasks => "view_tasks",
            Permission::WorkOnTask => "work_on_task",
            Permission::ViewBuckets => "view_buckets",
            Permission::ViewNotifications => "view_notifications",
            Permission::UploadFiles => "upload_files",
            Permission::ManageTasks => "manage_tasks",
            Permission::ReviewTasks => "review_tasks",
            Permission::ManageBuckets => "manage_buckets",
            Permission::ManageUsers => "manage_users",
            Permission::ViewAudit => "view_audit",
            Permission::ManageOrganizations => "manage_organizations",
            Permission::Impersonate => "impersonate",
            Permission::ViewPlatformAudit => "view_platform_audit",
            Permission::RunSweep => "run_sweep",
        }
    }

    pub fn is_platform(&self) -> bool {
        matches!(
            self,
            Permission::ManageOrganizations
                | Permission::Impersonate
                | Permission::ViewPlatformAudit
                | Permission::RunSweep
        )
    }
}

const EMPLOYEE_PERMISSIONS: &[Permission] = &[
    Permission::ViewTasks,
    Permission::WorkOnTask,
    Permission::ViewBuckets,
    Permission::ViewNotifications,
    Permission::UploadFiles,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewTasks,
    Permission::ViewBuckets,
    Permission::ViewNotifications,
    Permission::UploadFiles,
    Permission::ManageTasks,
    Permission::ReviewTasks,
    Permission::ManageBuckets,
    Permission::ManageUsers,
    Permission::ViewAudit,
];

const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageOrganizations,
    Permission::Impersonate,
    Permission::ViewPlatformAudit,
    Permission::RunSweep,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("this action needs an organization context; start an impersonation session first")]
    NoTenant,

    #[error("this action is not available from an impersonation session")]
    ImpersonationBoundary,

    #[error("permission denied: {0}")]
    Denied(&'static str),
}

/// Identity recorded on audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditIdentity {
    pub actor_id: Uuid,
    pub impersonator_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

impl Actor {
    /// The authenticated human behind the request.
    pub fn user_id(&self) -> Uuid {
        match *self {
            Actor::Employee { user_id, .. }
            | Actor::OrgAdmin { user_id, .. }
            | Actor::SuperAdmin { user_id } => user_id,
            Actor::Impersonating { super_admin_id, .. } => super_admin_id,
        }
    }

    /// Role the actor holds for this request. Impersonators act as admins.
    pub fn effective_role(&self) -> Role {
        match self {
            Actor::Employee { .. } => Role::Employee,
            Actor::OrgAdmin { .. } | Actor::Impersonating { .. } => Role::Admin,
            Actor::SuperAdmin { .. } => Role::SuperAdmin,
        }
    }

    pub fn organization_id(&self) -> Option<Uuid> {
        match *self {
            Actor::Employee { organization_id, .. }
            | Actor::OrgAdmin { organization_id, .. }
            | Actor::Impersonating { organization_id, .. } => Some(organization_id),
            Actor::SuperAdmin { .. } => None,
        }
    }

    pub fn impersonation_session(&self) -> Option<Uuid> {
        match *self {
            Actor::Impersonating { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    pub fn is_tenant_admin(&self) -> bool {
        matches!(self, Actor::OrgAdmin { .. } | Actor::Impersonating { .. })
    }

    fn permissions(&self) -> &'static [Permission] {
        match self {
            Actor::Employee { .. } => EMPLOYEE_PERMISSIONS,
            Actor::OrgAdmin { .. } | Actor::Impersonating { .. } => ADMIN_PERMISSIONS,
            Actor::SuperAdmin { .. } => SUPER_ADMIN_PERMISSIONS,
        }
    }

    pub fn authorize(&self, permission: Permission) -> Result<(), AccessError> {
        if self.permissions().contains(&permission) {
            return Ok(());
        }
        match self {
            Actor::SuperAdmin { .. } if !permission.is_platform() => Err(AccessError::NoTenant),
            Actor::Impersonating { .. } if permission.is_platform() => {
                Err(AccessError::ImpersonationBoundary)
            }
            _ => Err(AccessError::Denied(permission.name())),
        }
    }

    pub fn tenant(&self) -> Result<TenantScope, AccessError> {
        match *self {
            Actor::Employee {
                user_id,
                organization_id,
            } => Ok(TenantScope {
                organization_id,
                visibility: Visibility::AssignedTo(user_id),
            }),
            Actor::OrgAdmin {
                organization_id, ..
            }
            | Actor::Impersonating {
                organization_id, ..
            } => Ok(TenantScope {
                organization_id,
                visibility: Visibility::All,
            }),
            Actor::SuperAdmin { .. } => Err(AccessError::NoTenant),
        }
    }

    /// Writes to the caller's own account (password, devices, inbox state).
    /// An impersonation token borrows tenant powers only, so these are refused.
    pub fn own_account(&self) -> Result<(), AccessError> {
        match self {
            Actor::Impersonating { .. } => Err(AccessError::ImpersonationBoundary),
            _ => Ok(()),
        }
    }

    /// Authorize, then resolve the tenant scope.
    pub fn tenant_for(&self, permission: Permission) -> Result<TenantScope, AccessError> {
        self.authorize(permission)?;
        self.tenant()
    }

    pub fn audit_identity(&self) -> AuditIdentity {
        match *self {
            Actor::Impersonating {
                super_admin_id,
                session_id,
                ..
            } => AuditIdentity {
                actor_id: super_admin_id,
                impersonator_id: Some(super_admin_id),
                session_id: Some(session_id),
            },
            _ => AuditIdentity {
                actor_id: self.user_id(),
                impersonator_id: None,
                session_id: None,
            },
        }
    }
}
