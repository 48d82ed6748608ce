pub mod actor;
pub mod priority;
pub mod role;
pub mod status;

pub use actor::{AccessError, Actor, AuditIdentity, Permission, TenantScope, Visibility};
pub use priority::Priority;
pub use role::Role;
pub use status::{aggregate_status, AssigneeState, StatusAction, TaskStatus, TransitionError};
