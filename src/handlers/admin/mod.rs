// handlers/admin/mod.rs - /api/admin routes
//
// Organization admins and impersonating super-admins. Every write here is
// audited with the identity returned by Actor::audit_identity.

pub mod audit;
pub mod buckets;
pub mod tasks;
pub mod users;
