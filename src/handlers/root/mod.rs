// handlers/root/mod.rs - /api/root platform administration
//
// Only plain super-admin tokens reach these handlers. An impersonation token
// is stopped by the guard with an ImpersonationBoundary error, so a support
// session can never escalate back to platform scope.

pub mod audit;
pub mod impersonation;
pub mod organizations;
pub mod sweep;
