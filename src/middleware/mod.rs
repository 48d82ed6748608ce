// middleware/mod.rs - Request pipeline for authenticated routes
//
// Layer order on every protected router, outermost first:
//   1. jwt_auth_middleware      decode token into Claims / Actor / SessionToken
//   2. require_* guards         role checks against the decoded actor
//   3. validate_session_middleware  database checks (revocation, liveness)

pub mod auth;
pub mod guards;
pub mod response;
pub mod session;

pub use auth::{jwt_auth_middleware, SessionToken};
pub use guards::{require_super_admin, require_tenant, require_tenant_admin};
pub use response::{ApiResponse, ApiResult};
pub use session::validate_session_middleware;
