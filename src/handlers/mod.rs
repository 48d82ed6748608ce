// handlers/mod.rs - HTTP handlers grouped by access tier
//
// public/     no token required (service info, login, logout)
// protected/  any signed-in identity; tenant routes also need an organization
// admin/      organization admins and impersonating super-admins
// root/       plain super-admins (platform administration)
//
// Handlers stay thin: pull the actor and inputs out of the request, call the
// matching service, wrap the result in the success envelope.

pub mod admin;
pub mod extract;
pub mod protected;
pub mod public;
pub mod root;

pub use extract::{JsonBody, OptionalJson, QueryParams};
