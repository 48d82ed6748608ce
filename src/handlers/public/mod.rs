// handlers/public/mod.rs - Routes reachable without a session token

pub mod auth;
pub mod root;

pub use auth::{login, logout};
pub use root::{health, root};
