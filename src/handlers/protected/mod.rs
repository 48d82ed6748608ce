// handlers/protected/mod.rs - Routes for signed-in users
//
// auth/* is open to every identity, including plain super-admins. The rest
// needs an organization context: employees, admins or impersonators.

pub mod auth;
pub mod buckets;
pub mod calendar;
pub mod devices;
pub mod notifications;
pub mod tasks;
pub mod uploads;
