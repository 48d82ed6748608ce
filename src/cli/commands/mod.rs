pub mod migrate;
pub mod org;
pub mod super_admin;
pub mod sweep;

use anyhow::Context;

use crate::config;
use crate::database::Database;

/// Open the pool described by the environment / config file.
pub async fn connect() -> anyhow::Result<Database> {
    let config = config::config().context("failed to load configuration")?;
    Database::connect(&config.database)
        .await
        .with_context(|| format!("cannot connect to {}", Database::redacted_url(&config.database.url)))
}
