use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::Database;
use crate::services::sweep::run_sweep;
use crate::state::AppState;

pub async fn handle(db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = AppState::build(db.clone(), config::config()?.clone())?;
    let report = run_sweep(db.pool(), &state.notifier).await?;
    state.notifier.flush().await;

    output_success(
        output_format,
        &format!(
            "Marked {} task(s) and {} assignee(s) overdue; purged {} revoked token(s)",
            report.tasks_marked, report.assignees_marked, report.revoked_tokens_purged
        ),
        Some(json!(report)),
    )
}
