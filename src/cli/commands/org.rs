use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{format_table, output_empty_collection};
use crate::cli::OutputFormat;
use crate::database::repository::organizations;
use crate::database::Database;

#[derive(Subcommand)]
pub enum OrgCommands {
    #[command(about = "List organizations")]
    List {
        #[arg(long, help = "Only active (true) or only inactive (false) organizations")]
        active: Option<bool>,
    },
}

pub async fn handle(cmd: OrgCommands, db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        OrgCommands::List { active } => {
            let orgs = organizations::list(db.pool(), active).await?;
            if orgs.is_empty() {
                return output_empty_collection(output_format, "organizations", "No organizations found");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "organizations": orgs }))?);
                }
                OutputFormat::Text => {
                    let rows: Vec<Vec<String>> = orgs
                        .iter()
                        .map(|org| {
                            vec![
                                org.id.to_string(),
                                org.slug.clone(),
                                if org.is_active { "yes" } else { "no" }.to_string(),
                                org.created_at.format("%Y-%m-%d %H:%M").to_string(),
                                org.name.clone(),
                            ]
                        })
                        .collect();
                    println!("{}", format_table(&["ID", "SLUG", "ACTIVE", "CREATED", "NAME"], &rows));
                }
            }
            Ok(())
        }
    }
}
