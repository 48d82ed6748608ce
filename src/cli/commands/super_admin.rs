use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::Database;
use crate::services::users::UserService;

#[derive(Subcommand)]
pub enum SuperAdminCommands {
    #[command(about = "Create a platform super-admin")]
    Create {
        #[arg(long, help = "Display name")]
        name: String,

        #[arg(long, help = "Login email (unique across the platform)")]
        email: String,

        #[arg(long, help = "Initial password (at least 8 characters)")]
        password: String,
    },
}

pub async fn handle(cmd: SuperAdminCommands, db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SuperAdminCommands::Create { name, email, password } => {
            let user = UserService::new(db.pool().clone())
                .create_super_admin(&name, &email, &password)
                .await?;
            output_success(
                output_format,
                &format!("Super-admin {} created ({})", user.email, user.id),
                Some(json!({ "id": user.id, "email": user.email, "name": user.name })),
            )
        }
    }
}
