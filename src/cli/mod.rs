pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "taskhub")]
#[command(about = "TaskHub admin CLI - database and platform maintenance")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(name = "super-admin", about = "Platform super-admin accounts")]
    SuperAdmin {
        #[command(subcommand)]
        cmd: commands::super_admin::SuperAdminCommands,
    },

    #[command(about = "Organization inspection")]
    Org {
        #[command(subcommand)]
        cmd: commands::org::OrgCommands,
    },

    #[command(about = "Run the overdue sweep once")]
    Sweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json && !cli.text {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let db = commands::connect().await?;

    let result = match cli.command {
        Commands::Migrate => commands::migrate::handle(&db, output_format).await,
        Commands::SuperAdmin { cmd } => commands::super_admin::handle(cmd, &db, output_format).await,
        Commands::Org { cmd } => commands::org::handle(cmd, &db, output_format).await,
        Commands::Sweep => commands::sweep::handle(&db, output_format).await,
    };

    db.close().await;
    result
}
