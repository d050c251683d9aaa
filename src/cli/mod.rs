pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::{Client, HttpTransport};

#[derive(Parser)]
#[command(name = "carelink")]
#[command(about = "CareLink CLI - query and modify portal tables through the API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "CARELINK_URL", default_value = "http://localhost:3000", help = "API base URL")]
    pub url: String,

    #[arg(long, global = true, env = "CARELINK_TOKEN", hide_env_values = true, help = "Session token (JWT)")]
    pub token: Option<String>,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Read, count, insert, update and delete table rows")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "Check API and database health")]
    Health,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let transport = HttpTransport::new(&cli.url)?.with_token(cli.token.clone());

    match cli.command {
        Commands::Data { cmd } => commands::data::handle(cmd, &Client::new(transport), output_format).await,
        Commands::Health => commands::health::handle(&transport, output_format).await,
    }
}
