pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "folio-api")]
#[command(about = "Folio API - portfolio hosting server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format (default is human-readable text)")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (defaults to API_PORT, PORT, then 3000)")]
        port: Option<u16>,
    },

    #[command(about = "Print a bearer credential for a user id")]
    Token {
        #[arg(help = "User id to encode")]
        user_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Serve { port } => commands::serve::handle(port).await,
        Commands::Token { user_id } => commands::token::handle(&user_id, output_format),
    }
}
