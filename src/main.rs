// src/main.rs
// wafaq - FAQ suggestion bridge in front of a hosted conversational assistant

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::FmtSubscriber;
use wafaq::config::{self, EnvConfig};

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();

    let cli = Cli::parse();
    let mut env_config = EnvConfig::load();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(env_config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                env_config.host = host;
            }
            if let Some(port) = port {
                env_config.port = port;
            }
            cli::run_server(env_config).await
        }
        None => cli::run_server(env_config).await,
        Some(Commands::Check) => cli::run_check(&env_config),
    }
}
