// src/cli/mod.rs
// CLI module for wafaq commands

use clap::{Parser, Subcommand};

pub mod check;
pub mod serve;

pub use check::run_check;
pub use serve::run_server;

#[derive(Parser)]
#[command(name = "wafaq")]
#[command(about = "FAQ suggestion bridge in front of a hosted conversational assistant")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration and print a report
    Check,
}
