//! CLI module for the Clinical AI Gateway
//!
//! Subcommands:
//! - `serve`: run the HTTP gateway
//! - `reap`: delete expired cache entries and exit

pub mod reap;
pub mod serve;

use clap::{Parser, Subcommand};

/// Clinical AI Gateway - PHI-safe cached access to LLM providers
#[derive(Parser)]
#[command(name = "clinical-ai-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway HTTP server
    Serve,

    /// Delete cache entries past their expiry
    Reap,
}
