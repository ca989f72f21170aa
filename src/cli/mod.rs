//! CLI module for the model gateway

pub mod serve;

use clap::{Parser, Subcommand};

/// Model Gateway - OpenAI-compatible proxy for Ollama and compatible backends
#[derive(Parser)]
#[command(name = "pmp-model-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve,
}
