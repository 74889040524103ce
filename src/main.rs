//! acl-rs CLI.
//!
//! - `acl-rs check` - Parse an ACL rule file and summarize it
//! - `acl-rs match` - Evaluate destinations against a configured engine

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cli;
mod config;

/// acl-rs command-line interface.
#[derive(Parser)]
#[command(
    name = "acl-rs",
    version,
    about = "Evaluate proxy ACL rules against destinations",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a rule file and report its contents.
    Check(cli::CheckArgs),

    /// Decide an action for each destination.
    Match(cli::MatchArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(args) => cli::run_check(args),
        Commands::Match(args) => cli::run_match(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
