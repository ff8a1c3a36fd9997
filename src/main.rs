//! Binary entry point for userdesk.
//!
//! Runs the HTTP server or one-shot import/export commands against the
//! configured database.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// CLI output goes to stdout/stderr directly
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use userdesk::AppConfig;
use userdesk::http::{self, AppState};
use userdesk::io::formats::format_timestamp;
use userdesk::io::services::import;
use userdesk::observability;

/// Userdesk - user records with CSV import and export.
#[derive(Parser)]
#[command(name = "userdesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to listen on (overrides config).
        #[arg(short, long)]
        addr: Option<SocketAddr>,
    },

    /// Import users from a CSV file.
    Import {
        /// CSV file with `name`, `email` and optional `password` columns.
        file: PathBuf,
    },

    /// Export all users to CSV.
    Export {
        /// Output file (default: a timestamped file in the exports dir).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List previous exports, newest first.
    Exports,

    /// Print one page of users.
    Users {
        /// Page number.
        #[arg(short, long, default_value = "1")]
        page: usize,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to load .env: {e}");
        return ExitCode::FAILURE;
    }

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_config(&config, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::open(&config).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path().display()
        )
    })?;

    match command {
        Commands::Serve { addr } => cmd_serve(addr.unwrap_or(config.listen_addr), state).await,
        Commands::Import { file } => cmd_import(&state, file),
        Commands::Export { output } => cmd_export(&state, output),
        Commands::Exports => cmd_exports(&state),
        Commands::Users { page } => cmd_users(&state, page),
    }
}

async fn cmd_serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    http::serve(addr, state).await?;
    Ok(())
}

fn cmd_import(state: &AppState, file: PathBuf) -> anyhow::Result<()> {
    let report = state
        .imports()
        .import_from_path(&file)
        .map_err(|e| anyhow::anyhow!(import::failure_message(&e)))?;

    println!("{}", report.summary());
    for error in report.errors.iter().skip(import::SUMMARY_ERROR_LIMIT) {
        println!("  {error}");
    }
    Ok(())
}

fn cmd_export(state: &AppState, output: Option<PathBuf>) -> anyhow::Result<()> {
    let exports = state.exports();
    let result = match output {
        Some(path) => exports.export_to_file(&path),
        None => exports.export(),
    }
    .map_err(|e| anyhow::anyhow!(userdesk::io::services::export::failure_message(&e)))?;

    println!(
        "Exported {} users to {}",
        result.exported,
        result.path.display()
    );
    Ok(())
}

fn cmd_exports(state: &AppState) -> anyhow::Result<()> {
    let files = state.exports().list_exports()?;
    if files.is_empty() {
        println!("No exports yet.");
        return Ok(());
    }
    for file in files {
        println!(
            "{}  {:>10} bytes  {}",
            file.created_at,
            file.size,
            file.path.display()
        );
    }
    Ok(())
}

fn cmd_users(state: &AppState, page: usize) -> anyhow::Result<()> {
    let page = state.users().list(page)?;
    println!(
        "Page {} of {} ({} users)",
        page.page, page.last_page, page.total
    );
    for user in &page.items {
        println!(
            "{:>6}  {:<30}  {:<40}  {}",
            user.id.get(),
            user.name,
            user.email,
            format_timestamp(user.created_at)
        );
    }
    Ok(())
}
