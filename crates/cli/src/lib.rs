pub mod commands;

use bloodlink_core::SeedProfile;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "bloodlink",
    about = "BloodLink operator CLI",
    long_about = "Inspect BloodLink configuration, check ledger readiness, and run the approval smoke scenario.",
    after_help = "Examples:\n  bloodlink doctor --json\n  bloodlink config\n  bloodlink seed --profile empty\n  bloodlink smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Build a ledger from a seed profile and print its inventory and requests")]
    Seed {
        #[arg(long, help = "Seed profile (demo|empty); defaults to inventory.seed from config")]
        profile: Option<SeedProfile>,
    },
    #[command(about = "Run the approval scenario against a fresh ledger with per-check timing")]
    Smoke,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, listen address, and ledger bootstrap")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Seed { profile } => commands::seed::run(profile),
        Command::Smoke => commands::smoke::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
