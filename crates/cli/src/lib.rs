pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "snoozy",
    about = "Snoozy operator CLI",
    long_about = "Operate the Snoozy support backend: migrations, seed data, and a local chat loop.",
    after_help = "Examples:\n  snoozy migrate\n  snoozy seed\n  snoozy chat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic store fixture (catalog + reviews) and verify it")]
    Seed,
    #[command(about = "Chat with the support system interactively from the terminal")]
    Chat,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Chat => commands::chat::run(),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
