mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, check, mirror, normalize, rotate, ApplyArgs, CheckArgs, MirrorArgs, NormalizeArgs, RotateArgs};

/// Lectern CLI - edit rich documents from the command line
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, settle derived attributes and write a document back
    Normalize(NormalizeArgs),

    /// Report documents whose stored attributes are out of sync
    Check(CheckArgs),

    /// Run a JSON command script against a document
    Apply(ApplyArgs),

    /// Rotate an image a quarter turn
    Rotate(RotateArgs),

    /// Mirror an image horizontally or vertically
    Mirror(MirrorArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("{} cannot read current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Check(args) => check(args, &cwd),
        Command::Apply(args) => apply(args, &cwd).await,
        Command::Rotate(args) => rotate(args, &cwd).await,
        Command::Mirror(args) => mirror(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
