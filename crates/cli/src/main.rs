// stockmatch CLI - match distributor stock lists against inventory exports

mod exit_codes;
mod export;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stockmatch")]
#[command(about = "Reconcile a distributor product list against inventory stock")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inventory vs distributor reconciliation
    #[command(after_help = "\
Examples:
  stockmatch recon run ingram.recon.toml
  stockmatch recon validate ingram.recon.toml")]
    Recon {
        #[command(subcommand)]
        command: recon::ReconCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("error: cannot initialize logging: {e}");
        return ExitCode::from(EXIT_ERROR);
    }

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: stockmatch <command> [options]");
            eprintln!("       stockmatch --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Recon { command }) => recon::cmd_recon(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init()
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
