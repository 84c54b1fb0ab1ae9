//! Baseliner CLI - Command-line interface
//!
//! Removes redundant web test baselines across the platform fallback tree.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use baseliner::logging::{init_logging, LoggingConfig};
use baseliner::RunStatus;
use clap::{Parser, Subcommand};
use console::style;

use commands::common::GlobalArgs;
use commands::config::ConfigCommands;
use commands::optimize::OptimizeArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "baseliner")]
#[command(version = baseliner::VERSION)]
#[command(about = "Remove redundant web test baselines", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/baseliner/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Web tests directory, overriding the configuration file
    #[arg(long, global = true, value_name = "DIR")]
    web_tests: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Promote shared baselines and remove redundant ones
    Optimize(OptimizeArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::new().with_verbose(cli.verbose);
    if let Some(path) = &cli.log_file {
        logging = logging.with_log_file(path);
    }
    let guard = match init_logging(&logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", style("warning:").yellow().bold(), e);
            None
        }
    };

    let code = match run(cli) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            e.exit_code()
        }
    };

    // Flush the file writer before exiting.
    drop(guard);
    process::exit(code);
}

fn run(cli: Cli) -> Result<RunStatus, CliError> {
    let global = GlobalArgs {
        config: cli.config,
        web_tests: cli.web_tests,
    };

    match cli.command {
        Commands::Optimize(args) => commands::optimize::run(args, &global),
        Commands::Config { command } => {
            commands::config::run(command, &global)?;
            Ok(RunStatus::Clean)
        }
    }
}
