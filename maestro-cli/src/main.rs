//! Maestro CLI - command-line interface
//!
//! This binary provides a command-line interface to the maestro
//! orchestration library: scaffolding, validating and running declarative
//! emitter/chronicler topologies.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "maestro")]
#[command(version = maestro::VERSION)]
#[command(about = "Orchestrate data emitters and chroniclers from declarative configuration", long_about = None)]
struct Cli {
    /// Directory for log files; stdout-only when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter configuration file
    Init {
        /// Path of the configuration file to create
        #[arg(long, default_value = "maestro.json")]
        config: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Parse a configuration file and report its topology
    Validate {
        /// Path of the configuration file
        #[arg(long, default_value = "maestro.json")]
        config: PathBuf,
    },
    /// Load a configuration and run until interrupted
    Run {
        /// Path of the configuration file
        #[arg(long, default_value = "maestro.json")]
        config: PathBuf,
        /// Serialize live state back to the configuration on shutdown
        #[arg(long)]
        save_on_exit: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _logging_guard = match maestro::logging::init_logging(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };

    let result = match cli.command {
        Command::Init { config, force } => commands::init::execute(&config, force),
        Command::Validate { config } => commands::validate::execute(&config),
        Command::Run {
            config,
            save_on_exit,
        } => commands::run::execute(&config, save_on_exit).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}
