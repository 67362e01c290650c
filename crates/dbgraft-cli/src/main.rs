//! dbgraft CLI
//!
//! Command-line interface for capturing a store image and transplanting it
//! into other stores

use clap::{Parser, Subcommand};
use dbgraft_core::errors::ExError;
use dbgraft_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "dbgraft")]
#[command(about = "dbgraft - SQLite snapshot transplant", long_about = None)]
struct Cli {
    /// Diagnostic log format on stderr: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture the source store and transplant it into every target
    Run(commands::run::RunArgs),
    /// Print the verification report of one store
    Inspect(commands::inspect::InspectArgs),
    /// Print the capabilities of the linked SQLite library
    Info(commands::info::InfoArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log_format);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = e
                .downcast_ref::<ExError>()
                .map(|ex| ex.kind().exit_code())
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}
