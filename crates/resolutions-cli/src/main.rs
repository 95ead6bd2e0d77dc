#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use resolutions_core::{Config, Selector};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resolutions")]
#[command(author, version, about = "Dedupe duplicated packages in a bundled module graph", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Replay a bundler trace and print the dedupe resolution
    Resolve {
        /// Trace file (JSON)
        trace: PathBuf,

        /// Packages to dedupe: comma-separated names, or * for all
        #[arg(long, short = 's', value_name = "NAMES")]
        select: Option<Selector>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::default()
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Resolve { trace, select } => {
            logging::init(config.verbosity, config.json_logs);
            let action = commands::resolve::ResolveAction { trace, select };
            commands::resolve::run(action, config.json_logs)
        }
    }
}
