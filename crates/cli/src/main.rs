//! TradeCheck CLI - Main Entry Point
//!
//! Runs the comparison engine on JSON documents outside of a test and shows
//! how run options resolve against the environment files.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{compare, config};

/// TradeCheck CLI - tolerance-aware checks for trading platform tests
#[derive(Parser)]
#[command(name = "tradecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an actual JSON document against an expected one
    Compare(compare::CompareArgs),

    /// Resolve and print the runtime configuration
    Config(config::ConfigArgs),

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let debug = cli.verbose || matches!(&cli.command, Commands::Config(args) if args.options.debuglog);
    tradecheck_common::logging::init_logging(debug);

    match cli.command {
        Commands::Compare(args) => {
            if !compare::execute(args, cli.format)? {
                std::process::exit(1);
            }
        }
        Commands::Config(args) => config::execute(args, cli.format)?,
        Commands::Version => {
            println!("TradeCheck CLI v{}", tradecheck_common::VERSION);
            println!("Soft assertions with percentage tolerance for trading platform tests");
        }
    }

    Ok(())
}
