//! web2050 CLI - an internet from the year 2050, generated on demand.
//!
//! Provides commands for:
//! - `serve`: Start the page server
//! - `reset`: Delete a stored page so it is generated again

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ResetArgs, ServeArgs};
use output::Output;

/// web2050 - pages generated on demand by a language model.
#[derive(Parser)]
#[command(name = "web2050", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the page server.
    Serve(ServeArgs),
    /// Delete a stored page.
    Reset(ResetArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    init_tracing(matches!(&cli.command, Commands::Serve(args) if args.verbose));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = runtime.block_on(async {
        match cli.command {
            Commands::Serve(args) => args.execute().await,
            Commands::Reset(args) => args.execute().await,
        }
    });

    if let Err(err) = result {
        output.failure(&err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins unless `--verbose` asks for INFO; the fallback is WARN.
fn init_tracing(verbose: bool) {
    let filter = match (verbose, EnvFilter::try_from_default_env()) {
        (true, _) => EnvFilter::new("info,tower_http=debug"),
        (false, Ok(filter)) => filter,
        (false, Err(_)) => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
