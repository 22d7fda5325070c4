//! Tramar CLI — declarative resource-graph compiler for two-region
//! serverless services.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "tramar",
    version,
    about = "Declarative resource-graph compiler — deterministic plans, cross-region references"
)]
struct Cli {
    #[command(subcommand)]
    command: tramar::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = tramar::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
