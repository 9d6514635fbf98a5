//! Frago CLI — discover, inspect and run automation recipes.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "frago",
    version,
    about = "Recipe registry and runner for browser, Python and shell automation"
)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug              Enable debug logging\n    FRAGO_EXAMPLES_DIR=<path>   Bundled example recipes")]
struct Cli {
    #[command(flatten)]
    global: frago::cli::GlobalArgs,

    #[command(subcommand)]
    command: frago::cli::Commands,
}

fn main() {
    let cli = Cli::parse();

    // stderr only: stdout carries JSON.
    let default_level = if cli.global.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match frago::cli::dispatch(cli.command, &cli.global) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
