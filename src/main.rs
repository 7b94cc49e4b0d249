// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments, hand off to `ui::run`.
// - Returning `anyhow::Result` prints the error chain and exits non-zero.

use blog_publisher::{cli::Cli, ui};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Quiet by default; RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    ui::run(cli)
}
