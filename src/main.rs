//! Main entry point for the erate-open-data CLI

use clap::Parser;
use erate_open_data::cli::{Cli, Commands, OutputFormat};
use erate_open_data::output::error_envelope;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// Logs go to stderr: stdout belongs to the result envelopes and reports,
/// so piping the output stays machine-readable.
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("erate_open_data=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Stats(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Balance(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Enrich(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Datasets(ref cmd) => cmd.execute().await,
    };

    if let Err(e) = result {
        if matches!(cli.output_format, OutputFormat::Json) {
            println!("{}", error_envelope(&e.to_string()));
        }
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
