//! CardioLens - Main Entry Point
//!
//! Serves heart-disease risk predictions over HTTP, or scores a single record
//! from the command line.

use clap::Parser;
use cardiolens::cli::{cmd_predict, cmd_schema, cmd_serve, Cli, Commands};
use cardiolens::server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardiolens=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.paths.apply(ServerConfig::default());

    match cli.command {
        Some(Commands::Predict { input }) => {
            cmd_predict(config, &input)?;
        }
        Some(Commands::Schema) => {
            cmd_schema(&config)?;
        }
        Some(Commands::Serve { port, host, templates_dir }) => {
            cmd_serve(config, host, port, templates_dir).await?;
        }
        None => {
            cmd_serve(config, None, None, None).await?;
        }
    }

    Ok(())
}
