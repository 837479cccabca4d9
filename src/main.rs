//! Toolgate CLI entry point.

use anyhow::Result;
use clap::Parser;
use toolgate::cli::{commands, Cli, Commands};
use toolgate::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first: the default log level lives there
    let config_path = Settings::resolve_config_path(cli.config.as_deref());
    let settings = Settings::load_from(Some(&config_path))?;

    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout belongs to the stdio transport
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("toolgate={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Ensure working directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Mcp => {
            commands::run_mcp(settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::List { filter } => {
            commands::run_list(filter.as_deref(), &settings)?;
        }

        Commands::Call { tool, args, data } => {
            commands::run_call(tool, args, data.as_deref(), &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings, &config_path)?;
        }
    }

    Ok(())
}
