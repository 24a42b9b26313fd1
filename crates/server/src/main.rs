use anyhow::Result;
use mainline_core::config::{AppConfig, LoadOptions};
use mainline_server::bootstrap;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use mainline_core::config::LogFormat::*;

    let filter = log_filter(&config.logging.level);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level.trim()).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config);
    bootstrap::serve(app).await?;

    Ok(())
}
