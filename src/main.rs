//! mospi-pulse: fetch and print India macro indicators.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! fetches the cross-indicator summary (which pulls all four series
//! through the cache), and prints it as JSON for downstream consumers.

use anyhow::{Context, Result};
use tracing::info;

use mospi_pulse::config::AppConfig;
use mospi_pulse::indicators::IndicatorService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();
    let cfg = AppConfig::load_or_default("config.toml")?;

    info!(
        endpoint = %cfg.api.endpoint,
        timeout_secs = cfg.api.timeout_secs,
        cache_ttl_secs = cfg.cache.ttl_secs,
        "mospi-pulse starting up"
    );

    let service =
        IndicatorService::from_config(&cfg).context("Failed to build indicator service")?;

    let summary = service
        .fetch_summary()
        .await
        .context("Failed to fetch indicator summary")?;

    info!(%summary, "Indicators fetched");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mospi_pulse=info"));

    let json_logging = std::env::var("MOSPI_PULSE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
