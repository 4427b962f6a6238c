//! Configuration loading from TOML with environment variable overrides.
//!
//! Every field has a default, so the config file is optional and a bare
//! `IndicatorService` can be built without one. `MOSPI_MCP_URL` overrides
//! the endpoint at runtime (useful for pointing at a local stub).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Environment variable overriding `[api].endpoint`.
pub const ENDPOINT_ENV: &str = "MOSPI_MCP_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    /// Per-exchange HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://mcp.mospi.gov.in/".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // Six hours; source data updates monthly/quarterly.
        Self { ttl_secs: 21_600 }
    }
}

/// Year windows for the data calls. The remote filters are strings, so
/// these stay strings end to end.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// Comma-separated fiscal years for the quarterly GDP calls.
    pub gdp_years: String,
    pub cpi_year: String,
    pub wpi_year: String,
    /// Prior calendar year, fetched for the WPI year-over-year base.
    pub wpi_previous_year: String,
    pub iip_fiscal_year: String,
    pub iip_previous_fiscal_year: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            gdp_years: "2022-23,2023-24,2024-25".to_string(),
            cpi_year: "2024".to_string(),
            wpi_year: "2024".to_string(),
            wpi_previous_year: "2023".to_string(),
            iip_fiscal_year: "2024-25".to_string(),
            iip_previous_fiscal_year: "2023-24".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is
    /// absent (fresh checkout, container without a mounted config).
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            return Ok(config);
        }
        Self::load(path)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENDPOINT_ENV) {
            if !url.is_empty() {
                self.api.endpoint = url;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.endpoint, "https://mcp.mospi.gov.in/");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.cache.ttl_secs, 21_600);
        assert_eq!(cfg.query.gdp_years, "2022-23,2023-24,2024-25");
        assert_eq!(cfg.query.wpi_previous_year, "2023");
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [api]
            timeout_secs = 5

            [query]
            cpi_year = "2025"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.api.timeout_secs, 5);
        // Unset fields keep their defaults.
        assert_eq!(cfg.api.endpoint, "https://mcp.mospi.gov.in/");
        assert_eq!(cfg.query.cpi_year, "2025");
        assert_eq!(cfg.query.wpi_year, "2024");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cfg = AppConfig::load_or_default("/definitely/not/here.toml").unwrap();
        assert_eq!(cfg.cache.ttl_secs, 21_600);
    }
}
