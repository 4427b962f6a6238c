//! Dataset normalizers.
//!
//! One module per indicator family (GDP, CPI, WPI, IIP) plus the summary
//! aggregator. Each normalizer drives the mandated MCP call sequence with
//! family-specific filters, reconciles the raw rows into a chronologically
//! sorted series, and memoizes the result. `IndicatorService` is the
//! consumer-facing facade wiring client, cache, and query window together.

pub mod cpi;
pub mod gdp;
pub mod iip;
pub mod periods;
pub mod summary;
pub mod wpi;

use std::time::Duration;

use serde_json::{json, Value};

use crate::cache::ResultCache;
use crate::config::{AppConfig, QueryConfig};
use crate::mcp::{
    McpClient, ToolClient, TOOL_DESCRIBE_API, TOOL_GET_INDICATORS, TOOL_GET_METADATA,
};
use crate::types::{CpiPoint, FetchError, GdpPoint, IipPoint, SummarySnapshot, WpiPoint};

/// Facade over the four normalizers and the summary aggregator.
///
/// Each fetch is independently cacheable; a cache hit short-circuits the
/// whole remote call sequence.
pub struct IndicatorService {
    client: Box<dyn ToolClient>,
    cache: ResultCache,
    query: QueryConfig,
}

impl IndicatorService {
    /// Build a service backed by the HTTP MCP client.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let client = McpClient::new(
            config.api.endpoint.clone(),
            Duration::from_secs(config.api.timeout_secs),
        )?;
        Ok(Self::new(
            Box::new(client),
            ResultCache::new(Duration::from_secs(config.cache.ttl_secs)),
            config.query.clone(),
        ))
    }

    /// Build a service from parts. Tests inject a fake client and a cache
    /// with a manual clock through here.
    pub fn new(client: Box<dyn ToolClient>, cache: ResultCache, query: QueryConfig) -> Self {
        Self {
            client,
            cache,
            query,
        }
    }

    /// Drop all cached series (forced refresh).
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn fetch_gdp(&self) -> Result<Vec<GdpPoint>, FetchError> {
        gdp::fetch(self.client.as_ref(), &self.cache, &self.query).await
    }

    pub async fn fetch_cpi(&self) -> Result<Vec<CpiPoint>, FetchError> {
        cpi::fetch(self.client.as_ref(), &self.cache, &self.query).await
    }

    pub async fn fetch_wpi(&self) -> Result<Vec<WpiPoint>, FetchError> {
        wpi::fetch(self.client.as_ref(), &self.cache, &self.query).await
    }

    pub async fn fetch_iip(&self) -> Result<Vec<IipPoint>, FetchError> {
        iip::fetch(self.client.as_ref(), &self.cache, &self.query).await
    }

    pub async fn fetch_summary(&self) -> Result<SummarySnapshot, FetchError> {
        summary::fetch(self.client.as_ref(), &self.cache, &self.query).await
    }
}

// ---------------------------------------------------------------------------
// Shared fetch helpers
// ---------------------------------------------------------------------------

/// Open a session and run the three mandatory discovery calls.
///
/// The remote is stateful: capability description, indicator discovery,
/// and metadata (request ids 2-4, strictly in that order) must precede any
/// data call. Their results are discarded; data calls start at id 5.
pub(crate) async fn open_session(
    client: &dyn ToolClient,
    dataset: &str,
    metadata_args: Value,
) -> Result<String, FetchError> {
    let session = client.init_session().await?;
    client
        .call_tool(&session, TOOL_DESCRIBE_API, json!({}), 2)
        .await?;
    client
        .call_tool(&session, TOOL_GET_INDICATORS, json!({ "dataset": dataset }), 3)
        .await?;
    client
        .call_tool(&session, TOOL_GET_METADATA, metadata_args, 4)
        .await?;
    Ok(session)
}

/// Parse a numeric field that arrives as text.
///
/// Empty, malformed, and non-finite values ("", "NA", "NaN") coerce to
/// 0.0 so a single bad cell cannot poison a series.
pub(crate) fn parse_num(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Round to two decimal places, the precision of every published series.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
