//! Shared types for the MoSPI indicator pipeline.
//!
//! Normalized series elements, the cross-indicator summary snapshot, and
//! the error taxonomy. These types are the stable surface between the
//! acquisition modules and any consumer (CLI, HTTP layer, charts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Normalized series elements
// ---------------------------------------------------------------------------

/// One quarter of national-accounts data.
///
/// Growth figures are year-over-year percentages at constant prices;
/// `gdp_nominal` is the current-price level in lakh crore INR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdpPoint {
    pub quarter: String,
    /// Fiscal year label, e.g. "2024-25".
    pub year: String,
    pub gdp_growth: f64,
    pub gva_agriculture: f64,
    pub gva_industry: f64,
    pub gva_services: f64,
    pub gdp_nominal: f64,
}

/// One month of consumer-price-index data (base 2012 = 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiPoint {
    /// Abbreviated month label, e.g. "Jan".
    pub month: String,
    pub year: String,
    pub cpi_general: f64,
    pub cpi_food: f64,
    pub cpi_fuel: f64,
    pub cpi_housing: f64,
    pub cpi_clothing: f64,
    /// Year-over-year inflation of the General index, as reported.
    pub inflation_rate: f64,
}

/// One month of wholesale-price-index data (base 2011-12 = 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WpiPoint {
    pub month: String,
    pub year: String,
    pub wpi_all: f64,
    pub wpi_primary: f64,
    pub wpi_fuel: f64,
    pub wpi_manufactured: f64,
    /// Year-over-year change of the All Commodities index, computed here.
    pub wpi_inflation: f64,
}

/// One period of index-of-industrial-production data (base 2011-12 = 100).
///
/// `month` is a fiscal-month abbreviation ("Apr".."Mar"), or "Annual" when
/// the series fell back to yearly aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IipPoint {
    pub month: String,
    pub year: String,
    pub iip_general: f64,
    pub iip_mining: f64,
    pub iip_manufacturing: f64,
    pub iip_electricity: f64,
    pub growth_rate: f64,
}

// ---------------------------------------------------------------------------
// Summary snapshot
// ---------------------------------------------------------------------------

/// Direction of the last movement in a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

/// Latest value of one indicator, with a human period label and trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub value: f64,
    pub period: String,
    pub trend: Trend,
}

impl IndicatorSnapshot {
    /// Placeholder snapshot for an empty series.
    pub fn unavailable() -> Self {
        Self {
            value: 0.0,
            period: "N/A".to_string(),
            trend: Trend::Stable,
        }
    }
}

/// Headline figures across all four indicator families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySnapshot {
    pub gdp_growth: IndicatorSnapshot,
    pub cpi_inflation: IndicatorSnapshot,
    pub wpi_inflation: IndicatorSnapshot,
    pub iip_growth: IndicatorSnapshot,
    pub generated_at: DateTime<Utc>,
}

impl fmt::Display for SummarySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GDP {:+.2}% ({}) | CPI {:+.2}% ({}) | WPI {:+.2}% ({}) | IIP {:+.2}% ({})",
            self.gdp_growth.value,
            self.gdp_growth.period,
            self.cpi_inflation.value,
            self.cpi_inflation.period,
            self.wpi_inflation.value,
            self.wpi_inflation.period,
            self.iip_growth.value,
            self.iip_growth.period,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised along the acquisition path.
///
/// Everything propagates unmodified up to the caller; the two documented
/// exceptions (IIP month tolerance, WPI zero-prior guard) are handled
/// inside the respective normalizers.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx HTTP status from the MCP endpoint.
    #[error("MCP HTTP {status}")]
    Transport { status: u16 },

    /// Response body contained no parseable result or error frame.
    #[error("no valid event-stream message found in response")]
    MalformedResponse,

    /// The remote returned an explicit JSON-RPC error object.
    #[error("MCP error: {0}")]
    Protocol(String),

    /// A specific tool invocation was marked failed by the remote.
    #[error("MCP tool error ({tool}): {message}")]
    Tool { tool: String, message: String },

    /// The initialize handshake yielded no session identifier.
    #[error("MCP handshake returned no session id")]
    Session,

    /// The result envelope carried neither a structured nor a text payload.
    #[error("no data found in MCP response")]
    Extraction,

    #[error("failed to parse MCP payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("MCP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_display() {
        assert_eq!(Trend::Rising.to_string(), "rising");
        assert_eq!(Trend::Falling.to_string(), "falling");
        assert_eq!(Trend::Stable.to_string(), "stable");
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Rising).unwrap(), "\"rising\"");
        assert_eq!(serde_json::to_string(&Trend::Stable).unwrap(), "\"stable\"");
    }

    #[test]
    fn test_point_serializes_camel_case() {
        let p = GdpPoint {
            quarter: "Q1".into(),
            year: "2024-25".into(),
            gdp_growth: 6.7,
            gva_agriculture: 2.0,
            gva_industry: 7.2,
            gva_services: 7.1,
            gdp_nominal: 76.6,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["gdpGrowth"], 6.7);
        assert_eq!(json["gvaAgriculture"], 2.0);
        assert!(json.get("gdp_growth").is_none());
    }

    #[test]
    fn test_unavailable_snapshot() {
        let s = IndicatorSnapshot::unavailable();
        assert_eq!(s.value, 0.0);
        assert_eq!(s.period, "N/A");
        assert_eq!(s.trend, Trend::Stable);
    }

    #[test]
    fn test_fetch_error_messages() {
        let e = FetchError::Transport { status: 502 };
        assert_eq!(e.to_string(), "MCP HTTP 502");

        let e = FetchError::Tool {
            tool: "4_get_data".into(),
            message: "bad filters".into(),
        };
        assert_eq!(e.to_string(), "MCP tool error (4_get_data): bad filters");
    }
}
