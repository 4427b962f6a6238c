//! WPI normalizer.
//!
//! Fetches the four major-group index series for the target year, keeps
//! only major-group-level rows (no finer dimension populated), and
//! computes year-over-year inflation of the All Commodities index against
//! a second fetch of the prior year.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{open_session, parse_num, periods, round2};
use crate::cache::{CachedSeries, ResultCache};
use crate::config::QueryConfig;
use crate::mcp::{ToolClient, TOOL_GET_DATA};
use crate::types::{FetchError, WpiPoint};

const CACHE_KEY: &str = "wpi";
const DATASET: &str = "WPI";

// Major group codes: All Commodities, Primary Articles, Fuel & Power,
// Manufactured Products.
const MAJOR_GROUP_CODES: &str = "1000000000,1100000000,1200000000,1300000000";
const ALL_COMMODITIES_CODE: &str = "1000000000";

const ALL_COMMODITIES: &str = "Wholesale Price Index";

#[derive(Clone, Copy)]
enum Slot {
    All,
    Primary,
    Fuel,
    Manufactured,
}

/// Major group names as the API spells them.
const MAJOR_GROUP_TABLE: &[(&str, Slot)] = &[
    (ALL_COMMODITIES, Slot::All),
    ("Primary articles", Slot::Primary),
    ("Fuel & power", Slot::Fuel),
    ("Manufactured products", Slot::Manufactured),
];

// ---------------------------------------------------------------------------
// Raw rows and normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WpiRow {
    #[serde(default)]
    month: String,
    #[serde(default)]
    majorgroup: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    subgroup: Option<String>,
    #[serde(default)]
    sub_subgroup: Option<String>,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    index_value: String,
}

fn absent(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(str::is_empty)
}

/// A row at major-group granularity carries no finer dimension.
fn is_major_group_level(row: &WpiRow) -> bool {
    absent(&row.group) && absent(&row.subgroup) && absent(&row.sub_subgroup) && absent(&row.item)
}

#[derive(Debug, Default)]
struct MonthAccum {
    all: f64,
    primary: f64,
    fuel: f64,
    manufactured: f64,
}

fn normalize(rows: Vec<WpiRow>, prior_rows: Vec<WpiRow>, year_label: &str) -> Vec<WpiPoint> {
    let mut months: HashMap<String, MonthAccum> = HashMap::new();
    for row in rows.iter().filter(|r| is_major_group_level(r)) {
        let entry = months.entry(row.month.clone()).or_default();
        let value = parse_num(&row.index_value);
        let Some((_, slot)) = MAJOR_GROUP_TABLE
            .iter()
            .find(|(name, _)| *name == row.majorgroup)
        else {
            continue;
        };
        match slot {
            Slot::All => entry.all = value,
            Slot::Primary => entry.primary = value,
            Slot::Fuel => entry.fuel = value,
            Slot::Manufactured => entry.manufactured = value,
        }
    }

    // Prior-year All Commodities index per month, the YoY base.
    let prior_all: HashMap<String, f64> = prior_rows
        .iter()
        .filter(|r| r.majorgroup == ALL_COMMODITIES && is_major_group_level(r))
        .map(|r| (r.month.clone(), parse_num(&r.index_value)))
        .collect();

    let mut entries: Vec<(String, MonthAccum)> = months.into_iter().collect();
    entries.sort_by_key(|(month, _)| periods::month_index(month));

    entries
        .into_iter()
        .map(|(month, data)| {
            // A month absent from the prior year compares against itself
            // (0% change); a zero base yields 0% rather than infinity.
            let prior = prior_all.get(&month).copied().unwrap_or(data.all);
            let inflation = if prior > 0.0 {
                round2((data.all - prior) / prior * 100.0)
            } else {
                0.0
            };
            WpiPoint {
                month: periods::short_month(&month).to_string(),
                year: year_label.to_string(),
                wpi_all: round2(data.all),
                wpi_primary: round2(data.primary),
                wpi_fuel: round2(data.fuel),
                wpi_manufactured: round2(data.manufactured),
                wpi_inflation: inflation,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

pub(crate) async fn fetch(
    client: &dyn ToolClient,
    cache: &ResultCache,
    query: &QueryConfig,
) -> Result<Vec<WpiPoint>, FetchError> {
    if let Some(CachedSeries::Wpi(points)) = cache.get(CACHE_KEY) {
        return Ok(points);
    }

    info!(year = %query.wpi_year, "Fetching WPI series from MoSPI");
    let session = open_session(client, DATASET, json!({ "dataset": DATASET })).await?;

    let result = client
        .call_tool(
            &session,
            TOOL_GET_DATA,
            json!({
                "dataset": DATASET,
                "filters": {
                    "year": query.wpi_year,
                    "major_group_code": MAJOR_GROUP_CODES,
                    "Format": "JSON",
                    "limit": "500",
                },
            }),
            5,
        )
        .await?;

    // Prior year, All Commodities only, for the YoY base.
    let prior_result = client
        .call_tool(
            &session,
            TOOL_GET_DATA,
            json!({
                "dataset": DATASET,
                "filters": {
                    "year": query.wpi_previous_year,
                    "major_group_code": ALL_COMMODITIES_CODE,
                    "Format": "JSON",
                    "limit": "500",
                },
            }),
            6,
        )
        .await?;

    let rows: Vec<WpiRow> = result.extract()?;
    let prior_rows: Vec<WpiRow> = prior_result.extract()?;
    debug!(
        rows = rows.len(),
        prior = prior_rows.len(),
        "WPI raw rows received"
    );

    let points = normalize(rows, prior_rows, &query.wpi_year);
    info!(points = points.len(), "WPI series normalised");

    cache.set(CACHE_KEY, CachedSeries::Wpi(points.clone()));
    Ok(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn major_row(month: &str, majorgroup: &str, index: &str) -> WpiRow {
        WpiRow {
            month: month.to_string(),
            majorgroup: majorgroup.to_string(),
            group: None,
            subgroup: None,
            sub_subgroup: None,
            item: None,
            index_value: index.to_string(),
        }
    }

    #[test]
    fn test_normalize_assigns_major_groups() {
        let rows = vec![
            major_row("April", "Wholesale Price Index", "152.0"),
            major_row("April", "Primary articles", "182.3"),
            major_row("April", "Fuel & power", "148.5"),
            major_row("April", "Manufactured products", "141.0"),
        ];
        let points = normalize(rows, Vec::new(), "2024");
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.month, "Apr");
        assert_eq!(p.wpi_all, 152.0);
        assert_eq!(p.wpi_primary, 182.3);
        assert_eq!(p.wpi_fuel, 148.5);
        assert_eq!(p.wpi_manufactured, 141.0);
    }

    #[test]
    fn test_normalize_skips_finer_rows() {
        let mut fine = major_row("April", "Primary articles", "190.0");
        fine.group = Some("Food articles".to_string());
        let rows = vec![major_row("April", "Primary articles", "182.3"), fine];
        let points = normalize(rows, Vec::new(), "2024");
        assert_eq!(points[0].wpi_primary, 182.3);
    }

    #[test]
    fn test_yoy_inflation() {
        let rows = vec![major_row("May", "Wholesale Price Index", "154.5")];
        let prior = vec![major_row("May", "Wholesale Price Index", "150.0")];
        let points = normalize(rows, prior, "2024");
        // (154.5 - 150.0) / 150.0 * 100
        assert_eq!(points[0].wpi_inflation, 3.0);
    }

    #[test]
    fn test_yoy_inflation_zero_base_yields_zero() {
        let rows = vec![major_row("May", "Wholesale Price Index", "154.5")];
        let prior = vec![major_row("May", "Wholesale Price Index", "0")];
        let points = normalize(rows, prior, "2024");
        assert_eq!(points[0].wpi_inflation, 0.0);
        assert!(points[0].wpi_inflation.is_finite());
    }

    #[test]
    fn test_yoy_inflation_missing_prior_month_yields_zero() {
        let rows = vec![major_row("June", "Wholesale Price Index", "154.5")];
        let prior = vec![major_row("May", "Wholesale Price Index", "150.0")];
        let points = normalize(rows, prior, "2024");
        assert_eq!(points[0].wpi_inflation, 0.0);
    }

    #[test]
    fn test_normalize_sorts_calendar_months() {
        let rows = vec![
            major_row("September", "Wholesale Price Index", "153.0"),
            major_row("April", "Wholesale Price Index", "151.0"),
            major_row("July", "Wholesale Price Index", "152.4"),
        ];
        let points = normalize(rows, Vec::new(), "2024");
        let months: Vec<&str> = points.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["Apr", "Jul", "Sep"]);
    }

    #[test]
    fn test_prior_rows_at_finer_level_are_ignored() {
        let rows = vec![major_row("May", "Wholesale Price Index", "154.5")];
        let mut fine_prior = major_row("May", "Wholesale Price Index", "100.0");
        fine_prior.item = Some("Rice".to_string());
        let points = normalize(rows, vec![fine_prior], "2024");
        // Prior lookup misses, so the month compares against itself.
        assert_eq!(points[0].wpi_inflation, 0.0);
    }
}
