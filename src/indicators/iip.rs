//! IIP normalizer.
//!
//! The IIP dataset answers fiscal-year queries with annual aggregates. If
//! the response carries no month dimension, the normalizer issues twelve
//! month-filtered calls (April through March) and tolerates individual
//! misses: a month that fails or has no General row is simply not
//! published yet. If no month survives, the series degrades to two annual
//! points (previous and current fiscal year).

use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{open_session, parse_num, periods, round2};
use crate::cache::{CachedSeries, ResultCache};
use crate::config::QueryConfig;
use crate::mcp::{ToolClient, TOOL_GET_DATA};
use crate::types::{FetchError, IipPoint};

const CACHE_KEY: &str = "iip";
const DATASET: &str = "IIP";
const BASE_YEAR: &str = "2011-12";

// Category codes: 1=Mining, 2=Manufacturing, 3=Electricity, 4=General.
const CATEGORY_CODES: &str = "1,2,3,4";

/// Request id of the first monthly call; the twelve fan-out calls use
/// ids 10 through 21.
const FIRST_MONTHLY_REQUEST_ID: u64 = 10;

// ---------------------------------------------------------------------------
// Raw rows and builders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IipRow {
    #[serde(default)]
    category: String,
    #[serde(default)]
    sub_category: String,
    #[serde(default)]
    index: String,
    #[serde(default)]
    growth_rate: String,
    // Only presence matters; the wire type varies.
    #[serde(default)]
    month: Option<Value>,
    #[serde(default)]
    month_code: Option<Value>,
}

/// Whether the response rows carry a month dimension at all.
fn has_month_dimension(rows: &[IipRow]) -> bool {
    rows.first()
        .is_some_and(|r| r.month.is_some() || r.month_code.is_some())
}

fn category_index(top_level: &[&IipRow], name: &str) -> f64 {
    top_level
        .iter()
        .find(|r| r.category == name)
        .map(|r| parse_num(&r.index))
        .unwrap_or(0.0)
}

/// Assemble one point from the top-level category rows (empty
/// sub-category). Returns None when the General row is absent, meaning
/// the period isn't published.
fn build_point(rows: &[IipRow], month_label: &str, year_label: &str) -> Option<IipPoint> {
    let top_level: Vec<&IipRow> = rows.iter().filter(|r| r.sub_category.is_empty()).collect();
    let general = top_level.iter().find(|r| r.category == "General")?;
    Some(IipPoint {
        month: month_label.to_string(),
        year: year_label.to_string(),
        iip_general: round2(parse_num(&general.index)),
        iip_mining: round2(category_index(&top_level, "Mining")),
        iip_manufacturing: round2(category_index(&top_level, "Manufacturing")),
        iip_electricity: round2(category_index(&top_level, "Electricity")),
        growth_rate: round2(parse_num(&general.growth_rate)),
    })
}

fn annual_args(fiscal_year: &str) -> Value {
    json!({
        "dataset": DATASET,
        "filters": {
            "base_year": BASE_YEAR,
            "type": "All",
            "category_code": CATEGORY_CODES,
            "financial_year": fiscal_year,
            "Format": "JSON",
            "limit": "500",
        },
    })
}

fn monthly_args(fiscal_year: &str, month_code: usize) -> Value {
    json!({
        "dataset": DATASET,
        "filters": {
            "base_year": BASE_YEAR,
            "type": "All",
            "category_code": CATEGORY_CODES,
            "financial_year": fiscal_year,
            "month_code": month_code.to_string(),
            "Format": "JSON",
            "limit": "50",
        },
    })
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

pub(crate) async fn fetch(
    client: &dyn ToolClient,
    cache: &ResultCache,
    query: &QueryConfig,
) -> Result<Vec<IipPoint>, FetchError> {
    if let Some(CachedSeries::Iip(points)) = cache.get(CACHE_KEY) {
        return Ok(points);
    }

    info!(fiscal_year = %query.iip_fiscal_year, "Fetching IIP series from MoSPI");
    let session = open_session(
        client,
        DATASET,
        json!({ "dataset": DATASET, "base_year": BASE_YEAR, "frequency": "Monthly" }),
    )
    .await?;

    let (current, prior) = tokio::try_join!(
        client.call_tool(&session, TOOL_GET_DATA, annual_args(&query.iip_fiscal_year), 5),
        client.call_tool(
            &session,
            TOOL_GET_DATA,
            annual_args(&query.iip_previous_fiscal_year),
            6,
        ),
    )?;

    let current_rows: Vec<IipRow> = current.extract()?;
    let prior_rows: Vec<IipRow> = prior.extract()?;
    debug!(
        current = current_rows.len(),
        prior = prior_rows.len(),
        "IIP annual rows received"
    );

    if !has_month_dimension(&current_rows) {
        let points = fetch_monthly(client, &session, query).await;
        if !points.is_empty() {
            info!(points = points.len(), "IIP monthly series normalised");
            cache.set(CACHE_KEY, CachedSeries::Iip(points.clone()));
            return Ok(points);
        }
    }

    // Last resort: one point per fiscal year from the annual aggregates.
    let mut points = Vec::new();
    if let Some(p) = build_point(&prior_rows, "Annual", &query.iip_previous_fiscal_year) {
        points.push(p);
    }
    if let Some(p) = build_point(&current_rows, "Annual", &query.iip_fiscal_year) {
        points.push(p);
    }
    info!(points = points.len(), "IIP annual series normalised");

    cache.set(CACHE_KEY, CachedSeries::Iip(points.clone()));
    Ok(points)
}

/// Twelve month-filtered calls, April through March, fanned out
/// concurrently. A month that errors, has an unreadable payload, or lacks
/// a General row is skipped: not yet published, not fatal.
async fn fetch_monthly(
    client: &dyn ToolClient,
    session: &str,
    query: &QueryConfig,
) -> Vec<IipPoint> {
    let calls = (0..12).map(|i| {
        client.call_tool(
            session,
            TOOL_GET_DATA,
            monthly_args(&query.iip_fiscal_year, i + 1),
            FIRST_MONTHLY_REQUEST_ID + i as u64,
        )
    });
    let results = join_all(calls).await;

    let mut points = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        let label = periods::FISCAL_MONTH_LABELS[i];
        let rows: Vec<IipRow> = match result.and_then(|r| r.extract()) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(month = label, error = %e, "IIP month unavailable, skipping");
                continue;
            }
        };
        match build_point(&rows, label, &query.iip_fiscal_year) {
            Some(point) => points.push(point),
            None => debug!(month = label, "IIP month has no General row, skipping"),
        }
    }
    // join_all preserves call order, so points are already April..March.
    points
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, sub_category: &str, index: &str, growth: &str) -> IipRow {
        IipRow {
            category: category.to_string(),
            sub_category: sub_category.to_string(),
            index: index.to_string(),
            growth_rate: growth.to_string(),
            month: None,
            month_code: None,
        }
    }

    #[test]
    fn test_build_point_full_set() {
        let rows = vec![
            row("General", "", "150.1", "5.2"),
            row("Mining", "", "120.4", "2.8"),
            row("Manufacturing", "", "148.9", "5.6"),
            row("Electricity", "", "205.3", "7.9"),
        ];
        let p = build_point(&rows, "Apr", "2024-25").unwrap();
        assert_eq!(p.month, "Apr");
        assert_eq!(p.iip_general, 150.1);
        assert_eq!(p.iip_mining, 120.4);
        assert_eq!(p.iip_manufacturing, 148.9);
        assert_eq!(p.iip_electricity, 205.3);
        assert_eq!(p.growth_rate, 5.2);
    }

    #[test]
    fn test_build_point_missing_general_is_none() {
        let rows = vec![row("Mining", "", "120.4", "2.8")];
        assert!(build_point(&rows, "Apr", "2024-25").is_none());
    }

    #[test]
    fn test_build_point_missing_sectors_default_to_zero() {
        let rows = vec![row("General", "", "150.1", "5.2")];
        let p = build_point(&rows, "Annual", "2024-25").unwrap();
        assert_eq!(p.iip_mining, 0.0);
        assert_eq!(p.iip_electricity, 0.0);
    }

    #[test]
    fn test_build_point_ignores_sub_category_rows() {
        let rows = vec![
            row("General", "", "150.1", "5.2"),
            // A Manufacturing sub-sector, not the top-level category.
            row("Manufacturing", "Basic Metals", "171.0", "4.1"),
        ];
        let p = build_point(&rows, "Apr", "2024-25").unwrap();
        assert_eq!(p.iip_manufacturing, 0.0);
    }

    #[test]
    fn test_has_month_dimension() {
        let mut with_month = row("General", "", "150.1", "5.2");
        with_month.month = Some(Value::String("April".to_string()));
        assert!(has_month_dimension(&[with_month]));

        let mut with_code = row("General", "", "150.1", "5.2");
        with_code.month_code = Some(Value::from(4));
        assert!(has_month_dimension(&[with_code]));

        assert!(!has_month_dimension(&[row("General", "", "150.1", "5.2")]));
        assert!(!has_month_dimension(&[]));
    }
}
