//! GDP / national accounts normalizer.
//!
//! Joins three quarterly NAS series (growth rate, GVA by industry, and
//! absolute nominal value) into one series keyed by (fiscal year,
//! quarter). The GVA industries are rolled up into agriculture, industry,
//! and services buckets; nominal values convert crore to lakh crore.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{open_session, parse_num, periods, round2};
use crate::cache::{CachedSeries, ResultCache};
use crate::config::QueryConfig;
use crate::mcp::{ToolClient, TOOL_GET_DATA};
use crate::types::{FetchError, GdpPoint};

const CACHE_KEY: &str = "gdp";
const DATASET: &str = "NAS";

// NAS indicator codes for the three quarterly series joined here.
const INDICATOR_GDP_GROWTH: &str = "22";
const INDICATOR_GVA_GROWTH: &str = "21";
const INDICATOR_GDP_ABSOLUTE: &str = "5";

/// Crore per lakh crore.
const LAKH_CRORE: f64 = 100_000.0;

// Industry groups averaged into each GVA bucket, as named by the API.
// A group missing for a quarter contributes zero to its bucket mean.
const AGRICULTURE_GROUPS: &[&str] = &["Agriculture, Livestock, Forestry and Fishing"];
const INDUSTRY_GROUPS: &[&str] = &[
    "Mining and Quarrying",
    "Manufacturing",
    "Electricity, Gas, Water Supply & Other Utility Services",
    "Construction",
];
const SERVICES_GROUPS: &[&str] = &[
    "Trade, Hotels, Transport, Communication & Services Related to Broadcasting",
    "Financial, Real Estate & Professional Services",
    "Public Administration, Defence & Other Services",
];

// ---------------------------------------------------------------------------
// Raw rows (numbers arrive as strings)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GrowthRow {
    #[serde(default)]
    year: String,
    #[serde(default)]
    quarter: String,
    #[serde(default)]
    constant_price: String,
}

#[derive(Debug, Deserialize)]
struct GvaRow {
    #[serde(default)]
    year: String,
    #[serde(default)]
    quarter: String,
    #[serde(default)]
    industry: String,
    #[serde(default)]
    constant_price: String,
}

#[derive(Debug, Deserialize)]
struct AbsoluteRow {
    #[serde(default)]
    year: String,
    #[serde(default)]
    quarter: String,
    #[serde(default)]
    current_price: String,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn period_key(year: &str, quarter: &str) -> String {
    format!("{year}_{quarter}")
}

/// Mean growth across the named industry groups; absent groups count as
/// zero, and a quarter with no GVA rows at all yields zero.
fn sector_mean(industries: Option<&HashMap<String, f64>>, groups: &[&str]) -> f64 {
    let Some(map) = industries else {
        return 0.0;
    };
    let sum: f64 = groups
        .iter()
        .map(|group| map.get(*group).copied().unwrap_or(0.0))
        .sum();
    sum / groups.len() as f64
}

fn normalize(
    growth_rows: Vec<GrowthRow>,
    gva_rows: Vec<GvaRow>,
    absolute_rows: Vec<AbsoluteRow>,
) -> Vec<GdpPoint> {
    // GVA lookup: period key -> industry name -> growth.
    let mut gva: HashMap<String, HashMap<String, f64>> = HashMap::new();
    for row in &gva_rows {
        gva.entry(period_key(&row.year, &row.quarter))
            .or_default()
            .insert(row.industry.clone(), parse_num(&row.constant_price));
    }

    // Nominal lookup, converted to lakh crore.
    let mut nominal: HashMap<String, f64> = HashMap::new();
    for row in &absolute_rows {
        nominal.insert(
            period_key(&row.year, &row.quarter),
            parse_num(&row.current_price) / LAKH_CRORE,
        );
    }

    // Results arrive unordered; sort by fiscal year then quarter position,
    // and collapse any repeated period key.
    let mut rows = growth_rows;
    rows.sort_by(|a, b| {
        a.year.cmp(&b.year).then_with(|| {
            periods::quarter_index(&a.quarter).cmp(&periods::quarter_index(&b.quarter))
        })
    });
    rows.dedup_by(|a, b| a.year == b.year && a.quarter == b.quarter);

    rows.into_iter()
        .map(|row| {
            let key = period_key(&row.year, &row.quarter);
            let industries = gva.get(&key);
            GdpPoint {
                gdp_growth: round2(parse_num(&row.constant_price)),
                gva_agriculture: round2(sector_mean(industries, AGRICULTURE_GROUPS)),
                gva_industry: round2(sector_mean(industries, INDUSTRY_GROUPS)),
                gva_services: round2(sector_mean(industries, SERVICES_GROUPS)),
                gdp_nominal: round2(nominal.get(&key).copied().unwrap_or(0.0)),
                quarter: row.quarter,
                year: row.year,
            }
        })
        .collect()
}

fn data_args(indicator_code: &str, years: &str, limit: &str) -> Value {
    json!({
        "dataset": DATASET,
        "filters": {
            "series": "Current",
            "frequency_code": "Quarterly",
            "indicator_code": indicator_code,
            "year": years,
            "quarterly_code": "1,2,3,4",
            "Format": "JSON",
            "limit": limit,
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
) -> Result<Vec<GdpPoint>, FetchError> {
    if let Some(CachedSeries::Gdp(points)) = cache.get(CACHE_KEY) {
        return Ok(points);
    }

    info!(years = %query.gdp_years, "Fetching GDP series from MoSPI");
    let session = open_session(
        client,
        DATASET,
        json!({
            "dataset": DATASET,
            "indicator_code": INDICATOR_GDP_GROWTH,
            "frequency_code": "2",
        }),
    )
    .await?;

    // The three quarterly series fan out concurrently (ids 5-7); only the
    // discovery steps before them are order-sensitive.
    let (growth, gva, absolute) = tokio::try_join!(
        client.call_tool(
            &session,
            TOOL_GET_DATA,
            data_args(INDICATOR_GDP_GROWTH, &query.gdp_years, "100"),
            5,
        ),
        client.call_tool(
            &session,
            TOOL_GET_DATA,
            data_args(INDICATOR_GVA_GROWTH, &query.gdp_years, "200"),
            6,
        ),
        client.call_tool(
            &session,
            TOOL_GET_DATA,
            data_args(INDICATOR_GDP_ABSOLUTE, &query.gdp_years, "100"),
            7,
        ),
    )?;

    let growth_rows: Vec<GrowthRow> = growth.extract()?;
    let gva_rows: Vec<GvaRow> = gva.extract()?;
    let absolute_rows: Vec<AbsoluteRow> = absolute.extract()?;
    debug!(
        growth = growth_rows.len(),
        gva = gva_rows.len(),
        nominal = absolute_rows.len(),
        "GDP raw rows received"
    );

    let points = normalize(growth_rows, gva_rows, absolute_rows);
    info!(points = points.len(), "GDP series normalised");

    cache.set(CACHE_KEY, CachedSeries::Gdp(points.clone()));
    Ok(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn growth(year: &str, quarter: &str, value: &str) -> GrowthRow {
        GrowthRow {
            year: year.to_string(),
            quarter: quarter.to_string(),
            constant_price: value.to_string(),
        }
    }

    fn gva(year: &str, quarter: &str, industry: &str, value: &str) -> GvaRow {
        GvaRow {
            year: year.to_string(),
            quarter: quarter.to_string(),
            industry: industry.to_string(),
            constant_price: value.to_string(),
        }
    }

    #[test]
    fn test_sector_mean_single_entry() {
        let mut industries = HashMap::new();
        industries.insert(
            "Agriculture, Livestock, Forestry and Fishing".to_string(),
            3.5,
        );
        assert_eq!(sector_mean(Some(&industries), AGRICULTURE_GROUPS), 3.5);
        assert_eq!(sector_mean(Some(&industries), INDUSTRY_GROUPS), 0.0);
        assert_eq!(sector_mean(Some(&industries), SERVICES_GROUPS), 0.0);
    }

    #[test]
    fn test_sector_mean_missing_members_count_as_zero() {
        let mut industries = HashMap::new();
        industries.insert("Manufacturing".to_string(), 8.0);
        industries.insert("Construction".to_string(), 4.0);
        // (0 + 8 + 0 + 4) / 4
        assert_eq!(sector_mean(Some(&industries), INDUSTRY_GROUPS), 3.0);
    }

    #[test]
    fn test_sector_mean_no_quarter() {
        assert_eq!(sector_mean(None, SERVICES_GROUPS), 0.0);
    }

    #[test]
    fn test_normalize_sorts_by_year_then_quarter() {
        let rows = vec![
            growth("2024-25", "Q2", "6.1"),
            growth("2023-24", "Q4", "7.8"),
            growth("2024-25", "Q1", "6.7"),
        ];
        let points = normalize(rows, Vec::new(), Vec::new());
        let order: Vec<(String, String)> = points
            .iter()
            .map(|p| (p.year.clone(), p.quarter.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2023-24".to_string(), "Q4".to_string()),
                ("2024-25".to_string(), "Q1".to_string()),
                ("2024-25".to_string(), "Q2".to_string()),
            ]
        );
    }

    #[test]
    fn test_normalize_drops_duplicate_period() {
        let rows = vec![
            growth("2024-25", "Q1", "6.7"),
            growth("2024-25", "Q1", "6.7"),
        ];
        let points = normalize(rows, Vec::new(), Vec::new());
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_normalize_joins_gva_and_nominal() {
        let growth_rows = vec![growth("2024-25", "Q1", "6.7")];
        let gva_rows = vec![
            gva(
                "2024-25",
                "Q1",
                "Agriculture, Livestock, Forestry and Fishing",
                "2.0",
            ),
            gva("2024-25", "Q1", "Manufacturing", "9.2"),
            gva("2024-25", "Q1", "Construction", "10.0"),
        ];
        let absolute_rows = vec![AbsoluteRow {
            year: "2024-25".to_string(),
            quarter: "Q1".to_string(),
            current_price: "7650000".to_string(),
        }];

        let points = normalize(growth_rows, gva_rows, absolute_rows);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.gdp_growth, 6.7);
        assert_eq!(p.gva_agriculture, 2.0);
        // (0 + 9.2 + 0 + 10.0) / 4
        assert_eq!(p.gva_industry, 4.8);
        assert_eq!(p.gva_services, 0.0);
        // 7,650,000 crore -> 76.5 lakh crore
        assert_eq!(p.gdp_nominal, 76.5);
    }

    #[test]
    fn test_normalize_unmatched_quarter_defaults_to_zero() {
        let growth_rows = vec![growth("2024-25", "Q3", "6.2")];
        let gva_rows = vec![gva("2024-25", "Q1", "Manufacturing", "9.2")];
        let points = normalize(growth_rows, gva_rows, Vec::new());
        assert_eq!(points[0].gva_industry, 0.0);
        assert_eq!(points[0].gdp_nominal, 0.0);
    }
}
