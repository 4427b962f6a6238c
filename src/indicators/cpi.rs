//! CPI normalizer.
//!
//! One data call for the All-India combined series, then a scan that picks
//! the "-Overall" rollup row of each tracked group per month. The General
//! row also carries the published year-over-year inflation rate.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{open_session, parse_num, periods, round2};
use crate::cache::{CachedSeries, ResultCache};
use crate::config::QueryConfig;
use crate::mcp::{ToolClient, TOOL_GET_DATA};
use crate::types::{CpiPoint, FetchError};

const CACHE_KEY: &str = "cpi";
const DATASET: &str = "CPI";
const BASE_YEAR: &str = "2012";

// All India, Combined (rural + urban).
const STATE_CODE: &str = "99";
const SECTOR_CODE: &str = "3";

// Group codes: 0=General, 1=Food and Beverages, 3=Clothing and Footwear,
// 4=Housing, 5=Fuel and Light.
const GROUP_CODES: &str = "0,1,3,4,5";

// ---------------------------------------------------------------------------
// Group match table
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Slot {
    General,
    Food,
    Fuel,
    Housing,
    Clothing,
}

struct GroupRule {
    group: &'static str,
    subgroup: &'static str,
    slot: Slot,
}

/// The (group, subgroup) pairs whose rows feed the output, exactly as the
/// API spells them. Rows at finer granularity fall through.
const GROUP_TABLE: &[GroupRule] = &[
    GroupRule {
        group: "General",
        subgroup: "General-Overall",
        slot: Slot::General,
    },
    GroupRule {
        group: "Food and Beverages",
        subgroup: "Food and Beverages-Overall",
        slot: Slot::Food,
    },
    GroupRule {
        group: "Fuel and Light",
        subgroup: "Fuel and Light-Overall",
        slot: Slot::Fuel,
    },
    GroupRule {
        group: "Housing",
        subgroup: "Housing-Overall",
        slot: Slot::Housing,
    },
    GroupRule {
        group: "Clothing and Footwear",
        subgroup: "Clothing and Footwear-Overall",
        slot: Slot::Clothing,
    },
];

// ---------------------------------------------------------------------------
// Raw rows and normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CpiRow {
    #[serde(default)]
    month: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    subgroup: String,
    #[serde(default)]
    index: String,
    #[serde(default)]
    inflation: String,
}

#[derive(Debug, Default)]
struct MonthAccum {
    general: f64,
    food: f64,
    fuel: f64,
    housing: f64,
    clothing: f64,
    inflation: f64,
}

fn normalize(rows: Vec<CpiRow>, year_label: &str) -> Vec<CpiPoint> {
    let mut months: HashMap<String, MonthAccum> = HashMap::new();

    for row in &rows {
        let entry = months.entry(row.month.clone()).or_default();
        let Some(rule) = GROUP_TABLE
            .iter()
            .find(|s| s.group == row.group && s.subgroup == row.subgroup)
        else {
            continue;
        };
        let index = parse_num(&row.index);
        match rule.slot {
            Slot::General => {
                entry.general = index;
                entry.inflation = parse_num(&row.inflation);
            }
            Slot::Food => entry.food = index,
            Slot::Fuel => entry.fuel = index,
            Slot::Housing => entry.housing = index,
            Slot::Clothing => entry.clothing = index,
        }
    }

    let mut entries: Vec<(String, MonthAccum)> = months.into_iter().collect();
    entries.sort_by_key(|(month, _)| periods::month_index(month));

    entries
        .into_iter()
        .map(|(month, data)| CpiPoint {
            month: periods::short_month(&month).to_string(),
            year: year_label.to_string(),
            cpi_general: round2(data.general),
            cpi_food: round2(data.food),
            cpi_fuel: round2(data.fuel),
            cpi_housing: round2(data.housing),
            cpi_clothing: round2(data.clothing),
            inflation_rate: round2(data.inflation),
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
) -> Result<Vec<CpiPoint>, FetchError> {
    if let Some(CachedSeries::Cpi(points)) = cache.get(CACHE_KEY) {
        return Ok(points);
    }

    info!(year = %query.cpi_year, "Fetching CPI series from MoSPI");
    let session = open_session(
        client,
        DATASET,
        json!({ "dataset": DATASET, "base_year": BASE_YEAR, "level": "Group" }),
    )
    .await?;

    let result = client
        .call_tool(
            &session,
            TOOL_GET_DATA,
            json!({
                "dataset": DATASET,
                "filters": {
                    "base_year": BASE_YEAR,
                    "series": "Current",
                    "year": query.cpi_year,
                    "state_code": STATE_CODE,
                    "sector_code": SECTOR_CODE,
                    "group_code": GROUP_CODES,
                    "Format": "JSON",
                    "limit": "500",
                },
            }),
            5,
        )
        .await?;

    let rows: Vec<CpiRow> = result.extract()?;
    debug!(rows = rows.len(), "CPI raw rows received");

    let points = normalize(rows, &query.cpi_year);
    info!(points = points.len(), "CPI series normalised");

    cache.set(CACHE_KEY, CachedSeries::Cpi(points.clone()));
    Ok(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
