//! Summary aggregator.
//!
//! Fans out the four family fetches, takes each series' latest point, and
//! pairs it with a trend classified from the last two points of the full
//! series.

use chrono::Utc;
use tracing::info;

use super::{cpi, gdp, iip, wpi};
use crate::cache::{CachedSeries, ResultCache};
use crate::config::QueryConfig;
use crate::mcp::ToolClient;
use crate::types::{
    CpiPoint, FetchError, GdpPoint, IipPoint, IndicatorSnapshot, SummarySnapshot, Trend, WpiPoint,
};

const CACHE_KEY: &str = "summary";

/// Movements within this band count as noise, not a trend.
const TREND_DEADBAND: f64 = 0.01;

/// Classify the last movement of a chronologically ordered series.
///
/// Fewer than two points is always stable.
pub fn compute_trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }
    let last = values[values.len() - 1];
    let prev = values[values.len() - 2];
    if last > prev + TREND_DEADBAND {
        Trend::Rising
    } else if last < prev - TREND_DEADBAND {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

fn snapshot<T>(
    series: &[T],
    value: impl Fn(&T) -> f64,
    period: impl Fn(&T) -> String,
) -> IndicatorSnapshot {
    let Some(last) = series.last() else {
        return IndicatorSnapshot::unavailable();
    };
    let values: Vec<f64> = series.iter().map(&value).collect();
    IndicatorSnapshot {
        value: value(last),
        period: period(last),
        trend: compute_trend(&values),
    }
}

pub(crate) fn build_snapshot(
    gdp: &[GdpPoint],
    cpi: &[CpiPoint],
    wpi: &[WpiPoint],
    iip: &[IipPoint],
) -> SummarySnapshot {
    SummarySnapshot {
        gdp_growth: snapshot(
            gdp,
            |p| p.gdp_growth,
            |p| format!("{} FY {}", p.quarter, p.year),
        ),
        cpi_inflation: snapshot(
            cpi,
            |p| p.inflation_rate,
            |p| format!("{} {}", p.month, p.year),
        ),
        wpi_inflation: snapshot(
            wpi,
            |p| p.wpi_inflation,
            |p| format!("{} {}", p.month, p.year),
        ),
        iip_growth: snapshot(iip, |p| p.growth_rate, |p| format!("{} {}", p.month, p.year)),
        generated_at: Utc::now(),
    }
}

pub(crate) async fn fetch(
    client: &dyn ToolClient,
    cache: &ResultCache,
    query: &QueryConfig,
) -> Result<SummarySnapshot, FetchError> {
    if let Some(CachedSeries::Summary(snapshot)) = cache.get(CACHE_KEY) {
        return Ok(snapshot);
    }

    // Four independent fetch pipelines in flight at once; each still runs
    // its own session's steps strictly in order. Any failure fails the
    // summary as a whole.
    let (gdp, cpi, wpi, iip) = tokio::try_join!(
        gdp::fetch(client, cache, query),
        cpi::fetch(client, cache, query),
        wpi::fetch(client, cache, query),
        iip::fetch(client, cache, query),
    )?;

    let snapshot = build_snapshot(&gdp, &cpi, &wpi, &iip);
    info!(%snapshot, "Summary snapshot assembled");

    cache.set(CACHE_KEY, CachedSeries::Summary(snapshot.clone()));
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_short_series_is_stable() {
        assert_eq!(compute_trend(&[]), Trend::Stable);
        assert_eq!(compute_trend(&[4.2]), Trend::Stable);
    }

    #[test]
    fn test_trend_worked_examples() {
        assert_eq!(compute_trend(&[4.00, 4.02]), Trend::Rising);
        assert_eq!(compute_trend(&[4.00, 4.005]), Trend::Stable);
        assert_eq!(compute_trend(&[4.00, 3.98]), Trend::Falling);
    }

    #[test]
    fn test_trend_uses_last_two_points_only() {
        // Overall drift down, but the final step is inside the deadband.
        assert_eq!(compute_trend(&[5.0, 4.0, 4.005]), Trend::Stable);
        assert_eq!(compute_trend(&[1.0, 2.0, 1.5]), Trend::Falling);
    }

    fn cpi_point(month: &str, inflation: f64) -> CpiPoint {
        CpiPoint {
            month: month.to_string(),
            year: "2024".to_string(),
            cpi_general: 190.0,
            cpi_food: 0.0,
            cpi_fuel: 0.0,
            cpi_housing: 0.0,
            cpi_clothing: 0.0,
            inflation_rate: inflation,
        }
    }

    #[test]
    fn test_snapshot_takes_last_point() {
        let series = vec![cpi_point("Jan", 5.1), cpi_point("Feb", 4.8)];
        let snap = build_snapshot(&[], &series, &[], &[]);
        assert_eq!(snap.cpi_inflation.value, 4.8);
        assert_eq!(snap.cpi_inflation.period, "Feb 2024");
        assert_eq!(snap.cpi_inflation.trend, Trend::Falling);
    }

    #[test]
    fn test_snapshot_empty_series_unavailable() {
        let snap = build_snapshot(&[], &[], &[], &[]);
        assert_eq!(snap.gdp_growth.value, 0.0);
        assert_eq!(snap.gdp_growth.period, "N/A");
        assert_eq!(snap.gdp_growth.trend, Trend::Stable);
        assert_eq!(snap.iip_growth.period, "N/A");
    }

    #[test]
    fn test_snapshot_gdp_period_label() {
        let gdp = vec![GdpPoint {
            quarter: "Q2".to_string(),
            year: "2024-25".to_string(),
            gdp_growth: 6.1,
            gva_agriculture: 2.0,
            gva_industry: 5.0,
            gva_services: 7.0,
            gdp_nominal: 76.5,
        }];
        let snap = build_snapshot(&gdp, &[], &[], &[]);
        assert_eq!(snap.gdp_growth.period, "Q2 FY 2024-25");
        assert_eq!(snap.gdp_growth.value, 6.1);
    }
}
