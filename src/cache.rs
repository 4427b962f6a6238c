//! In-memory result cache.
//!
//! Memoizes normalized series for a freshness window so repeated requests
//! don't replay the whole MCP call sequence. Entries are evicted lazily on
//! read; there is no background sweep. The clock is injectable so expiry
//! is deterministic under test.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::{CpiPoint, GdpPoint, IipPoint, SummarySnapshot, WpiPoint};

/// Default freshness window. MoSPI data updates monthly/quarterly, so six
/// hours keeps a dashboard current without hammering the endpoint.
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Time source for the cache. Production uses [`SystemClock`]; tests inject
/// a manually advanced clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A cached payload, one variant per consumer-facing result shape.
#[derive(Debug, Clone)]
pub enum CachedSeries {
    Gdp(Vec<GdpPoint>),
    Cpi(Vec<CpiPoint>),
    Wpi(Vec<WpiPoint>),
    Iip(Vec<IipPoint>),
    Summary(SummarySnapshot),
}

struct Entry {
    payload: CachedSeries,
    created_at: Instant,
    ttl: Duration,
}

/// TTL memoization store keyed by dataset name.
pub struct ResultCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Box<dyn Clock>,
    default_ttl: Duration,
}

impl ResultCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Box::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            default_ttl,
        }
    }

    /// Look up a fresh entry. A stale entry is removed and reported as a
    /// miss; an entry exactly at its TTL is still fresh.
    pub fn get(&self, key: &str) -> Option<CachedSeries> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get(key)?;
        if self.clock.now().duration_since(entry.created_at) > entry.ttl {
            debug!(key, "cache entry expired");
            entries.remove(key);
            return None;
        }
        debug!(key, "cache hit");
        Some(entry.payload.clone())
    }

    /// Store a payload under the default TTL, replacing any prior entry.
    pub fn set(&self, key: &str, payload: CachedSeries) {
        self.set_with_ttl(key, payload, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: &str, payload: CachedSeries, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                payload,
                created_at: self.clock.now(),
                ttl,
            },
        );
    }

    /// Drop every entry (forced refresh).
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
