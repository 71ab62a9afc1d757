// Short-lived memo for remote query results
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::application::cell_log_repository::CellLogQuery;
use crate::domain::cell_log::CellLogRow;

/// Full parameter tuple for one fetch. Two dashboards pointed at
/// different stores (or credentials) never share entries because the
/// repository's scope is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: String,
    device_id: String,
    lookback_days: u32,
    limit: u32,
}

impl CacheKey {
    pub fn new(scope: String, query: &CellLogQuery) -> Self {
        Self {
            scope,
            device_id: query.device_id.clone(),
            lookback_days: query.lookback_days,
            limit: query.limit,
        }
    }
}

struct CacheEntry {
    rows: Vec<CellLogRow>,
    expires_at: Instant,
}

/// TTL-bounded memo for fetch results, so a refresh interval shorter
/// than the TTL does not issue redundant network calls. The data is
/// append-only upstream, so staleness within the TTL is benign.
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<CellLogRow>> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.rows.clone())
    }

    pub fn insert(&mut self, key: CacheKey, rows: Vec<CellLogRow>) {
        // Expired entries for other parameter sets accumulate only until
        // their key is reused or invalidated; the handful of control
        // combinations an operator can dial keeps this bounded.
        self.entries.insert(
            key,
            CacheEntry {
                rows,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::cell_log::PackStatus;

    fn sample_rows() -> Vec<CellLogRow> {
        vec![CellLogRow {
            ts: Utc.timestamp_opt(1_754_000_000, 0).unwrap(),
            device_id: "pack-a".to_string(),
            pack_v: Some(13.2),
            c1: Some(3.30),
            c2: Some(3.29),
            c3: Some(3.31),
            c4: Some(3.30),
            spread_mv: Some(20.0),
            status: Some(PackStatus::Green),
        }]
    }

    fn key(device: &str, days: u32, limit: u32) -> CacheKey {
        CacheKey::new(
            "https://example.supabase.co#anon".to_string(),
            &CellLogQuery::new(device, days, limit),
        )
    }

    #[test]
    fn test_hit_within_ttl() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(key("pack-a", 7, 5000), sample_rows());
        let hit = cache.get(&key("pack-a", 7, 5000));
        assert_eq!(hit.map(|rows| rows.len()), Some(1));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let mut cache = QueryCache::new(Duration::ZERO);
        cache.insert(key("pack-a", 7, 5000), sample_rows());
        assert!(cache.get(&key("pack-a", 7, 5000)).is_none());
    }

    #[test]
    fn test_keys_differ_by_any_parameter() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(key("pack-a", 7, 5000), sample_rows());
        assert!(cache.get(&key("pack-b", 7, 5000)).is_none());
        assert!(cache.get(&key("pack-a", 1, 5000)).is_none());
        assert!(cache.get(&key("pack-a", 7, 500)).is_none());
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(key("pack-a", 7, 5000), sample_rows());
        cache.invalidate(&key("pack-a", 7, 5000));
        assert!(cache.get(&key("pack-a", 7, 5000)).is_none());
    }
}
