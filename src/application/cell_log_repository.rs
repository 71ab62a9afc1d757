// Repository trait for cell log access
use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};

use crate::domain::cell_log::CellLogRow;

/// Parameters for one range read against the store. Built per fetch,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellLogQuery {
    pub device_id: String,
    /// Trailing window in days (UI-enforced 1-30).
    pub lookback_days: u32,
    /// Row cap (UI-enforced 500-20000).
    pub limit: u32,
}

impl CellLogQuery {
    pub fn new(device_id: impl Into<String>, lookback_days: u32, limit: u32) -> Self {
        Self {
            device_id: device_id.into(),
            lookback_days,
            limit,
        }
    }

    /// Lower timestamp bound: `now` truncated to whole seconds, minus the
    /// lookback window.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let end = now.with_nanosecond(0).unwrap_or(now);
        end - Duration::days(i64::from(self.lookback_days))
    }
}

#[async_trait]
pub trait CellLogRepository: Send + Sync {
    /// Fetch at most `query.limit` rows for the device, newest first,
    /// no older than the lookback window.
    async fn fetch_cell_logs(&self, query: &CellLogQuery) -> anyhow::Result<Vec<CellLogRow>>;

    /// Identifies the backing endpoint and credential so cached results
    /// are never shared across stores.
    fn cache_scope(&self) -> String;
}
