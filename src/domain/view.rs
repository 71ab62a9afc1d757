// View model - per-cycle derived state for rendering
use std::collections::BTreeSet;

use chrono::DateTime;
use chrono_tz::Tz;

use super::cell_log::{CellLogRow, PackStatus};

/// A telemetry row with its timestamp normalized to the display timezone.
#[derive(Debug, Clone)]
pub struct LocalRow {
    pub ts: DateTime<Tz>,
    pub device_id: String,
    pub pack_v: Option<f64>,
    pub cells: [Option<f64>; 4],
    pub spread_mv: Option<f64>,
    pub status: Option<PackStatus>,
}

impl LocalRow {
    fn localize(row: CellLogRow, tz: Tz) -> Self {
        Self {
            ts: row.ts.with_timezone(&tz),
            device_id: row.device_id,
            pack_v: row.pack_v,
            cells: [row.c1, row.c2, row.c3, row.c4],
            spread_mv: row.spread_mv,
            status: row.status,
        }
    }

    /// Per-cell voltages with absent cells read as 0.0.
    pub fn cell_voltages(&self) -> [f64; 4] {
        self.cells.map(|c| c.unwrap_or(0.0))
    }
}

/// Summary metrics computed from the chronologically last filtered row.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestMetrics {
    pub pack_v: Option<f64>,
    pub spread_mv: i64,
    pub cell_min: f64,
    pub cell_max: f64,
}

impl LatestMetrics {
    fn from_row(row: &LocalRow) -> Self {
        let cells = row.cell_voltages();
        let cell_min = cells.iter().copied().fold(f64::INFINITY, f64::min);
        let cell_max = cells.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            pack_v: row.pack_v,
            spread_mv: row.spread_mv.map(|s| s as i64).unwrap_or(0),
            cell_min,
            cell_max,
        }
    }

    pub fn pack_v_label(&self) -> String {
        match self.pack_v {
            Some(v) => format!("{v:.3} V"),
            None => "N/A".to_string(),
        }
    }

    pub fn spread_label(&self) -> String {
        format!("{}", self.spread_mv)
    }

    pub fn cell_min_label(&self) -> String {
        format!("{:.3}", self.cell_min)
    }

    pub fn cell_max_label(&self) -> String {
        format!("{:.3}", self.cell_max)
    }
}

/// Everything one render cycle needs. Discarded and rebuilt every refresh.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Normalized, ascending-sorted, status-filtered rows.
    pub rows: Vec<LocalRow>,
    pub latest: Option<LatestMetrics>,
    pub timezone: Tz,
    /// Set by the service when the fetch failed; rows are then empty.
    pub fetch_error: Option<String>,
}

impl ViewState {
    pub fn empty(tz: Tz) -> Self {
        Self {
            rows: Vec::new(),
            latest: None,
            timezone: tz,
            fetch_error: None,
        }
    }

    /// Normalize to `tz`, re-sort ascending (the store returns descending),
    /// apply the status filter, and derive latest-row metrics.
    ///
    /// An empty `filter` means no filtering, not "exclude all".
    pub fn build(rows: Vec<CellLogRow>, tz: Tz, filter: &BTreeSet<PackStatus>) -> Self {
        let mut local: Vec<LocalRow> = rows
            .into_iter()
            .map(|row| LocalRow::localize(row, tz))
            .collect();
        local.sort_by_key(|row| row.ts);

        if !filter.is_empty() {
            local.retain(|row| row.status.is_some_and(|s| filter.contains(&s)));
        }

        let latest = local.last().map(LatestMetrics::from_row);

        Self {
            rows: local,
            latest,
            timezone: tz,
            fetch_error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    // Chart series as (epoch seconds, value) pairs, skipping absent fields.

    pub fn pack_points(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| row.pack_v.map(|v| (row.ts.timestamp() as f64, v)))
            .collect()
    }

    pub fn cell_points(&self, cell: usize) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| row.cells[cell].map(|v| (row.ts.timestamp() as f64, v)))
            .collect()
    }

    pub fn spread_points(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| row.spread_mv.map(|v| (row.ts.timestamp() as f64, v)))
            .collect()
    }

    pub fn has_spread(&self) -> bool {
        self.rows.iter().any(|row| row.spread_mv.is_some())
    }

    /// Most recent `n` rows, reverse-chronological, for the table view.
    pub fn recent_rows(&self, n: usize) -> Vec<&LocalRow> {
        self.rows.iter().rev().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    use super::*;

    fn row(secs: i64, status: Option<PackStatus>) -> CellLogRow {
        CellLogRow {
            ts: Utc.timestamp_opt(1_754_000_000 + secs, 0).unwrap(),
            device_id: "pack-a".to_string(),
            pack_v: Some(13.20),
            c1: Some(3.30),
            c2: Some(3.29),
            c3: Some(3.31),
            c4: Some(3.30),
            spread_mv: Some(20.0),
            status,
        }
    }

    fn utc() -> Tz {
        "UTC".parse().unwrap()
    }

    #[test]
    fn test_descending_input_sorted_ascending() {
        let rows = vec![
            row(30, Some(PackStatus::Green)),
            row(20, Some(PackStatus::Green)),
            row(10, Some(PackStatus::Green)),
        ];
        let view = ViewState::build(rows, utc(), &BTreeSet::new());
        let stamps: Vec<i64> = view.rows.iter().map(|r| r.ts.timestamp()).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
        assert_eq!(view.rows.len(), 3);
    }

    #[test]
    fn test_empty_filter_returns_all_rows() {
        let rows = vec![
            row(1, Some(PackStatus::Green)),
            row(2, Some(PackStatus::Yellow)),
            row(3, Some(PackStatus::Red)),
        ];
        let view = ViewState::build(rows, utc(), &BTreeSet::new());
        assert_eq!(view.row_count(), 3);
    }

    #[test]
    fn test_status_filter_retains_members_only() {
        let rows = vec![
            row(1, Some(PackStatus::Green)),
            row(2, Some(PackStatus::Red)),
            row(3, Some(PackStatus::Yellow)),
            row(4, Some(PackStatus::Red)),
            row(5, None),
        ];
        let filter: BTreeSet<PackStatus> = [PackStatus::Red].into_iter().collect();
        let view = ViewState::build(rows, utc(), &filter);
        assert_eq!(view.row_count(), 2);
        assert!(
            view.rows
                .iter()
                .all(|r| r.status == Some(PackStatus::Red))
        );
    }

    #[test]
    fn test_empty_input_yields_empty_state_without_panicking() {
        let view = ViewState::build(Vec::new(), utc(), &BTreeSet::new());
        assert!(view.is_empty());
        assert!(view.latest.is_none());
        assert!(view.pack_points().is_empty());
        assert!(view.recent_rows(200).is_empty());
        assert!(!view.has_spread());
    }

    #[test]
    fn test_filter_excluding_everything_is_safe() {
        let rows = vec![row(1, Some(PackStatus::Green))];
        let filter: BTreeSet<PackStatus> = [PackStatus::Red].into_iter().collect();
        let view = ViewState::build(rows, utc(), &filter);
        assert!(view.is_empty());
        assert!(view.latest.is_none());
    }

    #[test]
    fn test_latest_metrics_scenario() {
        let rows = vec![row(0, Some(PackStatus::Green))];
        let view = ViewState::build(rows, utc(), &BTreeSet::new());
        let latest = view.latest.as_ref().expect("one row yields metrics");
        assert_eq!(latest.pack_v_label(), "13.200 V");
        assert_eq!(latest.spread_label(), "20");
        assert_eq!(latest.cell_min_label(), "3.290");
        assert_eq!(latest.cell_max_label(), "3.310");
        assert_eq!(view.row_count(), 1);
    }

    #[test]
    fn test_absent_fields_read_as_zero_or_na() {
        let mut bare = row(0, Some(PackStatus::Green));
        bare.pack_v = None;
        bare.spread_mv = None;
        bare.c1 = None;
        bare.c2 = None;
        bare.c3 = None;
        bare.c4 = None;
        let view = ViewState::build(vec![bare], utc(), &BTreeSet::new());
        let latest = view.latest.as_ref().unwrap();
        assert_eq!(latest.pack_v_label(), "N/A");
        assert_eq!(latest.spread_mv, 0);
        assert_eq!(latest.cell_min, 0.0);
        assert_eq!(latest.cell_max, 0.0);
        assert!(view.pack_points().is_empty());
        assert!(!view.has_spread());
    }

    #[test]
    fn test_timezone_conversion_preserves_instant() {
        use chrono::Offset;

        let tz: Tz = "Asia/Jakarta".parse().unwrap();
        let rows = vec![row(0, Some(PackStatus::Green))];
        let view = ViewState::build(rows, tz, &BTreeSet::new());
        // Same instant, different wall clock (+7, no DST).
        assert_eq!(view.rows[0].ts.timestamp(), 1_754_000_000);
        assert_eq!(
            view.rows[0].ts.offset().fix().local_minus_utc(),
            7 * 3600
        );
    }

    #[test]
    fn test_recent_rows_reverse_chronological_capped() {
        let rows: Vec<CellLogRow> = (0..300)
            .map(|i| row(i, Some(PackStatus::Green)))
            .collect();
        let view = ViewState::build(rows, utc(), &BTreeSet::new());
        let recent = view.recent_rows(200);
        assert_eq!(recent.len(), 200);
        assert!(recent[0].ts > recent[1].ts);
        assert_eq!(recent[0].ts.timestamp(), 1_754_000_000 + 299);
    }
}
