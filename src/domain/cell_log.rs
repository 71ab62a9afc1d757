// Cell log domain models
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Health classification assigned upstream by the uploading device.
/// Values outside the known set deserialize as `Unknown` rather than
/// failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackStatus {
    Green,
    Yellow,
    Red,
    #[serde(other)]
    Unknown,
}

impl PackStatus {
    /// The statuses an operator can filter on, in display order.
    pub fn selectable() -> [PackStatus; 3] {
        [PackStatus::Green, PackStatus::Yellow, PackStatus::Red]
    }

    pub fn label(&self) -> &'static str {
        match self {
            PackStatus::Green => "green",
            PackStatus::Yellow => "yellow",
            PackStatus::Red => "red",
            PackStatus::Unknown => "unknown",
        }
    }
}

/// One telemetry sample as stored in the remote `cell_logs` table.
///
/// Every numeric column is optional: the uploading firmware has shipped
/// rows with missing fields and the dashboard tolerates them instead of
/// rejecting the fetch. Extra fields in the payload are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CellLogRow {
    pub ts: DateTime<Utc>,
    pub device_id: String,
    #[serde(default)]
    pub pack_v: Option<f64>,
    #[serde(default)]
    pub c1: Option<f64>,
    #[serde(default)]
    pub c2: Option<f64>,
    #[serde(default)]
    pub c3: Option<f64>,
    #[serde(default)]
    pub c4: Option<f64>,
    #[serde(default)]
    pub spread_mv: Option<f64>,
    #[serde(default)]
    pub status: Option<PackStatus>,
}

impl CellLogRow {
    /// Per-cell voltages with absent cells read as 0.0.
    pub fn cell_voltages(&self) -> [f64; 4] {
        [
            self.c1.unwrap_or(0.0),
            self.c2.unwrap_or(0.0),
            self.c3.unwrap_or(0.0),
            self.c4.unwrap_or(0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_row() {
        let json = r#"{
            "ts": "2025-08-01T12:00:00Z",
            "device_id": "pack-4s2p-reza-s2mini",
            "pack_v": 13.2,
            "c1": 3.30, "c2": 3.29, "c3": 3.31, "c4": 3.30,
            "spread_mv": 20,
            "status": "green"
        }"#;
        let row: CellLogRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.device_id, "pack-4s2p-reza-s2mini");
        assert_eq!(row.pack_v, Some(13.2));
        assert_eq!(row.spread_mv, Some(20.0));
        assert_eq!(row.status, Some(PackStatus::Green));
    }

    #[test]
    fn test_deserialize_tolerates_missing_and_extra_fields() {
        let json = r#"{
            "ts": "2025-08-01T12:00:00Z",
            "device_id": "pack-a",
            "firmware": "v2.1"
        }"#;
        let row: CellLogRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.pack_v, None);
        assert_eq!(row.status, None);
        assert_eq!(row.cell_voltages(), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_status_does_not_fail_row() {
        let json = r#"{
            "ts": "2025-08-01T12:00:00Z",
            "device_id": "pack-a",
            "status": "purple"
        }"#;
        let row: CellLogRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.status, Some(PackStatus::Unknown));
    }
}
