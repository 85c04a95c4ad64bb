//! API response and query types.
//!
//! Field names follow the CSV export columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sim::kpi::RunReport;
use crate::sim::types::SimConfig;
use crate::village::VillageStep;

/// Combined state response: config, run report, and the latest timeslot.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub config: SimConfig,
    pub report: RunReport,
    /// Records of the last activated timeslot, one per village.
    pub latest: Vec<TelemetryRecord>,
}

/// Single per-tick village record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub timeslot: usize,
    pub at: DateTime<Utc>,
    pub village: String,
    pub day: usize,
    pub quarter: usize,
    pub temperature: Option<f64>,
    pub base_kwh: f64,
    pub controllable_kwh: f64,
    pub charge: f64,
    pub failures: usize,
}

impl From<&VillageStep> for TelemetryRecord {
    fn from(s: &VillageStep) -> Self {
        Self {
            timeslot: s.timeslot,
            at: s.at,
            village: s.village.clone(),
            day: s.day,
            quarter: s.quarter,
            temperature: s.temperature,
            base_kwh: s.base_kwh,
            controllable_kwh: s.controllable_kwh,
            charge: s.charge,
            failures: s.failures,
        }
    }
}

/// Optional timeslot range for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// First timeslot (inclusive).
    pub from: Option<usize>,
    /// Last timeslot (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn telemetry_record_copies_step_fields() {
        let step = VillageStep {
            village: "Village 2".to_string(),
            timeslot: 5,
            at: Utc.with_ymd_and_hms(2011, 1, 3, 5, 0, 0).unwrap(),
            day: 0,
            quarter: 20,
            temperature: Some(3.5),
            base_kwh: 2.25,
            controllable_kwh: 0.75,
            charge: 0.3,
            groups: Vec::new(),
            failures: 1,
        };
        let record = TelemetryRecord::from(&step);
        assert_eq!(record.timeslot, 5);
        assert_eq!(record.village, "Village 2");
        assert_eq!(record.quarter, 20);
        assert_eq!(record.temperature, Some(3.5));
        assert_eq!(record.controllable_kwh, 0.75);
        assert_eq!(record.failures, 1);
    }
}
