//! Post-hoc run report computed from village steps.

use std::fmt;

use serde::Serialize;

use crate::village::VillageStep;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from the village steps so the report always agrees with
/// the exported telemetry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Total non-controllable energy (kWh).
    pub base_kwh: f64,
    /// Total controllable energy (kWh).
    pub controllable_kwh: f64,
    /// Total usage charge billed.
    pub total_charge: f64,
    /// Highest demand of a single timeslot across all villages (kWh).
    pub peak_tick_kwh: f64,
    /// Controllable share of the total energy, in percent.
    pub controllable_pct: f64,
    /// Tariff transactions pushed to the ledger.
    pub transaction_count: usize,
    /// Household failures isolated during the run.
    pub failure_count: usize,
}

impl RunReport {
    /// Computes the report from all village steps.
    ///
    /// # Arguments
    ///
    /// * `steps` - Village steps in activation order
    /// * `transaction_count` - Number of transactions in the ledger
    pub fn from_steps(steps: &[VillageStep], transaction_count: usize) -> Self {
        if steps.is_empty() {
            return Self {
                transaction_count,
                ..Self::default()
            };
        }

        let mut base = 0.0;
        let mut controllable = 0.0;
        let mut charge = 0.0;
        let mut failures = 0;
        let mut peak: f64 = 0.0;
        let mut slot_total = 0.0;
        let mut slot = steps[0].timeslot;

        for s in steps {
            base += s.base_kwh;
            controllable += s.controllable_kwh;
            charge += s.charge;
            failures += s.failures;
            if s.timeslot != slot {
                peak = peak.max(slot_total);
                slot_total = 0.0;
                slot = s.timeslot;
            }
            slot_total += s.base_kwh + s.controllable_kwh;
        }
        peak = peak.max(slot_total);

        let total = base + controllable;
        Self {
            base_kwh: base,
            controllable_kwh: controllable,
            total_charge: charge,
            peak_tick_kwh: peak,
            controllable_pct: if total > 0.0 { 100.0 * controllable / total } else { 0.0 },
            transaction_count,
            failure_count: failures,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Report ---")?;
        writeln!(f, "Base energy:           {:.2} kWh", self.base_kwh)?;
        writeln!(
            f,
            "Controllable energy:   {:.2} kWh ({:.1}%)",
            self.controllable_kwh, self.controllable_pct
        )?;
        writeln!(f, "Total charge:          {:.2}", self.total_charge)?;
        writeln!(f, "Peak tick demand:      {:.2} kWh", self.peak_tick_kwh)?;
        writeln!(f, "Transactions:          {}", self.transaction_count)?;
        write!(f, "Household failures:    {}", self.failure_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn make_step(timeslot: usize, base: f64, controllable: f64) -> VillageStep {
        VillageStep {
            village: "v".to_string(),
            timeslot,
            at: Utc.with_ymd_and_hms(2011, 1, 3, 0, 0, 0).unwrap(),
            day: 0,
            quarter: 0,
            temperature: None,
            base_kwh: base,
            controllable_kwh: controllable,
            charge: (base + controllable) * 0.1,
            groups: Vec::new(),
            failures: 0,
        }
    }

    #[test]
    fn totals_and_share() {
        let steps = vec![make_step(0, 3.0, 1.0), make_step(1, 3.0, 1.0)];
        let report = RunReport::from_steps(&steps, 8);
        assert_relative_eq!(report.base_kwh, 6.0);
        assert_relative_eq!(report.controllable_pct, 25.0);
        assert_relative_eq!(report.total_charge, 0.8);
        assert_eq!(report.transaction_count, 8);
    }

    #[test]
    fn peak_sums_villages_of_one_timeslot() {
        let steps = vec![
            make_step(0, 2.0, 0.0),
            make_step(0, 2.0, 1.0),
            make_step(1, 4.0, 0.0),
        ];
        let report = RunReport::from_steps(&steps, 0);
        assert_relative_eq!(report.peak_tick_kwh, 5.0);
    }

    #[test]
    fn empty_steps() {
        let report = RunReport::from_steps(&[], 0);
        assert_eq!(report.base_kwh, 0.0);
        assert_eq!(report.failure_count, 0);
    }
}
