//! Core run types: timing configuration and per-day summaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::time::{Tick, TimeGrid};
use crate::village::VillageStep;

/// Centralized run configuration.
///
/// The grid covers bootstrap and competition days; the engine activates the
/// villages on every tick of that horizon.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use household_sim::sim::types::SimConfig;
/// use household_sim::time::Tick;
///
/// let start = Utc.with_ymd_and_hms(2011, 1, 3, 0, 0, 0).unwrap();
/// let cfg = SimConfig::new(start, 1, 2, Tick::Hour, 42);
/// assert_eq!(cfg.horizon_days(), 3);
/// assert_eq!(cfg.total_steps(), 72);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SimConfig {
    /// Instant of timeslot 0.
    pub start: DateTime<Utc>,
    /// Days simulated before the competition starts.
    pub days_of_bootstrap: usize,
    /// Competition days.
    pub days_of_competition: usize,
    /// Activation granularity.
    pub tick: Tick,
    /// Master random seed.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a run configuration.
    ///
    /// # Arguments
    ///
    /// * `start` - Instant of the first activation
    /// * `days_of_bootstrap` - Bootstrap days
    /// * `days_of_competition` - Competition days
    /// * `tick` - Activation granularity
    /// * `seed` - Master random seed
    pub fn new(
        start: DateTime<Utc>,
        days_of_bootstrap: usize,
        days_of_competition: usize,
        tick: Tick,
        seed: u64,
    ) -> Self {
        Self {
            start,
            days_of_bootstrap,
            days_of_competition,
            tick,
            seed,
        }
    }

    pub fn horizon_days(&self) -> usize {
        self.days_of_bootstrap + self.days_of_competition
    }

    /// Total number of activations across the horizon.
    pub fn total_steps(&self) -> usize {
        self.tick.per_day() * self.horizon_days()
    }

    /// Time grid shared by every village of the run.
    pub fn grid(&self) -> TimeGrid {
        TimeGrid::new(self.start, self.horizon_days())
    }
}

/// Aggregate demand and charge of all villages over one day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DaySummary {
    pub day: usize,
    pub base_kwh: f64,
    pub controllable_kwh: f64,
    pub charge: f64,
    /// Highest single-tick demand across all villages (kWh).
    pub peak_tick_kwh: f64,
    pub failures: usize,
}

impl DaySummary {
    /// Folds village steps into one summary per day, in day order.
    pub fn from_steps(steps: &[VillageStep]) -> Vec<DaySummary> {
        let mut days: Vec<DaySummary> = Vec::new();
        let mut tick_totals: Vec<(usize, usize, f64)> = Vec::new();
        for step in steps {
            if days.last().is_none_or(|d| d.day != step.day) {
                days.push(DaySummary {
                    day: step.day,
                    ..DaySummary::default()
                });
            }
            if let Some(d) = days.last_mut() {
                d.base_kwh += step.base_kwh;
                d.controllable_kwh += step.controllable_kwh;
                d.charge += step.charge;
                d.failures += step.failures;
            }
            let total = step.base_kwh + step.controllable_kwh;
            match tick_totals.last_mut() {
                Some((day, slot, sum)) if *day == step.day && *slot == step.timeslot => {
                    *sum += total
                }
                _ => tick_totals.push((step.day, step.timeslot, total)),
            }
        }
        for (day, _, total) in tick_totals {
            if let Some(d) = days.iter_mut().find(|d| d.day == day) {
                d.peak_tick_kwh = d.peak_tick_kwh.max(total);
            }
        }
        days
    }
}

impl fmt::Display for DaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "day={:>3} | base={:>9.2} kWh  controllable={:>8.2} kWh | \
             charge={:>8.2} | peak={:>7.2} kWh | failures={}",
            self.day,
            self.base_kwh,
            self.controllable_kwh,
            self.charge,
            self.peak_tick_kwh,
            self.failures,
        )
    }
}
