//! Quarter-hour time grid and instant-to-slot mapping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub const QUARTERS_OF_HOUR: usize = 4;
pub const HOURS_OF_DAY: usize = 24;
pub const QUARTERS_OF_DAY: usize = HOURS_OF_DAY * QUARTERS_OF_HOUR;
pub const DAYS_OF_WEEK: usize = 7;
pub const WEEKDAYS: usize = 5;
pub const QUARTERS_OF_WEEK: usize = DAYS_OF_WEEK * QUARTERS_OF_DAY;

/// Index into a flat `day * 96 + quarter` array.
#[inline]
pub fn flat_index(day: usize, quarter: usize) -> usize {
    debug_assert!(quarter < QUARTERS_OF_DAY);
    day * QUARTERS_OF_DAY + quarter
}

/// Granularity at which the host activates the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tick {
    #[default]
    Hour,
    Quarter,
}

impl Tick {
    /// Quarters covered by one tick.
    pub fn quarters(self) -> usize {
        match self {
            Tick::Hour => QUARTERS_OF_HOUR,
            Tick::Quarter => 1,
        }
    }

    /// Ticks per simulated day.
    pub fn per_day(self) -> usize {
        QUARTERS_OF_DAY / self.quarters()
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(15 * self.quarters() as i64)
    }
}

/// A (day-of-run, quarter-of-day) position on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub day: usize,
    pub quarter: usize,
}

impl Slot {
    pub fn new(day: usize, quarter: usize) -> Self {
        Self { day, quarter }
    }

    pub fn hour(&self) -> usize {
        self.quarter / QUARTERS_OF_HOUR
    }

    /// Week of the run this slot belongs to.
    pub fn week(&self) -> usize {
        self.day / DAYS_OF_WEEK
    }

    /// Position of the day inside its week, `0..7`.
    pub fn day_of_week(&self) -> usize {
        self.day % DAYS_OF_WEEK
    }

    /// Weekday number `1..=7` (Monday = 1, Sunday = 7). Day 0 of the run is a Monday.
    pub fn weekday_number(&self) -> usize {
        self.day_of_week() + 1
    }
}

/// Maps wall-clock instants onto the simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    horizon_days: usize,
}

impl TimeGrid {
    /// Creates a grid anchored at `start` covering `horizon_days` days.
    pub fn new(start: DateTime<Utc>, horizon_days: usize) -> Self {
        Self {
            start,
            horizon_days,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// Number of quarters in the whole horizon.
    pub fn horizon_quarters(&self) -> usize {
        self.horizon_days * QUARTERS_OF_DAY
    }

    /// Slot containing `now`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::BeforeStart` if `now` precedes the grid start.
    pub fn slot_at(&self, now: DateTime<Utc>) -> EngineResult<Slot> {
        let elapsed = now - self.start;
        if elapsed < Duration::zero() {
            return Err(EngineError::BeforeStart(now));
        }
        let quarters = (elapsed.num_minutes() / 15) as usize;
        Ok(Slot::new(
            quarters / QUARTERS_OF_DAY,
            quarters % QUARTERS_OF_DAY,
        ))
    }

    /// Instant at which `slot` begins.
    pub fn instant(&self, slot: Slot) -> DateTime<Utc> {
        self.start + Duration::minutes((flat_index(slot.day, slot.quarter) * 15) as i64)
    }

    /// Instant at which `day` begins.
    pub fn day_start(&self, day: usize) -> DateTime<Utc> {
        self.instant(Slot::new(day, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grid() -> TimeGrid {
        TimeGrid::new(Utc.with_ymd_and_hms(2011, 1, 10, 0, 0, 0).unwrap(), 77)
    }

    #[test]
    fn slot_at_start_is_origin() {
        let g = grid();
        assert_eq!(g.slot_at(g.start()).unwrap(), Slot::new(0, 0));
    }

    #[test]
    fn slot_at_maps_hours_and_days() {
        let g = grid();
        let now = g.start() + Duration::hours(18);
        let slot = g.slot_at(now).unwrap();
        assert_eq!(slot, Slot::new(0, 72));
        assert_eq!(slot.hour(), 18);

        let later = g.start() + Duration::days(8) + Duration::minutes(45);
        let slot = g.slot_at(later).unwrap();
        assert_eq!(slot, Slot::new(8, 3));
        assert_eq!(slot.week(), 1);
        assert_eq!(slot.day_of_week(), 1);
        assert_eq!(slot.weekday_number(), 2);
    }

    #[test]
    fn slot_before_start_is_rejected() {
        let g = grid();
        let err = g.slot_at(g.start() - Duration::minutes(1));
        assert!(matches!(err, Err(EngineError::BeforeStart(_))));
    }

    #[test]
    fn tick_lengths() {
        assert_eq!(Tick::Hour.per_day(), 24);
        assert_eq!(Tick::Quarter.per_day(), 96);
        assert_eq!(Tick::Hour.duration(), Duration::hours(1));
    }

    #[test]
    fn instant_inverts_slot_at() {
        let g = grid();
        let slot = Slot::new(3, 41);
        assert_eq!(g.slot_at(g.instant(slot)).unwrap(), slot);
    }
}
