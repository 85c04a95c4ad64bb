use chrono::{DateTime, Utc};

use crate::time::Tick;

/// A simulation clock that hands out timeslots over a fixed horizon.
///
/// Each tick yields the timeslot index and the instant it starts at, which
/// is exactly what the host passes to `Village::activate`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use household_sim::sim::clock::Clock;
/// use household_sim::time::Tick;
///
/// let start = Utc.with_ymd_and_hms(2011, 1, 3, 0, 0, 0).unwrap();
/// let mut clock = Clock::new(start, Tick::Hour, 3);
/// let mut slots = Vec::new();
///
/// clock.run(|slot, _| slots.push(slot));
/// assert_eq!(slots, vec![0, 1, 2]);
/// ```
pub struct Clock {
    start: DateTime<Utc>,
    tick: Tick,
    /// Next timeslot to hand out
    current: usize,
    /// Total timeslots in the run
    total: usize,
}

impl Clock {
    /// Creates a clock.
    ///
    /// # Arguments
    ///
    /// * `start` - Instant of timeslot 0
    /// * `tick` - Length of one timeslot
    /// * `total` - Number of timeslots the clock will run
    pub fn new(start: DateTime<Utc>, tick: Tick, total: usize) -> Self {
        Self {
            start,
            tick,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one timeslot.
    ///
    /// # Returns
    ///
    /// * `Some((slot, instant))` - The timeslot before advancing and its start
    /// * `None` - If the clock has run out of timeslots
    pub fn tick(&mut self) -> Option<(usize, DateTime<Utc>)> {
        if self.current < self.total {
            let slot = self.current;
            self.current += 1;
            Some((slot, self.instant(slot)))
        } else {
            None
        }
    }

    /// Start instant of `slot`.
    pub fn instant(&self, slot: usize) -> DateTime<Utc> {
        self.start + self.tick.duration() * slot as i32
    }

    /// Runs a function for each remaining timeslot.
    ///
    /// # Arguments
    ///
    /// * `f` - Called with the timeslot index and its start instant
    pub fn run(&mut self, mut f: impl FnMut(usize, DateTime<Utc>)) {
        while let Some((slot, at)) = self.tick() {
            f(slot, at);
        }
    }
}
