//! Refrigerators and freezers: continuous duty cycle, legal in every quarter.

use crate::rng::RandomStream;
use crate::time::QUARTERS_OF_DAY;

use super::DayInput;
use super::types::WeekProfile;

/// Hours per shifting period of a duty-cycle appliance.
pub const SHIFTING_INTERVAL: usize = 2;

/// Runs one quarter per cycle at an offset drawn once for the day.
pub(crate) fn duty_cycle(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    cycle: usize,
    rng: &mut RandomStream,
) {
    let cycle = cycle.max(1);
    let offset = rng.below(cycle);
    for q in (offset..QUARTERS_OF_DAY).step_by(cycle) {
        week.set(input.weekday, q, input.power);
    }
}

pub(crate) fn always_possible() -> Vec<bool> {
    vec![true; QUARTERS_OF_DAY]
}
