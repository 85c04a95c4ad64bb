//! Appliances that run a bounded number of cycles inside a legality window.

use crate::error::EngineError;
use crate::rng::RandomStream;
use crate::time::{DAYS_OF_WEEK, QUARTERS_OF_DAY, QUARTERS_OF_HOUR};

use super::DayInput;
use super::types::{
    DRYER_SECOND_PHASE, DRYER_THIRD_PHASE, DRYER_THIRD_PHASE_LOAD, Phases, WeekProfile,
    phase_length, phase_loads,
};

/// Unshifted start quarter of the storage heater (05:00).
pub const STORAGE_HEATER_START: usize = 20;
/// The storage heater must finish charging before this hour.
pub const STORAGE_HEATER_SHIFTING_END: usize = 17;

/// Picks `times` distinct days of the week (0-based), sorted.
pub(crate) fn pick_days(times: usize, rng: &mut RandomStream) -> Vec<usize> {
    let times = times.min(DAYS_OF_WEEK);
    let mut pool: Vec<usize> = (0..DAYS_OF_WEEK).collect();
    let mut days = Vec::with_capacity(times);
    for _ in 0..times {
        days.push(pool.swap_remove(rng.below(pool.len())));
    }
    days.sort_unstable();
    days
}

/// Whether a cycle of `len` quarters may start at `start`.
///
/// Occupancy-dependent appliances need someone on the premises for the whole
/// cycle; the others only need someone to switch them on.
fn legal_start(input: &DayInput<'_>, start: usize, len: usize, whole_cycle: bool) -> bool {
    if start + len > QUARTERS_OF_DAY {
        return false;
    }
    if whole_cycle {
        (start..start + len).all(|q| !input.occupancy.is_empty(input.day, q))
    } else {
        !input.occupancy.is_empty(input.day, start)
    }
}

/// Places one cycle at a random legal start. Returns the chosen start.
pub(crate) fn place_cycle(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    phases: Phases,
    whole_cycle: bool,
    rng: &mut RandomStream,
) -> Option<usize> {
    let len = phase_length(phases);
    let starts: Vec<usize> = (0..QUARTERS_OF_DAY)
        .filter(|&q| legal_start(input, q, len, whole_cycle))
        .filter(|&q| (q..q + len).all(|i| !week.operation(input.weekday, i)))
        .collect();
    if starts.is_empty() {
        return None;
    }
    let start = starts[rng.below(starts.len())];
    for (offset, load) in phase_loads(input.power, phases).into_iter().enumerate() {
        week.set(input.weekday, start + offset, load);
    }
    Some(start)
}

/// Quarters in which a cycle of `phases` could start for the day.
pub(crate) fn cycle_possibility(
    input: &DayInput<'_>,
    phases: Phases,
    whole_cycle: bool,
) -> Vec<bool> {
    let len = phase_length(phases);
    (0..QUARTERS_OF_DAY)
        .map(|q| legal_start(input, q, len, whole_cycle))
        .collect()
}

/// Storage heater: charges at a fixed early hour on most days.
pub(crate) fn storage_heater(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    phases: Phases,
    probability: f64,
    rng: &mut RandomStream,
) {
    if !rng.coin(probability) {
        return;
    }
    for (offset, load) in phase_loads(input.power, phases).into_iter().enumerate() {
        week.set(input.weekday, STORAGE_HEATER_START + offset, load);
    }
}

/// Storage heater legality: the whole charge must end by the shifting deadline.
pub(crate) fn storage_heater_possibility(phases: Phases) -> Vec<bool> {
    let len = phase_length(phases);
    let deadline = STORAGE_HEATER_SHIFTING_END * QUARTERS_OF_HOUR;
    (0..QUARTERS_OF_DAY).map(|q| q + len <= deadline).collect()
}

/// Dryer: starts at the first occupied quarter once the washing machine is done.
///
/// Three quarters at full power are followed by a cool-down that loses
/// a fixed amount each quarter. Quarters whose load would drop to zero are
/// left off.
pub(crate) fn dryer(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    washer: &WeekProfile,
) -> Option<usize> {
    let end = washer.end_of_operation(input.weekday)?;
    let start = (end..QUARTERS_OF_DAY - 1).find(|&q| !input.occupancy.is_empty(input.day, q))?;
    let mut load = input.power;
    for q in start..(start + DRYER_THIRD_PHASE).min(QUARTERS_OF_DAY) {
        if q >= start + DRYER_SECOND_PHASE {
            load -= DRYER_THIRD_PHASE_LOAD;
        }
        if load <= 0 {
            break;
        }
        week.set(input.weekday, q, load);
    }
    Some(start)
}

/// Days on which the dryer follows the washing machine: the first `times` washing days.
pub(crate) fn dryer_days(washer: &WeekProfile, times: usize) -> Vec<usize> {
    (0..DAYS_OF_WEEK)
        .filter(|&d| washer.runs_on(d))
        .take(times)
        .collect()
}

/// A dryer without a paired washing machine is a construction bug.
pub(crate) fn missing_washer(name: &str) -> EngineError {
    EngineError::StateInconsistency(format!("{name} has no paired washing machine"))
}

/// Returns the occupied quarters of the day, used as the dryer's legality.
pub(crate) fn presence_possibility(input: &DayInput<'_>) -> Vec<bool> {
    (0..QUARTERS_OF_DAY)
        .map(|q| !input.occupancy.is_empty(input.day, q))
        .collect()
}
