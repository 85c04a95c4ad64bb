//! Appliances that follow behaviour only and are never moved in time.

use crate::rng::RandomStream;
use crate::time::QUARTERS_OF_DAY;

use super::DayInput;
use super::types::WeekProfile;

/// Quarter at which daylight peaks.
const MID_DAY_QUARTER: f64 = 48.0;
/// Spread of the daylight curve in quarters.
const LUMINANCE_DEVIATION: f64 = 16.0;
/// Scales the daylight curve so that it reaches ~1.0 at midday.
const LUMINANCE_FACTOR: f64 = 40.0;

/// Daylight level in `[0, 1]` for a quarter of the day.
pub fn luminance(quarter: usize) -> f64 {
    let z = (quarter as f64 - MID_DAY_QUARTER) / LUMINANCE_DEVIATION;
    let pdf = (-0.5 * z * z).exp() / (LUMINANCE_DEVIATION * (2.0 * std::f64::consts::PI).sqrt());
    (LUMINANCE_FACTOR * pdf).min(1.0)
}

/// Circulation pump: each occupied quarter runs when a draw beats `percentage`.
pub(crate) fn circulation_pump(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    percentage: f64,
    rng: &mut RandomStream,
) {
    for q in 0..QUARTERS_OF_DAY {
        if !input.occupancy.is_empty(input.day, q) && rng.uniform() > percentage {
            week.set(input.weekday, q, input.power);
        }
    }
}

/// Consumer electronics and ICT: used with probability `percentage` while someone is awake.
pub(crate) fn per_quarter_use(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    percentage: f64,
    rng: &mut RandomStream,
) {
    for q in 0..QUARTERS_OF_DAY {
        if input.occupancy.tenants(input.day, q) > 0 && rng.coin(percentage) {
            week.set(input.weekday, q, input.power);
        }
    }
}

/// Lights switch on when it is darker than a uniform draw; every tenant adds one lamp.
pub(crate) fn lights(week: &mut WeekProfile, input: &DayInput<'_>, rng: &mut RandomStream) {
    for q in 0..QUARTERS_OF_DAY {
        if input.occupancy.is_empty(input.day, q) {
            continue;
        }
        let tenants = input.occupancy.tenants(input.day, q);
        if luminance(q) < rng.uniform() && tenants > 0 {
            week.set(input.weekday, q, input.power * tenants as i64);
        }
    }
}

/// Quarters weighted by the number of tenants present, one entry per tenant.
fn tenant_weighted_quarters(input: &DayInput<'_>) -> Vec<usize> {
    (0..QUARTERS_OF_DAY)
        .flat_map(|q| std::iter::repeat_n(q, input.occupancy.tenants(input.day, q)))
        .collect()
}

/// Miscellaneous small appliances: `times` uses picked from tenant-weighted
/// quarters. A quarter picked twice carries twice the load.
pub(crate) fn others(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    times: usize,
    rng: &mut RandomStream,
) {
    let mut pool = tenant_weighted_quarters(input);
    for _ in 0..times {
        if pool.is_empty() {
            break;
        }
        let quarter = pool.swap_remove(rng.below(pool.len()));
        week.add(input.weekday, quarter, input.power);
    }
}

/// Instantaneous water heater: `times` distinct quarters with someone awake.
pub(crate) fn instant_heater(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    times: usize,
    rng: &mut RandomStream,
) {
    let mut pool: Vec<usize> = (0..QUARTERS_OF_DAY)
        .filter(|&q| input.occupancy.tenants(input.day, q) > 0)
        .collect();
    for _ in 0..times {
        if pool.is_empty() {
            break;
        }
        let quarter = pool.swap_remove(rng.below(pool.len()));
        week.set(input.weekday, quarter, input.power);
    }
}
