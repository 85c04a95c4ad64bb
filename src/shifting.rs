//! Daily load shifting against a tariff's hourly price.
//!
//! Shifting works on hour buckets. A schedulable appliance's day is split into
//! runs of operation that do not share an hour; each run becomes a block of
//! hourly energy chunks starting at its first operating quarter, and is placed
//! at the start hour that minimises
//!
//!   cost(h) = sum_k unit_charge(h + k) * chunk_k
//!
//! among the hours where every chunk lands in a legal hour. Runs keep their
//! order and never overlap, so a dryer still follows its washing machine.
//!
//! Duty-cycle appliances are instead split into fixed periods, and each
//! period's energy is moved to its cheapest hour. Either way, only the timing
//! changes: the returned hourly array always sums to the day's energy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::rng::RandomStream;
use crate::tariff::Tariff;
use crate::time::{HOURS_OF_DAY, QUARTERS_OF_HOUR};

/// On an exact cost tie the incumbent is replaced when a uniform draw exceeds this.
pub const SAME: f64 = 0.6;

/// How a household group reacts to prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftingPolicy {
    /// Keeps the behavioural schedule.
    None,
    /// Any legal hour, chosen uniformly.
    Random,
    /// The earliest legal hour.
    Regular,
    /// The cheapest legal hour.
    Smart,
}

/// Unit usage charge of each hour of one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyPrices([f64; HOURS_OF_DAY]);

impl HourlyPrices {
    pub fn new(prices: [f64; HOURS_OF_DAY]) -> Self {
        Self(prices)
    }

    pub fn flat(price: f64) -> Self {
        Self([price; HOURS_OF_DAY])
    }

    /// Samples `tariff` for one unit of energy at the start of every hour of the day.
    pub fn from_tariff(tariff: &dyn Tariff, day_start: DateTime<Utc>) -> Self {
        let mut prices = [0.0; HOURS_OF_DAY];
        for (hour, price) in prices.iter_mut().enumerate() {
            *price = tariff.usage_charge(day_start + Duration::hours(hour as i64), 1.0, 0.0);
        }
        Self(prices)
    }

    pub fn get(&self, hour: usize) -> f64 {
        self.0[hour]
    }
}

/// Hour-level legality: an hour is legal if any of its quarters is.
pub fn shifting_window(possibility: &[bool]) -> [bool; HOURS_OF_DAY] {
    let mut window = [false; HOURS_OF_DAY];
    for (hour, slot) in window.iter_mut().enumerate() {
        let start = hour * QUARTERS_OF_HOUR;
        *slot = possibility
            .get(start..start + QUARTERS_OF_HOUR)
            .is_some_and(|q| q.iter().any(|&b| b));
    }
    window
}

/// Sum of quarter loads per hour, without moving anything.
pub fn unshifted(loads: &[i64]) -> [i64; HOURS_OF_DAY] {
    let mut out = [0; HOURS_OF_DAY];
    for (q, load) in loads.iter().enumerate().take(HOURS_OF_DAY * QUARTERS_OF_HOUR) {
        out[q / QUARTERS_OF_HOUR] += load;
    }
    out
}

/// Hourly chunks of the day's load, starting at its first active quarter.
///
/// Returns an empty block when nothing runs that day.
pub fn hourly_profile(loads: &[i64]) -> Vec<i64> {
    let Some(first) = loads.iter().position(|&l| l > 0) else {
        return Vec::new();
    };
    let last = loads.iter().rposition(|&l| l > 0).unwrap_or(first);
    loads[first..=last]
        .chunks(QUARTERS_OF_HOUR)
        .map(|c| c.iter().sum())
        .collect()
}

/// Keeps the cheapest candidate; exact ties are settled by a biased coin.
fn cheapest(
    candidates: impl Iterator<Item = (usize, f64)>,
    rng: &mut RandomStream,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (hour, cost) in candidates {
        best = match best {
            None => Some((hour, cost)),
            Some((_, min)) if cost < min => Some((hour, cost)),
            Some((_, min)) if cost == min && rng.uniform() > SAME => Some((hour, cost)),
            keep => keep,
        };
    }
    best.map(|(hour, _)| hour)
}

fn choose(
    candidates: &[usize],
    cost: impl Fn(usize) -> f64,
    policy: ShiftingPolicy,
    rng: &mut RandomStream,
) -> Option<usize> {
    match policy {
        ShiftingPolicy::None => None,
        ShiftingPolicy::Regular => candidates.first().copied(),
        ShiftingPolicy::Random if candidates.is_empty() => None,
        ShiftingPolicy::Random => Some(candidates[rng.below(candidates.len())]),
        ShiftingPolicy::Smart => cheapest(candidates.iter().map(|&h| (h, cost(h))), rng),
    }
}

/// Quarters `[first, last]` of one run of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    first: usize,
    last: usize,
}

impl Run {
    /// Clock hours the run touches where it was scheduled.
    fn span(&self) -> std::ops::Range<usize> {
        self.first / QUARTERS_OF_HOUR..self.last / QUARTERS_OF_HOUR + 1
    }
}

/// Splits the day's load into runs; runs sharing a clock hour are merged.
fn runs(loads: &[i64]) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    for (q, &load) in loads.iter().enumerate().take(HOURS_OF_DAY * QUARTERS_OF_HOUR) {
        if load <= 0 {
            continue;
        }
        match out.last_mut() {
            Some(run)
                if q == run.last + 1 || q / QUARTERS_OF_HOUR == run.last / QUARTERS_OF_HOUR =>
            {
                run.last = q;
            }
            _ => out.push(Run { first: q, last: q }),
        }
    }
    out
}

/// Places the day's runs of operation at start hours chosen by `policy`.
///
/// Each run is moved as a rigid block. A start hour is a candidate only if
/// every non-empty chunk lands in a legal hour, the block starts after the
/// previous run ends and finishes before the next run's scheduled hours.
///
/// # Arguments
///
/// * `loads` - The day's quarter loads (Watts)
/// * `window` - Legal hours
/// * `prices` - Unit charge per hour
/// * `policy` - Placement rule
/// * `rng` - Tie-break and random placement source
///
/// # Returns
///
/// Hourly energy in Watt-quarters. A run with no candidate start keeps its
/// scheduled hours.
pub fn shift_block(
    loads: &[i64],
    window: &[bool; HOURS_OF_DAY],
    prices: &HourlyPrices,
    policy: ShiftingPolicy,
    rng: &mut RandomStream,
) -> [i64; HOURS_OF_DAY] {
    let runs = runs(loads);
    let mut out = [0; HOURS_OF_DAY];
    let mut earliest = 0;
    for (i, run) in runs.iter().enumerate() {
        let quarters = &loads[run.first..=run.last];
        let block = hourly_profile(quarters);
        let limit = runs.get(i + 1).map_or(HOURS_OF_DAY, |next| next.span().start);
        let candidates: Vec<usize> = (earliest..HOURS_OF_DAY)
            .filter(|&h| h + block.len() <= limit)
            .filter(|&h| {
                block
                    .iter()
                    .enumerate()
                    .all(|(k, &e)| e == 0 || window[h + k])
            })
            .collect();
        let cost = |h: usize| -> f64 {
            block
                .iter()
                .enumerate()
                .map(|(k, &e)| prices.get(h + k) * e as f64)
                .sum()
        };
        match choose(&candidates, cost, policy, rng) {
            Some(start) => {
                for (k, energy) in block.iter().enumerate() {
                    out[start + k] += energy;
                }
                earliest = start + block.len();
            }
            None => {
                for (offset, load) in quarters.iter().enumerate() {
                    out[(run.first + offset) / QUARTERS_OF_HOUR] += load;
                }
                earliest = run.span().end;
            }
        }
    }
    out
}

/// Moves each `interval`-hour period's energy to one hour of that period.
pub fn shift_periodic(
    loads: &[i64],
    interval: usize,
    window: &[bool; HOURS_OF_DAY],
    prices: &HourlyPrices,
    policy: ShiftingPolicy,
    rng: &mut RandomStream,
) -> [i64; HOURS_OF_DAY] {
    let hourly = unshifted(loads);
    if policy == ShiftingPolicy::None {
        return hourly;
    }
    let interval = interval.clamp(1, HOURS_OF_DAY);
    let mut out = [0; HOURS_OF_DAY];
    for period in (0..HOURS_OF_DAY).step_by(interval) {
        let hours = period..(period + interval).min(HOURS_OF_DAY);
        let energy: i64 = hourly[hours.clone()].iter().sum();
        let candidates: Vec<usize> = hours.clone().filter(|&h| window[h]).collect();
        match choose(&candidates, |h| prices.get(h), policy, rng) {
            Some(hour) => out[hour] += energy,
            None => {
                for h in hours {
                    out[h] += hourly[h];
                }
            }
        }
    }
    out
}
