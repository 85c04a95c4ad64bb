//! Person schedules: working days, vacations, sickness and leisure.
//!
//! A person's status is generated once for the whole horizon when the
//! household is built and never changes afterwards.

use crate::params::HouseholdParams;
use crate::rng::RandomStream;
use crate::time::{DAYS_OF_WEEK, QUARTERS_OF_DAY, QUARTERS_OF_HOUR, Slot, WEEKDAYS, flat_index};

use super::status::{Profile, Status};

/// Quarter ranges `[start, end)` during which everybody sleeps.
pub const SLEEP_WINDOWS: [(usize, usize); 2] = [(0, 25), (91, 96)];
/// First quarter of a regular day shift (07:00).
pub const START_OF_WORK: usize = 28;
/// Length of a full shift in quarters.
pub const SHIFT_QUARTERS: usize = 8 * QUARTERS_OF_HOUR;
/// Start quarters of the three periodic shifts.
pub const PERIODIC_SHIFT_STARTS: [usize; 3] = [0, 33, 65];
/// Random shifts must end before this quarter (21:00).
pub const END_OF_WORK: usize = 84;

const LEISURE_START: usize = 28;
const LEISURE_WINDOW: usize = 46;
const LEISURE_END_WINDOW: usize = 75;
const LEISURE_SHIFTED_START: usize = 80;

/// Start quarter and length of a working shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub start: usize,
    pub quarters: usize,
}

impl Shift {
    /// Exclusive end quarter, clamped to the end of the day.
    pub fn end(&self) -> usize {
        (self.start + self.quarters).min(QUARTERS_OF_DAY)
    }
}

/// One inhabitant of a household.
#[derive(Debug, Clone)]
pub struct Person {
    name: String,
    profile: Profile,
    working_days: Vec<usize>,
    shift: Option<Shift>,
    vacation_days: Vec<usize>,
    sickness_days: Vec<usize>,
    leisure_days: Vec<usize>,
    statuses: Vec<Status>,
}

impl Person {
    /// Generates a person and their status for every quarter of the horizon.
    ///
    /// # Arguments
    ///
    /// * `name` - Identifier, usually `"<household> Person <n>"`
    /// * `profile` - Working pattern
    /// * `params` - Behavioural constants
    /// * `horizon_days` - Number of simulated days
    /// * `rng` - The household's random stream
    pub fn generate(
        name: impl Into<String>,
        profile: Profile,
        params: &HouseholdParams,
        horizon_days: usize,
        rng: &mut RandomStream,
    ) -> Self {
        let (working_days, shift) = match profile {
            Profile::MostlyPresent => (Vec::new(), None),
            Profile::RegularlyAbsent => {
                let count = rng.weighted_index(&params.working_days_weights) + 1;
                let shift = Shift {
                    start: START_OF_WORK,
                    quarters: SHIFT_QUARTERS,
                };
                (working_days(count, rng), Some(shift))
            }
            Profile::PeriodicallyAbsent => {
                let count = rng.weighted_index(&params.working_days_weights) + 1;
                let start = PERIODIC_SHIFT_STARTS[rng.below(PERIODIC_SHIFT_STARTS.len())];
                let shift = Shift {
                    start,
                    quarters: SHIFT_QUARTERS,
                };
                (working_days(count, rng), Some(shift))
            }
            Profile::RandomlyAbsent => {
                let count = rng.weighted_index(&params.working_days_weights) + 1;
                let quarters = rng.between(1, 8) * QUARTERS_OF_HOUR;
                let start = rng.between(START_OF_WORK, END_OF_WORK - quarters);
                (working_days(count, rng), Some(Shift { start, quarters }))
            }
        };

        let vacation_budget = rounded_budget(
            rng.normal(
                params.vacation_duration_mean,
                params.vacation_duration_deviation,
            ),
            horizon_days,
        );
        let vacation_days = vacation_days(vacation_budget, horizon_days, rng);

        let sickness_budget = rounded_budget(
            rng.normal(params.sickness_days_mean, params.sickness_days_deviation),
            horizon_days,
        );
        let mut sickness_days: Vec<usize> = (0..sickness_budget)
            .map(|_| rng.below(horizon_days))
            .collect();
        sickness_days.sort_unstable();
        sickness_days.dedup();

        let leisure_days =
            distinct_weekdays(params.leisure_days.min(DAYS_OF_WEEK), DAYS_OF_WEEK, rng);

        let mut person = Self {
            name: name.into(),
            profile,
            working_days,
            shift,
            vacation_days,
            sickness_days,
            leisure_days,
            statuses: Vec::new(),
        };
        person.statuses = person.derive_statuses(params, horizon_days, rng);
        person
    }

    /// A person holding the same status in every quarter of the horizon.
    pub fn constant(name: impl Into<String>, status: Status, horizon_days: usize) -> Self {
        Self {
            name: name.into(),
            profile: Profile::MostlyPresent,
            working_days: Vec::new(),
            shift: None,
            vacation_days: Vec::new(),
            sickness_days: Vec::new(),
            leisure_days: Vec::new(),
            statuses: vec![status; horizon_days * QUARTERS_OF_DAY],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Sorted weekday numbers (1 = Monday) this person works on.
    pub fn working_days(&self) -> &[usize] {
        &self.working_days
    }

    pub fn shift(&self) -> Option<Shift> {
        self.shift
    }

    /// Vacation days of the run, sorted; a day may appear more than once.
    pub fn vacation_days(&self) -> &[usize] {
        &self.vacation_days
    }

    pub fn sickness_days(&self) -> &[usize] {
        &self.sickness_days
    }

    pub fn leisure_days(&self) -> &[usize] {
        &self.leisure_days
    }

    /// Number of days covered by the status table.
    pub fn horizon_days(&self) -> usize {
        self.statuses.len() / QUARTERS_OF_DAY
    }

    /// Status at `(day, quarter)`, or `None` outside the horizon.
    pub fn status(&self, day: usize, quarter: usize) -> Option<Status> {
        if quarter >= QUARTERS_OF_DAY {
            return None;
        }
        self.statuses.get(flat_index(day, quarter)).copied()
    }

    fn derive_statuses(
        &self,
        params: &HouseholdParams,
        horizon_days: usize,
        rng: &mut RandomStream,
    ) -> Vec<Status> {
        let mut statuses = Vec::with_capacity(horizon_days * QUARTERS_OF_DAY);
        for day in 0..horizon_days {
            statuses.extend_from_slice(&self.day_statuses(day, params, rng));
        }
        statuses
    }

    fn day_statuses(
        &self,
        day: usize,
        params: &HouseholdParams,
        rng: &mut RandomStream,
    ) -> [Status; QUARTERS_OF_DAY] {
        let awake = if self.vacation_days.binary_search(&day).is_ok() {
            Status::OnVacation
        } else if self.sickness_days.binary_search(&day).is_ok() {
            Status::Sick
        } else {
            Status::AtHome
        };
        let mut out = [awake; QUARTERS_OF_DAY];
        // sleep overrides vacation and sickness
        for (start, end) in SLEEP_WINDOWS {
            out[start..end].fill(Status::Sleeping);
        }
        if awake != Status::AtHome {
            return out;
        }

        let weekday = Slot::new(day, 0).weekday_number();
        let mut work_end = None;
        if let Some(shift) = self.shift {
            if self.working_days.contains(&weekday) {
                for status in &mut out[shift.start..shift.end()] {
                    if *status == Status::AtHome {
                        *status = Status::Working;
                    }
                }
                work_end = Some(shift.end());
            }
        }

        if self.leisure_days.contains(&weekday) {
            let start = if rng.coin(params.leisure_shift_probability) {
                LEISURE_SHIFTED_START
            } else {
                match work_end {
                    Some(end) => {
                        let low = end.max(LEISURE_WINDOW);
                        if low >= LEISURE_END_WINDOW {
                            LEISURE_SHIFTED_START
                        } else {
                            rng.between(low, LEISURE_END_WINDOW - 1)
                        }
                    }
                    None => rng.between(LEISURE_START, LEISURE_WINDOW - 1),
                }
            };
            let end = (start + params.leisure_duration).min(QUARTERS_OF_DAY);
            for status in &mut out[start..end] {
                if *status == Status::AtHome {
                    *status = Status::AtLeisure;
                }
            }
        }
        out
    }
}

fn rounded_budget(sample: f64, horizon_days: usize) -> usize {
    (sample.round().max(0.0) as usize).min(horizon_days)
}

/// Picks the weekday numbers (1 = Monday ... 7 = Sunday) a person works on.
///
/// Fewer than five days are drawn from Monday to Friday with a rejection loop
/// so no day repeats. Five means Monday to Friday, six adds one weekend day
/// chosen by a coin flip and seven covers the whole week.
pub fn working_days(count: usize, rng: &mut RandomStream) -> Vec<usize> {
    match count {
        0 => Vec::new(),
        c if c < WEEKDAYS => distinct_weekdays(c, WEEKDAYS, rng),
        WEEKDAYS => (1..=WEEKDAYS).collect(),
        6 => {
            let mut days: Vec<usize> = (1..=WEEKDAYS).collect();
            days.push(if rng.coin(0.5) { 6 } else { 7 });
            days
        }
        _ => (1..=DAYS_OF_WEEK).collect(),
    }
}

/// `count` distinct day numbers in `[1, max]`, sorted.
fn distinct_weekdays(count: usize, max: usize, rng: &mut RandomStream) -> Vec<usize> {
    let count = count.min(max);
    let mut days = Vec::with_capacity(count);
    while days.len() < count {
        let day = rng.between(1, max);
        if !days.contains(&day) {
            days.push(day);
        }
    }
    days.sort_unstable();
    days
}

/// Draws vacation days until `budget` days have been handed out.
///
/// Each run starts on a random day in `[1, horizon_days - 1]` and lasts between
/// one day and the remaining budget. Runs may overlap, in which case a day is
/// listed twice; days past the horizon are kept but never match a simulated day.
pub fn vacation_days(budget: usize, horizon_days: usize, rng: &mut RandomStream) -> Vec<usize> {
    let mut days = Vec::with_capacity(budget);
    if horizon_days < 2 {
        return days;
    }
    let mut remaining = budget;
    while remaining > 0 {
        let start = rng.between(1, horizon_days - 1);
        let run = 1 + rng.below(remaining);
        days.extend(start..start + run);
        remaining -= run;
    }
    days.sort_unstable();
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    fn few_working_days_are_unique_weekdays(#[case] count: usize) {
        let mut rng = RandomStream::new(11);
        for _ in 0..50 {
            let days = working_days(count, &mut rng);
            assert_eq!(days.len(), count);
            assert!(days.iter().all(|d| (1..=5).contains(d)));
            assert!(days.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn five_six_and_seven_working_days() {
        let mut rng = RandomStream::new(5);
        assert_eq!(working_days(5, &mut rng), vec![1, 2, 3, 4, 5]);
        let six = working_days(6, &mut rng);
        assert_eq!(&six[..5], &[1, 2, 3, 4, 5]);
        assert!(six[5] == 6 || six[5] == 7);
        assert_eq!(working_days(7, &mut rng), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn vacation_length_matches_budget_and_is_sorted() {
        let mut rng = RandomStream::new(2);
        let days = vacation_days(12, 77, &mut rng);
        assert_eq!(days.len(), 12);
        assert!(days.windows(2).all(|w| w[0] <= w[1]));
        assert!(days.iter().all(|&d| d >= 1));
    }

    #[test]
    fn vacation_day_is_away_except_while_sleeping() {
        let mut params = HouseholdParams::default();
        params.vacation_duration_mean = 20.0;
        let mut rng = RandomStream::new(8);
        let person = Person::generate("p", Profile::MostlyPresent, &params, 28, &mut rng);
        let days: Vec<usize> = person.vacation_days().iter().copied().filter(|&d| d < 28).collect();
        assert!(!days.is_empty());
        for day in days {
            for q in 0..QUARTERS_OF_DAY {
                let asleep = SLEEP_WINDOWS.iter().any(|&(s, e)| (s..e).contains(&q));
                let expected = if asleep { Status::Sleeping } else { Status::OnVacation };
                assert_eq!(person.status(day, q), Some(expected), "day {day} quarter {q}");
            }
        }
    }

    #[test]
    fn sleep_windows_hold_on_normal_days() {
        let mut params = HouseholdParams::default();
        params.vacation_duration_mean = 0.0;
        params.vacation_duration_deviation = 0.0;
        params.sickness_days_mean = 0.0;
        params.sickness_days_deviation = 0.0;
        let mut rng = RandomStream::new(3);
        let person = Person::generate("p", Profile::PeriodicallyAbsent, &params, 14, &mut rng);
        for day in 0..14 {
            for (start, end) in SLEEP_WINDOWS {
                for q in start..end {
                    assert_eq!(person.status(day, q), Some(Status::Sleeping));
                }
            }
        }
    }

    #[test]
    fn regular_worker_is_away_during_shift() {
        let mut params = HouseholdParams::default();
        params.working_days_weights = [0, 0, 0, 0, 100, 0, 0];
        params.vacation_duration_mean = 0.0;
        params.vacation_duration_deviation = 0.0;
        params.sickness_days_mean = 0.0;
        params.sickness_days_deviation = 0.0;
        let mut rng = RandomStream::new(4);
        let person = Person::generate("p", Profile::RegularlyAbsent, &params, 7, &mut rng);
        assert_eq!(person.working_days(), &[1, 2, 3, 4, 5]);
        for q in START_OF_WORK..START_OF_WORK + SHIFT_QUARTERS {
            assert_eq!(person.status(0, q), Some(Status::Working));
            assert_ne!(person.status(5, q), Some(Status::Working));
        }
    }

    #[test]
    fn status_outside_horizon_is_none() {
        let person = Person::constant("p", Status::AtHome, 2);
        assert_eq!(person.status(1, 95), Some(Status::AtHome));
        assert_eq!(person.status(2, 0), None);
    }
}
