//! A household: its persons, their occupancy, and the appliances they own.

use tracing::debug;

use crate::appliances::{Appliance, Category, ShiftingClass};
use crate::error::{EngineError, EngineResult};
use crate::occupancy::{Occupancy, Person, Profile};
use crate::params::HouseholdParams;
use crate::rng::RandomStream;
use crate::shifting::{HourlyPrices, ShiftingPolicy};
use crate::time::{DAYS_OF_WEEK, HOURS_OF_DAY, QUARTERS_OF_HOUR, Tick};

/// Controllable energy planned for one day of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPlan {
    pub day: usize,
    /// Energy per hour in Watt-quarters.
    pub hourly: [i64; HOURS_OF_DAY],
}

/// Energy one household consumes during one tick, in Watt-quarters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickLoad {
    pub base: i64,
    pub controllable: i64,
}

/// One simulated household.
#[derive(Debug, Clone)]
pub struct Household {
    name: String,
    persons: Vec<Person>,
    occupancy: Occupancy,
    appliances: Vec<Appliance>,
    rng: RandomStream,
    plan: Option<DayPlan>,
}

impl Household {
    /// Draws members, their schedules and the appliance set, then generates week 0.
    ///
    /// # Arguments
    ///
    /// * `name` - Household name, e.g. `"Village 1 SS Household 4"`
    /// * `params` - Behavioural constants
    /// * `horizon_days` - Days of bootstrap plus competition
    /// * `rng` - The household's own stream; kept for later refreshes and shifting
    pub fn generate(
        name: impl Into<String>,
        params: &HouseholdParams,
        horizon_days: usize,
        mut rng: RandomStream,
    ) -> EngineResult<Self> {
        let name = name.into();
        let members = rng.weighted_index(&params.household_size_weights) + 1;
        let persons: Vec<Person> = (0..members)
            .map(|i| {
                let profile = Profile::ALL[rng.weighted_index(&params.person_profile_weights)];
                Person::generate(
                    format!("{name} Person {}", i + 1),
                    profile,
                    params,
                    horizon_days,
                    &mut rng,
                )
            })
            .collect();

        let mut appliances = Vec::new();
        for category in Category::ALL {
            let has_washer = appliances
                .iter()
                .any(|a: &Appliance| a.category() == Category::WashingMachine);
            if category == Category::Dryer && !has_washer {
                continue;
            }
            if let Some(appliance) = Appliance::sample(&name, category, params, members, &mut rng) {
                appliances.push(appliance);
            }
        }
        Self::from_parts(name, persons, appliances, horizon_days, rng)
    }

    /// Assembles a household from explicit persons and appliances.
    ///
    /// Appliances are ordered by category and the dryer is linked to the
    /// washing machine; week 0 is generated.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` when a dryer has no washing machine to follow.
    pub fn from_parts(
        name: impl Into<String>,
        persons: Vec<Person>,
        mut appliances: Vec<Appliance>,
        horizon_days: usize,
        rng: RandomStream,
    ) -> EngineResult<Self> {
        let name = name.into();
        appliances.sort_by_key(|a| a.category());
        let washer = appliances
            .iter()
            .position(|a| a.category() == Category::WashingMachine);
        let dryer = appliances
            .iter()
            .position(|a| a.category() == Category::Dryer);
        match (washer, dryer) {
            (Some(w), Some(d)) => {
                appliances[w].link(d);
                appliances[d].link(w);
            }
            (None, Some(_)) => {
                return Err(EngineError::StateInconsistency(format!(
                    "{name} has a dryer but no washing machine"
                )));
            }
            _ => {}
        }

        let occupancy = Occupancy::from_persons(&persons, horizon_days);
        let mut household = Self {
            name,
            persons,
            occupancy,
            appliances,
            rng,
            plan: None,
        };
        household.refresh(0)?;
        Ok(household)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> usize {
        self.persons.len()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn appliances(&self) -> &[Appliance] {
        &self.appliances
    }

    pub fn appliance(&self, category: Category) -> Option<&Appliance> {
        self.appliances.iter().find(|a| a.category() == category)
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    /// Nobody on the premises at `(day, quarter)`.
    pub fn is_empty(&self, day: usize, quarter: usize) -> bool {
        self.occupancy.is_empty(day, quarter)
    }

    /// Persons awake at home at `(day, quarter)`.
    pub fn tenants_number(&self, day: usize, quarter: usize) -> usize {
        self.occupancy.tenants(day, quarter)
    }

    /// Week of the run the appliance vectors currently describe.
    pub fn current_week(&self) -> Option<usize> {
        self.appliances.first().and_then(|a| a.week_index())
    }

    /// Plan computed by the latest [`Household::prepare_day`].
    pub fn plan(&self) -> Option<&DayPlan> {
        self.plan.as_ref()
    }

    /// Regenerates every appliance's weekly vectors for run week `week`.
    pub fn refresh(&mut self, week: usize) -> EngineResult<()> {
        for i in 0..self.appliances.len() {
            let washer = self.appliances[i].washer();
            match washer {
                Some(w) if w < i => {
                    let (before, after) = self.appliances.split_at_mut(i);
                    after[0].refresh(week, &self.occupancy, Some(&before[w]), &mut self.rng)?;
                }
                _ => {
                    self.appliances[i].refresh(week, &self.occupancy, None, &mut self.rng)?;
                }
            }
        }
        self.plan = None;
        debug!(household = %self.name, week, "weekly refresh");
        Ok(())
    }

    /// Total load of all appliances at a quarter of the current week (Watts).
    pub fn load(&self, weekday: usize, quarter: usize) -> i64 {
        self.appliances
            .iter()
            .map(|a| a.week().load(weekday, quarter))
            .sum()
    }

    /// Load of the non-controllable appliances at a quarter (Watts).
    pub fn base_load(&self, weekday: usize, quarter: usize) -> i64 {
        self.appliances
            .iter()
            .filter(|a| !a.is_controllable())
            .map(|a| a.week().load(weekday, quarter))
            .sum()
    }

    /// Unshifted controllable energy of a weekday per hour (Watt-quarters).
    pub fn controllable_hourly(&self, weekday: usize) -> [i64; HOURS_OF_DAY] {
        let mut out = [0; HOURS_OF_DAY];
        for appliance in self.appliances.iter().filter(|a| a.is_controllable()) {
            for (h, energy) in appliance.week().hourly(weekday).iter().enumerate() {
                out[h] += energy;
            }
        }
        out
    }

    /// Non-controllable energy of a weekday per hour (Watt-quarters).
    pub fn base_hourly(&self, weekday: usize) -> [i64; HOURS_OF_DAY] {
        let mut out = [0; HOURS_OF_DAY];
        for appliance in self.appliances.iter().filter(|a| !a.is_controllable()) {
            for (h, energy) in appliance.week().hourly(weekday).iter().enumerate() {
                out[h] += energy;
            }
        }
        out
    }

    /// Feeds the hour's temperature to the weather-sensitive appliances.
    pub fn apply_weather(&mut self, day: usize, hour: usize, temperature: f64) {
        for appliance in self
            .appliances
            .iter_mut()
            .filter(|a| a.category().shifting_class() == ShiftingClass::WeatherSensitive)
        {
            appliance.weather_hour(day, hour, temperature, &self.occupancy);
        }
    }

    /// Makes sure the vectors cover `day` and plans its controllable load.
    ///
    /// Refreshes on a week change, then shifts every controllable appliance
    /// against `prices` according to `policy`. Calling it again for the same
    /// day is a no-op.
    pub fn prepare_day(
        &mut self,
        day: usize,
        prices: &HourlyPrices,
        policy: ShiftingPolicy,
    ) -> EngineResult<&DayPlan> {
        let week = day / DAYS_OF_WEEK;
        if self.current_week() != Some(week) {
            self.refresh(week)?;
        }
        if self.plan.is_none_or(|p| p.day != day) {
            let hourly = self.daily_shifting(day % DAYS_OF_WEEK, prices, policy)?;
            self.plan = Some(DayPlan { day, hourly });
        }
        self.plan.as_ref().ok_or_else(|| {
            EngineError::StateInconsistency(format!("{} has no plan for day {day}", self.name))
        })
    }

    /// Shifts every controllable appliance for a weekday and sums the result.
    pub fn daily_shifting(
        &mut self,
        weekday: usize,
        prices: &HourlyPrices,
        policy: ShiftingPolicy,
    ) -> EngineResult<[i64; HOURS_OF_DAY]> {
        let mut total = [0; HOURS_OF_DAY];
        for appliance in self.appliances.iter().filter(|a| a.is_controllable()) {
            let dryer = appliance.dryer().and_then(|d| self.appliances.get(d));
            let hourly = appliance.daily_shift(weekday, prices, policy, dryer, &mut self.rng)?;
            for (t, e) in total.iter_mut().zip(hourly) {
                *t += e;
            }
        }
        debug!(
            household = %self.name,
            weekday,
            ?policy,
            energy = total.iter().sum::<i64>(),
            "daily shifting"
        );
        Ok(total)
    }

    /// Energy consumed during the tick starting at `(day, quarter)`.
    ///
    /// Controllable energy comes from the day's plan; on quarter ticks the
    /// hourly bucket is split evenly with the remainder on the hour's last quarter.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` if `day` has not been prepared.
    pub fn tick_load(&self, day: usize, quarter: usize, tick: Tick) -> EngineResult<TickLoad> {
        let plan = self.plan.filter(|p| p.day == day).ok_or_else(|| {
            EngineError::StateInconsistency(format!("{} has no plan for day {day}", self.name))
        })?;
        let weekday = day % DAYS_OF_WEEK;
        let hour = quarter / QUARTERS_OF_HOUR;
        Ok(match tick {
            Tick::Hour => {
                let first = hour * QUARTERS_OF_HOUR;
                TickLoad {
                    base: (first..first + QUARTERS_OF_HOUR)
                        .map(|q| self.base_load(weekday, q))
                        .sum(),
                    controllable: plan.hourly[hour],
                }
            }
            Tick::Quarter => {
                let bucket = plan.hourly[hour];
                let share = bucket / QUARTERS_OF_HOUR as i64;
                let remainder = bucket - share * QUARTERS_OF_HOUR as i64;
                let last = quarter % QUARTERS_OF_HOUR == QUARTERS_OF_HOUR - 1;
                TickLoad {
                    base: self.base_load(weekday, quarter),
                    controllable: share + if last { remainder } else { 0 },
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appliances::ApplianceKind;
    use crate::occupancy::Status;

    fn params() -> HouseholdParams {
        HouseholdParams::default()
    }

    #[test]
    fn generated_household_has_members_and_appliances() {
        let h = Household::generate("h", &params(), 14, RandomStream::new(3)).unwrap();
        assert!((1..=5).contains(&h.members()));
        assert!(h.appliance(Category::Lights).is_some());
        assert!(h.appliance(Category::Others).is_some());
        assert_eq!(h.current_week(), Some(0));
        if h.appliance(Category::Dryer).is_some() {
            assert!(h.appliance(Category::WashingMachine).is_some());
        }
    }

    #[test]
    fn dryer_without_washer_is_rejected() {
        let dryer = Appliance::new(
            "d",
            ApplianceKind::Dryer {
                weekly_times: 1,
                washer: None,
            },
            1400,
        );
        let err = Household::from_parts(
            "h",
            vec![Person::constant("p", Status::AtHome, 7)],
            vec![dryer],
            7,
            RandomStream::new(1),
        );
        assert!(matches!(err, Err(EngineError::StateInconsistency(_))));
    }

    #[test]
    fn tick_load_requires_a_prepared_day() {
        let h = Household::generate("h", &params(), 7, RandomStream::new(3)).unwrap();
        assert!(h.tick_load(0, 0, Tick::Hour).is_err());
    }

    #[test]
    fn quarter_ticks_sum_to_the_hour() {
        let mut h = Household::generate("h", &params(), 7, RandomStream::new(8)).unwrap();
        h.prepare_day(0, &HourlyPrices::flat(0.1), ShiftingPolicy::Smart)
            .unwrap();
        for hour in 0..HOURS_OF_DAY {
            let hourly = h.tick_load(0, hour * 4, Tick::Hour).unwrap();
            let quarters: i64 = (0..4)
                .map(|k| h.tick_load(0, hour * 4 + k, Tick::Quarter).unwrap().controllable)
                .sum();
            assert_eq!(quarters, hourly.controllable);
        }
    }

    #[test]
    fn week_change_triggers_refresh() {
        let mut h = Household::generate("h", &params(), 21, RandomStream::new(2)).unwrap();
        h.prepare_day(8, &HourlyPrices::flat(0.1), ShiftingPolicy::None)
            .unwrap();
        assert_eq!(h.current_week(), Some(1));
        assert_eq!(h.plan().map(|p| p.day), Some(8));
    }
}
