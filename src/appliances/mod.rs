//! Appliance models: weekly operation/load generation and daily shifting.
//!
//! Every appliance is one [`Appliance`] value whose [`ApplianceKind`] carries
//! the category-specific parameters. Generation, legality and shifting are
//! dispatched on the kind, so adding a category means adding one variant and
//! its arms.

/// Refrigerators and freezers.
pub mod fully_shifting;
/// Pumps, lights, electronics and other behaviour-driven loads.
pub mod not_shifting;
/// Dishwasher, washing machine, dryer, stove and storage heater.
pub mod semi_shifting;
pub mod types;
/// Space heaters and air conditioners.
pub mod weather;

pub use types::{Category, ShiftingClass, WeekProfile};
pub use weather::{AcSize, AirConditioner, EnergyClass};

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::occupancy::Occupancy;
use crate::params::HouseholdParams;
use crate::rng::RandomStream;
use crate::shifting::{self, HourlyPrices, ShiftingPolicy};
use crate::time::{DAYS_OF_WEEK, HOURS_OF_DAY, QUARTERS_OF_DAY};

use types::{
    DISHWASHER_PHASES, STORAGE_HEATER_PHASES, STOVE_PHASES, WASHER_PHASES,
};

/// Inputs for generating one day of one appliance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DayInput<'a> {
    /// Day of the run, used for occupancy lookups.
    pub day: usize,
    /// Position of the day inside the weekly vectors.
    pub weekday: usize,
    /// Nominal power in Watts.
    pub power: i64,
    pub occupancy: &'a Occupancy,
}

/// Category tag plus the parameters only that category needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplianceKind {
    CirculationPump { percentage: f64 },
    ConsumerElectronics { percentage: f64 },
    Ict { percentage: f64 },
    Lights,
    Others { daily_times: usize },
    InstantHeater { daily_times: usize },
    Dishwasher { weekly_times: usize },
    /// `dryer` is the index of the household's dryer, if any.
    WashingMachine { weekly_times: usize, dryer: Option<usize> },
    /// `washer` is the index of the paired washing machine.
    Dryer { weekly_times: usize, washer: Option<usize> },
    Stove { daily_times: usize },
    StorageHeater { probability: f64 },
    Refrigerator,
    Freezer,
    SpaceHeater { threshold: f64 },
    AirCondition(AirConditioner),
}

impl ApplianceKind {
    pub fn category(&self) -> Category {
        match self {
            ApplianceKind::CirculationPump { .. } => Category::CirculationPump,
            ApplianceKind::ConsumerElectronics { .. } => Category::ConsumerElectronics,
            ApplianceKind::Ict { .. } => Category::Ict,
            ApplianceKind::Lights => Category::Lights,
            ApplianceKind::Others { .. } => Category::Others,
            ApplianceKind::InstantHeater { .. } => Category::InstantHeater,
            ApplianceKind::Dishwasher { .. } => Category::Dishwasher,
            ApplianceKind::WashingMachine { .. } => Category::WashingMachine,
            ApplianceKind::Dryer { .. } => Category::Dryer,
            ApplianceKind::Stove { .. } => Category::Stove,
            ApplianceKind::StorageHeater { .. } => Category::StorageHeater,
            ApplianceKind::Refrigerator => Category::Refrigerator,
            ApplianceKind::Freezer => Category::Freezer,
            ApplianceKind::SpaceHeater { .. } => Category::SpaceHeater,
            ApplianceKind::AirCondition(_) => Category::AirCondition,
        }
    }
}

/// One appliance installed in a household.
#[derive(Debug, Clone)]
pub struct Appliance {
    name: String,
    kind: ApplianceKind,
    power: i64,
    days: Vec<usize>,
    week: WeekProfile,
    possibility: Option<Vec<bool>>,
    week_index: Option<usize>,
}

impl Appliance {
    /// Creates an appliance with an explicit kind and nominal power.
    ///
    /// Vectors stay empty until the first [`Appliance::refresh`].
    pub fn new(name: impl Into<String>, kind: ApplianceKind, power: i64) -> Self {
        Self {
            name: name.into(),
            kind,
            power: power.max(1),
            days: Vec::new(),
            week: WeekProfile::default(),
            possibility: None,
            week_index: None,
        }
    }

    /// Draws whether the household owns an appliance of `category` and, if so,
    /// its power and behaviour parameters.
    ///
    /// # Arguments
    ///
    /// * `household` - Owner name, used as a prefix for the appliance name
    /// * `category` - Category to sample
    /// * `params` - Saturations, power distributions and usage counts
    /// * `members` - Number of persons in the household
    /// * `rng` - The household's random stream
    ///
    /// # Returns
    ///
    /// `None` when the saturation draw fails and the household has no such appliance.
    pub fn sample(
        household: &str,
        category: Category,
        params: &HouseholdParams,
        members: usize,
        rng: &mut RandomStream,
    ) -> Option<Self> {
        if !rng.coin(params.saturation(category)) {
            return None;
        }
        let spec = params.power(category);
        let mut power = rng.normal(spec.mean, spec.deviation).round() as i64;
        let weekly = |base: usize| (base + members / 2).min(DAYS_OF_WEEK);
        let kind = match category {
            Category::CirculationPump => ApplianceKind::CirculationPump {
                percentage: params.circulation_pump_percentage,
            },
            Category::ConsumerElectronics => ApplianceKind::ConsumerElectronics {
                percentage: params.consumer_electronics_percentage,
            },
            Category::Ict => ApplianceKind::Ict {
                percentage: params.ict_percentage,
            },
            Category::Lights => ApplianceKind::Lights,
            Category::Others => ApplianceKind::Others {
                daily_times: params.others_daily_times + members,
            },
            Category::InstantHeater => ApplianceKind::InstantHeater {
                daily_times: params.instant_heater_daily_times,
            },
            Category::Dishwasher => ApplianceKind::Dishwasher {
                weekly_times: weekly(params.dishwasher_weekly_times),
            },
            Category::WashingMachine => ApplianceKind::WashingMachine {
                weekly_times: weekly(params.washing_machine_weekly_times),
                dryer: None,
            },
            Category::Dryer => ApplianceKind::Dryer {
                weekly_times: weekly(params.dryer_weekly_times),
                washer: None,
            },
            Category::Stove => ApplianceKind::Stove {
                daily_times: params.stove_daily_times,
            },
            Category::StorageHeater => ApplianceKind::StorageHeater {
                probability: params.storage_heater_probability,
            },
            Category::Refrigerator => ApplianceKind::Refrigerator,
            Category::Freezer => ApplianceKind::Freezer,
            Category::SpaceHeater => ApplianceKind::SpaceHeater {
                threshold: rng.normal(
                    params.space_heater_temperature_mean,
                    params.space_heater_temperature_deviation,
                ),
            },
            Category::AirCondition => {
                let unit = AirConditioner::sample(params, rng);
                power = unit.cooling_power();
                ApplianceKind::AirCondition(unit)
            }
        };
        Some(Self::new(
            format!("{household} {}", category.name()),
            kind,
            power,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ApplianceKind {
        &self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Nominal power drawn once for the household (Watts).
    pub fn power(&self) -> i64 {
        self.power
    }

    /// Cycle length in quarters.
    pub fn cycle_duration(&self) -> usize {
        self.category().cycle_duration()
    }

    pub fn occupancy_dependent(&self) -> bool {
        self.category().occupancy_dependent()
    }

    pub fn is_controllable(&self) -> bool {
        self.category().is_controllable()
    }

    /// Current week's vectors.
    pub fn week(&self) -> &WeekProfile {
        &self.week
    }

    /// Run week the vectors were last generated for.
    pub fn week_index(&self) -> Option<usize> {
        self.week_index
    }

    /// Days of the week (0-based) on which a weekly appliance was scheduled.
    pub fn days(&self) -> &[usize] {
        &self.days
    }

    /// Records the index of the partner appliance (washer ↔ dryer).
    pub fn link(&mut self, partner: usize) {
        match &mut self.kind {
            ApplianceKind::WashingMachine { dryer, .. } => *dryer = Some(partner),
            ApplianceKind::Dryer { washer, .. } => *washer = Some(partner),
            _ => {}
        }
    }

    /// Index of the paired washing machine, for a dryer.
    pub fn washer(&self) -> Option<usize> {
        match self.kind {
            ApplianceKind::Dryer { washer, .. } => washer,
            _ => None,
        }
    }

    /// Index of the paired dryer, for a washing machine.
    pub fn dryer(&self) -> Option<usize> {
        match self.kind {
            ApplianceKind::WashingMachine { dryer, .. } => dryer,
            _ => None,
        }
    }

    /// Legal quarters of a weekday.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` when the appliance is not schedulable or its
    /// vectors have not been generated yet.
    pub fn possibility(&self, weekday: usize) -> EngineResult<&[bool]> {
        let all = self.possibility.as_ref().ok_or_else(|| {
            EngineError::StateInconsistency(format!(
                "possibility vector of {} queried before generation",
                self.name
            ))
        })?;
        let start = weekday * QUARTERS_OF_DAY;
        all.get(start..start + QUARTERS_OF_DAY).ok_or_else(|| {
            EngineError::StateInconsistency(format!("weekday {weekday} out of range"))
        })
    }

    /// Regenerates the vectors for run week `week`.
    ///
    /// A dryer reads the washing machine's fresh vectors, so the washer must be
    /// refreshed first and passed in as `washer`.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` for a dryer without a paired washing machine.
    pub fn refresh(
        &mut self,
        week: usize,
        occupancy: &Occupancy,
        washer: Option<&Appliance>,
        rng: &mut RandomStream,
    ) -> EngineResult<()> {
        let mut profile = WeekProfile::default();
        let mut possibility = Vec::new();
        let schedulable = self.category().shifting_class() != ShiftingClass::NotShifting
            && self.category().shifting_class() != ShiftingClass::WeatherSensitive;

        self.days = match &self.kind {
            ApplianceKind::Dishwasher { weekly_times }
            | ApplianceKind::WashingMachine { weekly_times, .. } => {
                semi_shifting::pick_days(*weekly_times, rng)
            }
            ApplianceKind::Dryer { weekly_times, .. } => {
                let washer = washer.ok_or_else(|| semi_shifting::missing_washer(&self.name))?;
                semi_shifting::dryer_days(washer.week(), *weekly_times)
            }
            _ => (0..DAYS_OF_WEEK).collect(),
        };

        for weekday in 0..DAYS_OF_WEEK {
            let input = DayInput {
                day: week * DAYS_OF_WEEK + weekday,
                weekday,
                power: self.power,
                occupancy,
            };
            let scheduled = self.days.contains(&weekday);
            self.fill_day(&mut profile, &input, scheduled, washer, rng)?;
            if schedulable {
                possibility.extend(self.day_possibility(&input));
            }
        }

        self.week = profile;
        self.possibility = schedulable.then_some(possibility);
        self.week_index = Some(week);
        debug!(appliance = %self.name, week, "refreshed weekly vectors");
        Ok(())
    }

    fn fill_day(
        &self,
        week: &mut WeekProfile,
        input: &DayInput<'_>,
        scheduled: bool,
        washer: Option<&Appliance>,
        rng: &mut RandomStream,
    ) -> EngineResult<()> {
        match &self.kind {
            ApplianceKind::CirculationPump { percentage } => {
                not_shifting::circulation_pump(week, input, *percentage, rng)
            }
            ApplianceKind::ConsumerElectronics { percentage }
            | ApplianceKind::Ict { percentage } => {
                not_shifting::per_quarter_use(week, input, *percentage, rng)
            }
            ApplianceKind::Lights => not_shifting::lights(week, input, rng),
            ApplianceKind::Others { daily_times } => {
                not_shifting::others(week, input, *daily_times, rng)
            }
            ApplianceKind::InstantHeater { daily_times } => {
                not_shifting::instant_heater(week, input, *daily_times, rng)
            }
            ApplianceKind::Dishwasher { .. } if scheduled => {
                semi_shifting::place_cycle(week, input, DISHWASHER_PHASES, false, rng);
            }
            ApplianceKind::WashingMachine { .. } if scheduled => {
                semi_shifting::place_cycle(week, input, WASHER_PHASES, false, rng);
            }
            ApplianceKind::Dryer { .. } if scheduled => {
                let washer = washer.ok_or_else(|| semi_shifting::missing_washer(&self.name))?;
                semi_shifting::dryer(week, input, washer.week());
            }
            ApplianceKind::Stove { daily_times } => {
                for _ in 0..*daily_times {
                    semi_shifting::place_cycle(week, input, STOVE_PHASES, true, rng);
                }
            }
            ApplianceKind::StorageHeater { probability } => {
                semi_shifting::storage_heater(week, input, STORAGE_HEATER_PHASES, *probability, rng)
            }
            ApplianceKind::Refrigerator | ApplianceKind::Freezer => {
                fully_shifting::duty_cycle(week, input, self.cycle_duration(), rng)
            }
            // Filled hour by hour from the weather feed.
            ApplianceKind::SpaceHeater { .. } | ApplianceKind::AirCondition(_) => {}
            _ => {}
        }
        Ok(())
    }

    fn day_possibility(&self, input: &DayInput<'_>) -> Vec<bool> {
        match &self.kind {
            ApplianceKind::Dishwasher { .. } => {
                semi_shifting::cycle_possibility(input, DISHWASHER_PHASES, false)
            }
            ApplianceKind::WashingMachine { .. } => {
                semi_shifting::cycle_possibility(input, WASHER_PHASES, false)
            }
            ApplianceKind::Dryer { .. } => semi_shifting::presence_possibility(input),
            ApplianceKind::Stove { .. } => {
                semi_shifting::cycle_possibility(input, STOVE_PHASES, true)
            }
            ApplianceKind::StorageHeater { .. } => {
                semi_shifting::storage_heater_possibility(STORAGE_HEATER_PHASES)
            }
            _ => fully_shifting::always_possible(),
        }
    }

    /// Fills one hour of a weather-sensitive appliance from the outdoor temperature.
    ///
    /// Other categories ignore the call.
    pub fn weather_hour(
        &mut self,
        day: usize,
        hour: usize,
        temperature: f64,
        occupancy: &Occupancy,
    ) {
        let input = DayInput {
            day,
            weekday: day % DAYS_OF_WEEK,
            power: self.power,
            occupancy,
        };
        match &self.kind {
            ApplianceKind::SpaceHeater { threshold } => {
                weather::space_heater_hour(&mut self.week, &input, hour, temperature, *threshold)
            }
            ApplianceKind::AirCondition(unit) => {
                weather::air_condition_hour(&mut self.week, &input, unit, hour, temperature)
            }
            _ => {}
        }
    }

    /// Re-plans the appliance's energy for one weekday.
    ///
    /// # Arguments
    ///
    /// * `weekday` - Day inside the current weekly vectors
    /// * `prices` - Unit charge per hour of that day
    /// * `policy` - Placement rule of the household's group
    /// * `dryer` - For a washing machine, the paired dryer whose energy moves along
    /// * `rng` - Tie-break source
    ///
    /// # Returns
    ///
    /// Hourly energy in Watt-quarters. Non-controllable appliances and dryers
    /// return zeros; a dryer's energy is moved by its washing machine.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` when called before the vectors were generated.
    pub fn daily_shift(
        &self,
        weekday: usize,
        prices: &HourlyPrices,
        policy: ShiftingPolicy,
        dryer: Option<&Appliance>,
        rng: &mut RandomStream,
    ) -> EngineResult<[i64; HOURS_OF_DAY]> {
        if !self.is_controllable() || self.category() == Category::Dryer {
            return Ok([0; HOURS_OF_DAY]);
        }
        let window = shifting::shifting_window(self.possibility(weekday)?);
        let mut loads = self.week.day_load(weekday).to_vec();

        let out = match self.category().shifting_class() {
            ShiftingClass::FullyShifting => shifting::shift_periodic(
                &loads,
                fully_shifting::SHIFTING_INTERVAL,
                &window,
                prices,
                policy,
                rng,
            ),
            _ => {
                if let Some(dryer) = dryer {
                    for (q, load) in dryer.week().day_load(weekday).iter().enumerate() {
                        loads[q] += load;
                    }
                }
                shifting::shift_block(&loads, &window, prices, policy, rng)
            }
        };
        Ok(out)
    }
}
