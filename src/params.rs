//! Behavioural parameters of households, persons and appliances.
//!
//! Parameters arrive as a flat `key -> value` property table. Any key that is
//! missing keeps its default; a key whose value is malformed or out of range
//! is reported as a [`ConfigError`] and also falls back to the default, so a
//! village population is always constructible.

use std::collections::BTreeMap;

use tracing::warn;

use crate::appliances::Category;
use crate::error::ConfigError;

/// Gaussian power draw (Watts) for one appliance category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSpec {
    pub mean: f64,
    pub deviation: f64,
}

impl PowerSpec {
    pub const fn new(mean: f64, deviation: f64) -> Self {
        Self { mean, deviation }
    }
}

/// All tunable constants consumed while building households.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdParams {
    /// Weights (percent) for households of 1..=5 members.
    pub household_size_weights: [u32; 5],
    /// Weights (percent) for MostlyPresent, RegularlyAbsent, PeriodicallyAbsent, RandomlyAbsent.
    pub person_profile_weights: [u32; 4],
    /// Weights (percent) for 1..=7 working days per week.
    pub working_days_weights: [u32; 7],
    pub vacation_duration_mean: f64,
    pub vacation_duration_deviation: f64,
    pub sickness_days_mean: f64,
    pub sickness_days_deviation: f64,
    /// Number of leisure days per week for each person.
    pub leisure_days: usize,
    /// Leisure outing length in quarters.
    pub leisure_duration: usize,
    /// Chance that a leisure outing moves to the late evening window.
    pub leisure_shift_probability: f64,

    saturation: [f64; Category::COUNT],
    power: [PowerSpec; Category::COUNT],

    /// A pump quarter runs when a uniform draw exceeds this value.
    pub circulation_pump_percentage: f64,
    pub consumer_electronics_percentage: f64,
    pub ict_percentage: f64,
    pub others_daily_times: usize,
    pub stove_daily_times: usize,
    pub instant_heater_daily_times: usize,
    pub dishwasher_weekly_times: usize,
    pub washing_machine_weekly_times: usize,
    pub dryer_weekly_times: usize,
    /// Chance that the storage heater runs on a given day.
    pub storage_heater_probability: f64,
    pub space_heater_temperature_mean: f64,
    pub space_heater_temperature_deviation: f64,
    /// Weights (percent) for small, medium and large air conditioners.
    pub air_condition_size_weights: [u32; 3],
    /// Weights (percent) for energy classes A..=G.
    pub air_condition_class_weights: [u32; 7],
    /// Share of air conditioners that are inverter driven.
    pub air_condition_inverter_share: f64,
    pub comfort_low_mean: f64,
    pub comfort_low_deviation: f64,
    pub comfort_high_mean: f64,
    pub comfort_high_deviation: f64,
}

impl Default for HouseholdParams {
    fn default() -> Self {
        let mut saturation = [1.0; Category::COUNT];
        let mut power = [PowerSpec::new(0.0, 0.0); Category::COUNT];
        for category in Category::ALL {
            let (sat, spec) = category_defaults(category);
            saturation[category as usize] = sat;
            power[category as usize] = spec;
        }
        Self {
            household_size_weights: [30, 30, 20, 15, 5],
            person_profile_weights: [25, 40, 15, 20],
            working_days_weights: [2, 3, 5, 10, 60, 15, 5],
            vacation_duration_mean: 10.0,
            vacation_duration_deviation: 3.0,
            sickness_days_mean: 2.0,
            sickness_days_deviation: 1.0,
            leisure_days: 2,
            leisure_duration: 8,
            leisure_shift_probability: 0.3,
            saturation,
            power,
            circulation_pump_percentage: 0.85,
            consumer_electronics_percentage: 0.6,
            ict_percentage: 0.5,
            others_daily_times: 3,
            stove_daily_times: 2,
            instant_heater_daily_times: 2,
            dishwasher_weekly_times: 3,
            washing_machine_weekly_times: 2,
            dryer_weekly_times: 1,
            storage_heater_probability: 0.8,
            space_heater_temperature_mean: 13.0,
            space_heater_temperature_deviation: 3.0,
            air_condition_size_weights: [40, 40, 20],
            air_condition_class_weights: [10, 20, 25, 20, 15, 5, 5],
            air_condition_inverter_share: 0.5,
            comfort_low_mean: 16.0,
            comfort_low_deviation: 2.0,
            comfort_high_mean: 28.0,
            comfort_high_deviation: 2.0,
        }
    }
}

fn category_defaults(category: Category) -> (f64, PowerSpec) {
    match category {
        Category::CirculationPump => (0.5, PowerSpec::new(90.0, 15.0)),
        Category::ConsumerElectronics => (1.0, PowerSpec::new(100.0, 17.0)),
        Category::Ict => (0.8, PowerSpec::new(150.0, 25.0)),
        Category::Lights => (1.0, PowerSpec::new(350.0, 58.0)),
        Category::Others => (1.0, PowerSpec::new(500.0, 83.0)),
        Category::Dishwasher => (0.6, PowerSpec::new(530.0, 88.0)),
        Category::Dryer => (0.4, PowerSpec::new(1410.0, 235.0)),
        Category::WashingMachine => (0.9, PowerSpec::new(600.0, 100.0)),
        Category::Stove => (0.95, PowerSpec::new(1840.0, 307.0)),
        Category::SpaceHeater => (0.2, PowerSpec::new(7000.0, 300.0)),
        // Air-conditioner power derives from size and energy class.
        Category::AirCondition => (0.3, PowerSpec::new(0.0, 0.0)),
        Category::StorageHeater => (0.3, PowerSpec::new(3000.0, 500.0)),
        Category::InstantHeater => (0.2, PowerSpec::new(12000.0, 2000.0)),
        Category::Refrigerator => (1.0, PowerSpec::new(140.0, 23.0)),
        Category::Freezer => (0.5, PowerSpec::new(106.0, 18.0)),
    }
}

impl HouseholdParams {
    /// Probability that a household owns an appliance of `category`.
    pub fn saturation(&self, category: Category) -> f64 {
        self.saturation[category as usize]
    }

    pub fn set_saturation(&mut self, category: Category, value: f64) {
        self.saturation[category as usize] = value.clamp(0.0, 1.0);
    }

    pub fn power(&self, category: Category) -> PowerSpec {
        self.power[category as usize]
    }

    pub fn set_power(&mut self, category: Category, spec: PowerSpec) {
        self.power[category as usize] = spec;
    }

    /// Builds parameters from a flat property table, recovering from bad values.
    ///
    /// Returns the parameters together with every error that was recovered
    /// by falling back to a default.
    pub fn from_properties(props: &BTreeMap<String, String>) -> (Self, Vec<ConfigError>) {
        let mut p = Self::default();
        let mut r = Reader {
            props,
            errors: Vec::new(),
        };

        r.weights(
            &["OnePerson", "TwoPersons", "ThreePersons", "FourPersons", "FivePersons"],
            &mut p.household_size_weights,
        );
        r.weights(
            &[
                "MostlyPresent",
                "RegularlyAbsent",
                "PeriodicallyAbsent",
                "RandomlyAbsent",
            ],
            &mut p.person_profile_weights,
        );
        r.weights(
            &[
                "OneDay",
                "TwoDays",
                "ThreeDays",
                "FourDays",
                "FiveDays",
                "SixDays",
                "SevenDays",
            ],
            &mut p.working_days_weights,
        );
        r.non_negative("VacationDurationMean", &mut p.vacation_duration_mean);
        r.non_negative("VacationDurationVariance", &mut p.vacation_duration_deviation);
        r.non_negative("SicknessMean", &mut p.sickness_days_mean);
        r.non_negative("SicknessVariance", &mut p.sickness_days_deviation);
        r.count("LeisureDays", &mut p.leisure_days, 7);
        r.count("LeisureDuration", &mut p.leisure_duration, 96);
        r.probability("LeisureShiftPercentage", &mut p.leisure_shift_probability);

        for category in Category::ALL {
            let name = category.name();
            r.probability(
                &format!("{name}Saturation"),
                &mut p.saturation[category as usize],
            );
            r.non_negative(
                &format!("{name}PowerMean"),
                &mut p.power[category as usize].mean,
            );
            r.non_negative(
                &format!("{name}PowerVariance"),
                &mut p.power[category as usize].deviation,
            );
        }

        r.probability("CirculationPumpPercentage", &mut p.circulation_pump_percentage);
        r.probability(
            "ConsumerElectronicsPercentage",
            &mut p.consumer_electronics_percentage,
        );
        r.probability("ICTPercentage", &mut p.ict_percentage);
        r.count("OthersDailyTimes", &mut p.others_daily_times, 96);
        r.count("StoveDailyTimes", &mut p.stove_daily_times, 8);
        r.count("InstantHeaterDailyTimes", &mut p.instant_heater_daily_times, 96);
        r.count("DishwasherWeeklyTimes", &mut p.dishwasher_weekly_times, 7);
        r.count(
            "WashingMachineWeeklyTimes",
            &mut p.washing_machine_weekly_times,
            7,
        );
        r.count("DryerWeeklyTimes", &mut p.dryer_weekly_times, 7);
        r.probability("StorageHeaterPercentage", &mut p.storage_heater_probability);
        r.any("SpaceHeaterTemperatureMean", &mut p.space_heater_temperature_mean);
        r.non_negative(
            "SpaceHeaterTemperatureVariance",
            &mut p.space_heater_temperature_deviation,
        );
        r.weights(
            &["AirConditionSmall", "AirConditionMedium", "AirConditionLarge"],
            &mut p.air_condition_size_weights,
        );
        r.weights(
            &[
                "AirConditionClassA",
                "AirConditionClassB",
                "AirConditionClassC",
                "AirConditionClassD",
                "AirConditionClassE",
                "AirConditionClassF",
                "AirConditionClassG",
            ],
            &mut p.air_condition_class_weights,
        );
        r.probability(
            "AirConditionInverterPercentage",
            &mut p.air_condition_inverter_share,
        );
        r.any("ComfortLowMean", &mut p.comfort_low_mean);
        r.non_negative("ComfortLowVariance", &mut p.comfort_low_deviation);
        r.any("ComfortHighMean", &mut p.comfort_high_mean);
        r.non_negative("ComfortHighVariance", &mut p.comfort_high_deviation);

        if p.comfort_low_mean >= p.comfort_high_mean {
            r.reject(
                "ComfortLowMean",
                "must be below ComfortHighMean; using defaults for both",
            );
            let d = Self::default();
            p.comfort_low_mean = d.comfort_low_mean;
            p.comfort_high_mean = d.comfort_high_mean;
        }

        (p, r.errors)
    }
}

struct Reader<'a> {
    props: &'a BTreeMap<String, String>,
    errors: Vec<ConfigError>,
}

impl Reader<'_> {
    fn reject(&mut self, key: &str, message: &str) {
        warn!(key, message, "falling back to default property value");
        self.errors.push(ConfigError::new(key, message));
    }

    fn parse<T: std::str::FromStr>(&mut self, key: &str) -> Option<T> {
        let raw = self.props.get(key)?;
        match raw.trim().parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.reject(key, &format!("cannot parse \"{raw}\""));
                None
            }
        }
    }

    fn any(&mut self, key: &str, slot: &mut f64) {
        if let Some(v) = self.parse::<f64>(key) {
            if v.is_finite() {
                *slot = v;
            } else {
                self.reject(key, "must be finite");
            }
        }
    }

    fn non_negative(&mut self, key: &str, slot: &mut f64) {
        if let Some(v) = self.parse::<f64>(key) {
            if v.is_finite() && v >= 0.0 {
                *slot = v;
            } else {
                self.reject(key, "must be a finite value >= 0");
            }
        }
    }

    fn probability(&mut self, key: &str, slot: &mut f64) {
        if let Some(v) = self.parse::<f64>(key) {
            if (0.0..=1.0).contains(&v) {
                *slot = v;
            } else {
                self.reject(key, "must be in [0.0, 1.0]");
            }
        }
    }

    fn count(&mut self, key: &str, slot: &mut usize, max: usize) {
        if let Some(v) = self.parse::<usize>(key) {
            if v <= max {
                *slot = v;
            } else {
                self.reject(key, &format!("must be <= {max}"));
            }
        }
    }

    /// Reads a percentage distribution; it is only applied when it sums to 100.
    fn weights<const N: usize>(&mut self, keys: &[&str; N], slot: &mut [u32; N]) {
        if !keys.iter().any(|k| self.props.contains_key(*k)) {
            return;
        }
        let mut next = *slot;
        for (i, key) in keys.iter().enumerate() {
            match self.parse::<u32>(key) {
                Some(v) => next[i] = v,
                None if self.props.contains_key(*key) => return,
                None => next[i] = 0,
            }
        }
        if next.iter().sum::<u32>() == 100 {
            *slot = next;
        } else {
            self.reject(keys[0], "distribution must sum to 100");
        }
    }
}
