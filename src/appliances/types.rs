//! Appliance categories, weekly profiles and load phase helpers.

use serde::Serialize;

use crate::time::{HOURS_OF_DAY, QUARTERS_OF_DAY, QUARTERS_OF_HOUR, QUARTERS_OF_WEEK};

/// Every appliance category a household can own.
///
/// The declaration order is the order in which a household generates its
/// appliances; the washing machine precedes the dryer that depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    CirculationPump,
    ConsumerElectronics,
    Ict,
    Lights,
    Others,
    InstantHeater,
    Dishwasher,
    WashingMachine,
    Dryer,
    Stove,
    StorageHeater,
    Refrigerator,
    Freezer,
    SpaceHeater,
    AirCondition,
}

/// How an appliance reacts to the price signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShiftingClass {
    /// Runs whenever behaviour dictates; never moved.
    NotShifting,
    /// Runs a bounded number of times inside a legality window; movable within the day.
    SemiShifting,
    /// Runs in a fixed duty cycle that is legal in every quarter.
    FullyShifting,
    /// Driven by the outdoor temperature.
    WeatherSensitive,
}

impl Category {
    pub const COUNT: usize = 15;

    pub const ALL: [Category; Category::COUNT] = [
        Category::CirculationPump,
        Category::ConsumerElectronics,
        Category::Ict,
        Category::Lights,
        Category::Others,
        Category::InstantHeater,
        Category::Dishwasher,
        Category::WashingMachine,
        Category::Dryer,
        Category::Stove,
        Category::StorageHeater,
        Category::Refrigerator,
        Category::Freezer,
        Category::SpaceHeater,
        Category::AirCondition,
    ];

    /// Name used in property keys, e.g. `"ICT"` in `ICTSaturation`.
    pub fn name(self) -> &'static str {
        match self {
            Category::CirculationPump => "CirculationPump",
            Category::ConsumerElectronics => "ConsumerElectronics",
            Category::Ict => "ICT",
            Category::Lights => "Lights",
            Category::Others => "Others",
            Category::InstantHeater => "InstantHeater",
            Category::Dishwasher => "Dishwasher",
            Category::WashingMachine => "WashingMachine",
            Category::Dryer => "Dryer",
            Category::Stove => "Stove",
            Category::StorageHeater => "StorageHeater",
            Category::Refrigerator => "Refrigerator",
            Category::Freezer => "Freezer",
            Category::SpaceHeater => "SpaceHeater",
            Category::AirCondition => "AirCondition",
        }
    }

    pub fn shifting_class(self) -> ShiftingClass {
        match self {
            Category::CirculationPump
            | Category::ConsumerElectronics
            | Category::Ict
            | Category::Lights
            | Category::Others
            | Category::InstantHeater => ShiftingClass::NotShifting,
            Category::Dishwasher
            | Category::WashingMachine
            | Category::Dryer
            | Category::Stove
            | Category::StorageHeater => ShiftingClass::SemiShifting,
            Category::Refrigerator | Category::Freezer => ShiftingClass::FullyShifting,
            Category::SpaceHeater | Category::AirCondition => ShiftingClass::WeatherSensitive,
        }
    }

    /// Whether the load is billed to the interruptible (controllable) customer.
    pub fn is_controllable(self) -> bool {
        matches!(
            self.shifting_class(),
            ShiftingClass::SemiShifting | ShiftingClass::FullyShifting
        )
    }

    /// Whether the appliance may only run while somebody is on the premises.
    pub fn occupancy_dependent(self) -> bool {
        matches!(
            self,
            Category::CirculationPump
                | Category::ConsumerElectronics
                | Category::Ict
                | Category::Lights
                | Category::Others
                | Category::InstantHeater
                | Category::Stove
                | Category::AirCondition
        )
    }

    /// Length of one operation cycle in quarters.
    pub fn cycle_duration(self) -> usize {
        match self {
            Category::Dishwasher => phase_length(DISHWASHER_PHASES),
            Category::WashingMachine => phase_length(WASHER_PHASES),
            Category::Dryer => DRYER_THIRD_PHASE,
            Category::Stove => phase_length(STOVE_PHASES),
            Category::StorageHeater => phase_length(STORAGE_HEATER_PHASES),
            Category::Refrigerator | Category::Freezer => 2,
            Category::AirCondition => AIR_CONDITION_ON_QUARTERS + AIR_CONDITION_OFF_QUARTERS,
            _ => 1,
        }
    }
}

/// Load phases as `(quarters, share of nominal power)`.
pub type Phases = &'static [(usize, f64)];

pub const DISHWASHER_PHASES: Phases = &[(2, 1.0), (4, 0.25), (2, 1.0)];
pub const WASHER_PHASES: Phases = &[(2, 1.0), (5, 0.3), (1, 0.8)];
pub const STOVE_PHASES: Phases = &[(2, 1.0)];
pub const STORAGE_HEATER_PHASES: Phases = &[(2, 1.0), (2, 0.8), (2, 0.6), (2, 0.4)];

/// Dryer runs at full power until this quarter of its cycle.
pub const DRYER_SECOND_PHASE: usize = 3;
/// Dryer cycle ends at this quarter.
pub const DRYER_THIRD_PHASE: usize = 6;
/// Per-quarter load decrease of the dryer's cool-down phase (Watts).
pub const DRYER_THIRD_PHASE_LOAD: i64 = 250;

pub const AIR_CONDITION_ON_QUARTERS: usize = 3;
pub const AIR_CONDITION_OFF_QUARTERS: usize = 2;

pub fn phase_length(phases: Phases) -> usize {
    phases.iter().map(|(q, _)| q).sum()
}

/// Expands phases into per-quarter loads for a nominal `power`; every entry is at least 1 W.
pub fn phase_loads(power: i64, phases: Phases) -> Vec<i64> {
    phases
        .iter()
        .flat_map(|&(quarters, share)| {
            let load = ((power as f64 * share).round() as i64).max(1);
            std::iter::repeat_n(load, quarters)
        })
        .collect()
}

/// Weekly operation and load vectors (7 x 96, flat).
///
/// `load` is in Watts. A quarter is operating exactly when its load is
/// positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekProfile {
    operation: Vec<bool>,
    load: Vec<i64>,
}

impl Default for WeekProfile {
    fn default() -> Self {
        Self {
            operation: vec![false; QUARTERS_OF_WEEK],
            load: vec![0; QUARTERS_OF_WEEK],
        }
    }
}

impl WeekProfile {
    fn index(day: usize, quarter: usize) -> usize {
        debug_assert!(day < 7 && quarter < QUARTERS_OF_DAY);
        day * QUARTERS_OF_DAY + quarter
    }

    pub fn operation(&self, day: usize, quarter: usize) -> bool {
        self.operation[Self::index(day, quarter)]
    }

    pub fn load(&self, day: usize, quarter: usize) -> i64 {
        self.load[Self::index(day, quarter)]
    }

    /// Sets a quarter's load; non-positive loads switch the quarter off.
    pub fn set(&mut self, day: usize, quarter: usize, load: i64) {
        let idx = Self::index(day, quarter);
        self.load[idx] = load.max(0);
        self.operation[idx] = load > 0;
    }

    /// Adds load to a quarter.
    pub fn add(&mut self, day: usize, quarter: usize, load: i64) {
        let current = self.load(day, quarter);
        self.set(day, quarter, current + load);
    }

    pub fn day_operation(&self, day: usize) -> &[bool] {
        &self.operation[day * QUARTERS_OF_DAY..(day + 1) * QUARTERS_OF_DAY]
    }

    pub fn day_load(&self, day: usize) -> &[i64] {
        &self.load[day * QUARTERS_OF_DAY..(day + 1) * QUARTERS_OF_DAY]
    }

    /// Sum of quarter loads of `day` grouped per hour.
    pub fn hourly(&self, day: usize) -> [i64; HOURS_OF_DAY] {
        let mut out = [0; HOURS_OF_DAY];
        for (q, load) in self.day_load(day).iter().enumerate() {
            out[q / QUARTERS_OF_HOUR] += load;
        }
        out
    }

    /// Whether any quarter of `day` operates.
    pub fn runs_on(&self, day: usize) -> bool {
        self.day_operation(day).iter().any(|&on| on)
    }

    /// Quarter after the last operating quarter of `day`.
    pub fn end_of_operation(&self, day: usize) -> Option<usize> {
        self.day_operation(day)
            .iter()
            .rposition(|&on| on)
            .map(|q| q + 1)
    }

    pub fn clear_day(&mut self, day: usize) {
        let range = day * QUARTERS_OF_DAY..(day + 1) * QUARTERS_OF_DAY;
        self.operation[range.clone()].fill(false);
        self.load[range].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn washing_machine_precedes_dryer() {
        assert!(Category::WashingMachine < Category::Dryer);
        let pos = |c| Category::ALL.iter().position(|&x| x == c);
        assert!(pos(Category::WashingMachine) < pos(Category::Dryer));
    }

    #[test]
    fn controllable_categories_are_the_shiftable_ones() {
        assert!(Category::Freezer.is_controllable());
        assert!(Category::Dishwasher.is_controllable());
        assert!(!Category::Lights.is_controllable());
        assert!(!Category::SpaceHeater.is_controllable());
    }

    #[test]
    fn phase_loads_follow_shares() {
        assert_eq!(phase_loads(1000, DISHWASHER_PHASES), vec![
            1000, 1000, 250, 250, 250, 250, 1000, 1000
        ]);
        assert_eq!(Category::Dishwasher.cycle_duration(), 8);
    }

    #[test]
    fn set_keeps_operation_and_load_consistent() {
        let mut week = WeekProfile::default();
        week.set(2, 10, 300);
        assert!(week.operation(2, 10));
        week.set(2, 10, -5);
        assert!(!week.operation(2, 10));
        assert_eq!(week.load(2, 10), 0);
    }

    #[test]
    fn end_of_operation_is_exclusive() {
        let mut week = WeekProfile::default();
        week.set(0, 39, 100);
        assert_eq!(week.end_of_operation(0), Some(40));
        assert_eq!(week.end_of_operation(1), None);
        assert_eq!(week.hourly(0)[9], 100);
    }
}
