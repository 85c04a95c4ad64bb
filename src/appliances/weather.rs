//! Weather-sensitive heating and cooling appliances.
//!
//! Their weekly vectors start out empty on every refresh; each hour the
//! village feeds the outdoor temperature in and the hour's four quarters are
//! filled from it.

use serde::Serialize;

use crate::params::HouseholdParams;
use crate::rng::RandomStream;
use crate::time::QUARTERS_OF_HOUR;

use super::DayInput;
use super::types::{AIR_CONDITION_OFF_QUARTERS, AIR_CONDITION_ON_QUARTERS, WeekProfile};

/// BTU/h to Watts.
const BTU_TO_WATT: f64 = 0.293_071;
/// Extra load of an inverter unit in the first quarter of a run.
const INVERTER_START_OVERSHOOT: f64 = 0.09;
/// Share of nominal load an inverter unit settles at.
const INVERTER_MEAN: f64 = 0.5;

/// Ramp-up of the space heater starts at this quarter.
pub const SPACE_HEATER_PHASE_1: usize = 9;
/// Full power from this quarter.
pub const SPACE_HEATER_PHASE_2: usize = 16;
/// Ramp-down from this quarter.
pub const SPACE_HEATER_PHASE_3: usize = 86;
/// Off from this quarter.
pub const SPACE_HEATER_PHASE_4: usize = 90;
/// Load step of the ramps in Watts.
pub const SPACE_HEATER_PHASE_LOAD: i64 = 750;

/// Cooling capacity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcSize {
    Small,
    Medium,
    Large,
}

impl AcSize {
    pub const ALL: [AcSize; 3] = [AcSize::Small, AcSize::Medium, AcSize::Large];

    /// Capacity in BTU/h.
    pub fn capacity(self) -> f64 {
        match self {
            AcSize::Small => 9000.0,
            AcSize::Medium => 12000.0,
            AcSize::Large => 18000.0,
        }
    }
}

/// Energy label A (best) to G.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnergyClass {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl EnergyClass {
    pub const ALL: [EnergyClass; 7] = [
        EnergyClass::A,
        EnergyClass::B,
        EnergyClass::C,
        EnergyClass::D,
        EnergyClass::E,
        EnergyClass::F,
        EnergyClass::G,
    ];

    /// Cooling efficiency (W/W).
    pub fn eer(self) -> f64 {
        match self {
            EnergyClass::A => 3.2,
            EnergyClass::B => 3.0,
            EnergyClass::C => 2.8,
            EnergyClass::D => 2.6,
            EnergyClass::E => 2.4,
            EnergyClass::F => 2.2,
            EnergyClass::G => 2.0,
        }
    }

    /// Heating efficiency (W/W).
    pub fn cop(self) -> f64 {
        match self {
            EnergyClass::A => 3.6,
            EnergyClass::B => 3.4,
            EnergyClass::C => 3.2,
            EnergyClass::D => 2.8,
            EnergyClass::E => 2.6,
            EnergyClass::F => 2.4,
            EnergyClass::G => 2.2,
        }
    }
}

/// Physical parameters of one air conditioner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AirConditioner {
    pub size: AcSize,
    pub class: EnergyClass,
    pub inverter: bool,
    /// Heating starts below this outdoor temperature (°C).
    pub comfort_low: f64,
    /// Cooling starts above this outdoor temperature (°C).
    pub comfort_high: f64,
}

impl AirConditioner {
    pub fn sample(params: &HouseholdParams, rng: &mut RandomStream) -> Self {
        let size = AcSize::ALL[rng.weighted_index(&params.air_condition_size_weights)];
        let class = EnergyClass::ALL[rng.weighted_index(&params.air_condition_class_weights)];
        let inverter = rng.coin(params.air_condition_inverter_share);
        let comfort_low = rng.normal(params.comfort_low_mean, params.comfort_low_deviation);
        let comfort_high = rng
            .normal(params.comfort_high_mean, params.comfort_high_deviation)
            .max(comfort_low + 1.0);
        Self {
            size,
            class,
            inverter,
            comfort_low,
            comfort_high,
        }
    }

    pub fn cooling_power(&self) -> i64 {
        (self.size.capacity() * BTU_TO_WATT / self.class.eer()).round() as i64
    }

    pub fn heating_power(&self) -> i64 {
        (self.size.capacity() * BTU_TO_WATT / self.class.cop()).round() as i64
    }

    /// Nominal load for an outdoor temperature, or `None` inside the comfort band.
    pub fn demand(&self, temperature: f64) -> Option<i64> {
        if temperature < self.comfort_low {
            Some(self.heating_power())
        } else if temperature > self.comfort_high {
            Some(self.cooling_power())
        } else {
            None
        }
    }
}

fn hour_quarters(hour: usize) -> std::ops::Range<usize> {
    hour * QUARTERS_OF_HOUR..(hour + 1) * QUARTERS_OF_HOUR
}

/// Space-heater load at a quarter of a heating day.
pub fn space_heater_profile(power: i64, quarter: usize) -> i64 {
    let load = match quarter {
        q if (SPACE_HEATER_PHASE_1..SPACE_HEATER_PHASE_2).contains(&q) => {
            SPACE_HEATER_PHASE_LOAD * (q - SPACE_HEATER_PHASE_1 + 1) as i64
        }
        q if (SPACE_HEATER_PHASE_2..SPACE_HEATER_PHASE_3).contains(&q) => power,
        q if (SPACE_HEATER_PHASE_3..SPACE_HEATER_PHASE_4).contains(&q) => {
            power - SPACE_HEATER_PHASE_LOAD * (q - SPACE_HEATER_PHASE_3 + 1) as i64
        }
        _ => 0,
    };
    load.clamp(0, power)
}

/// Space heater: runs its daily profile for the hour when it is colder than `threshold`.
pub(crate) fn space_heater_hour(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    hour: usize,
    temperature: f64,
    threshold: f64,
) {
    for q in hour_quarters(hour) {
        let load = if temperature < threshold {
            space_heater_profile(input.power, q)
        } else {
            0
        };
        week.set(input.weekday, q, load);
    }
}

/// Air conditioner: heats or cools while somebody is on the premises.
///
/// A conventional unit cycles on and off; an inverter unit overshoots in the
/// first quarter of a run and then settles at a fraction of nominal load.
pub(crate) fn air_condition_hour(
    week: &mut WeekProfile,
    input: &DayInput<'_>,
    unit: &AirConditioner,
    hour: usize,
    temperature: f64,
) {
    let demand = unit.demand(temperature);
    for q in hour_quarters(hour) {
        let load = match demand {
            Some(power) if !input.occupancy.is_empty(input.day, q) => {
                if unit.inverter {
                    let running = q > 0 && week.operation(input.weekday, q - 1);
                    let share = if running {
                        INVERTER_MEAN
                    } else {
                        1.0 + INVERTER_START_OVERSHOOT
                    };
                    ((power as f64 * share).round() as i64).max(1)
                } else if q % (AIR_CONDITION_ON_QUARTERS + AIR_CONDITION_OFF_QUARTERS)
                    < AIR_CONDITION_ON_QUARTERS
                {
                    power
                } else {
                    0
                }
            }
            _ => 0,
        };
        week.set(input.weekday, q, load);
    }
}
