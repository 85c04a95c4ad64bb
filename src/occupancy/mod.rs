//! Household occupancy derived from the schedules of its persons.

pub mod person;
pub mod status;

pub use person::{Person, Shift};
pub use status::{Profile, Status};

use crate::time::{QUARTERS_OF_DAY, flat_index};

/// Precomputed presence counts of one household over the whole horizon.
///
/// Appliances only ever ask two questions: is anybody on the premises, and
/// how many people are awake at home. Both are answered from flat
/// `day * 96 + quarter` tables built once from the persons' statuses.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    members: usize,
    present: Vec<u8>,
    tenants: Vec<u8>,
}

impl Occupancy {
    /// Builds the presence tables for `persons` over `horizon_days`.
    pub fn from_persons(persons: &[Person], horizon_days: usize) -> Self {
        let len = horizon_days * QUARTERS_OF_DAY;
        let mut present = vec![0u8; len];
        let mut tenants = vec![0u8; len];
        for person in persons {
            for day in 0..horizon_days {
                for quarter in 0..QUARTERS_OF_DAY {
                    let Some(status) = person.status(day, quarter) else {
                        continue;
                    };
                    let idx = flat_index(day, quarter);
                    if status.is_present() {
                        present[idx] = present[idx].saturating_add(1);
                    }
                    if status.is_tenant() {
                        tenants[idx] = tenants[idx].saturating_add(1);
                    }
                }
            }
        }
        Self {
            members: persons.len(),
            present,
            tenants,
        }
    }

    /// Number of persons living in the household.
    pub fn members(&self) -> usize {
        self.members
    }

    pub fn horizon_days(&self) -> usize {
        self.present.len() / QUARTERS_OF_DAY
    }

    /// `true` when nobody is on the premises. Days outside the horizon are empty.
    pub fn is_empty(&self, day: usize, quarter: usize) -> bool {
        self.present
            .get(flat_index(day, quarter))
            .is_none_or(|&n| n == 0)
    }

    /// Number of persons awake at home at `(day, quarter)`.
    pub fn tenants(&self, day: usize, quarter: usize) -> usize {
        self.tenants
            .get(flat_index(day, quarter))
            .map_or(0, |&n| n as usize)
    }
}
