//! Per-quarter person status and person behaviour profiles.

use serde::Serialize;

/// What a person is doing during one quarter-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Sleeping,
    Working,
    AtLeisure,
    AtHome,
    OnVacation,
    Sick,
}

impl Status {
    /// Whether the person counts as being on the premises.
    ///
    /// Sleeping and sick persons are inside the house; working persons and
    /// those on vacation are away. A person at leisure is treated as present,
    /// which is the predicate appliance scheduling relies on.
    pub fn is_present(self) -> bool {
        matches!(
            self,
            Status::Sleeping | Status::AtHome | Status::AtLeisure | Status::Sick
        )
    }

    /// Whether the person is awake at home and able to use appliances.
    pub fn is_tenant(self) -> bool {
        self == Status::AtHome
    }
}

/// Weekly working pattern of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Profile {
    /// Never works outside the house.
    MostlyPresent,
    /// Fixed day shift on the chosen working days.
    RegularlyAbsent,
    /// Works one of three fixed eight-hour shifts.
    PeriodicallyAbsent,
    /// Shift start and length drawn at random.
    RandomlyAbsent,
}

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::MostlyPresent,
        Profile::RegularlyAbsent,
        Profile::PeriodicallyAbsent,
        Profile::RandomlyAbsent,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_predicate() {
        assert!(Status::Sleeping.is_present());
        assert!(Status::AtHome.is_present());
        assert!(Status::AtLeisure.is_present());
        assert!(Status::Sick.is_present());
        assert!(!Status::Working.is_present());
        assert!(!Status::OnVacation.is_present());
    }

    #[test]
    fn only_at_home_counts_as_tenant() {
        assert!(Status::AtHome.is_tenant());
        assert!(!Status::Sleeping.is_tenant());
        assert!(!Status::AtLeisure.is_tenant());
    }
}
