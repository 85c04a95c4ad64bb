/// Simulation clock handing out timeslots.
pub mod clock;
pub mod engine;
/// Scheduled tariff market changes.
pub mod event;
pub mod kpi;
pub mod types;
