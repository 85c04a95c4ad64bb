//! Household electricity demand simulator for village customers.
//!
//! Households are built from persons and sampled appliances; every appliance
//! plans a weekly quarter-hour load, controllable appliances are shifted each
//! day against tariff prices, and villages bill the resulting demand to their
//! tariff subscriptions once per host activation.

#[cfg(feature = "api")]
pub mod api;
pub mod appliances;
pub mod cli;
pub mod config;
pub mod error;
pub mod forecast;
pub mod household;
pub mod io;
pub mod occupancy;
pub mod params;
pub mod rng;
pub mod runner;
pub mod shifting;
/// Simulation engine, clock, market events and run reports.
pub mod sim;
pub mod tariff;
pub mod time;
pub mod village;
pub mod weather;
