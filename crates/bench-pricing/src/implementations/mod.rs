//! Price oracle implementations.

pub mod coingecko;
pub mod fixed;
