//! Token aggregator plugins.
//!
//! Each module exposes a `ConfigSchema` for its `[protocols.<name>]` table and
//! a `create_*` factory used by [`crate::create_aggregator`].

pub mod cowswap;
pub mod lifi;
pub mod socket;
pub mod uniswap;
pub mod xy;
