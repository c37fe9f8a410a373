//! Account implementations.

pub mod local;
