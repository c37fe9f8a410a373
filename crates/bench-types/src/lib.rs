//! Shared types for the bridge aggregator benchmark.
//!
//! Every other crate in the workspace depends on this one for the static
//! chain and token tables, the protocol support matrix, the normalized report
//! schema and the route/transaction types that flow between plugins.

pub mod chains;
pub mod protocols;
pub mod report;
pub mod route;
pub mod tokens;
pub mod transaction;
pub mod units;
pub mod validation;

pub use chains::*;
pub use protocols::*;
pub use report::*;
pub use route::*;
pub use tokens::*;
pub use transaction::*;
pub use units::*;
pub use validation::*;
