//! String simulation.
//!
//! Responsibilities:
//!
//! - aggregate cell curves into a series string (per-cell or segment bypass)
//! - pick the maximum-power operating point
//! - evaluate whole scenarios (parallel over strings)
//! - integrate energy over repeated evaluations

pub mod energy;
pub mod evaluate;
pub mod segments;
pub mod series;
pub mod sweep;

pub use energy::*;
pub use evaluate::*;
pub use segments::*;
pub use series::*;
