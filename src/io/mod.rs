//! Input/output helpers.
//!
//! - scenario + preset JSON read/write (`scenario`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod scenario;

pub use export::*;
pub use scenario::*;
