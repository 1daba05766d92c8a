//! Synthetic inputs for the simulator.
//!
//! Responsibilities:
//! - shading patterns for quick what-if runs (`shading`)
//! - sun geometry and moving shadows over a whole day (`day`)

pub mod day;
pub mod shading;

pub use day::*;
pub use shading::*;
