//! Mathematical utilities: monotone interpolation and sample grids.

pub mod interp;

pub use interp::*;
