//! Terminal plots (`ascii`).

pub mod ascii;

pub use ascii::*;
