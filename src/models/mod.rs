//! Device models.
//!
//! Models are implemented as small, pure functions so that the aggregation code
//! can stay generic over where the cell curves come from.

pub mod cell;

pub use cell::*;
