//! Domain types used throughout the simulation.
//!
//! This module defines:
//!
//! - the sampled IV curve (`IvTrace`)
//! - cell parameters and presets (`CellParams`, `CellPreset`)
//! - bypass segments and string results (`SegmentBypass`, `StringSimResult`)
//! - scenario input (`Scenario`, `StringLayout`, `BypassTopology`)

pub mod scenario;
pub mod trace;
pub mod types;

pub use scenario::*;
pub use trace::*;
pub use types::*;
