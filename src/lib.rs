//! `pv-shade` library crate.
//!
//! Simulates series strings of photovoltaic cells under partial shading,
//! including bypass diodes that short out weak cells or segments.
//!
//! The binary (`pvs`) is a thin wrapper around this library so that the core
//! model is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod sim;
pub mod tui;
