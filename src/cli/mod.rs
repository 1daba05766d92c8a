//! Command-line parsing for the string shading simulator.
//!
//! Argument parsing and command dispatch stay separate from the simulation code;
//! `app` turns these structs into calls into the library.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

use crate::data::ShadingPattern;
use crate::domain::CellPreset;

pub mod picker;

/// Names accepted as the first argument without rewriting (see `app::rewrite_args`).
pub const SUBCOMMANDS: [&str; 5] = ["cell", "sim", "day", "init", "tui"];

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pvs", version, about = "PV string partial-shading simulator")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sweep a single cell and print its key points.
    Cell(CellArgs),
    /// Evaluate every string of a scenario.
    Sim(SimArgs),
    /// Integrate a scenario's energy over one day of sun movement.
    Day(DayArgs),
    /// Write a demo scenario file to start from.
    Init(InitArgs),
    /// Launch the interactive shading editor.
    Tui(TuiArgs),
}

/// Plot options shared by `cell` and `sim`.
#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot power instead of current against voltage.
    #[arg(long)]
    pub pv: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct CellArgs {
    #[arg(short, long, value_enum, default_value_t = CellPreset::Mono)]
    pub preset: CellPreset,

    /// Irradiance ratio (0 = dark, 1 = full sun).
    #[arg(short, long, default_value_t = 1.0)]
    pub irradiance: f64,

    /// Samples per sweep (defaults to PVS_SAMPLES or 200).
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export the cell trace to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SimArgs {
    /// Scenario JSON. Without it, an interactive picker lists `*.json` files.
    #[arg(short = 'f', long = "file", value_name = "JSON")]
    pub file: Option<PathBuf>,

    /// Overwrite the scenario's irradiance with a synthetic shading pattern.
    #[arg(long, value_enum)]
    pub pattern: Option<ShadingPattern>,

    /// Seed for the random pattern.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of light removed by the pattern (0..=1).
    #[arg(long, default_value_t = 0.8)]
    pub severity: f64,

    /// Samples per sweep (defaults to PVS_SAMPLES or 200).
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// Print the per-cell table of every string.
    #[arg(long)]
    pub cells: bool,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export string traces to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the result summary to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Write a Markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct DayArgs {
    /// Scenario JSON. Without it, an interactive picker lists `*.json` files.
    #[arg(short = 'f', long = "file", value_name = "JSON")]
    pub file: Option<PathBuf>,

    /// Day to simulate (YYYY-MM-DD, defaults to today).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Latitude in degrees (north positive).
    #[arg(long, default_value_t = 45.0, allow_negative_numbers = true)]
    pub lat: f64,

    /// Panel tilt from horizontal, degrees.
    #[arg(long, default_value_t = 30.0)]
    pub tilt: f64,

    /// Panel azimuth, degrees clockwise from north (180 = south).
    #[arg(long, default_value_t = 180.0)]
    pub azimuth: f64,

    /// Minutes between evaluations.
    #[arg(long, default_value_t = 15)]
    pub step: u32,

    /// Panel headings averaged per step (36 = any parking direction).
    #[arg(long, default_value_t = 1)]
    pub headings: u32,

    /// Hour the moving shadow enters the first cell.
    #[arg(long = "shadow-start", requires = "shadow_end")]
    pub shadow_start: Option<f64>,

    /// Hour the moving shadow leaves the last cell.
    #[arg(long = "shadow-end", requires = "shadow_start")]
    pub shadow_end: Option<f64>,

    /// Shadow width in cells.
    #[arg(long = "shadow-width", default_value_t = 2.0)]
    pub shadow_width: f64,

    /// Fraction of light the shadow removes (0..=1).
    #[arg(long = "shadow-depth", default_value_t = 0.8)]
    pub shadow_depth: f64,

    /// Samples per sweep (defaults to PVS_SAMPLES or 200).
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// How many lowest-yield cells to list.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Export the day report to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Output path.
    #[arg(short, long, default_value = "scenario.json")]
    pub out: PathBuf,

    /// Cells per string.
    #[arg(long, default_value_t = 12)]
    pub cells: usize,

    #[arg(short, long, value_enum, default_value_t = CellPreset::Mono)]
    pub preset: CellPreset,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    /// Scenario JSON (a demo installation when absent).
    #[arg(short = 'f', long = "file", value_name = "JSON")]
    pub file: Option<PathBuf>,

    /// Cells per string of the demo installation.
    #[arg(long, default_value_t = 12)]
    pub cells: usize,

    /// Preset of the demo installation.
    #[arg(short, long, value_enum, default_value_t = CellPreset::Mono)]
    pub preset: CellPreset,

    /// Samples per sweep (defaults to PVS_SAMPLES or 200).
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sim_with_pattern_and_exports() {
        let cli = Cli::try_parse_from([
            "pvs", "-vv", "sim", "-f", "roof.json", "--pattern", "random", "--seed", "7", "--plot", "--pv",
            "--export-json", "out.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Sim(args) = cli.command else {
            panic!("expected sim");
        };
        assert_eq!(args.file, Some(PathBuf::from("roof.json")));
        assert_eq!(args.pattern, Some(ShadingPattern::Random));
        assert_eq!(args.seed, 7);
        assert!(args.plot.plot && args.plot.pv);
        assert_eq!(args.export_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn parses_day_with_date_and_shadow() {
        let cli = Cli::try_parse_from([
            "pvs", "day", "--date", "2024-06-21", "--lat", "-33.9", "--shadow-start", "9", "--shadow-end", "11",
            "--headings", "36",
        ])
        .unwrap();
        let Command::Day(args) = cli.command else {
            panic!("expected day");
        };
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 6, 21));
        assert_eq!(args.lat, -33.9);
        assert_eq!((args.shadow_start, args.shadow_end), (Some(9.0), Some(11.0)));
        assert_eq!(args.headings, 36);
    }

    #[test]
    fn shadow_bounds_come_in_pairs() {
        assert!(Cli::try_parse_from(["pvs", "day", "--shadow-start", "9"]).is_err());
    }

    #[test]
    fn cell_preset_names() {
        let cli = Cli::try_parse_from(["pvs", "cell", "--preset", "thinfilm", "-i", "0.5"]).unwrap();
        let Command::Cell(args) = cli.command else {
            panic!("expected cell");
        };
        assert_eq!(args.preset, CellPreset::ThinFilm);
        assert_eq!(args.irradiance, 0.5);
    }
}
