//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads settings (`.env`, presets)
//! - runs the requested command
//! - prints reports/plots and writes optional exports

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use crate::cli::{CellArgs, Command, DayArgs, InitArgs, PlotArgs, SUBCOMMANDS, SimArgs, TuiArgs};
use crate::config::Settings;
use crate::data::{DayConfig, MovingShadow, run_day};
use crate::domain::{CellSpec, PresetTable, Scenario};
use crate::error::AppError;
use crate::plot::{PlotKind, PlotSeries};

pub mod pipeline;

use pipeline::{PatternSpec, ScenarioSource};

/// Entry point for the `pvs` binary.
pub fn run() -> Result<(), AppError> {
    // `pvs` and `pvs -f x.json` behave like `pvs tui ...`; clap needs the
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // Log lines would corrupt the alternate screen.
    let quiet = matches!(cli.command, Command::Tui(_));
    crate::logging::init(cli.verbose, quiet);

    let settings = Settings::from_env()?;
    let presets = settings.preset_table()?;

    match cli.command {
        Command::Cell(args) => handle_cell(args, &settings),
        Command::Sim(args) => handle_sim(args, &settings, &presets),
        Command::Day(args) => handle_day(args, &settings, &presets),
        Command::Init(args) => handle_init(args),
        Command::Tui(args) => handle_tui(args, &settings, &presets),
    }
}

fn plot_kind(args: &PlotArgs) -> PlotKind {
    if args.pv { PlotKind::Pv } else { PlotKind::Iv }
}

fn handle_cell(args: CellArgs, settings: &Settings) -> Result<(), AppError> {
    if !args.irradiance.is_finite() {
        return Err(AppError::new(2, "Irradiance must be a finite number."));
    }
    let opts = settings.sweep(args.samples);
    let params = args.preset.params();
    let irradiance = CellSpec::lit(args.irradiance).irradiance_ratio();
    let trace = crate::models::build_cell_trace(&params, irradiance, opts);

    println!(
        "{}",
        crate::report::format_cell_summary(args.preset.name(), &params, irradiance, &trace)
    );

    if args.plot.plot {
        let plot = crate::plot::render_trace_plot(&trace, plot_kind(&args.plot), args.plot.width, args.plot.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::write_named_traces_csv(path, [(args.preset.name(), &trace)])?;
        info!(path = %path.display(), "cell trace exported");
    }
    Ok(())
}

fn resolve_scenario_path(file: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match file {
        Some(path) => Ok(path),
        None => crate::cli::picker::prompt_for_scenario_path(),
    }
}

fn handle_sim(args: SimArgs, settings: &Settings, presets: &PresetTable) -> Result<(), AppError> {
    let path = resolve_scenario_path(args.file.clone())?;
    let scenario = pipeline::load_scenario(ScenarioSource::File(&path), presets)?;
    let pattern = args.pattern.map(|pattern| PatternSpec {
        pattern,
        severity: args.severity,
        seed: args.seed,
    });
    let run = pipeline::run_scenario(scenario, presets, pattern, settings.sweep(args.samples))?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.scenario, &run.evals, run.opts)
    );

    if args.cells {
        for eval in &run.evals {
            println!("{}", crate::report::format_string_cells(&run.scenario, eval));
        }
    }

    if args.plot.plot {
        let series: Vec<PlotSeries<'_>> = run
            .evals
            .iter()
            .map(|e| PlotSeries {
                label: &e.name,
                trace: &e.result.trace,
            })
            .collect();
        let plot = crate::plot::render_ascii_plot(&series, plot_kind(&args.plot), args.plot.width, args.plot.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::write_traces_csv(path, &run.evals)?;
    }
    if let Some(path) = &args.export_json {
        let summary = crate::io::ResultsSummary::new(&run.scenario.name, run.opts.samples, &run.evals);
        crate::io::write_results_json(path, &summary)?;
    }
    if args.debug {
        let path = crate::debug::write_debug_bundle(
            Path::new("debug"),
            &run.scenario,
            &run.presets,
            &run.evals,
            run.opts,
            crate::debug::DEFAULT_STRIDE,
        )?;
        println!("Wrote debug bundle: {}", path.display());
    }

    Ok(())
}

pub fn day_config_from_args(args: &DayArgs) -> DayConfig {
    let shadow = match (args.shadow_start, args.shadow_end) {
        (Some(start_hour), Some(end_hour)) => Some(MovingShadow {
            start_hour,
            end_hour,
            width_cells: args.shadow_width,
            depth: args.shadow_depth,
        }),
        _ => None,
    };
    DayConfig {
        date: args.date.unwrap_or_else(|| Local::now().date_naive()),
        latitude_deg: args.lat,
        tilt_deg: args.tilt,
        azimuth_deg: args.azimuth,
        step_minutes: args.step,
        headings: args.headings,
        shadow,
    }
}

fn handle_day(args: DayArgs, settings: &Settings, presets: &PresetTable) -> Result<(), AppError> {
    let path = resolve_scenario_path(args.file.clone())?;
    let scenario = pipeline::load_scenario(ScenarioSource::File(&path), presets)?;
    let cfg = day_config_from_args(&args);

    let cancel = AtomicBool::new(false);
    let report = run_day(&scenario, presets, &cfg, settings.sweep(args.samples), &cancel)?;

    let weakest = crate::report::rank_weakest_cells(&report.ledger, args.top);
    println!("{}", crate::report::format_day_summary(&scenario, &report, &weakest));

    if let Some(path) = &args.export_json {
        crate::io::write_day_json(path, &report)?;
    }
    Ok(())
}

fn handle_init(args: InitArgs) -> Result<(), AppError> {
    if args.cells == 0 {
        return Err(AppError::new(2, "--cells must be at least 1."));
    }
    if args.out.exists() && !args.force {
        return Err(AppError::new(
            2,
            format!("{} already exists (use --force to overwrite).", args.out.display()),
        ));
    }
    let scenario = Scenario::demo(args.cells, args.preset);
    crate::io::write_scenario_json(&args.out, &scenario)?;
    println!(
        "Wrote {} ({} strings x {} cells, preset {}).",
        args.out.display(),
        scenario.strings.len(),
        args.cells,
        args.preset.name()
    );
    Ok(())
}

fn handle_tui(args: TuiArgs, settings: &Settings, presets: &PresetTable) -> Result<(), AppError> {
    let source = match &args.file {
        Some(path) => ScenarioSource::File(path),
        None => ScenarioSource::Demo {
            cells_per_string: args.cells,
            preset: args.preset,
        },
    };
    let scenario = pipeline::load_scenario(source, presets)?;
    if scenario.strings.iter().all(|s| s.cells.is_empty()) {
        warn!("scenario has no cells in any string");
    }
    crate::tui::run(scenario, presets, settings.sweep(args.samples))
}

/// Rewrite argv so `pvs` defaults to `pvs tui`.
///
/// Rules:
/// - `pvs`                      -> `pvs tui`
/// - `pvs -f x.json ...`        -> `pvs tui -f x.json ...`
/// - `pvs --help/--version/-h`  -> unchanged (top-level help/version)
pub fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version || SUBCOMMANDS.contains(&arg1.as_str()) {
        return argv;
    }

    // Leading flags before any subcommand are tui flags (or the global -v).
    if arg1.starts_with('-') && !argv[1..].iter().any(|a| SUBCOMMANDS.contains(&a.as_str())) {
        argv.insert(1, "tui".to_string());
    }
    argv
}
