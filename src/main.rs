//! natality-weeks - delivery method by gestational week
//!
//! Command-line front end and interactive viewer over the `natality_weeks`
//! library.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (unreadable input, invalid layout, bad filter, write failure)

mod app;
mod cli;
mod state;
mod ui;

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eframe::egui;

use app::NatalityApp;
use cli::{Args, Command, ExportArgs, ReportArgs};
use natality_weeks::analysis::{tabulate, tabulate_buckets};
use natality_weeks::config::{Config, DEFAULT_CONFIG_FILE};
use natality_weeks::data::loader;
use natality_weeks::report::chart::save_chart;
use natality_weeks::report::export::{WeeklyExport, write_json};
use natality_weeks::report::summary::render_summary;
use state::AppState;

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    log::debug!("Arguments: {args:?}");

    if let Err(e) = run(args) {
        log::error!("{e:#}");
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = || Config::load_or_default(args.config.as_deref());

    match args.command {
        Command::Report(report) => run_report(config()?, report),
        Command::Export(export) => run_export(config()?, export),
        Command::Convert { input, output } => {
            let dataset = loader::load_file(&input, &config()?.layout())?;
            loader::save_file(&dataset, &output)?;
            println!("Converted {} records to {}", dataset.len(), output.display());
            Ok(())
        }
        Command::View { input } => run_viewer(config()?, input.as_deref()),
        Command::InitConfig => handle_init_config(),
    }
}

/// Write a default natality.toml, refusing to overwrite an existing one.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        return Err(anyhow!(
            "{DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually."
        ));
    }

    let content = Config::default_toml()?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;

    println!("Created {DEFAULT_CONFIG_FILE} with default settings.");
    Ok(())
}

fn run_report(mut config: Config, args: ReportArgs) -> Result<()> {
    args.filter.apply(&mut config.filter);
    config.filter.validate().context("invalid filter")?;

    let dataset = loader::load_file(&args.input, &config.layout())?;
    let table = tabulate(&dataset, &config.filter);

    print!("{}", render_summary(&table, &config.filter));

    let chart = if args.no_chart {
        None
    } else {
        args.png.or(config.output.chart)
    };
    if let Some(path) = chart {
        save_chart(&table, &config.filter, &path)?;
        println!("\nChart written to {}", path.display());
    }

    if let Some(path) = args.json.or(config.output.weekly_json) {
        write_json(&WeeklyExport::new(&table, &config.filter), &path)?;
        println!("Weekly table written to {}", path.display());
    }
    Ok(())
}

fn run_export(mut config: Config, args: ExportArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let dataset = loader::load_file(&args.input, &config.layout())?;
    let buckets = tabulate_buckets(&dataset, &config.buckets, config.filter.weeks);

    write_json(&buckets, &config.output.export)?;
    println!(
        "Exported {} buckets ({} births) to {}",
        config.buckets.bucket_count(),
        buckets.total(),
        config.output.export.display()
    );
    Ok(())
}

fn run_viewer(config: Config, input: Option<&Path>) -> Result<()> {
    let mut state = AppState::new(config.layout(), config.filter);
    if let Some(path) = input {
        state.open(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Natality Weeks – Delivery Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(NatalityApp::new(state)))),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}
