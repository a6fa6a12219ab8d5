#![deny(warnings)]

//! Headless dashboard: runs a page load plus optional events, prints the
//! tables and exports workbook, JSON and report on request.

use agro_core::{EnvField, Year};
use agro_runtime::{DashboardConfig, DashboardEvent, DashboardSession, DashboardView, LabelTable};
use anyhow::{anyhow, bail, Context, Result};
use data_pipeline::{export_workbook, render_report, write_json, ReportHeader};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: agro-dashboard [--config PATH] [--history DIR] [--seed N] \
[--regenerate] [--override FIELD=VALUE]... [--range MIN:MAX] [--export DIR]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    history: Option<PathBuf>,
    seed: Option<u64>,
    /// Events after the page load, in command-line order.
    events: Vec<DashboardEvent>,
    export: Option<PathBuf>,
}

fn parse_override(s: &str) -> Result<DashboardEvent> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("--override expects FIELD=VALUE, got {s}"))?;
    let field: EnvField = field.parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("bad override value {value}"))?;
    Ok(DashboardEvent::OverrideChanged { field, value })
}

fn parse_range(s: &str) -> Result<DashboardEvent> {
    let (min, max) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("--range expects MIN:MAX, got {s}"))?;
    let min: Year = min.trim().parse().with_context(|| format!("bad year {min}"))?;
    let max: Year = max.trim().parse().with_context(|| format!("bad year {max}"))?;
    Ok(DashboardEvent::RangeFilterChanged { min, max })
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = || it.next().ok_or_else(|| anyhow!("{arg} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--history" => args.history = Some(PathBuf::from(value()?)),
            "--seed" => args.seed = Some(value()?.parse().context("--seed expects an integer")?),
            "--regenerate" => args.events.push(DashboardEvent::RegenerateRequested),
            "--override" => args.events.push(parse_override(&value()?)?),
            "--range" => args.events.push(parse_range(&value()?)?),
            "--export" => args.export = Some(PathBuf::from(value()?)),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument {other}\n{USAGE}"),
        }
    }
    Ok(args)
}

fn print_view(view: &DashboardView, labels: &LabelTable) {
    for section in view.sections(&labels.display) {
        println!("\n{}\n", section.heading);
        if section.table.rows.is_empty() {
            println!("(no rows)");
        } else {
            println!("{}", section.table.to_markdown());
        }
    }
    println!(
        "\nyears {}..={} of {}..={} | sliders T {} H {} P {} cm",
        view.year_range.min,
        view.year_range.max,
        view.forecast_span.min,
        view.forecast_span.max,
        view.sliders.temperature,
        view.sliders.humidity,
        view.sliders.precipitation
    );
}

fn export(dir: &Path, view: &DashboardView, labels: &LabelTable, header: &ReportHeader) -> Result<()> {
    let sheets = export_workbook(dir, &view.workbook())?;
    write_json(&dir.join("dashboard.json"), view)?;
    let report = render_report(
        header,
        chrono::Local::now().naive_local(),
        &view.sections(&labels.report),
    );
    let report_path = dir.join("report.md");
    std::fs::write(&report_path, report)
        .with_context(|| format!("writing {}", report_path.display()))?;
    info!(dir = %dir.display(), sheets = sheets.len(), "export complete");
    Ok(())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .init();

    let args = parse_args()?;
    info!(
        sha = env!("GIT_SHA"),
        built = env!("BUILD_DATE"),
        config = ?args.config,
        "starting agro-dashboard"
    );

    let mut config = match &args.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = args.history {
        config.history_dir = Some(dir);
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    let labels = config.labels.clone();
    let header = config.report.clone();

    let mut session = DashboardSession::new(config)?;
    info!(seed = session.seed(), "session ready");
    let mut view = session.handle(DashboardEvent::PageLoad)?;
    for event in args.events {
        view = session.handle(event)?;
    }

    print_view(&view, &labels);
    if let Some(dir) = &args.export {
        export(dir, &view, &labels, &header)?;
    }
    Ok(())
}
