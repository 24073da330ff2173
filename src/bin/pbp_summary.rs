use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use log::info;

use pbp_terminal::chart::ChartSpec;
use pbp_terminal::config::{DashboardConfig, SourceKind};
use pbp_terminal::export::{self, PanelSheet};
use pbp_terminal::loader::{self, SeasonLoader};
use pbp_terminal::panels::Aggregate;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = DashboardConfig::from_env();
    if let Some(raw) = flag_value(&args, "--season") {
        config.season = raw
            .parse()
            .with_context(|| format!("invalid --season value: {raw}"))?;
    }
    if let Some(raw) = flag_value(&args, "--source") {
        config.source =
            SourceKind::parse(&raw).ok_or_else(|| anyhow!("unknown --source: {raw}"))?;
    }
    let out = flag_value(&args, "--out").map(PathBuf::from);
    let json = args.iter().any(|a| a == "--json");

    let loader = SeasonLoader::new(loader::source_from_config(&config));
    info!("source: {}", loader.source().describe());
    let data = loader::load_season(&loader, config.season, config.domain_order)?;
    let aggregates = data.engine.default_aggregates();
    if aggregates.is_empty() {
        bail!("no panels computed for season {}", data.season);
    }

    if json {
        let charts: Vec<ChartSpec> = aggregates
            .iter()
            .map(|(kind, agg)| ChartSpec::from_aggregate(*kind, data.season, agg))
            .collect();
        println!("{}", serde_json::to_string_pretty(&charts)?);
    } else {
        println!("Season {}: {}", data.season, data.report.summary());
        for (kind, agg) in &aggregates {
            println!();
            println!("== {} ({} rows, {} plays)", kind.title(), agg.len(), agg.total_plays());
            print_table(agg);
        }
    }

    if let Some(path) = out {
        let sheets: Vec<PanelSheet<'_>> = aggregates
            .iter()
            .map(|(kind, agg)| PanelSheet {
                kind: *kind,
                aggregate: agg,
            })
            .collect();
        let report = export::export_panels(&path, data.season, Some(&data.report), &sheets)?;
        eprintln!(
            "wrote {} ({} sheets, {} rows)",
            report.path.display(),
            report.sheets,
            report.rows
        );
    }

    Ok(())
}

fn print_table(agg: &Aggregate) {
    let header = agg.header();
    let rows = agg.table_rows();
    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(idx) {
                *w = (*w).max(cell.len());
            }
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(idx, c)| format!("{c:<width$}", width = widths.get(idx).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(&header));
    for row in &rows {
        println!("{}", line(row));
    }
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix)
            && !v.trim().is_empty()
        {
            return Some(v.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
