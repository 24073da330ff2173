use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::cleaner::CleanReport;
use crate::panels::{Aggregate, PanelKind};
use crate::play::Season;

pub struct PanelSheet<'a> {
    pub kind: PanelKind,
    pub aggregate: &'a Aggregate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub sheets: usize,
    pub rows: usize,
}

/// `pbp_{season}_panels_{timestamp}.xlsx` in the working directory.
pub fn default_export_path(season: Season) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("pbp_{season}_panels_{stamp}.xlsx"))
}

/// Writes a summary sheet and one sheet per panel aggregate.
pub fn export_panels(
    path: &Path,
    season: Season,
    report: Option<&CleanReport>,
    panels: &[PanelSheet<'_>],
) -> Result<ExportReport> {
    let mut summary_rows = vec![vec![
        "Panel".to_string(),
        "Rows".to_string(),
        "Plays".to_string(),
    ]];
    for panel in panels {
        summary_rows.push(vec![
            panel.kind.title().to_string(),
            panel.aggregate.len().to_string(),
            panel.aggregate.total_plays().to_string(),
        ]);
    }
    summary_rows.push(Vec::new());
    summary_rows.push(vec!["Season".to_string(), season.to_string()]);
    if let Some(report) = report {
        summary_rows.push(vec!["Cleaning".to_string(), report.summary()]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }

    let mut rows = 0usize;
    for panel in panels {
        let mut table = vec![panel.aggregate.header()];
        table.extend(panel.aggregate.table_rows());
        rows += table.len().saturating_sub(1);

        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(panel.kind))?;
        write_rows(sheet, &table)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        path: path.to_path_buf(),
        sheets: panels.len() + 1,
        rows,
    })
}

fn sheet_name(kind: PanelKind) -> &'static str {
    match kind {
        PanelKind::TeamMix => "TeamMix",
        PanelKind::ByDown => "ByDown",
        PanelKind::ByQuarter => "ByQuarter",
        PanelKind::ByDistance => "ByDistance",
        PanelKind::RunLocation => "RunLocation",
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            // Counts are written as numbers.
            if let Ok(n) = value.parse::<u64>() {
                worksheet
                    .write_number(row_idx as u32, col_idx as u16, n as f64)
                    .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
            } else {
                worksheet
                    .write_string(row_idx as u32, col_idx as u16, value)
                    .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
            }
        }
    }
    Ok(())
}
