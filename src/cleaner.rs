use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};

use crate::play::{
    CleanedPlay, CleanedTable, DISTANCE_BUCKET_COLUMN, DistanceBucket, Down, PlayType,
    REGULAR_SEASON, RawPlay, RawTable,
};

/// Why a row that survived the play filters still had to be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataQualityDefect {
    MissingYardsToGo,
    MissingPosteam,
    InvalidQuarter,
    InvalidDown,
}

impl fmt::Display for DataQualityDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MissingYardsToGo => "missing ydstogo",
            Self::MissingPosteam => "missing posteam",
            Self::InvalidQuarter => "invalid qtr",
            Self::InvalidDown => "invalid down",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub input_rows: usize,
    pub scrambles_reclassified: usize,
    pub dropped_non_scrimmage: usize,
    pub dropped_non_regular: usize,
    pub downs_filled: usize,
    pub dropped_no_formation: usize,
    pub defects: BTreeMap<DataQualityDefect, usize>,
    pub output_rows: usize,
}

impl CleanReport {
    pub fn defect_total(&self) -> usize {
        self.defects.values().sum()
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} rows -> {} plays ({} scrambles as pass, {} non-run/pass, {} non-regular, {} 2pt downs, {} no formation",
            self.input_rows,
            self.output_rows,
            self.scrambles_reclassified,
            self.dropped_non_scrimmage,
            self.dropped_non_regular,
            self.downs_filled,
            self.dropped_no_formation,
        );
        for (defect, count) in &self.defects {
            line.push_str(&format!(", {count} {defect}"));
        }
        line.push(')');
        line
    }

    fn defect(&mut self, kind: DataQualityDefect) {
        *self.defects.entry(kind).or_insert(0) += 1;
    }
}

/// Runs the cleaning steps in order over a raw season.
pub fn clean(table: &RawTable) -> (CleanedTable, CleanReport) {
    let mut report = CleanReport {
        input_rows: table.plays.len(),
        ..CleanReport::default()
    };
    let mut plays = Vec::with_capacity(table.plays.len());

    for raw in &table.plays {
        if let Some(play) = clean_row(raw, &mut report) {
            plays.push(play);
        }
    }
    report.output_rows = plays.len();

    let mut columns = table.columns.clone();
    columns.insert(DISTANCE_BUCKET_COLUMN.to_string());

    info!("season {} cleaned: {}", table.season, report.summary());
    if report.defect_total() > 0 {
        warn!(
            "season {}: dropped {} rows with data-quality defects",
            table.season,
            report.defect_total()
        );
    }

    (
        CleanedTable {
            season: table.season,
            columns,
            plays,
        },
        report,
    )
}

fn clean_row(raw: &RawPlay, report: &mut CleanReport) -> Option<CleanedPlay> {
    // A scramble is a designed pass, whatever the source labelled it.
    let scramble = raw.qb_scramble.unwrap_or(false);
    if scramble && raw.play_type.as_deref() != Some(PlayType::Pass.as_str()) {
        report.scrambles_reclassified += 1;
    }
    let play_type = if scramble {
        PlayType::Pass
    } else {
        let Some(kind) = raw.play_type.as_deref().and_then(PlayType::parse) else {
            report.dropped_non_scrimmage += 1;
            return None;
        };
        kind
    };

    if raw.season_type.as_deref() != Some(REGULAR_SEASON) {
        report.dropped_non_regular += 1;
        return None;
    }

    let down = match raw.down {
        Some(down) => down,
        None => {
            report.downs_filled += 1;
            Down::TwoPointConversion
        }
    };

    let Some(offense_formation) = raw.offense_formation.clone() else {
        report.dropped_no_formation += 1;
        return None;
    };

    let Some(yards_to_go) = raw.ydstogo.filter(|v| !v.is_nan()) else {
        report.defect(DataQualityDefect::MissingYardsToGo);
        return None;
    };
    let Some(posteam) = raw.posteam.clone().filter(|t| !t.trim().is_empty()) else {
        report.defect(DataQualityDefect::MissingPosteam);
        return None;
    };
    let Some(qtr) = raw
        .qtr
        .filter(|q| (1..=5).contains(q))
        .and_then(|q| u8::try_from(q).ok())
    else {
        report.defect(DataQualityDefect::InvalidQuarter);
        return None;
    };
    if !down.is_valid() {
        report.defect(DataQualityDefect::InvalidDown);
        return None;
    }

    Some(CleanedPlay {
        source: raw.clone(),
        play_type,
        down,
        posteam,
        qtr,
        yards_to_go,
        distance_bucket: DistanceBucket::from_yards(yards_to_go),
        offense_formation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RawPlay {
        RawPlay {
            posteam: Some("BUF".to_string()),
            season_type: Some("REG".to_string()),
            play_type: Some("run".to_string()),
            qtr: Some(1),
            down: Some(Down::Number(1)),
            ydstogo: Some(10.0),
            offense_formation: Some("SINGLEBACK".to_string()),
            ..RawPlay::default()
        }
    }

    fn run(rows: Vec<RawPlay>) -> (CleanedTable, CleanReport) {
        clean(&RawTable::with_full_schema(2022, rows))
    }

    #[test]
    fn scramble_counted_once_even_if_already_pass() {
        let mut as_run = base();
        as_run.qb_scramble = Some(true);
        let mut as_pass = base();
        as_pass.qb_scramble = Some(true);
        as_pass.play_type = Some("pass".to_string());
        let (table, report) = run(vec![as_run, as_pass]);
        assert_eq!(report.scrambles_reclassified, 1);
        assert!(table.plays.iter().all(|p| p.play_type == PlayType::Pass));
    }

    #[test]
    fn scramble_rescues_non_scrimmage_label() {
        let mut row = base();
        row.play_type = Some("no_play".to_string());
        row.qb_scramble = Some(true);
        let (table, report) = run(vec![row]);
        assert_eq!(report.dropped_non_scrimmage, 0);
        assert_eq!(table.plays[0].play_type, PlayType::Pass);
    }

    #[test]
    fn defects_are_counted_not_fatal() {
        let mut no_ytg = base();
        no_ytg.ydstogo = None;
        let mut nan_ytg = base();
        nan_ytg.ydstogo = Some(f64::NAN);
        let mut bad_qtr = base();
        bad_qtr.qtr = Some(7);
        let mut bad_down = base();
        bad_down.down = Some(Down::Number(0));
        let mut no_team = base();
        no_team.posteam = Some("  ".to_string());
        let (table, report) = run(vec![no_ytg, nan_ytg, bad_qtr, bad_down, no_team, base()]);
        assert_eq!(table.plays.len(), 1);
        assert_eq!(report.defects[&DataQualityDefect::MissingYardsToGo], 2);
        assert_eq!(report.defects[&DataQualityDefect::InvalidQuarter], 1);
        assert_eq!(report.defects[&DataQualityDefect::InvalidDown], 1);
        assert_eq!(report.defects[&DataQualityDefect::MissingPosteam], 1);
        assert_eq!(report.defect_total(), 5);
    }

    #[test]
    fn adds_bucket_column_to_schema() {
        let (table, _) = run(vec![base()]);
        assert!(table.columns.contains(DISTANCE_BUCKET_COLUMN));
        assert_eq!(table.plays[0].distance_bucket, DistanceBucket::Long);
    }

    #[test]
    fn summary_mentions_defects() {
        let mut row = base();
        row.posteam = None;
        let (_, report) = run(vec![row]);
        assert!(report.summary().contains("1 missing posteam"));
    }
}
