use serde::Serialize;

use crate::panels::{Aggregate, PanelKind};
use crate::play::{PlayType, Season};

pub const PLACEHOLDER: &str = "Please make your selections to generate the plot";
pub const NO_DATA: &str = "No data for the current selection";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    Scatter { label: String },
    GroupedBar,
    Bar,
}

/// One labelled scatter point (x = pass, y = run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// Bar heights for one color group, aligned with `ChartSpec::categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<Option<u64>>,
}

/// Renderer-neutral chart description built from a panel aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    pub points: Vec<ScatterPoint>,
}

impl ChartSpec {
    pub fn from_aggregate(panel: PanelKind, season: Season, aggregate: &Aggregate) -> Self {
        match aggregate {
            Aggregate::TeamMix { rows } => {
                // Teams without both play types have no position on the plot.
                let points = rows
                    .iter()
                    .filter_map(|row| {
                        Some(ScatterPoint {
                            label: row.posteam.clone(),
                            x: row.pass? as f64,
                            y: row.run? as f64,
                        })
                    })
                    .collect();
                ChartSpec {
                    title: format!("{season} Run/Pass Mix by Team"),
                    kind: ChartKind::Scatter {
                        label: "posteam".to_string(),
                    },
                    x: PlayType::Pass.to_string(),
                    y: PlayType::Run.to_string(),
                    color: None,
                    categories: Vec::new(),
                    series: Vec::new(),
                    points,
                }
            }
            Aggregate::Grouped { dimension, rows } => {
                let mut categories: Vec<String> = Vec::new();
                for row in rows {
                    if categories.last() != Some(&row.label) {
                        categories.push(row.label.clone());
                    }
                }
                let series = PlayType::ALL
                    .iter()
                    .filter(|pt| rows.iter().any(|r| r.play_type == **pt))
                    .map(|pt| BarSeries {
                        name: pt.to_string(),
                        values: categories
                            .iter()
                            .map(|cat| {
                                rows.iter()
                                    .find(|r| &r.label == cat && r.play_type == *pt)
                                    .map(|r| r.play_count)
                            })
                            .collect(),
                    })
                    .collect();
                ChartSpec {
                    title: format!("{season} {}", panel.title()),
                    kind: ChartKind::GroupedBar,
                    x: dimension.field().to_string(),
                    y: "play_count".to_string(),
                    color: Some("play_type".to_string()),
                    categories,
                    series,
                    points: Vec::new(),
                }
            }
            Aggregate::RunLocation { rows } => {
                let categories: Vec<String> = rows.iter().map(|r| r.run_location.clone()).collect();
                let series = if rows.is_empty() {
                    Vec::new()
                } else {
                    vec![BarSeries {
                        name: "play_count".to_string(),
                        values: rows.iter().map(|r| Some(r.play_count)).collect(),
                    }]
                };
                ChartSpec {
                    title: format!("{season} {}", panel.title()),
                    kind: ChartKind::Bar,
                    x: "run_location".to_string(),
                    y: "play_count".to_string(),
                    color: None,
                    categories,
                    series,
                    points: Vec::new(),
                }
            }
        }
    }

    /// True when there is nothing to draw; the renderer shows [`NO_DATA`].
    pub fn is_empty(&self) -> bool {
        match self.kind {
            ChartKind::Scatter { .. } => self.points.is_empty(),
            ChartKind::GroupedBar | ChartKind::Bar => self.categories.is_empty(),
        }
    }

    pub fn max_value(&self) -> f64 {
        let bars = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .map(|v| *v as f64);
        let points = self.points.iter().map(|p| p.x.max(p.y));
        bars.chain(points).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::Dimension;
    use crate::panels::{GroupCountRow, GroupKey, TeamMixRow};
    use crate::play::Down;

    #[test]
    fn scatter_skips_half_empty_teams() {
        let agg = Aggregate::TeamMix {
            rows: vec![
                TeamMixRow {
                    posteam: "BUF".to_string(),
                    pass: Some(3),
                    run: Some(2),
                },
                TeamMixRow {
                    posteam: "KC".to_string(),
                    pass: Some(1),
                    run: None,
                },
            ],
        };
        let spec = ChartSpec::from_aggregate(PanelKind::TeamMix, 2022, &agg);
        assert_eq!(spec.title, "2022 Run/Pass Mix by Team");
        assert_eq!(spec.points.len(), 1);
        assert_eq!(spec.points[0].label, "BUF");
        assert_eq!((spec.points[0].x, spec.points[0].y), (3.0, 2.0));
    }

    #[test]
    fn grouped_bar_aligns_series_with_categories() {
        let row = |down: u8, play_type, play_count| GroupCountRow {
            key: GroupKey::Down(Down::Number(down)),
            label: down.to_string(),
            play_type,
            play_count,
        };
        let agg = Aggregate::Grouped {
            dimension: Dimension::Down,
            rows: vec![
                row(1, PlayType::Pass, 4),
                row(1, PlayType::Run, 5),
                row(3, PlayType::Pass, 2),
            ],
        };
        let spec = ChartSpec::from_aggregate(PanelKind::ByDown, 2021, &agg);
        assert_eq!(spec.categories, vec!["1", "3"]);
        assert_eq!(spec.series[0].name, "pass");
        assert_eq!(spec.series[0].values, vec![Some(4), Some(2)]);
        assert_eq!(spec.series[1].values, vec![Some(5), None]);
        assert_eq!(spec.max_value(), 5.0);
    }

    #[test]
    fn empty_aggregate_gives_empty_chart() {
        let spec = ChartSpec::from_aggregate(
            PanelKind::RunLocation,
            2022,
            &Aggregate::RunLocation { rows: Vec::new() },
        );
        assert!(spec.is_empty());
        assert!(spec.series.is_empty());
    }
}
