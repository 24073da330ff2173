use std::time::{Duration, Instant};

use pbp_terminal::chart::ChartKind;
use pbp_terminal::dashboard::{DashboardState, Delta, RangeBound, apply_delta};
use pbp_terminal::domains::{Dimension, DomainOrder, QuarterRange};
use pbp_terminal::export::{self, PanelSheet};
use pbp_terminal::loader::{self, FakeSeasonSource, SeasonLoader};
use pbp_terminal::panels::PanelKind;

fn loaded_state() -> DashboardState {
    let loader = SeasonLoader::new(FakeSeasonSource { seed: 8, games: 20 });
    let data = loader::load_season(&loader, 2022, DomainOrder::Observed).expect("season");
    let mut state = DashboardState::new(2021, "fake");
    apply_delta(&mut state, Delta::SeasonLoading(2022));
    apply_delta(
        &mut state,
        Delta::SeasonLoaded {
            engine: data.engine,
            report: data.report,
        },
    );
    state
}

#[test]
fn season_load_installs_all_panels() {
    let state = loaded_state();
    assert_eq!(state.season, 2022);
    assert_eq!(state.panels.len(), PanelKind::ALL.len());
    assert!(state.loading.is_none());
    assert!(state.panels.iter().all(|p| p.chart.is_none()));
    assert!(state.logs.iter().any(|l| l.contains("plays ready")));
}

#[test]
fn generate_then_edit_clears_the_chart() {
    let mut state = loaded_state();
    state.select_panel(PanelKind::ByDown.index());
    state.generate();
    let chart = state.active_panel().and_then(|p| p.chart.clone()).expect("chart");
    assert_eq!(chart.kind, ChartKind::GroupedBar);
    assert!(!chart.is_empty());

    let before = state.active_panel().map(|p| p.aggregate.total_plays());
    assert!(state.toggle_at_cursor());
    let panel = state.active_panel().expect("panel");
    assert!(panel.chart.is_none());
    assert!(Some(panel.aggregate.total_plays()) < before);
}

#[test]
fn selecting_nothing_yields_a_no_data_chart() {
    let mut state = loaded_state();
    state.select_panel(PanelKind::RunLocation.index());
    assert!(state.select_none_focused());
    state.generate();
    let panel = state.active_panel().expect("panel");
    assert!(panel.aggregate.is_empty());
    assert!(panel.chart.as_ref().is_some_and(|c| c.is_empty()));

    assert!(state.reset_panel());
    let panel = state.active_panel().expect("panel");
    assert!(!panel.aggregate.is_empty());
    assert!(panel.chart.is_none());
}

#[test]
fn quarter_bounds_move_and_stay_ordered() {
    let mut state = loaded_state();
    state.select_panel(PanelKind::TeamMix.index());
    state.focus_next_dim();
    assert_eq!(
        state.active_panel().map(|p| p.focused_dim()),
        Some(Dimension::Quarter)
    );

    state.cursor_down();
    assert_eq!(state.active_panel().map(|p| p.bound), Some(RangeBound::High));
    assert!(state.shift_quarter(-1));
    assert!(state.shift_quarter(-1));
    assert_eq!(
        state.active_panel().and_then(|p| p.quarter_range()),
        Some(QuarterRange { low: 1, high: 3 })
    );

    state.cursor_up();
    for _ in 0..6 {
        state.shift_quarter(1);
    }
    assert_eq!(
        state.active_panel().and_then(|p| p.quarter_range()),
        Some(QuarterRange { low: 3, high: 3 })
    );
    assert!(!state.shift_quarter(1));
}

#[test]
fn by_quarter_panel_has_no_range_widget() {
    let mut state = loaded_state();
    state.select_panel(PanelKind::ByQuarter.index());
    assert!(!state.set_quarter_range(2, 3));
    assert!(!state.shift_quarter(1));
}

#[test]
fn panel_navigation_wraps() {
    let mut state = loaded_state();
    state.prev_panel();
    assert_eq!(state.active, PanelKind::ALL.len() - 1);
    state.next_panel();
    assert_eq!(state.active, 0);
    state.select_panel(42);
    assert_eq!(state.active, 0);
}

#[test]
fn failed_season_blocks_panels() {
    let mut state = loaded_state();
    apply_delta(
        &mut state,
        Delta::SeasonFailed {
            season: 1990,
            error: "data source error for season 1990: 404".to_string(),
        },
    );
    assert_eq!(state.season, 1990);
    assert!(state.panels.is_empty());
    assert!(state.engine.is_none());
    assert!(state.load_error.is_some());
    assert!(!state.toggle_at_cursor());
    assert!(state.logs.back().is_some_and(|l| l.starts_with("[WARN]")));
}

#[test]
fn log_is_bounded() {
    let mut state = DashboardState::new(2022, "fake");
    for idx in 0..250 {
        apply_delta(&mut state, Delta::Log(format!("[INFO] line {idx}")));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] line 50"));
}

#[test]
fn export_writes_every_panel_sheet() {
    let state = loaded_state();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("panels.xlsx");
    let sheets: Vec<PanelSheet<'_>> = state
        .panels
        .iter()
        .map(|p| PanelSheet {
            kind: p.kind,
            aggregate: &p.aggregate,
        })
        .collect();

    let report =
        export::export_panels(&path, state.season, state.report.as_ref(), &sheets).expect("export");
    assert_eq!(report.sheets, PanelKind::ALL.len() + 1);
    assert!(report.rows > 0);
    assert!(path.exists());

    let mut state = state;
    apply_delta(
        &mut state,
        Delta::ExportFinished {
            path: report.path.display().to_string(),
            sheets: report.sheets,
            rows: report.rows,
        },
    );
    assert!(state.export.done);
    let later = Instant::now() + Duration::from_secs(30);
    state.maybe_clear_export(later);
    assert!(!state.export.active);
}
