use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::chart::ChartSpec;
use crate::cleaner::CleanReport;
use crate::domains::{Dimension, Domains, QUARTER_MAX, QUARTER_MIN, QuarterRange};
use crate::panels::{Aggregate, PanelEngine, PanelKind, Selection};
use crate::play::Season;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Low,
    High,
}

/// Widget state of one panel plus its current aggregate.
///
/// `chart` is only filled by [`DashboardState::generate`] and is cleared by
/// every selection edit.
#[derive(Debug, Clone)]
pub struct PanelState {
    pub kind: PanelKind,
    pub selection: Selection,
    pub aggregate: Arc<Aggregate>,
    pub chart: Option<ChartSpec>,
    pub dim_focus: usize,
    pub cursor: usize,
    pub bound: RangeBound,
}

impl PanelState {
    fn new(kind: PanelKind, selection: Selection, aggregate: Arc<Aggregate>) -> Self {
        Self {
            kind,
            selection,
            aggregate,
            chart: None,
            dim_focus: 0,
            cursor: 0,
            bound: RangeBound::Low,
        }
    }

    pub fn focused_dim(&self) -> Dimension {
        let dims = self.kind.dimensions();
        dims[self.dim_focus.min(dims.len() - 1)]
    }

    pub fn quarter_range(&self) -> Option<QuarterRange> {
        self.selection.quarters
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportState {
    pub active: bool,
    pub done: bool,
    pub path: Option<String>,
    pub message: String,
    pub last_updated: Option<Instant>,
}

impl ExportState {
    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.active || !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::default();
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub season: Season,
    pub source_label: String,
    pub engine: Option<Arc<PanelEngine>>,
    pub report: Option<CleanReport>,
    pub panels: Vec<PanelState>,
    pub active: usize,
    pub loading: Option<Season>,
    pub load_error: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub export: ExportState,
}

#[derive(Debug, Clone)]
pub enum Delta {
    SeasonLoading(Season),
    SeasonLoaded {
        engine: Arc<PanelEngine>,
        report: CleanReport,
    },
    SeasonFailed {
        season: Season,
        error: String,
    },
    ExportFinished {
        path: String,
        sheets: usize,
        rows: usize,
    },
    ExportFailed(String),
    Log(String),
}

impl DashboardState {
    pub fn new(season: Season, source_label: impl Into<String>) -> Self {
        Self {
            season,
            source_label: source_label.into(),
            engine: None,
            report: None,
            panels: Vec::new(),
            active: 0,
            loading: None,
            load_error: None,
            logs: VecDeque::new(),
            help_overlay: false,
            export: ExportState::default(),
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn domains(&self) -> Option<&Domains> {
        self.engine.as_deref().map(PanelEngine::domains)
    }

    pub fn active_panel(&self) -> Option<&PanelState> {
        self.panels.get(self.active)
    }

    pub fn select_panel(&mut self, idx: usize) {
        if idx < PanelKind::ALL.len() {
            self.active = idx;
        }
    }

    pub fn next_panel(&mut self) {
        self.active = (self.active + 1) % PanelKind::ALL.len();
    }

    pub fn prev_panel(&mut self) {
        let total = PanelKind::ALL.len();
        self.active = (self.active + total - 1) % total;
    }

    pub fn focus_next_dim(&mut self) {
        if let Some(panel) = self.panels.get_mut(self.active) {
            let total = panel.kind.dimensions().len();
            panel.dim_focus = (panel.dim_focus + 1) % total;
            panel.cursor = 0;
        }
    }

    pub fn focus_prev_dim(&mut self) {
        if let Some(panel) = self.panels.get_mut(self.active) {
            let total = panel.kind.dimensions().len();
            panel.dim_focus = (panel.dim_focus + total - 1) % total;
            panel.cursor = 0;
        }
    }

    /// Moves down the value list, or to the upper bound on the quarter widget.
    pub fn cursor_down(&mut self) {
        let Some(total) = self.focused_len() else {
            return;
        };
        let Some(panel) = self.panels.get_mut(self.active) else {
            return;
        };
        if panel.focused_dim().is_range() {
            panel.bound = RangeBound::High;
        } else if total > 0 {
            panel.cursor = (panel.cursor + 1) % total;
        }
    }

    pub fn cursor_up(&mut self) {
        let Some(total) = self.focused_len() else {
            return;
        };
        let Some(panel) = self.panels.get_mut(self.active) else {
            return;
        };
        if panel.focused_dim().is_range() {
            panel.bound = RangeBound::Low;
        } else if total > 0 {
            panel.cursor = (panel.cursor + total - 1) % total;
        }
    }

    fn focused_len(&self) -> Option<usize> {
        let panel = self.active_panel()?;
        Some(self.domains()?.len(panel.focused_dim()))
    }

    pub fn toggle_at_cursor(&mut self) -> bool {
        self.edit_active(|panel, domains| {
            let dim = panel.focused_dim();
            panel.selection.toggle(domains, dim, panel.cursor)
        })
    }

    pub fn select_all_focused(&mut self) -> bool {
        self.edit_active(|panel, domains| {
            let dim = panel.focused_dim();
            if !panel.selection.is_active(dim) {
                return false;
            }
            panel.selection.select_all(domains, dim);
            true
        })
    }

    pub fn select_none_focused(&mut self) -> bool {
        self.edit_active(|panel, _| {
            let dim = panel.focused_dim();
            if dim.is_range() || !panel.selection.is_active(dim) {
                return false;
            }
            panel.selection.select_none(dim);
            true
        })
    }

    /// Moves the focused quarter bound by `step`; the range stays ordered.
    pub fn shift_quarter(&mut self, step: i8) -> bool {
        self.edit_active(|panel, _| {
            let Some(range) = panel.selection.quarters else {
                return false;
            };
            if !panel.focused_dim().is_range() {
                return false;
            }
            let moved = |v: u8| {
                (v as i16 + step as i16).clamp(QUARTER_MIN as i16, QUARTER_MAX as i16) as u8
            };
            let (low, high) = match panel.bound {
                RangeBound::Low => (moved(range.low).min(range.high), range.high),
                RangeBound::High => (range.low, moved(range.high).max(range.low)),
            };
            if (low, high) == (range.low, range.high) {
                return false;
            }
            panel.selection.set_quarter_range(low, high)
        })
    }

    pub fn set_quarter_range(&mut self, low: u8, high: u8) -> bool {
        self.edit_active(|panel, _| panel.selection.set_quarter_range(low, high))
    }

    pub fn reset_panel(&mut self) -> bool {
        self.edit_active(|panel, domains| {
            panel.selection = Selection::for_panel(panel.kind, domains);
            true
        })
    }

    /// Draws the active panel's chart from its current aggregate.
    pub fn generate(&mut self) {
        let season = self.season;
        if let Some(panel) = self.panels.get_mut(self.active) {
            panel.chart = Some(ChartSpec::from_aggregate(
                panel.kind,
                season,
                &panel.aggregate,
            ));
        }
    }

    fn edit_active(&mut self, edit: impl FnOnce(&mut PanelState, &Domains) -> bool) -> bool {
        let Some(engine) = self.engine.clone() else {
            return false;
        };
        let Some(panel) = self.panels.get_mut(self.active) else {
            return false;
        };
        if !edit(panel, engine.domains()) {
            return false;
        }
        panel.aggregate = engine.aggregate(panel.kind, &panel.selection);
        panel.chart = None;
        true
    }

    fn install(&mut self, engine: Arc<PanelEngine>, report: CleanReport) {
        self.season = engine.season();
        self.panels = engine
            .default_aggregates()
            .into_iter()
            .map(|(kind, aggregate)| PanelState::new(kind, engine.default_selection(kind), aggregate))
            .collect();
        self.engine = Some(engine);
        self.report = Some(report);
        self.loading = None;
        self.load_error = None;
    }
}

pub fn apply_delta(state: &mut DashboardState, delta: Delta) {
    match delta {
        Delta::SeasonLoading(season) => {
            state.loading = Some(season);
            state.push_log(format!("[INFO] Loading season {season}"));
        }
        Delta::SeasonLoaded { engine, report } => {
            let season = engine.season();
            let plays = engine.plays().len();
            state.install(engine, report.clone());
            state.push_log(format!("[INFO] Season {season}: {}", report.summary()));
            if report.defect_total() > 0 {
                state.push_log(format!(
                    "[WARN] Season {season}: {} rows dropped for data-quality defects",
                    report.defect_total()
                ));
            }
            state.push_log(format!("[INFO] {plays} plays ready"));
        }
        Delta::SeasonFailed { season, error } => {
            state.season = season;
            state.engine = None;
            state.report = None;
            state.panels.clear();
            state.loading = None;
            state.push_log(format!("[WARN] Season {season} failed: {error}"));
            state.load_error = Some(error);
        }
        Delta::ExportFinished { path, sheets, rows } => {
            state.export = ExportState {
                active: true,
                done: true,
                path: Some(path.clone()),
                message: format!("Exported {sheets} sheets ({rows} rows)"),
                last_updated: Some(Instant::now()),
            };
            state.push_log(format!("[INFO] Export complete: {path}"));
        }
        Delta::ExportFailed(err) => {
            state.export = ExportState {
                active: true,
                done: true,
                path: None,
                message: format!("Export failed: {err}"),
                last_updated: Some(Instant::now()),
            };
            state.push_log(format!("[WARN] Export failed: {err}"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
