use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::domains::{Dimension, DomainOrder, Domains, QuarterRange};
use crate::play::{DistanceBucket, Down, PlayType, ProjectedPlay, Season};

pub const MEMO_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    TeamMix,
    ByDown,
    ByQuarter,
    ByDistance,
    RunLocation,
}

impl PanelKind {
    pub const ALL: [PanelKind; 5] = [
        PanelKind::TeamMix,
        PanelKind::ByDown,
        PanelKind::ByQuarter,
        PanelKind::ByDistance,
        PanelKind::RunLocation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::TeamMix => "NFL Teams Play Mix",
            Self::ByDown => "NFL Play Types by Down",
            Self::ByQuarter => "NFL Play Types by Quarter",
            Self::ByDistance => "NFL Play Types by Distance to Go",
            Self::RunLocation => "NFL Run Location",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::TeamMix => "Team mix",
            Self::ByDown => "By down",
            Self::ByQuarter => "By quarter",
            Self::ByDistance => "By distance",
            Self::RunLocation => "Run location",
        }
    }

    /// Filter widgets the panel exposes, in display order.
    pub fn dimensions(self) -> &'static [Dimension] {
        use Dimension as D;
        match self {
            Self::TeamMix => &[D::Team, D::Quarter, D::Down, D::Distance],
            Self::ByDown => &[D::Team, D::Quarter, D::Distance, D::Formation, D::HomeAway],
            Self::ByQuarter => &[D::Team, D::Down, D::Distance, D::Formation, D::HomeAway],
            Self::ByDistance => &[D::Team, D::Quarter, D::Down, D::Formation, D::HomeAway],
            Self::RunLocation => &[
                D::Team,
                D::Quarter,
                D::Down,
                D::Distance,
                D::Formation,
                D::HomeAway,
            ],
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_label())
    }
}

/// Current widget values of one panel. `None` marks a dimension the panel
/// does not expose; it never constrains the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    pub teams: Option<BTreeSet<String>>,
    pub quarters: Option<QuarterRange>,
    pub downs: Option<BTreeSet<Down>>,
    pub distances: Option<BTreeSet<DistanceBucket>>,
    pub formations: Option<BTreeSet<String>>,
    pub home_away: Option<BTreeSet<Option<String>>>,
}

impl Selection {
    /// Every exposed dimension at its full domain.
    pub fn for_panel(kind: PanelKind, domains: &Domains) -> Self {
        let mut selection = Selection::default();
        for dim in kind.dimensions() {
            selection.select_all(domains, *dim);
        }
        selection
    }

    pub fn is_active(&self, dim: Dimension) -> bool {
        match dim {
            Dimension::Team => self.teams.is_some(),
            Dimension::Quarter => self.quarters.is_some(),
            Dimension::Down => self.downs.is_some(),
            Dimension::Distance => self.distances.is_some(),
            Dimension::Formation => self.formations.is_some(),
            Dimension::HomeAway => self.home_away.is_some(),
        }
    }

    /// AND across active dimensions.
    pub fn matches(&self, play: &ProjectedPlay) -> bool {
        member(&self.teams, &play.posteam)
            && self.quarters.is_none_or(|range| range.contains(play.qtr))
            && member(&self.downs, &play.down)
            && member(&self.distances, &play.distance_bucket)
            && member(&self.formations, &play.offense_formation)
            && member(&self.home_away, &play.posteam_type)
    }

    /// Flips membership of the domain value at `index`. Returns false when
    /// the dimension is inactive, is the quarter range, or `index` is out of range.
    pub fn toggle(&mut self, domains: &Domains, dim: Dimension, index: usize) -> bool {
        match dim {
            Dimension::Team => flip(&mut self.teams, domains.teams.get(index)),
            Dimension::Quarter => false,
            Dimension::Down => flip(&mut self.downs, domains.downs.get(index)),
            Dimension::Distance => flip(&mut self.distances, domains.distances.get(index)),
            Dimension::Formation => flip(&mut self.formations, domains.formations.get(index)),
            Dimension::HomeAway => flip(&mut self.home_away, domains.home_away.get(index)),
        }
    }

    /// Restores `dim` to its full domain and activates it.
    pub fn select_all(&mut self, domains: &Domains, dim: Dimension) {
        match dim {
            Dimension::Team => self.teams = Some(domains.teams.iter().cloned().collect()),
            Dimension::Quarter => self.quarters = Some(QuarterRange::FULL),
            Dimension::Down => self.downs = Some(domains.downs.iter().copied().collect()),
            Dimension::Distance => {
                self.distances = Some(domains.distances.iter().copied().collect())
            }
            Dimension::Formation => {
                self.formations = Some(domains.formations.iter().cloned().collect())
            }
            Dimension::HomeAway => {
                self.home_away = Some(domains.home_away.iter().cloned().collect())
            }
        }
    }

    /// Empties an active multi-choice dimension. The quarter range has no empty state.
    pub fn select_none(&mut self, dim: Dimension) {
        match dim {
            Dimension::Team => clear(&mut self.teams),
            Dimension::Quarter => {}
            Dimension::Down => clear(&mut self.downs),
            Dimension::Distance => clear(&mut self.distances),
            Dimension::Formation => clear(&mut self.formations),
            Dimension::HomeAway => clear(&mut self.home_away),
        }
    }

    /// Returns false when the panel has no quarter widget.
    pub fn set_quarter_range(&mut self, low: u8, high: u8) -> bool {
        if self.quarters.is_none() {
            return false;
        }
        self.quarters = Some(QuarterRange::new(low, high));
        true
    }

    pub fn is_selected(&self, domains: &Domains, dim: Dimension, index: usize) -> bool {
        match dim {
            Dimension::Team => contains(&self.teams, domains.teams.get(index)),
            Dimension::Quarter => domains
                .quarters
                .get(index)
                .is_some_and(|q| self.quarters.is_some_and(|r| r.contains(*q))),
            Dimension::Down => contains(&self.downs, domains.downs.get(index)),
            Dimension::Distance => contains(&self.distances, domains.distances.get(index)),
            Dimension::Formation => contains(&self.formations, domains.formations.get(index)),
            Dimension::HomeAway => contains(&self.home_away, domains.home_away.get(index)),
        }
    }

    /// Number of chosen values, `None` for an inactive or range dimension.
    pub fn selected_len(&self, dim: Dimension) -> Option<usize> {
        match dim {
            Dimension::Team => self.teams.as_ref().map(BTreeSet::len),
            Dimension::Quarter => None,
            Dimension::Down => self.downs.as_ref().map(BTreeSet::len),
            Dimension::Distance => self.distances.as_ref().map(BTreeSet::len),
            Dimension::Formation => self.formations.as_ref().map(BTreeSet::len),
            Dimension::HomeAway => self.home_away.as_ref().map(BTreeSet::len),
        }
    }
}

fn member<T: Ord>(set: &Option<BTreeSet<T>>, value: &T) -> bool {
    set.as_ref().is_none_or(|s| s.contains(value))
}

fn contains<T: Ord>(set: &Option<BTreeSet<T>>, value: Option<&T>) -> bool {
    match (set, value) {
        (Some(set), Some(value)) => set.contains(value),
        _ => false,
    }
}

fn flip<T: Ord + Clone>(set: &mut Option<BTreeSet<T>>, value: Option<&T>) -> bool {
    let (Some(set), Some(value)) = (set.as_mut(), value) else {
        return false;
    };
    if !set.remove(value) {
        set.insert(value.clone());
    }
    true
}

fn clear<T>(set: &mut Option<BTreeSet<T>>) {
    if let Some(set) = set.as_mut() {
        set.clear();
    }
}

/// Group key of the by-down/by-quarter/by-distance panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Down(Down),
    Quarter(u8),
    Distance(DistanceBucket),
}

impl GroupKey {
    pub fn label(self) -> String {
        match self {
            Self::Down(down) => down.label(),
            Self::Quarter(q) => q.to_string(),
            Self::Distance(bucket) => bucket.label().to_string(),
        }
    }
}

/// Long-to-wide team row. A play type the team never ran under the current
/// filter is `None`, not zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMixRow {
    pub posteam: String,
    pub pass: Option<u64>,
    pub run: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCountRow {
    #[serde(skip)]
    pub key: GroupKey,
    pub label: String,
    pub play_type: PlayType,
    pub play_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRow {
    pub run_location: String,
    pub play_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    TeamMix {
        rows: Vec<TeamMixRow>,
    },
    Grouped {
        dimension: Dimension,
        rows: Vec<GroupCountRow>,
    },
    RunLocation {
        rows: Vec<LocationRow>,
    },
}

impl Aggregate {
    pub fn len(&self) -> usize {
        match self {
            Self::TeamMix { rows } => rows.len(),
            Self::Grouped { rows, .. } => rows.len(),
            Self::RunLocation { rows } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of every count cell.
    pub fn total_plays(&self) -> u64 {
        match self {
            Self::TeamMix { rows } => rows
                .iter()
                .map(|r| r.pass.unwrap_or(0) + r.run.unwrap_or(0))
                .sum(),
            Self::Grouped { rows, .. } => rows.iter().map(|r| r.play_count).sum(),
            Self::RunLocation { rows } => rows.iter().map(|r| r.play_count).sum(),
        }
    }

    pub fn header(&self) -> Vec<String> {
        let cols: Vec<&str> = match self {
            Self::TeamMix { .. } => vec!["posteam", "pass", "run"],
            Self::Grouped { dimension, .. } => vec![dimension.field(), "play_type", "play_count"],
            Self::RunLocation { .. } => vec!["run_location", "play_count"],
        };
        cols.into_iter().map(str::to_string).collect()
    }

    /// Rows as display strings; missing pivot cells are blank.
    pub fn table_rows(&self) -> Vec<Vec<String>> {
        let opt = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();
        match self {
            Self::TeamMix { rows } => rows
                .iter()
                .map(|r| vec![r.posteam.clone(), opt(r.pass), opt(r.run)])
                .collect(),
            Self::Grouped { rows, .. } => rows
                .iter()
                .map(|r| {
                    vec![
                        r.label.clone(),
                        r.play_type.to_string(),
                        r.play_count.to_string(),
                    ]
                })
                .collect(),
            Self::RunLocation { rows } => rows
                .iter()
                .map(|r| vec![r.run_location.clone(), r.play_count.to_string()])
                .collect(),
        }
    }
}

/// Plays a panel aggregates: the selection filter, plus the run restriction
/// of the run-location panel. Run plays without a location are left out.
pub fn panel_matches(kind: PanelKind, selection: &Selection, play: &ProjectedPlay) -> bool {
    if !selection.matches(play) {
        return false;
    }
    match kind {
        PanelKind::RunLocation => play.play_type == PlayType::Run && play.run_location.is_some(),
        _ => true,
    }
}

/// Filters `plays` and applies the panel's grouping recipe.
pub fn compute(kind: PanelKind, plays: &[ProjectedPlay], selection: &Selection) -> Aggregate {
    let matched = plays.iter().filter(|p| panel_matches(kind, selection, p));
    match kind {
        PanelKind::TeamMix => {
            let mut teams: BTreeMap<&str, (Option<u64>, Option<u64>)> = BTreeMap::new();
            for play in matched {
                let entry = teams.entry(play.posteam.as_str()).or_default();
                let slot = match play.play_type {
                    PlayType::Pass => &mut entry.0,
                    PlayType::Run => &mut entry.1,
                };
                *slot = Some(slot.unwrap_or(0) + u64::from(play.play_count));
            }
            Aggregate::TeamMix {
                rows: teams
                    .into_iter()
                    .map(|(team, (pass, run))| TeamMixRow {
                        posteam: team.to_string(),
                        pass,
                        run,
                    })
                    .collect(),
            }
        }
        PanelKind::ByDown => grouped(Dimension::Down, matched, |p| GroupKey::Down(p.down)),
        PanelKind::ByQuarter => grouped(Dimension::Quarter, matched, |p| GroupKey::Quarter(p.qtr)),
        PanelKind::ByDistance => grouped(Dimension::Distance, matched, |p| {
            GroupKey::Distance(p.distance_bucket)
        }),
        PanelKind::RunLocation => {
            let mut locations: BTreeMap<&str, u64> = BTreeMap::new();
            for play in matched {
                if let Some(location) = play.run_location.as_deref() {
                    *locations.entry(location).or_insert(0) += u64::from(play.play_count);
                }
            }
            Aggregate::RunLocation {
                rows: locations
                    .into_iter()
                    .map(|(location, play_count)| LocationRow {
                        run_location: location.to_string(),
                        play_count,
                    })
                    .collect(),
            }
        }
    }
}

fn grouped<'a>(
    dimension: Dimension,
    plays: impl Iterator<Item = &'a ProjectedPlay>,
    key: impl Fn(&ProjectedPlay) -> GroupKey,
) -> Aggregate {
    let mut counts: BTreeMap<(GroupKey, PlayType), u64> = BTreeMap::new();
    for play in plays {
        *counts.entry((key(play), play.play_type)).or_insert(0) += u64::from(play.play_count);
    }
    Aggregate::Grouped {
        dimension,
        rows: counts
            .into_iter()
            .map(|((key, play_type), play_count)| GroupCountRow {
                key,
                label: key.label(),
                play_type,
                play_count,
            })
            .collect(),
    }
}

type MemoKey = (PanelKind, Selection);

/// One season's projected plays with their domains and a bounded memo of
/// panel aggregates. A new season gets a new engine.
pub struct PanelEngine {
    season: Season,
    plays: Arc<[ProjectedPlay]>,
    domains: Domains,
    memo: Mutex<HashMap<MemoKey, Arc<Aggregate>>>,
}

impl fmt::Debug for PanelEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelEngine")
            .field("season", &self.season)
            .field("plays", &self.plays.len())
            .field("memo", &self.memo_len())
            .finish()
    }
}

impl PanelEngine {
    pub fn new(season: Season, plays: Arc<[ProjectedPlay]>, order: DomainOrder) -> Self {
        let domains = Domains::from_plays(&plays, order);
        Self {
            season,
            plays,
            domains,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn plays(&self) -> &[ProjectedPlay] {
        &self.plays
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn default_selection(&self, kind: PanelKind) -> Selection {
        Selection::for_panel(kind, &self.domains)
    }

    pub fn aggregate(&self, kind: PanelKind, selection: &Selection) -> Arc<Aggregate> {
        let key = (kind, selection.clone());
        {
            let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = memo.get(&key) {
                debug!("memo hit for {kind} (season {})", self.season);
                return Arc::clone(hit);
            }
        }

        let computed = Arc::new(compute(kind, &self.plays, selection));
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if memo.len() >= MEMO_CAPACITY {
            debug!("panel memo full ({MEMO_CAPACITY}), clearing");
            memo.clear();
        }
        memo.insert(key, Arc::clone(&computed));
        computed
    }

    /// Computes several panels in parallel over the shared play table.
    pub fn aggregate_all(&self, requests: &[(PanelKind, Selection)]) -> Vec<Arc<Aggregate>> {
        requests
            .par_iter()
            .map(|(kind, selection)| self.aggregate(*kind, selection))
            .collect()
    }

    /// Default aggregate of every panel, in [`PanelKind::ALL`] order.
    pub fn default_aggregates(&self) -> Vec<(PanelKind, Arc<Aggregate>)> {
        let requests: Vec<MemoKey> = PanelKind::ALL
            .iter()
            .map(|kind| (*kind, self.default_selection(*kind)))
            .collect();
        PanelKind::ALL
            .iter()
            .copied()
            .zip(self.aggregate_all(&requests))
            .collect()
    }

    pub fn memo_len(&self) -> usize {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
