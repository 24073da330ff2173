use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::play::{DistanceBucket, Down, ProjectedPlay};

pub const QUARTER_MIN: u8 = 1;
pub const QUARTER_MAX: u8 = 5;
/// Display label of a missing home/away role.
pub const NO_ROLE_LABEL: &str = "(none)";

/// A filter axis a panel can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Dimension {
    Team,
    Quarter,
    Down,
    Distance,
    Formation,
    HomeAway,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Self::Team => "Team(s)",
            Self::Quarter => "Quarter",
            Self::Down => "Down",
            Self::Distance => "Distance to Go",
            Self::Formation => "Formation",
            Self::HomeAway => "Home/Away Team",
        }
    }

    /// Projected column the dimension reads.
    pub fn field(self) -> &'static str {
        match self {
            Self::Team => "posteam",
            Self::Quarter => "qtr",
            Self::Down => "down",
            Self::Distance => "distance_bucket",
            Self::Formation => "offense_formation",
            Self::HomeAway => "posteam_type",
        }
    }

    pub fn is_range(self) -> bool {
        matches!(self, Self::Quarter)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How multi-choice domains are ordered for display.
///
/// `Observed`: teams, quarters and distance
/// buckets sorted, downs/formations/home-away in order of first appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainOrder {
    #[default]
    Observed,
    SortedAll,
}

/// Inclusive quarter window; always within 1..=5 with `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuarterRange {
    pub low: u8,
    pub high: u8,
}

impl QuarterRange {
    pub const FULL: QuarterRange = QuarterRange {
        low: QUARTER_MIN,
        high: QUARTER_MAX,
    };

    pub fn new(a: u8, b: u8) -> Self {
        let a = a.clamp(QUARTER_MIN, QUARTER_MAX);
        let b = b.clamp(QUARTER_MIN, QUARTER_MAX);
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn contains(self, qtr: u8) -> bool {
        self.low <= qtr && qtr <= self.high
    }

    pub fn covers(self, other: QuarterRange) -> bool {
        self.low <= other.low && other.high <= self.high
    }
}

impl Default for QuarterRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Distinct values of each dimension, computed once per season.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domains {
    pub teams: Vec<String>,
    pub quarters: Vec<u8>,
    pub downs: Vec<Down>,
    pub distances: Vec<DistanceBucket>,
    pub formations: Vec<String>,
    /// `None` is a play the source left without a role.
    pub home_away: Vec<Option<String>>,
}

impl Domains {
    pub fn from_plays(plays: &[ProjectedPlay], order: DomainOrder) -> Self {
        let mut domains = Domains {
            teams: distinct(plays.iter().map(|p| p.posteam.clone())),
            quarters: distinct(plays.iter().map(|p| p.qtr)),
            downs: distinct(plays.iter().map(|p| p.down)),
            distances: distinct(plays.iter().map(|p| p.distance_bucket)),
            formations: distinct(plays.iter().map(|p| p.offense_formation.clone())),
            home_away: distinct(plays.iter().map(|p| p.posteam_type.clone())),
        };
        domains.teams.sort();
        domains.quarters.sort();
        domains.distances.sort();
        if order == DomainOrder::SortedAll {
            domains.downs.sort();
            domains.formations.sort();
            domains.home_away.sort();
        }
        domains
    }

    pub fn len(&self, dim: Dimension) -> usize {
        match dim {
            Dimension::Team => self.teams.len(),
            Dimension::Quarter => self.quarters.len(),
            Dimension::Down => self.downs.len(),
            Dimension::Distance => self.distances.len(),
            Dimension::Formation => self.formations.len(),
            Dimension::HomeAway => self.home_away.len(),
        }
    }

    /// Display labels for a dimension, in domain order.
    pub fn labels(&self, dim: Dimension) -> Vec<String> {
        match dim {
            Dimension::Team => self.teams.clone(),
            Dimension::Quarter => self.quarters.iter().map(|q| q.to_string()).collect(),
            Dimension::Down => self.downs.iter().map(|d| d.label()).collect(),
            Dimension::Distance => self
                .distances
                .iter()
                .map(|d| d.label().to_string())
                .collect(),
            Dimension::Formation => self.formations.clone(),
            Dimension::HomeAway => self
                .home_away
                .iter()
                .map(|role| role.clone().unwrap_or_else(|| NO_ROLE_LABEL.to_string()))
                .collect(),
        }
    }
}

/// Distinct values in order of first appearance.
fn distinct<T, I>(values: I) -> Vec<T>
where
    T: Clone + Eq + std::hash::Hash,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_range_is_clamped_and_ordered() {
        assert_eq!(QuarterRange::new(4, 2), QuarterRange { low: 2, high: 4 });
        assert_eq!(QuarterRange::new(0, 9), QuarterRange::FULL);
        assert!(QuarterRange::new(2, 3).contains(3));
        assert!(!QuarterRange::new(2, 3).contains(4));
        assert!(QuarterRange::FULL.covers(QuarterRange::new(2, 3)));
    }

    #[test]
    fn missing_role_is_part_of_home_away_domain() {
        let domains = Domains {
            home_away: vec![Some("home".to_string()), None],
            ..Domains::default()
        };
        assert_eq!(domains.len(Dimension::HomeAway), 2);
        assert_eq!(domains.labels(Dimension::HomeAway), vec!["home", NO_ROLE_LABEL]);
    }

    #[test]
    fn distinct_keeps_first_appearance() {
        let values = distinct(vec!["b", "a", "b", "c", "a"]);
        assert_eq!(values, vec!["b", "a", "c"]);
    }
}
