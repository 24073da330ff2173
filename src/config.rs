use std::path::PathBuf;
use std::time::Duration;

use crate::domains::DomainOrder;
use crate::play::Season;

pub const DEFAULT_SEASON: Season = 2022;
pub const DEFAULT_NFLVERSE_URL: &str =
    "https://github.com/nflverse/nflverse-data/releases/download/pbp";
pub const DEFAULT_PARTICIPATION_URL: &str =
    "https://github.com/nflverse/nflverse-data/releases/download/pbp_participation";
pub const CACHE_DIR_NAME: &str = "pbp_terminal";

const DEFAULT_TIMEOUT_SECS: u64 = 180;
const MIN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FAKE_GAMES: usize = 272;
const MAX_FAKE_GAMES: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Nflverse,
    Fake,
}

impl SourceKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nflverse" | "remote" => Some(Self::Nflverse),
            "fake" | "synthetic" => Some(Self::Fake),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Nflverse => "nflverse",
            Self::Fake => "fake",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub season: Season,
    pub source: SourceKind,
    pub nflverse_url: String,
    pub participation_url: String,
    pub timeout: Duration,
    pub cache_dir: Option<PathBuf>,
    pub fake_seed: u64,
    pub fake_games: usize,
    pub domain_order: DomainOrder,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let season = get("PBP_SEASON")
            .and_then(|v| v.trim().parse::<Season>().ok())
            .unwrap_or(DEFAULT_SEASON);
        let source = get("PBP_SOURCE")
            .and_then(|v| SourceKind::parse(&v))
            .unwrap_or(SourceKind::Nflverse);
        let nflverse_url = get("PBP_NFLVERSE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_NFLVERSE_URL.to_string());
        let participation_url = get("PBP_PARTICIPATION_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PARTICIPATION_URL.to_string());
        let timeout_secs = get("PBP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(MIN_TIMEOUT_SECS);
        let cache_dir = get("PBP_CACHE_DIR")
            .map(|v| PathBuf::from(v.trim()))
            .or_else(|| default_cache_dir(&get));
        let fake_seed = get("PBP_FAKE_SEED")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEASON as u64);
        let fake_games = get("PBP_FAKE_GAMES")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_FAKE_GAMES)
            .clamp(1, MAX_FAKE_GAMES);
        let domain_order = match get("PBP_SORT_ALL_DOMAINS").as_deref().map(str::trim) {
            Some("1") | Some("true") | Some("yes") => DomainOrder::SortedAll,
            _ => DomainOrder::Observed,
        };

        Self {
            season,
            source,
            nflverse_url,
            participation_url,
            timeout: Duration::from_secs(timeout_secs),
            cache_dir,
            fake_seed,
            fake_games,
            domain_order,
        }
    }
}

fn default_cache_dir(get: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(base) = get("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(CACHE_DIR_NAME));
    }
    let home = get("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR_NAME))
}
