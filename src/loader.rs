use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{info, warn};
use once_cell::sync::OnceCell;

use crate::cleaner::{self, CleanReport};
use crate::config::{CACHE_DIR_NAME, DashboardConfig, SourceKind};
use crate::domains::DomainOrder;
use crate::error::PipelineError;
use crate::fake_season;
use crate::http_cache::FileCache;
use crate::http_client::http_client;
use crate::panels::PanelEngine;
use crate::pbp_parquet;
use crate::play::{CLEANER_COLUMNS, RawTable, Season};
use crate::projector;

/// Where raw seasons come from.
pub trait PlaySource: Send + Sync {
    fn fetch(&self, season: Season) -> Result<RawTable, PipelineError>;

    fn describe(&self) -> String;
}

/// First season nflverse publishes participation (formation) data for.
pub const FIRST_PARTICIPATION_SEASON: Season = 2016;

/// Season files published by nflverse, cached on disk between runs.
///
/// Formations live in the separate participation release, which is joined
/// onto the play-by-play rows.
pub struct NflverseSource {
    base_url: String,
    participation_url: String,
    timeout: Duration,
    cache: FileCache,
}

impl NflverseSource {
    pub fn new(
        base_url: impl Into<String>,
        participation_url: impl Into<String>,
        timeout: Duration,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            participation_url: participation_url.into(),
            timeout,
            cache: FileCache::new(cache_dir),
        }
    }

    pub fn season_url(&self, season: Season) -> String {
        format!(
            "{}/play_by_play_{season}.parquet",
            self.base_url.trim_end_matches('/')
        )
    }

    pub fn participation_url(&self, season: Season) -> String {
        format!(
            "{}/pbp_participation_{season}.parquet",
            self.participation_url.trim_end_matches('/')
        )
    }

    fn download(&self, url: &str, key: &str) -> anyhow::Result<PathBuf> {
        let client = http_client(self.timeout)?;
        self.cache.fetch(client, url, key)
    }
}

impl PlaySource for NflverseSource {
    fn fetch(&self, season: Season) -> Result<RawTable, PipelineError> {
        let pbp = self
            .download(
                &self.season_url(season),
                &format!("play_by_play_{season}.parquet"),
            )
            .map_err(|err| PipelineError::from_chain(season, &err))?;
        let participation = if season >= FIRST_PARTICIPATION_SEASON {
            let path = self
                .download(
                    &self.participation_url(season),
                    &format!("pbp_participation_{season}.parquet"),
                )
                .map_err(|err| PipelineError::from_chain(season, &err))?;
            Some(path)
        } else {
            warn!("season {season}: no participation release before {FIRST_PARTICIPATION_SEASON}");
            None
        };
        pbp_parquet::read_season_files(&pbp, participation.as_deref(), season)
            .map_err(|err| PipelineError::from_chain(season, &err))
    }

    fn describe(&self) -> String {
        format!("nflverse ({})", self.base_url)
    }
}

/// Synthetic seasons for offline use and tests.
pub struct FakeSeasonSource {
    pub seed: u64,
    pub games: usize,
}

impl PlaySource for FakeSeasonSource {
    fn fetch(&self, season: Season) -> Result<RawTable, PipelineError> {
        Ok(fake_season::generate_season(season, self.seed, self.games))
    }

    fn describe(&self) -> String {
        format!("fake (seed {}, {} games)", self.seed, self.games)
    }
}

impl<S: PlaySource + ?Sized> PlaySource for Box<S> {
    fn fetch(&self, season: Season) -> Result<RawTable, PipelineError> {
        (**self).fetch(season)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Source selected by `PBP_SOURCE`.
pub fn source_from_config(config: &DashboardConfig) -> Box<dyn PlaySource> {
    match config.source {
        SourceKind::Nflverse => {
            let cache_dir = config
                .cache_dir
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join(CACHE_DIR_NAME));
            Box::new(NflverseSource::new(
                config.nflverse_url.clone(),
                config.participation_url.clone(),
                config.timeout,
                cache_dir,
            ))
        }
        SourceKind::Fake => Box::new(FakeSeasonSource {
            seed: config.fake_seed,
            games: config.fake_games,
        }),
    }
}

/// Memoizes a source per season for the life of the process.
///
/// Each season has its own cell, so concurrent first calls for one season
/// share a single fetch while other seasons load independently.
pub struct SeasonLoader<S> {
    source: S,
    seasons: Mutex<HashMap<Season, Arc<OnceCell<Arc<RawTable>>>>>,
}

impl<S: PlaySource> SeasonLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            seasons: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cached raw season; the source is only asked on the first call.
    ///
    /// Failures are not cached, so a later call retries.
    pub fn fetch(&self, season: Season) -> Result<Arc<RawTable>, PipelineError> {
        let cell = Arc::clone(
            self.seasons
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(season)
                .or_default(),
        );
        let table = cell.get_or_try_init(|| self.load(season))?;
        Ok(Arc::clone(table))
    }

    fn load(&self, season: Season) -> Result<Arc<RawTable>, PipelineError> {
        info!("loading season {season} from {}", self.source.describe());
        let table = self.source.fetch(season)?;
        let missing = table.missing_columns(CLEANER_COLUMNS);
        if !missing.is_empty() {
            return Err(PipelineError::data_source(
                season,
                format!("schema mismatch: missing columns {}", missing.join(", ")),
            ));
        }
        Ok(Arc::new(table))
    }

    pub fn is_cached(&self, season: Season) -> bool {
        self.seasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&season)
            .is_some_and(|cell| cell.get().is_some())
    }
}

/// A season run through the whole pipeline, ready for the panels.
pub struct SeasonData {
    pub season: Season,
    pub report: CleanReport,
    pub engine: Arc<PanelEngine>,
}

pub fn load_season<S: PlaySource>(
    loader: &SeasonLoader<S>,
    season: Season,
    order: DomainOrder,
) -> Result<SeasonData, PipelineError> {
    let raw = loader.fetch(season)?;
    let (cleaned, report) = cleaner::clean(&raw);
    let plays = projector::project(&cleaned)?;
    info!("season {season}: {} projected plays", plays.len());
    let engine = PanelEngine::new(season, plays.into(), order);
    Ok(SeasonData {
        season,
        report,
        engine: Arc::new(engine),
    })
}
