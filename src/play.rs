use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub type Season = u16;

pub const REGULAR_SEASON: &str = "REG";
pub const PLAY_COUNT_COLUMN: &str = "play_count";
pub const DISTANCE_BUCKET_COLUMN: &str = "distance_bucket";

/// Columns the cleaner reads. A source without any of them is unusable.
pub const CLEANER_COLUMNS: &[&str] = &[
    "play_type",
    "qb_scramble",
    "season_type",
    "down",
    "offense_formation",
    "ydstogo",
    "posteam",
    "qtr",
];

/// Fixed, ordered column list kept by the projector (`play_count` is appended after it).
pub const PROJECTED_COLUMNS: &[&str] = &[
    "home_team",
    "away_team",
    "season_type",
    "week",
    "posteam",
    "posteam_type",
    "defteam",
    "side_of_field",
    "score_differential",
    "yardline_100",
    "game_date",
    "quarter_seconds_remaining",
    "half_seconds_remaining",
    "game_seconds_remaining",
    "game_half",
    "quarter_end",
    "drive",
    "qtr",
    "down",
    "goal_to_go",
    "time",
    "yrdln",
    "ydstogo",
    "ydsnet",
    "play_type",
    "yards_gained",
    "shotgun",
    "no_huddle",
    "pass_length",
    "air_yards",
    "run_location",
    "run_gap",
    "posteam_timeouts_remaining",
    "defteam_timeouts_remaining",
    "fg_prob",
    "td_prob",
    "epa",
    "third_down_converted",
    "third_down_failed",
    "fourth_down_converted",
    "fourth_down_failed",
    "incomplete_pass",
    "interception",
    "safety",
    "tackled_for_loss",
    "qb_hit",
    "sack",
    "touchdown",
    "pass_touchdown",
    "rush_touchdown",
    "fumble",
    "complete_pass",
    "time_of_day",
    "stadium",
    "weather",
    "roof",
    "surface",
    "temp",
    "wind",
    "offense_formation",
    "offense_personnel",
    "defenders_in_box",
    "defense_personnel",
    "number_of_pass_rushers",
    DISTANCE_BUCKET_COLUMN,
];

/// Keys joining a play-by-play row to its participation row.
pub const GAME_ID_COLUMN: &str = "game_id";
pub const PLAY_ID_COLUMN: &str = "play_id";

/// Columns nflverse publishes in the separate participation release rather
/// than in the play-by-play file.
pub const PARTICIPATION_COLUMNS: &[&str] = &[
    "offense_formation",
    "offense_personnel",
    "defenders_in_box",
    "defense_personnel",
    "number_of_pass_rushers",
];

/// Every source column the loader asks the data source for.
pub fn source_columns() -> impl Iterator<Item = &'static str> {
    PROJECTED_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != DISTANCE_BUCKET_COLUMN)
        .chain(["qb_scramble", GAME_ID_COLUMN, PLAY_ID_COLUMN])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayType {
    Pass,
    Run,
}

impl PlayType {
    pub const ALL: [PlayType; 2] = [PlayType::Pass, PlayType::Run];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pass" => Some(Self::Pass),
            "run" => Some(Self::Run),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for PlayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Down of a play. Plays after a touchdown have no traditional down and
/// carry the two-point-conversion sentinel once cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Down {
    Number(u8),
    TwoPointConversion,
}

impl Down {
    pub const SENTINEL_LABEL: &'static str = "2-point conversion";

    /// Numeric source value; out-of-range values are kept so the cleaner can count them.
    pub fn from_number(value: f64) -> Self {
        Self::Number(value.round().clamp(0.0, u8::MAX as f64) as u8)
    }

    pub fn parse_text(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("2pt conv") || trimmed.eq_ignore_ascii_case(Self::SENTINEL_LABEL)
        {
            return Some(Self::TwoPointConversion);
        }
        trimmed.parse::<f64>().ok().map(Self::from_number)
    }

    pub fn is_valid(self) -> bool {
        match self {
            Self::Number(n) => (1..=4).contains(&n),
            Self::TwoPointConversion => true,
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::TwoPointConversion => Self::SENTINEL_LABEL.to_string(),
        }
    }
}

impl fmt::Display for Down {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DistanceBucket {
    Short,
    Medium,
    Long,
    VeryLong,
}

impl DistanceBucket {
    pub const ALL: [DistanceBucket; 4] = [
        DistanceBucket::Short,
        DistanceBucket::Medium,
        DistanceBucket::Long,
        DistanceBucket::VeryLong,
    ];

    /// Upper bounds are inclusive: 3 is Short, 8 is Medium, 12 is Long.
    pub fn from_yards(yards_to_go: f64) -> Self {
        if yards_to_go <= 3.0 {
            Self::Short
        } else if yards_to_go <= 8.0 {
            Self::Medium
        } else if yards_to_go <= 12.0 {
            Self::Long
        } else {
            Self::VeryLong
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Short => "Short (<=3)",
            Self::Medium => "Medium (4-8)",
            Self::Long => "Long (9-12)",
            Self::VeryLong => "Very Long (13+)",
        }
    }
}

impl fmt::Display for DistanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row as the data source delivers it. Everything is nullable here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPlay {
    pub game_id: Option<String>,
    pub play_id: Option<i64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub season_type: Option<String>,
    pub week: Option<i32>,
    pub posteam: Option<String>,
    pub posteam_type: Option<String>,
    pub defteam: Option<String>,
    pub side_of_field: Option<String>,
    pub score_differential: Option<f64>,
    pub yardline_100: Option<f64>,
    pub game_date: Option<String>,
    pub quarter_seconds_remaining: Option<f64>,
    pub half_seconds_remaining: Option<f64>,
    pub game_seconds_remaining: Option<f64>,
    pub game_half: Option<String>,
    pub quarter_end: Option<bool>,
    pub drive: Option<i32>,
    pub qtr: Option<i32>,
    pub down: Option<Down>,
    pub goal_to_go: Option<bool>,
    pub time: Option<String>,
    pub yrdln: Option<String>,
    pub ydstogo: Option<f64>,
    pub ydsnet: Option<f64>,
    pub play_type: Option<String>,
    pub yards_gained: Option<f64>,
    pub shotgun: Option<bool>,
    pub no_huddle: Option<bool>,
    pub pass_length: Option<String>,
    pub air_yards: Option<f64>,
    pub run_location: Option<String>,
    pub run_gap: Option<String>,
    pub posteam_timeouts_remaining: Option<i32>,
    pub defteam_timeouts_remaining: Option<i32>,
    pub fg_prob: Option<f64>,
    pub td_prob: Option<f64>,
    pub epa: Option<f64>,
    pub third_down_converted: Option<bool>,
    pub third_down_failed: Option<bool>,
    pub fourth_down_converted: Option<bool>,
    pub fourth_down_failed: Option<bool>,
    pub incomplete_pass: Option<bool>,
    pub interception: Option<bool>,
    pub safety: Option<bool>,
    pub tackled_for_loss: Option<bool>,
    pub qb_hit: Option<bool>,
    pub sack: Option<bool>,
    pub touchdown: Option<bool>,
    pub pass_touchdown: Option<bool>,
    pub rush_touchdown: Option<bool>,
    pub fumble: Option<bool>,
    pub complete_pass: Option<bool>,
    pub time_of_day: Option<String>,
    pub stadium: Option<String>,
    pub weather: Option<String>,
    pub roof: Option<String>,
    pub surface: Option<String>,
    pub temp: Option<i32>,
    pub wind: Option<i32>,
    pub offense_formation: Option<String>,
    pub offense_personnel: Option<String>,
    pub defenders_in_box: Option<i32>,
    pub defense_personnel: Option<String>,
    pub number_of_pass_rushers: Option<i32>,
    pub qb_scramble: Option<bool>,
}

/// A season of raw rows together with the columns the source declared.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub season: Season,
    pub columns: BTreeSet<String>,
    pub plays: Vec<RawPlay>,
}

impl RawTable {
    pub fn new(season: Season, columns: BTreeSet<String>, plays: Vec<RawPlay>) -> Self {
        Self {
            season,
            columns,
            plays,
        }
    }

    /// Table whose schema holds every column this crate reads.
    pub fn with_full_schema(season: Season, plays: Vec<RawPlay>) -> Self {
        let columns = source_columns().map(str::to_string).collect();
        Self::new(season, columns, plays)
    }

    /// Feeds projected rows back in as raw rows, e.g. to re-run the pipeline.
    pub fn from_projected(season: Season, plays: &[ProjectedPlay]) -> Self {
        let columns = PROJECTED_COLUMNS
            .iter()
            .filter(|c| **c != DISTANCE_BUCKET_COLUMN)
            .map(|c| c.to_string())
            .collect();
        Self::new(season, columns, plays.iter().map(RawPlay::from).collect())
    }

    pub fn missing_columns<'a>(&self, wanted: &[&'a str]) -> Vec<&'a str> {
        wanted
            .iter()
            .copied()
            .filter(|c| !self.columns.contains(*c))
            .collect()
    }
}

/// A row that passed every cleaning step.
///
/// The typed fields supersede the same-named values kept in `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPlay {
    pub source: RawPlay,
    pub play_type: PlayType,
    pub down: Down,
    pub posteam: String,
    pub qtr: u8,
    pub yards_to_go: f64,
    pub distance_bucket: DistanceBucket,
    pub offense_formation: String,
}

#[derive(Debug, Clone, Default)]
pub struct CleanedTable {
    pub season: Season,
    pub columns: BTreeSet<String>,
    pub plays: Vec<CleanedPlay>,
}

/// One cell of a projected row, in export/display form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Text(String),
    Int(i64),
    Number(f64),
    Flag(bool),
}

impl Cell {
    fn text(value: &Option<String>) -> Self {
        value.clone().map(Cell::Text).unwrap_or(Cell::Missing)
    }

    fn int(value: Option<i32>) -> Self {
        value.map(|v| Cell::Int(v as i64)).unwrap_or(Cell::Missing)
    }

    fn number(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Missing)
    }

    fn flag(value: Option<bool>) -> Self {
        value.map(Cell::Flag).unwrap_or(Cell::Missing)
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(v) => v.to_string(),
            Cell::Number(v) => v.to_string(),
            Cell::Flag(v) => if *v { "1" } else { "0" }.to_string(),
        }
    }
}

/// The analytical row every panel works from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPlay {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub season_type: Option<String>,
    pub week: Option<i32>,
    pub posteam: String,
    pub posteam_type: Option<String>,
    pub defteam: Option<String>,
    pub side_of_field: Option<String>,
    pub score_differential: Option<f64>,
    pub yardline_100: Option<f64>,
    pub game_date: Option<String>,
    pub quarter_seconds_remaining: Option<f64>,
    pub half_seconds_remaining: Option<f64>,
    pub game_seconds_remaining: Option<f64>,
    pub game_half: Option<String>,
    pub quarter_end: Option<bool>,
    pub drive: Option<i32>,
    pub qtr: u8,
    pub down: Down,
    pub goal_to_go: Option<bool>,
    pub time: Option<String>,
    pub yrdln: Option<String>,
    pub ydstogo: f64,
    pub ydsnet: Option<f64>,
    pub play_type: PlayType,
    pub yards_gained: Option<f64>,
    pub shotgun: Option<bool>,
    pub no_huddle: Option<bool>,
    pub pass_length: Option<String>,
    pub air_yards: Option<f64>,
    pub run_location: Option<String>,
    pub run_gap: Option<String>,
    pub posteam_timeouts_remaining: Option<i32>,
    pub defteam_timeouts_remaining: Option<i32>,
    pub fg_prob: Option<f64>,
    pub td_prob: Option<f64>,
    pub epa: Option<f64>,
    pub third_down_converted: Option<bool>,
    pub third_down_failed: Option<bool>,
    pub fourth_down_converted: Option<bool>,
    pub fourth_down_failed: Option<bool>,
    pub incomplete_pass: Option<bool>,
    pub interception: Option<bool>,
    pub safety: Option<bool>,
    pub tackled_for_loss: Option<bool>,
    pub qb_hit: Option<bool>,
    pub sack: Option<bool>,
    pub touchdown: Option<bool>,
    pub pass_touchdown: Option<bool>,
    pub rush_touchdown: Option<bool>,
    pub fumble: Option<bool>,
    pub complete_pass: Option<bool>,
    pub time_of_day: Option<String>,
    pub stadium: Option<String>,
    pub weather: Option<String>,
    pub roof: Option<String>,
    pub surface: Option<String>,
    pub temp: Option<i32>,
    pub wind: Option<i32>,
    pub offense_formation: String,
    pub offense_personnel: Option<String>,
    pub defenders_in_box: Option<i32>,
    pub defense_personnel: Option<String>,
    pub number_of_pass_rushers: Option<i32>,
    pub distance_bucket: DistanceBucket,
    pub play_count: u32,
}

impl ProjectedPlay {
    /// Values in [`PROJECTED_COLUMNS`] order followed by `play_count`.
    pub fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.home_team),
            Cell::text(&self.away_team),
            Cell::text(&self.season_type),
            Cell::int(self.week),
            Cell::Text(self.posteam.clone()),
            Cell::text(&self.posteam_type),
            Cell::text(&self.defteam),
            Cell::text(&self.side_of_field),
            Cell::number(self.score_differential),
            Cell::number(self.yardline_100),
            Cell::text(&self.game_date),
            Cell::number(self.quarter_seconds_remaining),
            Cell::number(self.half_seconds_remaining),
            Cell::number(self.game_seconds_remaining),
            Cell::text(&self.game_half),
            Cell::flag(self.quarter_end),
            Cell::int(self.drive),
            Cell::Int(self.qtr as i64),
            match self.down {
                Down::Number(n) => Cell::Int(n as i64),
                Down::TwoPointConversion => Cell::Text(Down::SENTINEL_LABEL.to_string()),
            },
            Cell::flag(self.goal_to_go),
            Cell::text(&self.time),
            Cell::text(&self.yrdln),
            Cell::Number(self.ydstogo),
            Cell::number(self.ydsnet),
            Cell::Text(self.play_type.as_str().to_string()),
            Cell::number(self.yards_gained),
            Cell::flag(self.shotgun),
            Cell::flag(self.no_huddle),
            Cell::text(&self.pass_length),
            Cell::number(self.air_yards),
            Cell::text(&self.run_location),
            Cell::text(&self.run_gap),
            Cell::int(self.posteam_timeouts_remaining),
            Cell::int(self.defteam_timeouts_remaining),
            Cell::number(self.fg_prob),
            Cell::number(self.td_prob),
            Cell::number(self.epa),
            Cell::flag(self.third_down_converted),
            Cell::flag(self.third_down_failed),
            Cell::flag(self.fourth_down_converted),
            Cell::flag(self.fourth_down_failed),
            Cell::flag(self.incomplete_pass),
            Cell::flag(self.interception),
            Cell::flag(self.safety),
            Cell::flag(self.tackled_for_loss),
            Cell::flag(self.qb_hit),
            Cell::flag(self.sack),
            Cell::flag(self.touchdown),
            Cell::flag(self.pass_touchdown),
            Cell::flag(self.rush_touchdown),
            Cell::flag(self.fumble),
            Cell::flag(self.complete_pass),
            Cell::text(&self.time_of_day),
            Cell::text(&self.stadium),
            Cell::text(&self.weather),
            Cell::text(&self.roof),
            Cell::text(&self.surface),
            Cell::int(self.temp),
            Cell::int(self.wind),
            Cell::Text(self.offense_formation.clone()),
            Cell::text(&self.offense_personnel),
            Cell::int(self.defenders_in_box),
            Cell::text(&self.defense_personnel),
            Cell::int(self.number_of_pass_rushers),
            Cell::Text(self.distance_bucket.label().to_string()),
            Cell::Int(self.play_count as i64),
        ]
    }
}

impl From<&ProjectedPlay> for RawPlay {
    fn from(p: &ProjectedPlay) -> Self {
        RawPlay {
            game_id: None,
            play_id: None,
            home_team: p.home_team.clone(),
            away_team: p.away_team.clone(),
            season_type: p.season_type.clone(),
            week: p.week,
            posteam: Some(p.posteam.clone()),
            posteam_type: p.posteam_type.clone(),
            defteam: p.defteam.clone(),
            side_of_field: p.side_of_field.clone(),
            score_differential: p.score_differential,
            yardline_100: p.yardline_100,
            game_date: p.game_date.clone(),
            quarter_seconds_remaining: p.quarter_seconds_remaining,
            half_seconds_remaining: p.half_seconds_remaining,
            game_seconds_remaining: p.game_seconds_remaining,
            game_half: p.game_half.clone(),
            quarter_end: p.quarter_end,
            drive: p.drive,
            qtr: Some(p.qtr as i32),
            down: Some(p.down),
            goal_to_go: p.goal_to_go,
            time: p.time.clone(),
            yrdln: p.yrdln.clone(),
            ydstogo: Some(p.ydstogo),
            ydsnet: p.ydsnet,
            play_type: Some(p.play_type.as_str().to_string()),
            yards_gained: p.yards_gained,
            shotgun: p.shotgun,
            no_huddle: p.no_huddle,
            pass_length: p.pass_length.clone(),
            air_yards: p.air_yards,
            run_location: p.run_location.clone(),
            run_gap: p.run_gap.clone(),
            posteam_timeouts_remaining: p.posteam_timeouts_remaining,
            defteam_timeouts_remaining: p.defteam_timeouts_remaining,
            fg_prob: p.fg_prob,
            td_prob: p.td_prob,
            epa: p.epa,
            third_down_converted: p.third_down_converted,
            third_down_failed: p.third_down_failed,
            fourth_down_converted: p.fourth_down_converted,
            fourth_down_failed: p.fourth_down_failed,
            incomplete_pass: p.incomplete_pass,
            interception: p.interception,
            safety: p.safety,
            tackled_for_loss: p.tackled_for_loss,
            qb_hit: p.qb_hit,
            sack: p.sack,
            touchdown: p.touchdown,
            pass_touchdown: p.pass_touchdown,
            rush_touchdown: p.rush_touchdown,
            fumble: p.fumble,
            complete_pass: p.complete_pass,
            time_of_day: p.time_of_day.clone(),
            stadium: p.stadium.clone(),
            weather: p.weather.clone(),
            roof: p.roof.clone(),
            surface: p.surface.clone(),
            temp: p.temp,
            wind: p.wind,
            offense_formation: Some(p.offense_formation.clone()),
            offense_personnel: p.offense_personnel.clone(),
            defenders_in_box: p.defenders_in_box,
            defense_personnel: p.defense_personnel.clone(),
            number_of_pass_rushers: p.number_of_pass_rushers,
            qb_scramble: None,
        }
    }
}
