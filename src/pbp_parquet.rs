use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use parquet::schema::types::Type;

use crate::play::{
    CLEANER_COLUMNS, Down, GAME_ID_COLUMN, PARTICIPATION_COLUMNS, PLAY_ID_COLUMN, RawPlay,
    RawTable, Season, source_columns,
};

/// Game key column of the participation release.
pub const PARTICIPATION_GAME_ID_COLUMN: &str = "nflverse_game_id";

/// Participation values of one play.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Participation {
    pub offense_formation: Option<String>,
    pub offense_personnel: Option<String>,
    pub defenders_in_box: Option<i32>,
    pub defense_personnel: Option<String>,
    pub number_of_pass_rushers: Option<i32>,
}

/// A season of participation rows keyed by (game id, play id).
#[derive(Debug, Clone, Default)]
pub struct ParticipationTable {
    pub columns: BTreeSet<String>,
    pub plays: HashMap<(String, i64), Participation>,
}

/// Reads a play-by-play file and, when given, left-joins its participation file.
pub fn read_season_files(
    pbp: &Path,
    participation: Option<&Path>,
    season: Season,
) -> Result<RawTable> {
    let mut table = read_season_parquet(pbp, season)?;
    if let Some(path) = participation {
        let participation = read_participation_parquet(path)?;
        merge_participation(&mut table, &participation);
    }
    Ok(table)
}

/// Reads one nflverse play-by-play file, decoding only the columns this crate uses.
///
/// Fails before touching any row if a column the cleaner needs is absent.
/// Formation columns come from the participation release and are not required here.
pub fn read_season_parquet(path: &Path, season: Season) -> Result<RawTable> {
    let required: Vec<&str> = CLEANER_COLUMNS
        .iter()
        .copied()
        .filter(|c| !PARTICIPATION_COLUMNS.contains(c))
        .collect();
    let wanted: BTreeSet<&str> = source_columns().collect();
    let (columns, plays) = read_rows(path, &wanted, &required, |row| {
        let mut play = RawPlay::default();
        for (name, field) in row.get_column_iter() {
            assign(&mut play, name, field);
        }
        play
    })?;
    Ok(RawTable::new(season, columns, plays))
}

/// Reads an nflverse `pbp_participation` file.
pub fn read_participation_parquet(path: &Path) -> Result<ParticipationTable> {
    let wanted: BTreeSet<&str> = PARTICIPATION_COLUMNS
        .iter()
        .copied()
        .chain([PARTICIPATION_GAME_ID_COLUMN, PLAY_ID_COLUMN])
        .collect();
    let required = [PARTICIPATION_GAME_ID_COLUMN, PLAY_ID_COLUMN];
    let (mut columns, rows) = read_rows(path, &wanted, &required, |row| {
        let mut key = (None, None);
        let mut part = Participation::default();
        for (name, field) in row.get_column_iter() {
            match name.as_str() {
                PARTICIPATION_GAME_ID_COLUMN => key.0 = as_text(field),
                PLAY_ID_COLUMN => key.1 = as_id(field),
                "offense_formation" => part.offense_formation = as_text(field),
                "offense_personnel" => part.offense_personnel = as_text(field),
                "defenders_in_box" => part.defenders_in_box = as_int(field),
                "defense_personnel" => part.defense_personnel = as_text(field),
                "number_of_pass_rushers" => part.number_of_pass_rushers = as_int(field),
                _ => {}
            }
        }
        (key, part)
    })?;

    let mut plays = HashMap::with_capacity(rows.len());
    let mut unkeyed = 0usize;
    for ((game_id, play_id), part) in rows {
        match (game_id, play_id) {
            (Some(game_id), Some(play_id)) => {
                plays.entry((game_id, play_id)).or_insert(part);
            }
            _ => unkeyed += 1,
        }
    }
    if unkeyed > 0 {
        warn!("{unkeyed} participation rows without a game/play key skipped");
    }
    columns.remove(PARTICIPATION_GAME_ID_COLUMN);
    columns.remove(PLAY_ID_COLUMN);
    Ok(ParticipationTable { columns, plays })
}

/// Left join on (`game_id`, `play_id`) = (`nflverse_game_id`, `play_id`).
///
/// Matched plays take the participation values; unmatched plays keep theirs.
/// The participation columns join the table schema. Returns the matched count.
pub fn merge_participation(table: &mut RawTable, participation: &ParticipationTable) -> usize {
    let mut matched = 0usize;
    for play in &mut table.plays {
        let (Some(game_id), Some(play_id)) = (play.game_id.clone(), play.play_id) else {
            continue;
        };
        let Some(part) = participation.plays.get(&(game_id, play_id)) else {
            continue;
        };
        play.offense_formation = part.offense_formation.clone();
        play.offense_personnel = part.offense_personnel.clone();
        play.defenders_in_box = part.defenders_in_box;
        play.defense_personnel = part.defense_personnel.clone();
        play.number_of_pass_rushers = part.number_of_pass_rushers;
        matched += 1;
    }
    table
        .columns
        .extend(participation.columns.iter().cloned());
    info!(
        "season {}: participation matched {matched} of {} plays",
        table.season,
        table.plays.len()
    );
    matched
}

fn read_rows<T>(
    path: &Path,
    wanted: &BTreeSet<&str>,
    required: &[&str],
    decode: impl Fn(&Row) -> T,
) -> Result<(BTreeSet<String>, Vec<T>)> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader")?;

    let root = reader.metadata().file_metadata().schema_descr().root_schema();
    let fields: Vec<Arc<Type>> = root
        .get_fields()
        .iter()
        .filter(|f| wanted.contains(f.name()))
        .cloned()
        .collect();
    let columns: BTreeSet<String> = fields.iter().map(|f| f.name().to_string()).collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !columns.contains(*c))
        .collect();
    if !missing.is_empty() {
        bail!(
            "schema mismatch in {}: missing columns {}",
            path.display(),
            missing.join(", ")
        );
    }

    let projection = Type::group_type_builder("schema")
        .with_fields(fields)
        .build()
        .context("build column projection")?;
    let iter = reader
        .get_row_iter(Some(projection))
        .context("iterate rows")?;

    let mut rows = Vec::new();
    for row in iter {
        let row = row.context("decode row")?;
        rows.push(decode(&row));
    }
    info!(
        "read {} rows ({} columns) from {}",
        rows.len(),
        columns.len(),
        path.display()
    );
    Ok((columns, rows))
}

fn assign(play: &mut RawPlay, name: &str, field: &Field) {
    match name {
        GAME_ID_COLUMN => play.game_id = as_text(field),
        PLAY_ID_COLUMN => play.play_id = as_id(field),
        "home_team" => play.home_team = as_text(field),
        "away_team" => play.away_team = as_text(field),
        "season_type" => play.season_type = as_text(field),
        "week" => play.week = as_int(field),
        "posteam" => play.posteam = as_text(field),
        "posteam_type" => play.posteam_type = as_text(field),
        "defteam" => play.defteam = as_text(field),
        "side_of_field" => play.side_of_field = as_text(field),
        "score_differential" => play.score_differential = as_num(field),
        "yardline_100" => play.yardline_100 = as_num(field),
        "game_date" => play.game_date = as_text(field),
        "quarter_seconds_remaining" => play.quarter_seconds_remaining = as_num(field),
        "half_seconds_remaining" => play.half_seconds_remaining = as_num(field),
        "game_seconds_remaining" => play.game_seconds_remaining = as_num(field),
        "game_half" => play.game_half = as_text(field),
        "quarter_end" => play.quarter_end = as_flag(field),
        "drive" => play.drive = as_int(field),
        "qtr" => play.qtr = as_int(field),
        "down" => play.down = as_down(field),
        "goal_to_go" => play.goal_to_go = as_flag(field),
        "time" => play.time = as_text(field),
        "yrdln" => play.yrdln = as_text(field),
        "ydstogo" => play.ydstogo = as_num(field),
        "ydsnet" => play.ydsnet = as_num(field),
        "play_type" => play.play_type = as_text(field),
        "yards_gained" => play.yards_gained = as_num(field),
        "shotgun" => play.shotgun = as_flag(field),
        "no_huddle" => play.no_huddle = as_flag(field),
        "pass_length" => play.pass_length = as_text(field),
        "air_yards" => play.air_yards = as_num(field),
        "run_location" => play.run_location = as_text(field),
        "run_gap" => play.run_gap = as_text(field),
        "posteam_timeouts_remaining" => play.posteam_timeouts_remaining = as_int(field),
        "defteam_timeouts_remaining" => play.defteam_timeouts_remaining = as_int(field),
        "fg_prob" => play.fg_prob = as_num(field),
        "td_prob" => play.td_prob = as_num(field),
        "epa" => play.epa = as_num(field),
        "third_down_converted" => play.third_down_converted = as_flag(field),
        "third_down_failed" => play.third_down_failed = as_flag(field),
        "fourth_down_converted" => play.fourth_down_converted = as_flag(field),
        "fourth_down_failed" => play.fourth_down_failed = as_flag(field),
        "incomplete_pass" => play.incomplete_pass = as_flag(field),
        "interception" => play.interception = as_flag(field),
        "safety" => play.safety = as_flag(field),
        "tackled_for_loss" => play.tackled_for_loss = as_flag(field),
        "qb_hit" => play.qb_hit = as_flag(field),
        "sack" => play.sack = as_flag(field),
        "touchdown" => play.touchdown = as_flag(field),
        "pass_touchdown" => play.pass_touchdown = as_flag(field),
        "rush_touchdown" => play.rush_touchdown = as_flag(field),
        "fumble" => play.fumble = as_flag(field),
        "complete_pass" => play.complete_pass = as_flag(field),
        "time_of_day" => play.time_of_day = as_text(field),
        "stadium" => play.stadium = as_text(field),
        "weather" => play.weather = as_text(field),
        "roof" => play.roof = as_text(field),
        "surface" => play.surface = as_text(field),
        "temp" => play.temp = as_int(field),
        "wind" => play.wind = as_int(field),
        "offense_formation" => play.offense_formation = as_text(field),
        "offense_personnel" => play.offense_personnel = as_text(field),
        "defenders_in_box" => play.defenders_in_box = as_int(field),
        "defense_personnel" => play.defense_personnel = as_text(field),
        "number_of_pass_rushers" => play.number_of_pass_rushers = as_int(field),
        "qb_scramble" => play.qb_scramble = as_flag(field),
        _ => {}
    }
}

fn as_text(field: &Field) -> Option<String> {
    match field {
        Field::Str(s) => Some(s.clone()),
        Field::Null => None,
        other => as_num(other).map(|v| v.to_string()),
    }
}

fn as_num(field: &Field) -> Option<f64> {
    match field {
        Field::Byte(v) => Some(*v as f64),
        Field::Short(v) => Some(*v as f64),
        Field::Int(v) => Some(*v as f64),
        Field::Long(v) => Some(*v as f64),
        Field::UByte(v) => Some(*v as f64),
        Field::UShort(v) => Some(*v as f64),
        Field::UInt(v) => Some(*v as f64),
        Field::ULong(v) => Some(*v as f64),
        Field::Float(v) => Some(*v as f64),
        Field::Double(v) => Some(*v),
        Field::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        Field::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_int(field: &Field) -> Option<i32> {
    as_num(field)
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i32)
}

fn as_id(field: &Field) -> Option<i64> {
    as_num(field)
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
}

fn as_flag(field: &Field) -> Option<bool> {
    match field {
        Field::Bool(v) => Some(*v),
        Field::Str(s) => match s.trim() {
            "1" | "true" | "TRUE" => Some(true),
            "0" | "false" | "FALSE" => Some(false),
            _ => None,
        },
        other => as_num(other).filter(|v| !v.is_nan()).map(|v| v != 0.0),
    }
}

fn as_down(field: &Field) -> Option<Down> {
    match field {
        Field::Str(s) => Down::parse_text(s),
        other => as_num(other)
            .filter(|v| v.is_finite())
            .map(Down::from_number),
    }
}
