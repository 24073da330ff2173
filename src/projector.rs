use crate::error::PipelineError;
use crate::play::{CleanedPlay, CleanedTable, PROJECTED_COLUMNS, ProjectedPlay};

/// Restricts cleaned rows to the fixed column list and appends `play_count = 1`.
///
/// The schema check runs before any row is touched: a missing column means the
/// loader or cleaner broke its contract, so nothing is projected at all.
pub fn project(table: &CleanedTable) -> Result<Vec<ProjectedPlay>, PipelineError> {
    let missing: Vec<String> = PROJECTED_COLUMNS
        .iter()
        .filter(|c| !table.columns.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::SchemaViolation { missing });
    }

    Ok(table.plays.iter().map(project_row).collect())
}

fn project_row(play: &CleanedPlay) -> ProjectedPlay {
    let src = &play.source;
    ProjectedPlay {
        home_team: src.home_team.clone(),
        away_team: src.away_team.clone(),
        season_type: src.season_type.clone(),
        week: src.week,
        posteam: play.posteam.clone(),
        posteam_type: src.posteam_type.clone(),
        defteam: src.defteam.clone(),
        side_of_field: src.side_of_field.clone(),
        score_differential: src.score_differential,
        yardline_100: src.yardline_100,
        game_date: src.game_date.clone(),
        quarter_seconds_remaining: src.quarter_seconds_remaining,
        half_seconds_remaining: src.half_seconds_remaining,
        game_seconds_remaining: src.game_seconds_remaining,
        game_half: src.game_half.clone(),
        quarter_end: src.quarter_end,
        drive: src.drive,
        qtr: play.qtr,
        down: play.down,
        goal_to_go: src.goal_to_go,
        time: src.time.clone(),
        yrdln: src.yrdln.clone(),
        ydstogo: play.yards_to_go,
        ydsnet: src.ydsnet,
        play_type: play.play_type,
        yards_gained: src.yards_gained,
        shotgun: src.shotgun,
        no_huddle: src.no_huddle,
        pass_length: src.pass_length.clone(),
        air_yards: src.air_yards,
        run_location: src.run_location.clone(),
        run_gap: src.run_gap.clone(),
        posteam_timeouts_remaining: src.posteam_timeouts_remaining,
        defteam_timeouts_remaining: src.defteam_timeouts_remaining,
        fg_prob: src.fg_prob,
        td_prob: src.td_prob,
        epa: src.epa,
        third_down_converted: src.third_down_converted,
        third_down_failed: src.third_down_failed,
        fourth_down_converted: src.fourth_down_converted,
        fourth_down_failed: src.fourth_down_failed,
        incomplete_pass: src.incomplete_pass,
        interception: src.interception,
        safety: src.safety,
        tackled_for_loss: src.tackled_for_loss,
        qb_hit: src.qb_hit,
        sack: src.sack,
        touchdown: src.touchdown,
        pass_touchdown: src.pass_touchdown,
        rush_touchdown: src.rush_touchdown,
        fumble: src.fumble,
        complete_pass: src.complete_pass,
        time_of_day: src.time_of_day.clone(),
        stadium: src.stadium.clone(),
        weather: src.weather.clone(),
        roof: src.roof.clone(),
        surface: src.surface.clone(),
        temp: src.temp,
        wind: src.wind,
        offense_formation: play.offense_formation.clone(),
        offense_personnel: src.offense_personnel.clone(),
        defenders_in_box: src.defenders_in_box,
        defense_personnel: src.defense_personnel.clone(),
        number_of_pass_rushers: src.number_of_pass_rushers,
        distance_bucket: play.distance_bucket,
        play_count: 1,
    }
}
