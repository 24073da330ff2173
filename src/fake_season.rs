use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::play::{Down, RawPlay, RawTable, Season};

pub const TEAMS: [&str; 32] = [
    "ARI", "ATL", "BAL", "BUF", "CAR", "CHI", "CIN", "CLE", "DAL", "DEN", "DET", "GB", "HOU",
    "IND", "JAX", "KC", "LA", "LAC", "LV", "MIA", "MIN", "NE", "NO", "NYG", "NYJ", "PHI", "PIT",
    "SEA", "SF", "TB", "TEN", "WAS",
];

const PLAYS_PER_GAME: usize = 128;
const OVERTIME_PLAYS: usize = 10;
const FORMATIONS: [&str; 7] = [
    "SHOTGUN",
    "SINGLEBACK",
    "UNDER CENTER",
    "I_FORM",
    "PISTOL",
    "EMPTY",
    "JUMBO",
];
const STADIUMS: [(&str, &str, &str); 4] = [
    ("Arrowhead Stadium", "outdoors", "grass"),
    ("SoFi Stadium", "dome", "matrixturf"),
    ("Lambeau Field", "outdoors", "grass"),
    ("Caesars Superdome", "dome", "sportturf"),
];

/// Deterministic synthetic season shaped like an nflverse play-by-play file:
/// special-teams rows, a few postseason games, scrambles labelled as runs,
/// conversion attempts without a down and the odd row missing a formation.
pub fn generate_season(season: Season, seed: u64, games: usize) -> RawTable {
    let mut rng = StdRng::seed_from_u64(seed ^ u64::from(season));
    let opener = NaiveDate::from_ymd_opt(i32::from(season), 9, 8);
    let mut plays = Vec::with_capacity(games * PLAYS_PER_GAME);

    for game in 0..games {
        let home = TEAMS[(game * 7) % TEAMS.len()];
        let away = TEAMS[(game * 7 + 1 + game / TEAMS.len()) % TEAMS.len()];
        let away = if away == home {
            TEAMS[(game * 7 + 2) % TEAMS.len()]
        } else {
            away
        };
        let week = (game / 16 + 1) as i32;
        let season_type = if game % 25 == 24 { "POST" } else { "REG" };
        let game_date = opener
            .map(|d| d + ChronoDuration::days(7 * (week as i64 - 1)))
            .map(|d| d.format("%Y-%m-%d").to_string());
        let (stadium, roof, surface) = STADIUMS[game % STADIUMS.len()];
        let ctx = GameContext {
            game_id: format!("{season}_{week:02}_{away}_{home}"),
            home,
            away,
            week,
            season_type,
            game_date,
            stadium,
            roof,
            surface,
            temp: rng.gen_range(28..=92),
            wind: rng.gen_range(0..=18),
        };

        let total = if game % 9 == 0 {
            PLAYS_PER_GAME + OVERTIME_PLAYS
        } else {
            PLAYS_PER_GAME
        };
        for idx in 0..total {
            plays.push(fake_play(&mut rng, &ctx, idx));
        }
    }

    RawTable::with_full_schema(season, plays)
}

struct GameContext<'a> {
    game_id: String,
    home: &'a str,
    away: &'a str,
    week: i32,
    season_type: &'a str,
    game_date: Option<String>,
    stadium: &'a str,
    roof: &'a str,
    surface: &'a str,
    temp: i32,
    wind: i32,
}

fn fake_play(rng: &mut StdRng, ctx: &GameContext<'_>, idx: usize) -> RawPlay {
    let qtr = if idx >= PLAYS_PER_GAME {
        5
    } else {
        (idx * 4 / PLAYS_PER_GAME + 1) as i32
    };
    let drive = (idx / 6 + 1) as i32;
    let home_has_ball = drive % 2 == 1;
    let (posteam, defteam) = if home_has_ball {
        (ctx.home, ctx.away)
    } else {
        (ctx.away, ctx.home)
    };

    let roll = rng.gen_range(0..100);
    let (play_type, mut down) = match roll {
        0..=3 => ("kickoff", None),
        4..=6 => ("punt", Some(Down::Number(4))),
        7..=8 => ("field_goal", Some(Down::Number(4))),
        9..=10 => ("no_play", Some(fake_down(rng))),
        11..=12 => ("extra_point", None),
        13 => (if rng.gen_bool(0.5) { "pass" } else { "run" }, None),
        _ => (if rng.gen_bool(0.42) { "run" } else { "pass" }, Some(fake_down(rng))),
    };
    // A conversion attempt never has a down; keep a stray invalid one rare.
    if down.is_some() && rng.gen_bool(0.001) {
        down = Some(Down::Number(0));
    }

    let mut play_type = play_type.to_string();
    let mut qb_scramble = Some(false);
    if play_type == "pass" && rng.gen_bool(0.06) {
        play_type = "run".to_string();
        qb_scramble = Some(true);
    }
    let is_run = play_type == "run" && qb_scramble != Some(true);
    let is_pass = play_type == "pass" || qb_scramble == Some(true);

    let ydstogo = match down {
        None => 2.0,
        Some(Down::Number(1)) if rng.gen_bool(0.85) => 10.0,
        _ => rng.gen_range(1..=22) as f64,
    };
    let yards_gained = rng.gen_range(-6..=28) as f64;
    let formation = if rng.gen_bool(0.02) || play_type == "kickoff" {
        None
    } else {
        Some(FORMATIONS[rng.gen_range(0..FORMATIONS.len())].to_string())
    };
    let run_location = if is_run && !rng.gen_bool(0.03) {
        Some(["left", "middle", "right"][rng.gen_range(0..3)].to_string())
    } else {
        None
    };
    let run_gap = match run_location.as_deref() {
        Some("left") | Some("right") => Some(["end", "tackle", "guard"][rng.gen_range(0..3)].to_string()),
        _ => None,
    };
    let yardline_100 = rng.gen_range(1..=99) as f64;
    let quarter_seconds = rng.gen_range(0..=900) as f64;
    let complete = is_pass && rng.gen_bool(0.64);
    let touchdown = rng.gen_bool(0.03);
    let converted = yards_gained >= ydstogo;
    let down_no = match down {
        Some(Down::Number(n)) => n,
        _ => 0,
    };

    RawPlay {
        game_id: Some(ctx.game_id.clone()),
        play_id: Some(idx as i64 + 1),
        home_team: Some(ctx.home.to_string()),
        away_team: Some(ctx.away.to_string()),
        season_type: Some(ctx.season_type.to_string()),
        week: Some(ctx.week),
        posteam: Some(posteam.to_string()),
        posteam_type: Some(if home_has_ball { "home" } else { "away" }.to_string()),
        defteam: Some(defteam.to_string()),
        side_of_field: Some(if yardline_100 > 50.0 { posteam } else { defteam }.to_string()),
        score_differential: Some(rng.gen_range(-21..=21) as f64),
        yardline_100: Some(yardline_100),
        game_date: ctx.game_date.clone(),
        quarter_seconds_remaining: Some(quarter_seconds),
        half_seconds_remaining: Some(quarter_seconds + if qtr % 2 == 1 { 900.0 } else { 0.0 }),
        game_seconds_remaining: Some(quarter_seconds + 900.0 * (4 - qtr.min(4)) as f64),
        game_half: Some(match qtr {
            1 | 2 => "Half1",
            3 | 4 => "Half2",
            _ => "Overtime",
        }
        .to_string()),
        quarter_end: Some(false),
        drive: Some(drive),
        qtr: Some(qtr),
        down,
        goal_to_go: Some(yardline_100 <= ydstogo),
        time: Some(format!(
            "{:02}:{:02}",
            quarter_seconds as u32 / 60,
            quarter_seconds as u32 % 60
        )),
        yrdln: Some(format!("{posteam} {}", (yardline_100 as i32).min(50))),
        ydstogo: if rng.gen_bool(0.002) { None } else { Some(ydstogo) },
        ydsnet: Some(rng.gen_range(-10..=80) as f64),
        play_type: Some(play_type),
        yards_gained: Some(yards_gained),
        shotgun: Some(formation.as_deref() == Some("SHOTGUN")),
        no_huddle: Some(rng.gen_bool(0.05)),
        pass_length: is_pass.then(|| if rng.gen_bool(0.8) { "short" } else { "deep" }.to_string()),
        air_yards: is_pass.then(|| rng.gen_range(-3..=45) as f64),
        run_location,
        run_gap,
        posteam_timeouts_remaining: Some(rng.gen_range(0..=3)),
        defteam_timeouts_remaining: Some(rng.gen_range(0..=3)),
        fg_prob: Some(rng.gen_range(0.0..0.6)),
        td_prob: Some(rng.gen_range(0.0..0.6)),
        epa: Some(rng.gen_range(-3.0..3.0)),
        third_down_converted: Some(down_no == 3 && converted),
        third_down_failed: Some(down_no == 3 && !converted),
        fourth_down_converted: Some(down_no == 4 && converted),
        fourth_down_failed: Some(down_no == 4 && !converted),
        incomplete_pass: Some(is_pass && !complete),
        interception: Some(is_pass && !complete && rng.gen_bool(0.07)),
        safety: Some(false),
        tackled_for_loss: Some(is_run && yards_gained < 0.0),
        qb_hit: Some(is_pass && rng.gen_bool(0.1)),
        sack: Some(is_pass && !complete && rng.gen_bool(0.15)),
        touchdown: Some(touchdown),
        pass_touchdown: Some(touchdown && is_pass),
        rush_touchdown: Some(touchdown && is_run),
        fumble: Some(rng.gen_bool(0.01)),
        complete_pass: Some(complete),
        time_of_day: ctx.game_date.as_ref().map(|d| format!("{d}T17:00:00Z")),
        stadium: Some(ctx.stadium.to_string()),
        weather: Some(format!("Temp: {}° F, Wind: {} mph", ctx.temp, ctx.wind)),
        roof: Some(ctx.roof.to_string()),
        surface: Some(ctx.surface.to_string()),
        temp: (ctx.roof == "outdoors").then_some(ctx.temp),
        wind: (ctx.roof == "outdoors").then_some(ctx.wind),
        offense_formation: formation,
        offense_personnel: Some("1 RB, 1 TE, 3 WR".to_string()),
        defenders_in_box: Some(rng.gen_range(4..=8)),
        defense_personnel: Some("4 DL, 2 LB, 5 DB".to_string()),
        number_of_pass_rushers: is_pass.then(|| rng.gen_range(3..=6)),
        qb_scramble,
    }
}

fn fake_down(rng: &mut StdRng) -> Down {
    match rng.gen_range(0..10) {
        0..=3 => Down::Number(1),
        4..=6 => Down::Number(2),
        7..=8 => Down::Number(3),
        _ => Down::Number(4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_season() {
        let a = generate_season(2022, 7, 3);
        let b = generate_season(2022, 7, 3);
        assert_eq!(a.plays, b.plays);
        assert_eq!(a.plays.len(), 3 * PLAYS_PER_GAME + OVERTIME_PLAYS);
    }

    #[test]
    fn teams_never_play_themselves() {
        let table = generate_season(2021, 1, 64);
        assert!(
            table
                .plays
                .iter()
                .all(|p| p.home_team.is_some() && p.home_team != p.away_team)
        );
    }
}
