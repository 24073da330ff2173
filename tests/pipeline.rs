use pbp_terminal::cleaner::{self, DataQualityDefect};
use pbp_terminal::domains::DomainOrder;
use pbp_terminal::error::PipelineError;
use pbp_terminal::fake_season;
use pbp_terminal::panels::{self, Aggregate, PanelEngine, PanelKind, Selection};
use pbp_terminal::play::{
    DistanceBucket, Down, PROJECTED_COLUMNS, PlayType, RawPlay, RawTable,
};
use pbp_terminal::projector;

fn play(team: &str, play_type: &str, formation: Option<&str>) -> RawPlay {
    RawPlay {
        posteam: Some(team.to_string()),
        posteam_type: Some("home".to_string()),
        season_type: Some("REG".to_string()),
        play_type: Some(play_type.to_string()),
        qtr: Some(1),
        down: Some(Down::Number(1)),
        ydstogo: Some(10.0),
        run_location: Some("left".to_string()),
        offense_formation: formation.map(str::to_string),
        ..RawPlay::default()
    }
}

#[test]
fn toy_season_end_to_end() {
    let mut scramble = play("A", "run", Some("Shotgun"));
    scramble.qb_scramble = Some(true);
    let rows = vec![
        play("A", "run", Some("Shotgun")),
        play("A", "run", Some("Shotgun")),
        scramble,
        play("A", "run", None),
    ];

    let (cleaned, report) = cleaner::clean(&RawTable::with_full_schema(2022, rows));
    assert_eq!(report.dropped_no_formation, 1);
    assert_eq!(report.scrambles_reclassified, 1);

    let projected = projector::project(&cleaned).expect("projected");
    let types: Vec<PlayType> = projected.iter().map(|p| p.play_type).collect();
    assert_eq!(types, vec![PlayType::Run, PlayType::Run, PlayType::Pass]);
    assert!(projected.iter().all(|p| p.play_count == 1));

    let engine = PanelEngine::new(2022, projected.into(), DomainOrder::Observed);
    let selection = engine.default_selection(PanelKind::TeamMix);
    match engine.aggregate(PanelKind::TeamMix, &selection).as_ref() {
        Aggregate::TeamMix { rows } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].posteam, "A");
            assert_eq!(rows[0].run, Some(2));
            assert_eq!(rows[0].pass, Some(1));
        }
        other => panic!("unexpected aggregate: {other:?}"),
    }
}

#[test]
fn only_run_and_pass_survive() {
    let rows = ["run", "pass", "punt", "kickoff", "no_play", "field_goal", "extra_point"]
        .iter()
        .map(|t| play("BUF", t, Some("SHOTGUN")))
        .collect();
    let (cleaned, report) = cleaner::clean(&RawTable::with_full_schema(2022, rows));
    assert_eq!(cleaned.plays.len(), 2);
    assert_eq!(report.dropped_non_scrimmage, 5);
}

#[test]
fn postseason_rows_are_dropped() {
    let mut post = play("BUF", "pass", Some("SHOTGUN"));
    post.season_type = Some("POST".to_string());
    let mut unknown = play("BUF", "pass", Some("SHOTGUN"));
    unknown.season_type = None;
    let (cleaned, report) = cleaner::clean(&RawTable::with_full_schema(
        2022,
        vec![post, unknown, play("BUF", "pass", Some("SHOTGUN"))],
    ));
    assert_eq!(cleaned.plays.len(), 1);
    assert_eq!(report.dropped_non_regular, 2);
}

#[test]
fn missing_down_becomes_two_point_sentinel() {
    let mut two_pt = play("KC", "pass", Some("SHOTGUN"));
    two_pt.down = None;
    let (cleaned, report) = cleaner::clean(&RawTable::with_full_schema(2022, vec![two_pt]));
    assert_eq!(report.downs_filled, 1);
    assert_eq!(cleaned.plays[0].down, Down::TwoPointConversion);
    assert_eq!(cleaned.plays[0].down.label(), "2-point conversion");
}

#[test]
fn distance_bucket_boundaries() {
    let cases = [
        (3.0, DistanceBucket::Short),
        (3.5, DistanceBucket::Medium),
        (8.0, DistanceBucket::Medium),
        (8.01, DistanceBucket::Long),
        (12.0, DistanceBucket::Long),
        (12.5, DistanceBucket::VeryLong),
    ];
    let rows = cases
        .iter()
        .map(|(ytg, _)| {
            let mut row = play("NYJ", "run", Some("I_FORM"));
            row.ydstogo = Some(*ytg);
            row
        })
        .collect();
    let (cleaned, _) = cleaner::clean(&RawTable::with_full_schema(2022, rows));
    let buckets: Vec<DistanceBucket> = cleaned.plays.iter().map(|p| p.distance_bucket).collect();
    let expected: Vec<DistanceBucket> = cases.iter().map(|(_, b)| *b).collect();
    assert_eq!(buckets, expected);
}

#[test]
fn cleaned_rows_always_have_a_formation() {
    let raw = fake_season::generate_season(2022, 7, 24);
    let (cleaned, report) = cleaner::clean(&raw);
    assert!(report.dropped_no_formation > 0);
    assert!(cleaned.plays.iter().all(|p| !p.offense_formation.is_empty()));
    assert!(
        cleaned
            .plays
            .iter()
            .all(|p| matches!(p.play_type, PlayType::Run | PlayType::Pass))
    );
}

#[test]
fn clean_and_project_is_idempotent() {
    let raw = fake_season::generate_season(2021, 11, 30);
    let (cleaned, _) = cleaner::clean(&raw);
    let first = projector::project(&cleaned).expect("first pass");

    let again = RawTable::from_projected(2021, &first);
    let (recleaned, report) = cleaner::clean(&again);
    let second = projector::project(&recleaned).expect("second pass");

    assert_eq!(report.defect_total(), 0);
    assert_eq!(first, second);
}

#[test]
fn data_quality_defects_do_not_abort_the_season() {
    let mut no_team = play("", "pass", Some("SHOTGUN"));
    no_team.posteam = None;
    let mut bad_down = play("DAL", "run", Some("SINGLEBACK"));
    bad_down.down = Some(Down::Number(5));
    let (cleaned, report) = cleaner::clean(&RawTable::with_full_schema(
        2022,
        vec![no_team, bad_down, play("DAL", "pass", Some("SHOTGUN"))],
    ));
    assert_eq!(cleaned.plays.len(), 1);
    assert_eq!(report.defects[&DataQualityDefect::MissingPosteam], 1);
    assert_eq!(report.defects[&DataQualityDefect::InvalidDown], 1);
}

#[test]
fn projector_fails_fast_on_missing_column() {
    let (mut cleaned, _) = cleaner::clean(&RawTable::with_full_schema(
        2022,
        vec![play("SF", "run", Some("PISTOL"))],
    ));
    cleaned.columns.remove("weather");
    cleaned.columns.remove("surface");

    match projector::project(&cleaned) {
        Err(PipelineError::SchemaViolation { missing }) => {
            assert_eq!(missing, vec!["weather".to_string(), "surface".to_string()]);
        }
        other => panic!("expected schema violation, got {other:?}"),
    }
}

#[test]
fn projected_cells_follow_column_order() {
    let (cleaned, _) = cleaner::clean(&RawTable::with_full_schema(
        2022,
        vec![play("SF", "run", Some("PISTOL"))],
    ));
    let projected = projector::project(&cleaned).expect("projected");
    assert_eq!(projected[0].cells().len(), PROJECTED_COLUMNS.len() + 1);
}

#[test]
fn fake_season_aggregates_conserve_play_count() {
    let raw = fake_season::generate_season(2022, 2022, 40);
    let (cleaned, _) = cleaner::clean(&raw);
    let plays = projector::project(&cleaned).expect("projected");
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);

    for kind in PanelKind::ALL {
        let selection = engine.default_selection(kind);
        let matched = engine
            .plays()
            .iter()
            .filter(|p| panels::panel_matches(kind, &selection, p))
            .map(|p| u64::from(p.play_count))
            .sum::<u64>();
        assert_eq!(
            panels::compute(kind, engine.plays(), &selection).total_plays(),
            matched,
            "{kind}"
        );
    }

    let location = engine.default_selection(PanelKind::RunLocation);
    let runs_with_location = engine
        .plays()
        .iter()
        .filter(|p| p.play_type == PlayType::Run && p.run_location.is_some())
        .count() as u64;
    assert!(runs_with_location > 0);
    assert_eq!(
        panels::compute(PanelKind::RunLocation, engine.plays(), &location).total_plays(),
        runs_with_location
    );

    let empty = Selection::default();
    assert_eq!(
        panels::compute(PanelKind::ByDown, engine.plays(), &empty).total_plays(),
        engine.plays().len() as u64
    );
}
