use std::sync::Arc;

use pbp_terminal::chart::{ChartKind, ChartSpec};
use pbp_terminal::cleaner;
use pbp_terminal::domains::{Dimension, DomainOrder, NO_ROLE_LABEL};
use pbp_terminal::fake_season;
use pbp_terminal::panels::{Aggregate, PanelEngine, PanelKind, Selection};
use pbp_terminal::play::{DistanceBucket, Down, PlayType, ProjectedPlay, RawPlay, RawTable};
use pbp_terminal::projector;

fn raw(team: &str, kind: &str, qtr: i32, down: u8, role: Option<&str>) -> RawPlay {
    RawPlay {
        posteam: Some(team.to_string()),
        posteam_type: role.map(str::to_string),
        season_type: Some("REG".to_string()),
        play_type: Some(kind.to_string()),
        qtr: Some(qtr),
        down: Some(Down::Number(down)),
        ydstogo: Some(7.0),
        run_location: (kind == "run").then(|| "middle".to_string()),
        offense_formation: Some("SHOTGUN".to_string()),
        ..RawPlay::default()
    }
}

fn projected(rows: Vec<RawPlay>) -> Vec<ProjectedPlay> {
    let (cleaned, _) = cleaner::clean(&RawTable::with_full_schema(2022, rows));
    projector::project(&cleaned).expect("projected")
}

fn fake_engine() -> PanelEngine {
    let (cleaned, _) = cleaner::clean(&fake_season::generate_season(2022, 99, 48));
    let plays = projector::project(&cleaned).expect("projected");
    PanelEngine::new(2022, plays.into(), DomainOrder::Observed)
}

#[test]
fn narrowing_a_selection_never_adds_plays() {
    let engine = fake_engine();
    let domains = engine.domains();
    for kind in PanelKind::ALL {
        let full = engine.default_selection(kind);
        let mut narrow = full.clone();
        narrow.toggle(domains, Dimension::Team, 0);
        narrow.toggle(domains, Dimension::Team, 3);
        if narrow.is_active(Dimension::Quarter) {
            narrow.set_quarter_range(2, 3);
        }

        let wide = engine.aggregate(kind, &full).total_plays();
        let small = engine.aggregate(kind, &narrow).total_plays();
        assert!(small <= wide, "{kind}: {small} > {wide}");
        assert!(small < wide, "{kind} should lose some plays");
    }
}

#[test]
fn grouped_panels_sum_to_matched_rows() {
    let engine = fake_engine();
    let down = engine.aggregate(PanelKind::ByDown, &engine.default_selection(PanelKind::ByDown));
    let quarter = engine.aggregate(
        PanelKind::ByQuarter,
        &engine.default_selection(PanelKind::ByQuarter),
    );
    let all = engine.plays().len() as u64;
    assert_eq!(down.total_plays(), all);
    assert_eq!(quarter.total_plays(), all);
}

#[test]
fn team_mix_pivot_keeps_missing_cells_empty() {
    let plays = projected(vec![
        raw("BUF", "pass", 1, 1, Some("home")),
        raw("BUF", "run", 1, 2, Some("home")),
        raw("MIA", "pass", 2, 1, Some("away")),
    ]);
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);
    let agg = engine.aggregate(PanelKind::TeamMix, &engine.default_selection(PanelKind::TeamMix));
    let Aggregate::TeamMix { rows } = agg.as_ref() else {
        panic!("expected team mix");
    };
    assert_eq!(rows[1].posteam, "MIA");
    assert_eq!(rows[1].pass, Some(1));
    assert_eq!(rows[1].run, None);
    assert_eq!(agg.table_rows()[1], vec!["MIA", "1", ""]);

    let chart = ChartSpec::from_aggregate(PanelKind::TeamMix, 2022, &agg);
    assert_eq!(chart.title, "2022 Run/Pass Mix by Team");
    assert_eq!(chart.points.len(), 1);
    assert_eq!(chart.points[0].label, "BUF");
}

#[test]
fn grouped_rows_sort_by_key_then_pass_before_run() {
    let plays = projected(vec![
        raw("KC", "run", 1, 2, Some("home")),
        raw("KC", "pass", 1, 2, Some("home")),
        raw("KC", "run", 1, 1, Some("home")),
    ]);
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);
    let agg = engine.aggregate(PanelKind::ByDown, &engine.default_selection(PanelKind::ByDown));
    let Aggregate::Grouped { dimension, rows } = agg.as_ref() else {
        panic!("expected grouped aggregate");
    };
    assert_eq!(*dimension, Dimension::Down);
    let keys: Vec<(&str, PlayType)> = rows.iter().map(|r| (r.label.as_str(), r.play_type)).collect();
    assert_eq!(
        keys,
        vec![("1", PlayType::Run), ("2", PlayType::Pass), ("2", PlayType::Run)]
    );
}

#[test]
fn default_home_away_selection_keeps_plays_without_a_role() {
    let plays = projected(vec![
        raw("NE", "pass", 1, 1, Some("home")),
        raw("NE", "pass", 1, 1, None),
    ]);
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);
    assert_eq!(
        engine.domains().home_away,
        vec![Some("home".to_string()), None]
    );
    assert_eq!(
        engine.domains().labels(Dimension::HomeAway),
        vec!["home".to_string(), NO_ROLE_LABEL.to_string()]
    );

    for kind in PanelKind::ALL {
        let total = engine.aggregate(kind, &engine.default_selection(kind)).total_plays();
        let expected = if kind == PanelKind::RunLocation { 0 } else { 2 };
        assert_eq!(total, expected, "{kind}");
    }

    let mut sel = engine.default_selection(PanelKind::ByDown);
    assert!(sel.toggle(engine.domains(), Dimension::HomeAway, 1));
    assert_eq!(engine.aggregate(PanelKind::ByDown, &sel).total_plays(), 1);
}

#[test]
fn run_location_counts_only_runs() {
    let plays = projected(vec![
        raw("LV", "run", 1, 1, Some("away")),
        raw("LV", "run", 3, 1, Some("away")),
        raw("LV", "pass", 3, 1, Some("away")),
    ]);
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);
    let agg = engine.aggregate(
        PanelKind::RunLocation,
        &engine.default_selection(PanelKind::RunLocation),
    );
    assert_eq!(agg.total_plays(), 2);
    let chart = ChartSpec::from_aggregate(PanelKind::RunLocation, 2022, &agg);
    assert_eq!(chart.kind, ChartKind::Bar);
    assert_eq!(chart.categories, vec!["middle".to_string()]);
}

#[test]
fn run_location_applies_the_distance_filter() {
    let mut long = raw("LV", "run", 1, 1, Some("away"));
    long.ydstogo = Some(15.0);
    let plays = projected(vec![raw("LV", "run", 1, 1, Some("away")), long]);
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);
    let domains = engine.domains();
    assert!(PanelKind::RunLocation.dimensions().contains(&Dimension::Distance));

    let mut sel = engine.default_selection(PanelKind::RunLocation);
    let very_long = domains
        .distances
        .iter()
        .position(|b| *b == DistanceBucket::VeryLong)
        .expect("bucket in domain");
    assert!(sel.toggle(domains, Dimension::Distance, very_long));
    assert_eq!(engine.aggregate(PanelKind::RunLocation, &sel).total_plays(), 1);
}

#[test]
fn empty_selection_renders_no_data() {
    let engine = fake_engine();
    let mut sel = engine.default_selection(PanelKind::ByDistance);
    sel.select_none(Dimension::Team);
    let agg = engine.aggregate(PanelKind::ByDistance, &sel);
    assert!(agg.is_empty());
    assert!(ChartSpec::from_aggregate(PanelKind::ByDistance, 2022, &agg).is_empty());
}

#[test]
fn memo_returns_the_same_aggregate() {
    let engine = fake_engine();
    let sel = engine.default_selection(PanelKind::ByQuarter);
    let first = engine.aggregate(PanelKind::ByQuarter, &sel);
    let second = engine.aggregate(PanelKind::ByQuarter, &sel.clone());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.memo_len(), 1);

    let all = engine.default_aggregates();
    assert_eq!(all.len(), PanelKind::ALL.len());
    assert_eq!(engine.memo_len(), PanelKind::ALL.len());
}

#[test]
fn inactive_dimension_does_not_filter() {
    let engine = fake_engine();
    let sel = Selection::default();
    assert_eq!(
        engine.aggregate(PanelKind::TeamMix, &sel).total_plays(),
        engine.plays().len() as u64
    );
}
