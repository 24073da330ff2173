use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use pbp_terminal::cleaner;
use pbp_terminal::domains::{Dimension, DomainOrder};
use pbp_terminal::fake_season;
use pbp_terminal::panels::{self, PanelEngine, PanelKind};
use pbp_terminal::projector;

fn bench_clean_project(c: &mut Criterion) {
    let raw = fake_season::generate_season(2022, 2022, 272);
    c.bench_function("clean_and_project_season", |b| {
        b.iter(|| {
            let (cleaned, report) = cleaner::clean(black_box(&raw));
            let plays = projector::project(&cleaned).expect("project");
            black_box((plays.len(), report.output_rows))
        })
    });
}

fn bench_panels(c: &mut Criterion) {
    let raw = fake_season::generate_season(2022, 2022, 272);
    let (cleaned, _) = cleaner::clean(&raw);
    let plays = projector::project(&cleaned).expect("project");
    let engine = PanelEngine::new(2022, plays.into(), DomainOrder::Observed);

    for kind in PanelKind::ALL {
        let mut selection = engine.default_selection(kind);
        selection.toggle(engine.domains(), Dimension::Team, 1);
        c.bench_function(&format!("compute_{}", kind.short_label()), |b| {
            b.iter(|| black_box(panels::compute(kind, engine.plays(), black_box(&selection))))
        });
    }

    c.bench_function("default_aggregates_fresh_engine", |b| {
        b.iter(|| {
            let fresh = PanelEngine::new(2022, engine.plays().into(), DomainOrder::Observed);
            black_box(fresh.default_aggregates().len())
        })
    });
}

criterion_group!(benches, bench_clean_project, bench_panels);
criterion_main!(benches);
