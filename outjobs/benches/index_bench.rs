use criterion::{black_box, criterion_group, criterion_main, Criterion};
use outjobs::prelude::*;
use outjobs::{substitute_path, OutputIndex, ProjectAttributeLookup};
use std::path::PathBuf;
use uuid::Uuid;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("demo")
        .join(name)
}

fn large_index() -> String {
    let jobs: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();
    let mut index = OutputIndex::new();
    for i in 0..5000 {
        index.insert(
            format!("gerber/board_{}/layer_{}.gbr", i % 50, i),
            jobs[i % jobs.len()],
        );
    }
    index.serialize()
}

fn bench_index(c: &mut Criterion) {
    let content = large_index();
    c.bench_function("parse_index", |b| {
        b.iter(|| OutputIndex::parse(black_box(&content)))
    });

    let index = OutputIndex::parse(&content).unwrap();
    c.bench_function("serialize_index", |b| b.iter(|| black_box(&index).serialize()));
}

fn bench_substitute_path(c: &mut Criterion) {
    let project = Project::load(&fixture_path("demo.lpp")).unwrap();
    let lookup = ProjectAttributeLookup::new(
        &project,
        project.boards.first(),
        project.assembly_variants.first(),
    );
    c.bench_function("substitute_path", |b| {
        b.iter(|| {
            substitute_path(
                black_box("assembly/{{PROJECT}}_{{VERSION}}_{{BOARD}}_{{VARIANT}}_PnP-TOP.csv"),
                &lookup,
            )
        })
    });
}

fn bench_load_jobs(c: &mut Criterion) {
    c.bench_function("load_jobs", |b| {
        b.iter(|| JobList::load(black_box(&fixture_path("project/jobs.lp"))))
    });
}

criterion_group!(benches, bench_index, bench_substitute_path, bench_load_jobs);
criterion_main!(benches);
