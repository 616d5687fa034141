use chrono::{Duration, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rating_archive::format;
use rating_archive::normalize::Game;
use rating_archive::pipeline;
use rating_archive::raw::RawDataset;
use rating_archive::reduce;
use rating_archive::significance::significance;
use rating_archive::table::Table;

fn fixture() -> RawDataset {
    RawDataset::from_json_str(RAW_ARCHIVE_JSON).expect("valid fixture json")
}

fn bench_raw_parse(c: &mut Criterion) {
    c.bench_function("raw_parse", |b| {
        b.iter(|| {
            let raw = RawDataset::from_json_str(black_box(RAW_ARCHIVE_JSON)).unwrap();
            black_box(raw.results.len());
        })
    });
}

fn bench_format(c: &mut Criterion) {
    let raw = fixture();
    c.bench_function("format_dataset", |b| {
        b.iter(|| {
            let formatted = format::format_dataset(black_box(&raw)).unwrap();
            black_box(formatted.results.len());
        })
    });
}

fn bench_full_run(c: &mut Criterion) {
    let raw = fixture();
    c.bench_function("pipeline_run", |b| {
        b.iter(|| {
            let reduced = pipeline::run(black_box(&raw)).unwrap();
            black_box(reduced.expected.len());
        })
    });
}

fn bench_significance(c: &mut Criterion) {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..5_000).map(|d| base - Duration::days(d)).collect();
    c.bench_function("significance_5k_dates", |b| {
        b.iter(|| {
            let total: f64 = dates.iter().map(|d| significance(base, *d)).sum();
            black_box(total);
        })
    });
}

fn bench_expected_reduce(c: &mut Criterion) {
    let mut rows = Vec::with_capacity(20_000);
    for p1 in 1..=100i64 {
        for p2 in 1..=100i64 {
            if p1 == p2 {
                continue;
            }
            let we = 0.5 + (p2 - p1) as f64 / 400.0;
            for _ in 0..2 {
                rows.push(Game {
                    event_id: 1,
                    player_id_1: p1,
                    player_id_2: p2,
                    significance: 1.0,
                    r_1: Some(1200),
                    r_2: Some(1200),
                    unplayed: None,
                    w: 1.0,
                    we,
                    dw: 1.0 - we,
                });
            }
        }
    }
    let games = Table::from_rows(rows);
    c.bench_function("expected_reduce_10k_pairs", |b| {
        b.iter(|| {
            let expected = reduce::expected(black_box(&games)).unwrap();
            black_box(expected.len());
        })
    });
}

criterion_group!(
    perf,
    bench_raw_parse,
    bench_format,
    bench_full_run,
    bench_significance,
    bench_expected_reduce
);
criterion_main!(perf);

static RAW_ARCHIVE_JSON: &str = include_str!("../tests/fixtures/raw_archive.json");
