//! Performance benchmarks for the suffix sorting strategies
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfxidx::alphabet::SEPARATOR;
use sfxidx::encseq::{Direction, EncodedSequence, SatelliteKind, TextStats};
use sfxidx::index::suffix_array::{DerivedSelection, DerivedTables, SortConfig, Strategy, SuffixArrayBuilder};

/// Random DNA reads with a repeated region, joined by separators
fn create_benchmark_text(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let repeat: Vec<u8> = (0..500).map(|_| rng.gen_range(0..4)).collect();
    let mut codes = Vec::with_capacity(len);
    while codes.len() < len {
        if !codes.is_empty() {
            codes.push(SEPARATOR);
        }
        let read = rng.gen_range(100..1000);
        for i in 0..read {
            codes.push(if i < repeat.len() && i % 3 == 0 { repeat[i] } else { rng.gen_range(0..4) });
        }
    }
    codes.truncate(len);
    if codes.last() == Some(&SEPARATOR) {
        codes.pop();
    }
    codes
}

fn encode(codes: &[u8], kind: SatelliteKind) -> EncodedSequence {
    let stats = TextStats::collect(codes, 4);
    EncodedSequence::encode(codes.to_vec(), &stats, kind)
}

fn bench_strategies(c: &mut Criterion) {
    let codes = create_benchmark_text(200_000);
    let encoded = encode(&codes, SatelliteKind::Bit);
    let strategies = [
        ("direct", Strategy::Direct),
        ("doubling", Strategy::Doubling),
        ("dc64", Strategy::DifferenceCover { modulus: 64 }),
    ];

    let mut group = c.benchmark_group("suffix_sort");
    group.sample_size(10);
    for (name, strategy) in strategies {
        let config = SortConfig {
            strategy,
            prefix_length: 6,
            ..SortConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            let builder = SuffixArrayBuilder::new(config.clone());
            b.iter(|| builder.build(black_box(&encoded), Direction::Forward))
        });
    }
    group.finish();
}

fn bench_partitions(c: &mut Criterion) {
    let codes = create_benchmark_text(200_000);
    let encoded = encode(&codes, SatelliteKind::Uchar);

    let mut group = c.benchmark_group("partitions");
    group.sample_size(10);
    for parts in [1usize, 4, 16] {
        let config = SortConfig {
            prefix_length: 6,
            parts,
            ..SortConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(parts), &config, |b, config| {
            let builder = SuffixArrayBuilder::new(config.clone());
            b.iter(|| builder.build(black_box(&encoded), Direction::Forward))
        });
    }
    group.finish();
}

fn bench_satellite_access(c: &mut Criterion) {
    let codes = create_benchmark_text(100_000);
    let mut group = c.benchmark_group("satellite_decode");
    for kind in [SatelliteKind::Direct, SatelliteKind::Bit, SatelliteKind::Uchar, SatelliteKind::Uint32] {
        let encoded = encode(&codes, kind);
        group.bench_with_input(BenchmarkId::from_parameter(kind), &encoded, |b, encoded| {
            b.iter(|| encoded.decode(black_box(0..encoded.total_length())))
        });
    }
    group.finish();
}

fn bench_derived_tables(c: &mut Criterion) {
    let codes = create_benchmark_text(200_000);
    let encoded = encode(&codes, SatelliteKind::Bit);
    let built = SuffixArrayBuilder::new(SortConfig {
        prefix_length: 6,
        ..SortConfig::default()
    })
    .build(&encoded, Direction::Forward)
    .expect("Failed to sort suffixes");

    let selection = DerivedSelection {
        lcp: true,
        bwt: true,
        bck: true,
    };
    c.bench_function("derived_tables", |b| {
        b.iter(|| DerivedTables::compute(black_box(&encoded), &built, selection))
    });
}

criterion_group!(
    benches,
    bench_strategies,
    bench_partitions,
    bench_satellite_access,
    bench_derived_tables,
);
criterion_main!(benches);
