//! End-to-end index construction benchmarks.
//!
//! Run with: `cargo bench --bench indexing`
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`

use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfxidx::config::BuildOptions;
use sfxidx::index::{build_index, IndexReader, ReadMode, TableSet, Trials};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a FASTA file of random DNA records
fn create_fasta(dir: &Path, records: usize) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(7);
    let mut text = String::new();
    for i in 0..records {
        let _ = writeln!(text, ">read{} benchmark", i);
        let len = rng.gen_range(200..2000);
        let residues: String = (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)] as char).collect();
        text.push_str(&residues);
        text.push('\n');
    }
    let path = dir.join("bench.fna");
    fs::write(&path, text).expect("Failed to write fasta");
    path
}

fn bench_build(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let fasta = create_fasta(temp_dir.path(), 200);
    let name = temp_dir.path().join("bench");

    let mut group = c.benchmark_group("build");
    group.sample_size(10);
    group.bench_function("all_tables", |b| {
        b.iter(|| {
            let options = BuildOptions {
                inputs: vec![fasta.clone()],
                index_name: Some(name.clone()),
                tables: Some(TableSet::all()),
                ..Default::default()
            };
            build_index(&options.validate().expect("valid options")).expect("Failed to build index")
        })
    });
    group.finish();

    let mut group = c.benchmark_group("map");
    for (label, mode) in [("mapped", ReadMode::Mapped), ("stream", ReadMode::Stream)] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let reader = IndexReader::open(&name, TableSet::all(), mode).expect("Failed to open index");
                reader.verify(Trials::default()).expect("Index is inconsistent")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
