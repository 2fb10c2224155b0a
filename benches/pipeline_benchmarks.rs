//! Pipeline benchmarks
//!
//! - Feature extraction over a multi-session store (sequential vs rayon)
//! - Random forest fitting
//! - Parquet write/load of the feature table

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use neurotab::config::{ExtractionConfig, ForestConfig};
use neurotab::dataset::{Dataset, DatasetAssembler, StratifiedSplit};
use neurotab::model::ModelTrainer;
use neurotab::session::{
    Contrast, Feedback, MemorySessionStore, Session, SessionStore, SpikeMatrix, Trial,
};
use neurotab::storage::FeatureTable;
use neurotab::vocabulary::{AreaVocabulary, VocabularyOrder};

const AREAS: [&str; 8] = ["ACA", "CA1", "DG", "LGd", "MOs", "SUB", "VISp", "root"];
const BINS: usize = 40;

/// Deterministic session with `neurons` neurons over a rotating subset of areas
fn create_session(id: u32, neurons: usize, trials: usize) -> Session {
    let areas: Vec<&str> = (0..neurons)
        .map(|n| AREAS[(n + id as usize) % (AREAS.len() - 2)])
        .collect();
    let trials = (0..trials).map(|t| {
        let feedback = if t % 10 < 7 { Feedback::Success } else { Feedback::Failure };
        let counts = (0..neurons * BINS)
            .map(|i| u32::try_from((i * 7 + t * 3) % 5).unwrap())
            .collect();
        Trial::new(
            Contrast::LEVELS[t % 4],
            Contrast::LEVELS[(t / 4) % 4],
            feedback,
            SpikeMatrix::new(neurons, BINS, counts).unwrap(),
        )
    });
    Session::builder(id, format!("mouse{}", id % 4), "2017-06-10")
        .neuron_areas(areas)
        .trials(trials)
        .build()
        .unwrap()
}

fn create_store(sessions: u32) -> MemorySessionStore {
    MemorySessionStore::new((1..=sessions).map(|id| create_session(id, 300, 120)).collect())
        .unwrap()
}

fn assemble(store: &MemorySessionStore) -> Dataset {
    let vocabulary = AreaVocabulary::build(store.sessions(), VocabularyOrder::Lexicographic);
    DatasetAssembler::new(ExtractionConfig::default())
        .assemble(store, &vocabulary)
        .unwrap()
        .0
}

/// Benchmark dataset assembly
fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");
    let store = create_store(6);
    let vocabulary = AreaVocabulary::build(store.sessions(), VocabularyOrder::Lexicographic);

    for parallel in [false, true] {
        let assembler = DatasetAssembler::new(ExtractionConfig {
            parallel,
            ..ExtractionConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("parallel", parallel), &parallel, |b, _| {
            b.iter(|| black_box(assembler.assemble(&store, &vocabulary).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark forest fitting
fn bench_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10);
    let dataset = assemble(&create_store(6));
    let split = StratifiedSplit::default().split(&dataset).unwrap();

    for n_trees in [10, 50] {
        let trainer = ModelTrainer::new(ForestConfig {
            n_trees,
            ..ForestConfig::default()
        });
        group.bench_with_input(BenchmarkId::from_parameter(n_trees), &n_trees, |b, _| {
            b.iter(|| black_box(trainer.fit(&split.training(&dataset)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark Parquet round trip of the feature table
fn bench_parquet(c: &mut Criterion) {
    let dataset = assemble(&create_store(6));
    let table = FeatureTable::from_dataset(&dataset).unwrap();
    let path = std::env::temp_dir().join("neurotab_bench.parquet");

    c.bench_function("parquet_write", |b| {
        b.iter(|| table.write_parquet(&path).unwrap());
    });
    c.bench_function("parquet_load", |b| {
        b.iter(|| black_box(FeatureTable::load_parquet(&path).unwrap().to_dataset().unwrap()));
    });

    std::fs::remove_file(&path).ok();
}

criterion_group!(benches, bench_assembly, bench_forest, bench_parquet);
criterion_main!(benches);
