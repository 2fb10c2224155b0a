//! End-to-end tests: session store to evaluation report

mod common;

use std::path::PathBuf;

use neurotab::config::{ExtractionConfig, PipelineConfig};
use neurotab::dataset::DatasetAssembler;
use neurotab::features::FillPolicy;
use neurotab::session::{
    Contrast, Feedback, MemorySessionStore, Session, SessionRecord, SessionStore, SessionSummary,
    SpikeMatrix, Trial, TrialRecord,
};
use neurotab::vocabulary::{AreaVocabulary, VocabularyOrder};
use neurotab::{Error, Pipeline};

fn pipeline() -> Pipeline {
    Pipeline::builder().trees(25).seed(7).build().unwrap()
}

#[test]
fn test_end_to_end_run() {
    let store = common::store(30);
    let output = pipeline().run(&store).unwrap();

    assert_eq!(
        output.vocabulary.labels(),
        &["CA1", "LGd", "MOs", "VISp", "root"]
    );
    assert_eq!(output.dataset.len(), 90);
    assert_eq!(output.dataset.schema().width(), 2 + 3 * 5);
    assert_eq!(output.stats.sessions, 3);
    assert_eq!(output.stats.successes, 63);
    assert_eq!(output.stats.time_bins, Some(common::TIME_BINS));
    assert_eq!(output.stats.degenerate_trials, 0);

    // round(63 * 0.2) = 13, round(27 * 0.2) = 5
    assert_eq!(output.split.validation_indices().len(), 18);
    assert_eq!(output.split.training_indices().len(), 72);

    let report = &output.report;
    assert_eq!(report.validation_rows, 18);
    assert_eq!(report.training_rows, 72);
    assert_eq!(report.confusion.total(), 18);
    assert!(report.accuracy >= 0.9, "accuracy {}", report.accuracy);
    assert!(report.recall_success.is_some());
    assert!(report.recall_failure.is_some());
}

#[test]
fn test_importance_finds_signal_area() {
    let output = pipeline().run(&common::store(30)).unwrap();
    let importance = output.model.feature_importance();

    let total: f64 = importance.scores().iter().sum();
    assert!((total - 1.0).abs() < 1e-9);

    let mos: f64 = importance
        .names()
        .iter()
        .zip(importance.scores())
        .filter(|(name, _)| name.ends_with(".MOs"))
        .map(|(_, score)| score)
        .sum();
    assert!(mos > 0.5, "MOs share {mos}");
}

#[test]
fn test_session_id_not_a_predictor() {
    let output = pipeline().run(&common::store(20)).unwrap();
    let names = output.model.feature_names();
    assert_eq!(names.len(), output.dataset.schema().width());
    assert!(names.iter().all(|n| n != "session_id" && n != "feedback"));
    assert_eq!(names[0], "contrast_left");
    assert_eq!(names[1], "contrast_right");
}

#[test]
fn test_absent_area_columns_are_zero() {
    let output = pipeline().run(&common::store(20)).unwrap();
    let schema = output.dataset.schema();
    let columns: Vec<usize> = ["total_spikes.CA1", "early_rate.CA1", "late_rate.CA1"]
        .iter()
        .map(|name| schema.index_of(name).unwrap())
        .collect();

    let session2: Vec<_> = output
        .dataset
        .rows()
        .iter()
        .filter(|r| r.session_id() == 2)
        .collect();
    assert_eq!(session2.len(), 20);
    for row in session2 {
        for &c in &columns {
            assert_eq!(row.values()[c], 0.0);
        }
    }
}

#[test]
fn test_missing_fill_policy_marks_absent_areas() {
    let pipeline = Pipeline::builder()
        .trees(10)
        .fill_policy(FillPolicy::Missing)
        .build()
        .unwrap();
    let output = pipeline.run(&common::store(20)).unwrap();
    let c = output.dataset.schema().index_of("total_spikes.VISp").unwrap();

    for row in output.dataset.rows() {
        assert_eq!(row.values()[c].is_nan(), row.session_id() != 2);
    }
    assert!(output.report.accuracy >= 0.9);
}

#[test]
fn test_run_is_reproducible() {
    let store = common::store(20);
    let a = pipeline().run(&store).unwrap();
    let b = pipeline().run(&store).unwrap();
    assert_eq!(a.dataset, b.dataset);
    assert_eq!(a.split, b.split);
    assert_eq!(a.report, b.report);

    let sequential = Pipeline::builder()
        .trees(25)
        .seed(7)
        .parallel(false)
        .build()
        .unwrap()
        .run(&store)
        .unwrap();
    assert_eq!(a.model, sequential.model);
}

#[test]
fn test_first_seen_vocabulary_order() {
    let pipeline = Pipeline::builder()
        .trees(5)
        .vocabulary_order(VocabularyOrder::FirstSeen)
        .build()
        .unwrap();
    let (dataset, _) = pipeline.build_dataset(&common::store(10)).unwrap();
    assert_eq!(
        dataset.vocabulary().labels(),
        &["CA1", "MOs", "root", "VISp", "LGd"]
    );
    assert_eq!(dataset.schema().names()[2], "total_spikes.CA1");
    assert_eq!(dataset.schema().names()[3], "total_spikes.MOs");
}

#[test]
fn test_single_class_store_fails_split() {
    let areas = ["MOs"];
    let session = Session::builder(1, "Cori", "2016-12-14")
        .neuron_areas(areas)
        .trials((0..10).map(|i| common::trial(&areas, i, Feedback::Success)))
        .build()
        .unwrap();
    let store = MemorySessionStore::new(vec![session]).unwrap();

    let result = pipeline().run(&store);
    assert!(matches!(result, Err(Error::Split(_))));
}

#[test]
fn test_time_bin_mismatch_is_schema_error() {
    let odd = Trial::new(
        Contrast::Zero,
        Contrast::Half,
        Feedback::Failure,
        SpikeMatrix::from_rows(vec![vec![1, 0, 1]]).unwrap(),
    );
    let broken = Session::builder(4, "Lederberg", "2017-12-05")
        .neuron_areas(["MOs"])
        .trial(common::trial(&["MOs"], 0, Feedback::Success))
        .trial(odd)
        .build()
        .unwrap();
    let mut sessions: Vec<Session> = common::store(10).sessions().to_vec();
    sessions.push(broken);
    let store = MemorySessionStore::new(sessions).unwrap();

    match pipeline().build_dataset(&store) {
        Err(Error::Schema { at, .. }) => {
            assert_eq!(at.session_id, 4);
            assert_eq!(at.trial, Some(1));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn test_unknown_area_is_vocabulary_error() {
    let store = common::store(5);
    let vocabulary = AreaVocabulary::from_labels(["CA1", "MOs", "root"]);
    let result = DatasetAssembler::new(ExtractionConfig::default()).assemble(&store, &vocabulary);

    match result {
        Err(Error::Vocabulary { at, area }) => {
            assert_eq!(at.session_id, 2);
            assert_eq!(area, "VISp");
        }
        other => panic!("expected vocabulary error, got {other:?}"),
    }
}

#[test]
fn test_degenerate_window_is_counted() {
    let trial = |i: usize| {
        let feedback = common::outcome(i);
        let count = if feedback == Feedback::Success { 5 } else { 0 };
        Trial::new(
            Contrast::Full,
            Contrast::Zero,
            feedback,
            SpikeMatrix::from_rows(vec![vec![count]]).unwrap(),
        )
    };
    let session = Session::builder(1, "Forssmann", "2017-11-01")
        .neuron_areas(["MOs"])
        .trials((0..10).map(trial))
        .build()
        .unwrap();
    let store = MemorySessionStore::new(vec![session]).unwrap();

    let (dataset, stats) = pipeline().build_dataset(&store).unwrap();
    assert_eq!(stats.time_bins, Some(1));
    assert_eq!(stats.degenerate_trials, 10);

    let early = dataset.schema().index_of("early_rate.MOs").unwrap();
    let late = dataset.schema().index_of("late_rate.MOs").unwrap();
    assert!(dataset.rows().iter().all(|r| r.values()[early] == 0.0));
    assert_eq!(dataset.rows()[0].values()[late], 5.0);
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("neurotab-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn record(session: &Session) -> SessionRecord {
    SessionRecord {
        session_id: None,
        mouse_name: session.mouse_name().to_string(),
        date_experiment: session.date_experiment().to_string(),
        neuron_area: session.neuron_areas().to_vec(),
        trials: session
            .trials()
            .iter()
            .map(|t| TrialRecord {
                contrast_left: t.contrast_left().value(),
                contrast_right: t.contrast_right().value(),
                feedback_type: i64::from(t.feedback().feedback_type()),
                spikes: t.spikes().rows().map(<[u32]>::to_vec).collect(),
            })
            .collect(),
    }
}

#[test]
fn test_json_directory_run() {
    let dir = temp_dir("json-run");
    let store = common::store(20);
    // file names sort in reverse of the in-memory order
    for (session, name) in store.sessions().iter().zip(["c.json", "b.json", "a.json"]) {
        let json = serde_json::to_string(&record(session)).unwrap();
        std::fs::write(dir.join(name), json).unwrap();
    }
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let loaded = MemorySessionStore::load_json_dir(&dir).unwrap();
    assert_eq!(loaded.len(), 3);
    let ids: Vec<u32> = loaded.sessions().iter().map(Session::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(loaded.sessions()[0].neuron_areas(), store.sessions()[2].neuron_areas());

    let summary = SessionSummary::from_session(&loaded.sessions()[0]);
    assert_eq!(summary.trials, 20);
    assert_eq!(summary.areas, 4);
    assert!((summary.success_rate - 0.7).abs() < 1e-12);

    let config = PipelineConfig::default();
    let output = Pipeline::builder()
        .config(config)
        .trees(15)
        .build()
        .unwrap()
        .run(&loaded)
        .unwrap();
    assert_eq!(output.dataset.len(), 60);

    std::fs::remove_dir_all(&dir).unwrap();
}
