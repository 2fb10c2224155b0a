//! Synthetic recordings shared by the integration tests

#![allow(dead_code)]

use neurotab::session::{Contrast, Feedback, MemorySessionStore, Session, SpikeMatrix, Trial};

pub const TIME_BINS: usize = 4;

/// Area sets of the three synthetic sessions; only `MOs` carries signal.
pub const SESSION_AREAS: [&[&str]; 3] = [
    &["CA1", "MOs", "root"],
    &["MOs", "VISp", "MOs"],
    &["CA1", "MOs", "LGd", "root"],
];

/// 7 of every 10 trials succeed.
pub fn outcome(trial: usize) -> Feedback {
    if trial % 10 < 7 {
        Feedback::Success
    } else {
        Feedback::Failure
    }
}

fn neuron_row(area: &str, feedback: Feedback, trial: usize) -> Vec<u32> {
    let jitter = u32::try_from(trial % 2).unwrap();
    match (area, feedback) {
        ("MOs", Feedback::Success) => vec![2 + jitter, 3, 2, 3 + jitter],
        ("MOs", Feedback::Failure) => vec![0, 0, jitter, 0],
        _ => vec![1, 0, 1, jitter],
    }
}

pub fn trial(areas: &[&str], index: usize, feedback: Feedback) -> Trial {
    let rows = areas
        .iter()
        .map(|area| neuron_row(area, feedback, index))
        .collect();
    Trial::new(
        Contrast::LEVELS[index % 4],
        Contrast::LEVELS[(index / 4) % 4],
        feedback,
        SpikeMatrix::from_rows(rows).unwrap(),
    )
}

pub fn session(id: u32, areas: &[&str], trials: usize) -> Session {
    Session::builder(id, format!("mouse{id}"), "2016-12-14")
        .neuron_areas(areas.iter().copied())
        .trials((0..trials).map(|i| trial(areas, i, outcome(i))))
        .build()
        .unwrap()
}

/// Three sessions of `trials_per_session` trials each, ids 1..=3.
pub fn store(trials_per_session: usize) -> MemorySessionStore {
    let sessions = SESSION_AREAS
        .iter()
        .zip(1..)
        .map(|(areas, id)| session(id, areas, trials_per_session))
        .collect();
    MemorySessionStore::new(sessions).unwrap()
}
