//! Early/late time windows and per-neuron activity

use std::ops::Range;

/// Partition of a trial's time-bin axis into early and late halves.
///
/// The early half holds the first `bins / 2` bins; the late half holds the
/// rest, so an odd extra bin lands in the late half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindows {
    early: Range<usize>,
    late: Range<usize>,
}

impl TimeWindows {
    /// Split `bins` time bins into halves.
    #[must_use]
    pub const fn split(bins: usize) -> Self {
        let mid = bins / 2;
        Self {
            early: 0..mid,
            late: mid..bins,
        }
    }

    /// Early bin range.
    #[must_use]
    pub fn early(&self) -> Range<usize> {
        self.early.clone()
    }

    /// Late bin range.
    #[must_use]
    pub fn late(&self) -> Range<usize> {
        self.late.clone()
    }

    /// Total bins covered.
    #[must_use]
    pub const fn bins(&self) -> usize {
        self.late.end
    }

    /// True when either half is empty (fewer than 2 bins).
    ///
    /// Rates over an empty half are defined as 0.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.early.start == self.early.end || self.late.start == self.late.end
    }
}

/// Spike statistics of one neuron in one trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronActivity {
    /// Spikes over the whole window
    pub total: u64,
    /// Mean spikes per bin in the early half
    pub early_rate: f64,
    /// Mean spikes per bin in the late half
    pub late_rate: f64,
}

impl NeuronActivity {
    /// Measure one neuron's spike-count row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is shorter than `windows.bins()`.
    #[must_use]
    pub fn measure(row: &[u32], windows: &TimeWindows) -> Self {
        let early = sum(&row[windows.early()]);
        let late = sum(&row[windows.late()]);
        let total = early + late;
        Self {
            total,
            early_rate: rate(early, windows.early().len()),
            late_rate: rate(late, windows.late().len()),
        }
    }
}

fn sum(counts: &[u32]) -> u64 {
    counts.iter().map(|&c| u64::from(c)).sum()
}

#[allow(clippy::cast_precision_loss)]
fn rate(spikes: u64, bins: usize) -> f64 {
    if bins == 0 {
        0.0
    } else {
        spikes as f64 / bins as f64
    }
}
