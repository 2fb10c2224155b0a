//! Feature importance ranking
//!
//! Scores are mean decrease in Gini impurity. Ranking the top K of a few
//! hundred columns uses a bounded min-heap: O(N log K) instead of a full sort.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::Serialize;

/// One feature's position in the importance ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFeature {
    /// 1-based rank
    pub rank: usize,
    /// Feature column name
    pub name: String,
    /// Importance score (non-negative)
    pub score: f64,
}

/// Per-feature importance scores, in feature-column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    names: Vec<String>,
    scores: Vec<f64>,
}

// Heap item: higher score ranks first, earlier column breaks ties.
#[derive(Debug)]
struct HeapItem {
    score: f64,
    column: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl Ord for HeapItem {
    // "Greater" means ranked lower, so the heap top is the weakest kept item.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.column.cmp(&other.column))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FeatureImportance {
    /// Pair names with scores.
    ///
    /// # Panics
    ///
    /// Panics if `names` and `scores` differ in length.
    #[must_use]
    pub fn new(names: Vec<String>, scores: Vec<f64>) -> Self {
        assert_eq!(names.len(), scores.len(), "one score per feature");
        Self { names, scores }
    }

    /// Score of a feature by column name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.scores[i])
    }

    /// Scores in feature-column order.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Feature names in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check if there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Name → score mapping.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.names.iter().cloned().zip(self.scores.iter().copied()).collect()
    }

    /// All features, highest score first.
    #[must_use]
    pub fn ranked(&self) -> Vec<RankedFeature> {
        self.top_k(self.len())
    }

    /// The `k` highest-scoring features, highest first.
    ///
    /// Equal scores keep column order.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<RankedFeature> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (column, &score) in self.scores.iter().enumerate() {
            heap.push(HeapItem { score, column });
            if heap.len() > k {
                heap.pop();
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .enumerate()
            .map(|(i, item)| RankedFeature {
                rank: i + 1,
                name: self.names[item.column].clone(),
                score: item.score,
            })
            .collect()
    }
}
