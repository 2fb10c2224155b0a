//! CART classification tree (Gini impurity)
//!
//! Two classes only (failure = 0, success = 1). Splits are axis-aligned
//! `x[feature] <= threshold`; NaN never satisfies the test, so missing
//! values always follow the right child.

use rand::seq::index;
use rand::Rng;

use crate::session::Feedback;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// Maximum depth (`None` = unlimited)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each child
    pub min_samples_leaf: usize,
    /// Features inspected at each split, drawn without replacement
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        success_share: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    features: usize,
}

/// Result of fitting one tree.
#[derive(Debug, Clone)]
pub struct FittedTree {
    /// The tree
    pub tree: DecisionTree,
    /// Weighted impurity decrease per feature (unnormalized)
    pub impurity_decrease: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
    left: [usize; 2],
    right: [usize; 2],
}

struct Grower<'a, R> {
    x: &'a [&'a [f64]],
    y: &'a [usize],
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows of `x` listed in `samples` (duplicates allowed,
    /// as produced by bootstrap resampling).
    ///
    /// `y[i]` is the class index of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if a sample index is out of range for `x` or `y`.
    pub fn fit<R: Rng>(
        x: &[&[f64]],
        y: &[usize],
        samples: Vec<usize>,
        params: TreeParams,
        rng: &mut R,
    ) -> FittedTree {
        let features = x.first().map_or(0, |row| row.len());
        let mut grower = Grower {
            x,
            y,
            params: TreeParams {
                max_features: params.max_features.clamp(1, features.max(1)),
                ..params
            },
            rng,
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; features],
        };
        let counts = grower.counts(&samples);
        grower.grow(samples, counts, 0);

        FittedTree {
            tree: Self {
                nodes: grower.nodes,
                features,
            },
            impurity_decrease: grower.impurity_decrease,
        }
    }

    /// Share of training samples in the reached leaf that were successes.
    ///
    /// # Panics
    ///
    /// Panics if `row` is shorter than the training feature width.
    #[must_use]
    pub fn success_share(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { success_share } => return *success_share,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Predicted class; ties in the leaf go to success.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> Feedback {
        if self.success_share(row) >= 0.5 {
            Feedback::Success
        } else {
            Feedback::Failure
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Feature width the tree was trained on.
    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.features
    }
}

#[allow(clippy::cast_precision_loss)]
fn gini(counts: [usize; 2]) -> f64 {
    let n = counts[0] + counts[1];
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let p0 = counts[0] as f64 / n;
    let p1 = counts[1] as f64 / n;
    1.0 - p0 * p0 - p1 * p1
}

impl<R: Rng> Grower<'_, R> {
    fn counts(&self, samples: &[usize]) -> [usize; 2] {
        let mut counts = [0; 2];
        for &s in samples {
            counts[self.y[s]] += 1;
        }
        counts
    }

    #[allow(clippy::cast_precision_loss)]
    fn leaf(&mut self, counts: [usize; 2]) -> usize {
        let n = counts[0] + counts[1];
        let success_share = if n == 0 {
            0.0
        } else {
            counts[1] as f64 / n as f64
        };
        self.nodes.push(Node::Leaf { success_share });
        self.nodes.len() - 1
    }

    #[allow(clippy::cast_precision_loss)]
    fn grow(&mut self, samples: Vec<usize>, counts: [usize; 2], depth: usize) -> usize {
        let n = samples.len();
        let pure = counts[0] == 0 || counts[1] == 0;
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || n < self.params.min_samples_split {
            return self.leaf(counts);
        }

        let Some(best) = self.best_split(&samples, counts) else {
            return self.leaf(counts);
        };

        let parent = n as f64 * gini(counts);
        let children = (best.left[0] + best.left[1]) as f64 * gini(best.left)
            + (best.right[0] + best.right[1]) as f64 * gini(best.right);
        let decrease = parent - children;
        // children with the parent's class mix: no gain, and rounding can
        // make the decrease slightly negative
        if decrease <= 0.0 {
            return self.leaf(counts);
        }
        self.impurity_decrease[best.feature] += decrease;

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.x[s][best.feature] <= best.threshold);

        // reserve the split slot so children land after their parent
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { success_share: 0.0 });
        let left_id = self.grow(left, best.left, depth + 1);
        let right_id = self.grow(right, best.right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_id,
            right: right_id,
        };
        id
    }

    #[allow(clippy::cast_precision_loss)]
    fn best_split(&mut self, samples: &[usize], counts: [usize; 2]) -> Option<Candidate> {
        let n = samples.len();
        let features = self.impurity_decrease.len();
        if features == 0 {
            return None;
        }
        // Random feature order; keep drawing past `max_features` only while
        // no valid split has been found (constant features yield none).
        let order = index::sample(&mut *self.rng, features, features);
        let min_leaf = self.params.min_samples_leaf;

        let mut best: Option<Candidate> = None;
        let mut values: Vec<(f64, usize)> = Vec::with_capacity(n);

        for (inspected, feature) in order.iter().enumerate() {
            if inspected >= self.params.max_features && best.is_some() {
                break;
            }
            values.clear();
            values.extend(
                samples
                    .iter()
                    .map(|&s| (self.x[s][feature], self.y[s]))
                    .filter(|(v, _)| !v.is_nan()),
            );
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = [0usize; 2];
            for i in 0..values.len().saturating_sub(1) {
                left[values[i].1] += 1;
                let (lo, hi) = (values[i].0, values[i + 1].0);
                if lo >= hi {
                    continue;
                }
                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }
                let right = [counts[0] - left[0], counts[1] - left[1]];
                let impurity =
                    (left_n as f64 * gini(left) + right_n as f64 * gini(right)) / n as f64;
                if best.map_or(true, |b| impurity < b.impurity) {
                    let mid = lo + (hi - lo) / 2.0;
                    best = Some(Candidate {
                        feature,
                        threshold: if mid < hi { mid } else { lo },
                        impurity,
                        left,
                        right,
                    });
                }
            }

            // every non-missing value left, missing values right
            let missing = n - values.len();
            if missing > 0 && !values.is_empty() {
                let mut left = [0usize; 2];
                for &(_, class) in &values {
                    left[class] += 1;
                }
                let left_n = values.len();
                if left_n >= min_leaf && missing >= min_leaf {
                    let right = [counts[0] - left[0], counts[1] - left[1]];
                    let impurity =
                        (left_n as f64 * gini(left) + missing as f64 * gini(right)) / n as f64;
                    if best.map_or(true, |b| impurity < b.impurity) {
                        best = Some(Candidate {
                            feature,
                            threshold: values[left_n - 1].0,
                            impurity,
                            left,
                            right,
                        });
                    }
                }
            }
        }
        best
    }
}
