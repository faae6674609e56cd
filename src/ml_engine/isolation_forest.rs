//! Isolation Forest
//!
//! Unsupervised outlier model over the four telemetry channels. Each tree is
//! grown on a random subsample by splitting on a random feature at a random
//! threshold until a row is isolated or the depth limit is reached. Outliers
//! are isolated after few splits, so a short average path means a high score.
//!
//! ## Scoring
//! - `h(x)`: depth at which `x` leaves the tree. A leaf holding `n` training
//!   rows adds `c(n)`, the expected path length of an unbuilt subtree.
//! - Every node keeps the bounding box of its training rows. A point outside a
//!   split node's box is separable from all of them by one cut, so its path
//!   ends there with `h = depth + 1`.
//! - `s(x) = 2^(-E[h(x)] / c(subsample))`, in (0, 1]; higher is more anomalous.

use rand::prelude::*;
use statrs::consts::EULER_MASCHERONI;
use thiserror::Error;

use crate::types::{FeatureVector, NUM_CHANNELS};

/// Subsample cap per tree.
pub const MAX_SUBSAMPLE: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("Training sample too small: {0} rows (need at least 2)")]
    TooFewSamples(usize),

    #[error("Contamination {0} must be within (0, 0.5]")]
    InvalidContamination(f64),

    #[error("Forest needs at least one estimator")]
    NoEstimators,

    #[error("Non-finite value at row {row}, feature {feature}")]
    NonFinite { row: usize, feature: usize },

    #[error("Feature {feature} has zero spread across the training sample")]
    ZeroSpread { feature: usize },
}

/// Average path length of an unsuccessful BST search over `n` items,
/// `c(n) = 2H(n-1) - 2(n-1)/n` with `H(i) ≈ ln(i) + γ`.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// Tree Structure
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct BoundingBox {
    min: FeatureVector,
    max: FeatureVector,
}

impl BoundingBox {
    fn of(rows: &[FeatureVector]) -> Self {
        let mut min = [f64::INFINITY; NUM_CHANNELS];
        let mut max = [f64::NEG_INFINITY; NUM_CHANNELS];
        for row in rows {
            for f in 0..NUM_CHANNELS {
                min[f] = min[f].min(row[f]);
                max[f] = max[f].max(row[f]);
            }
        }
        Self { min, max }
    }

    fn contains(&self, x: &FeatureVector) -> bool {
        (0..NUM_CHANNELS).all(|f| x[f] >= self.min[f] && x[f] <= self.max[f])
    }

    fn splittable_features(&self) -> Vec<usize> {
        (0..NUM_CHANNELS).filter(|&f| self.max[f] > self.min[f]).collect()
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        bounds: BoundingBox,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One isolation tree stored as a flat node arena
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
    root: usize,
}

impl IsolationTree {
    fn grow<R: Rng + ?Sized>(rows: Vec<FeatureVector>, depth_limit: usize, rng: &mut R) -> Self {
        let mut nodes = Vec::new();
        let root = Self::build(&mut nodes, rows, 0, depth_limit, rng);
        Self { nodes, root }
    }

    /// Build the subtree for `rows` and return its index. Children are pushed
    /// before their parent.
    fn build<R: Rng + ?Sized>(
        nodes: &mut Vec<Node>,
        rows: Vec<FeatureVector>,
        depth: usize,
        depth_limit: usize,
        rng: &mut R,
    ) -> usize {
        if depth >= depth_limit || rows.len() <= 1 {
            nodes.push(Node::Leaf { size: rows.len() });
            return nodes.len() - 1;
        }

        let bounds = BoundingBox::of(&rows);
        let candidates = bounds.splittable_features();
        let Some(&feature) = candidates.choose(rng) else {
            // All rows identical
            nodes.push(Node::Leaf { size: rows.len() });
            return nodes.len() - 1;
        };

        // [min, max): the min row always goes left, the max row right
        let threshold = rng.gen_range(bounds.min[feature]..bounds.max[feature]);
        let (left_rows, right_rows): (Vec<FeatureVector>, Vec<FeatureVector>) =
            rows.into_iter().partition(|r| r[feature] <= threshold);

        let left = Self::build(nodes, left_rows, depth + 1, depth_limit, rng);
        let right = Self::build(nodes, right_rows, depth + 1, depth_limit, rng);
        nodes.push(Node::Split {
            feature,
            threshold,
            bounds,
            left,
            right,
        });
        nodes.len() - 1
    }

    fn path_length(&self, x: &FeatureVector) -> f64 {
        let mut idx = self.root;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    bounds,
                    left,
                    right,
                } => {
                    if !bounds.contains(x) {
                        return depth + 1.0;
                    }
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

// ============================================================================
// Forest
// ============================================================================

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample: usize,
    normalizer: f64,
}

impl IsolationForest {
    /// Grow `n_estimators` trees over `rows`, each on `min(max_samples, 256,
    /// rows.len())` rows drawn without replacement.
    pub fn fit<R: Rng + ?Sized>(
        rows: &[FeatureVector],
        n_estimators: usize,
        max_samples: usize,
        rng: &mut R,
    ) -> Result<Self, TrainingError> {
        if rows.len() < 2 {
            return Err(TrainingError::TooFewSamples(rows.len()));
        }
        if n_estimators == 0 {
            return Err(TrainingError::NoEstimators);
        }
        for (row_idx, row) in rows.iter().enumerate() {
            if let Some(feature) = row.iter().position(|v| !v.is_finite()) {
                return Err(TrainingError::NonFinite { row: row_idx, feature });
            }
        }
        let bounds = BoundingBox::of(rows);
        if let Some(feature) = (0..NUM_CHANNELS).find(|&f| bounds.max[f] <= bounds.min[f]) {
            return Err(TrainingError::ZeroSpread { feature });
        }

        let subsample = max_samples.clamp(2, MAX_SUBSAMPLE).min(rows.len());
        let depth_limit = (subsample as f64).log2().ceil() as usize;

        let trees = (0..n_estimators)
            .map(|_| {
                let sample: Vec<FeatureVector> = rand::seq::index::sample(rng, rows.len(), subsample)
                    .into_iter()
                    .map(|i| rows[i])
                    .collect();
                IsolationTree::grow(sample, depth_limit, rng)
            })
            .collect();

        Ok(Self {
            trees,
            subsample,
            normalizer: average_path_length(subsample),
        })
    }

    /// Anomaly score in (0, 1]. Pure function of the model and `x`.
    pub fn score(&self, x: &FeatureVector) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / self.normalizer)
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub const fn subsample(&self) -> usize {
        self.subsample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_rows(n: usize, seed: u64) -> Vec<FeatureVector> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                [
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(0.0..1.0),
                ]
            })
            .collect()
    }

    #[test]
    fn test_average_path_length_small_cases() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) is about 10.24
        let c = average_path_length(256);
        assert!((c - 10.24).abs() < 0.05, "c(256) = {c}");
    }

    #[test]
    fn test_outside_hull_scores_high() {
        let rows = uniform_rows(500, 1);
        let mut rng = StdRng::seed_from_u64(42);
        let forest = IsolationForest::fit(&rows, 50, 256, &mut rng).unwrap();

        let far = forest.score(&[5.0, 0.5, 0.5, 0.5]);
        let center = forest.score(&[0.5, 0.5, 0.5, 0.5]);
        assert!(far > 0.9, "far = {far}");
        assert!(center < 0.6, "center = {center}");
        assert!(far > center);
    }

    #[test]
    fn test_score_is_deterministic() {
        let rows = uniform_rows(300, 2);
        let mut rng = StdRng::seed_from_u64(42);
        let forest = IsolationForest::fit(&rows, 20, 256, &mut rng).unwrap();
        let x = [0.1, 0.9, 0.3, 0.7];
        assert_eq!(forest.score(&x), forest.score(&x));
    }

    #[test]
    fn test_subsample_capped_by_rows() {
        let rows = uniform_rows(40, 3);
        let mut rng = StdRng::seed_from_u64(42);
        let forest = IsolationForest::fit(&rows, 5, 256, &mut rng).unwrap();
        assert_eq!(forest.subsample(), 40);
        assert_eq!(forest.n_estimators(), 5);
    }

    #[test]
    fn test_degenerate_samples_rejected() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            IsolationForest::fit(&[[1.0; 4]], 10, 256, &mut rng).unwrap_err(),
            TrainingError::TooFewSamples(1)
        );

        let flat = vec![[1.0, 2.0, 3.0, 4.0], [1.5, 2.0, 3.5, 4.5]];
        assert_eq!(
            IsolationForest::fit(&flat, 10, 256, &mut rng).unwrap_err(),
            TrainingError::ZeroSpread { feature: 1 }
        );

        let nan = vec![[1.0, 2.0, 3.0, 4.0], [1.5, f64::NAN, 3.5, 4.5]];
        assert_eq!(
            IsolationForest::fit(&nan, 10, 256, &mut rng).unwrap_err(),
            TrainingError::NonFinite { row: 1, feature: 1 }
        );

        let rows = uniform_rows(10, 4);
        assert_eq!(
            IsolationForest::fit(&rows, 0, 256, &mut rng).unwrap_err(),
            TrainingError::NoEstimators
        );
    }
}
