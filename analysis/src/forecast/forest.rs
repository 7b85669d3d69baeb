//! Bootstrap-aggregated regression trees
//!
//! CART-style trees split on the feature/threshold pair with the lowest
//! summed squared error of the two children. The forest averages the trees,
//! each fit on its own bootstrap sample drawn from a per-tree seeded RNG, so
//! the same data and seed always yield the same model.

use crate::config::ForestConfig;
use crate::error::{AnalysisError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Single regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
    depth: usize,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Fit on the rows of `features` selected by `rows` (repeats allowed)
    fn fit(features: &[Vec<f64>], labels: &[f64], rows: Vec<usize>, config: &ForestConfig) -> Self {
        let mut depth = 0;
        let root = Self::grow(features, labels, rows, 0, config, &mut depth);
        Self { root, depth }
    }

    fn grow(
        features: &[Vec<f64>],
        labels: &[f64],
        rows: Vec<usize>,
        level: usize,
        config: &ForestConfig,
        depth: &mut usize,
    ) -> Node {
        *depth = (*depth).max(level);

        let n = rows.len() as f64;
        let sum: f64 = rows.iter().map(|&r| labels[r]).sum();
        let sq: f64 = rows.iter().map(|&r| labels[r] * labels[r]).sum();
        let mean = sum / n;
        let parent_sse = sq - sum * sum / n;

        let depth_reached = config.max_depth.is_some_and(|max| level >= max);
        if rows.len() < config.min_samples_split.max(2) || depth_reached || parent_sse <= f64::EPSILON * sq.max(1.0) {
            return Node::Leaf(mean);
        }

        let best = match Self::best_split(features, labels, &rows, sum, sq) {
            Some(best) => best,
            None => return Node::Leaf(mean),
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| features[r][best.feature] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(Self::grow(features, labels, left_rows, level + 1, config, depth)),
            right: Box::new(Self::grow(features, labels, right_rows, level + 1, config, depth)),
        }
    }

    fn best_split(
        features: &[Vec<f64>],
        labels: &[f64],
        rows: &[usize],
        total_sum: f64,
        total_sq: f64,
    ) -> Option<Candidate> {
        let n = rows.len();
        let width = features[rows[0]].len();
        let mut order = rows.to_vec();
        let mut best: Option<Candidate> = None;

        for feature in 0..width {
            order.sort_by(|a, b| features[*a][feature].total_cmp(&features[*b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 0..n - 1 {
                let y = labels[order[k]];
                left_sum += y;
                left_sq += y * y;

                let lo = features[order[k]][feature];
                let hi = features[order[k + 1]][feature];
                if lo == hi {
                    continue;
                }

                let n_left = (k + 1) as f64;
                let n_right = (n - k - 1) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if best.as_ref().map_or(true, |b| sse < b.sse) {
                    let mid = lo + (hi - lo) / 2.0;
                    // Adjacent floats: keep `hi` on the right side
                    let threshold = if mid >= hi { lo } else { mid };
                    best = Some(Candidate { feature, threshold, sse });
                }
            }
        }

        best
    }

    pub fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split { feature, threshold, left, right } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Deepest split level reached while growing
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Random-forest regressor
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Fit the forest
    ///
    /// # Arguments
    /// * `features` - One row per example, every row the same width
    /// * `labels` - Target value per example
    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()> {
        if features.is_empty() {
            return Err(AnalysisError::ModelError("no training examples".to_string()));
        }
        if features.len() != labels.len() {
            return Err(AnalysisError::ModelError(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let width = features[0].len();
        if width == 0 || features.iter().any(|row| row.len() != width) {
            return Err(AnalysisError::ModelError("feature rows must share a non-zero width".to_string()));
        }
        if self.config.n_trees == 0 {
            return Err(AnalysisError::ModelError("forest needs at least one tree".to_string()));
        }

        let n = features.len();
        let config = &self.config;

        self.trees = (0..config.n_trees)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(features, labels, rows, config)
            })
            .collect();
        self.n_features = width;

        tracing::debug!(
            trees = self.trees.len(),
            examples = n,
            features = width,
            max_depth = self.trees.iter().map(RegressionTree::depth).max().unwrap_or(0),
            "Fitted random forest"
        );

        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Mean prediction of all trees for one example
    pub fn predict_one(&self, sample: &[f64]) -> Result<f64> {
        if !self.is_fitted() {
            return Err(AnalysisError::ModelError("forest is not fitted".to_string()));
        }
        if sample.len() != self.n_features {
            return Err(AnalysisError::ModelError(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }

        let total: f64 = self.trees.iter().map(|t| t.predict(sample)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn predict(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>> {
        samples.iter().map(|s| self.predict_one(s)).collect()
    }
}
