//! Bagged decision-tree ensemble.
//!
//! Each tree is a CART tree grown on a bootstrap resample of the training
//! rows. At every node a random subset of `floor(sqrt(N_FEATURES))`
//! candidate features is searched for the Gini-optimal midpoint threshold;
//! if none of them separates the node, the remaining features are tried
//! before giving up and emitting a leaf. All randomness comes from a seeded
//! `StdRng`, so the same rows and config always produce the same forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Label, N_FEATURES};
use crate::config::ForestConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Node {
    Leaf(Label),
    Split {
        feature: usize,
        threshold: f64,
        /// Rows with `x[feature] <= threshold`.
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: &[f64; N_FEATURES]) -> Label {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(label) => return *label,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Ensemble of decision trees voting on the label.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Node>,
}

impl RandomForest {
    /// Fit `config.n_trees` trees on bootstrap resamples of `rows`.
    pub fn fit(
        rows: &[[f64; N_FEATURES]],
        labels: &[Label],
        config: &ForestConfig,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::ModelFitFailure("no training rows".into()));
        }
        if rows.len() != labels.len() {
            return Err(Error::ModelFitFailure(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if config.n_trees == 0 {
            return Err(Error::ModelFitFailure("n_trees must be at least 1".into()));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let n = rows.len();
        let builder = TreeBuilder {
            rows,
            labels,
            config,
            max_features: ((N_FEATURES as f64).sqrt() as usize).max(1),
        };

        let trees = (0..config.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                builder.build(&sample, 0, &mut rng)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Depth of the deepest tree.
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Number of trees voting Highway.
    pub fn highway_votes(&self, x: &[f64; N_FEATURES]) -> usize {
        self.trees
            .iter()
            .filter(|tree| tree.predict(x) == Label::Highway)
            .count()
    }

    /// Share of trees voting Highway, in [0, 1].
    pub fn highway_fraction(&self, x: &[f64; N_FEATURES]) -> f64 {
        self.highway_votes(x) as f64 / self.trees.len() as f64
    }

    /// Majority vote. A tie resolves to ServiceRoad.
    pub fn predict(&self, x: &[f64; N_FEATURES]) -> Label {
        if self.highway_votes(x) * 2 > self.trees.len() {
            Label::Highway
        } else {
            Label::ServiceRoad
        }
    }
}

struct TreeBuilder<'a> {
    rows: &'a [[f64; N_FEATURES]],
    labels: &'a [Label],
    config: &'a ForestConfig,
    max_features: usize,
}

impl TreeBuilder<'_> {
    fn build(&self, sample: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let total = sample.len();
        let highway = self.count_highway(sample);
        let majority = if highway * 2 > total {
            Label::Highway
        } else {
            Label::ServiceRoad
        };

        let pure = highway == 0 || highway == total;
        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || total < self.config.min_samples_split.max(2) {
            return Node::Leaf(majority);
        }

        let Some((feature, threshold)) = self.best_split(sample, highway, rng) else {
            return Node::Leaf(majority);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .iter()
            .partition(|&&i| self.rows[i][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(&left, depth + 1, rng)),
            right: Box::new(self.build(&right, depth + 1, rng)),
        }
    }

    fn count_highway(&self, sample: &[usize]) -> usize {
        sample
            .iter()
            .filter(|&&i| self.labels[i] == Label::Highway)
            .count()
    }

    /// Lowest weighted Gini impurity split that improves on the parent.
    fn best_split(
        &self,
        sample: &[usize],
        highway: usize,
        rng: &mut StdRng,
    ) -> Option<(usize, f64)> {
        let total = sample.len();
        let parent = gini(highway, total);

        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        features.shuffle(rng);

        let mut best: Option<(usize, f64, f64)> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }

            let mut values: Vec<(f64, bool)> = sample
                .iter()
                .map(|&i| (self.rows[i][feature], self.labels[i] == Label::Highway))
                .collect();
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_highway = 0;
            for k in 1..total {
                if values[k - 1].1 {
                    left_highway += 1;
                }
                if values[k].0 <= values[k - 1].0 {
                    continue;
                }

                let right_highway = highway - left_highway;
                let impurity = (k as f64 * gini(left_highway, k)
                    + (total - k) as f64 * gini(right_highway, total - k))
                    / total as f64;

                let improves = impurity < parent - 1e-12;
                if improves && best.map_or(true, |(_, _, b)| impurity < b) {
                    let threshold = (values[k - 1].0 + values[k].0) / 2.0;
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

fn gini(highway: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = highway as f64 / total as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
