//! Gini decision tree for binary classification, the building block of the forest

use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Fraction of positive samples
        proba: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Weighted impurity decrease: n * gini - n_l * gini_l - n_r * gini_r
    decrease: f64,
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Decision Tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    /// Unnormalized impurity decrease per feature
    impurity_decrease: Vec<f64>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            impurity_decrease: Vec::new(),
        }
    }

    /// Train on the rows listed in `indices` (repeats allowed, as in a bootstrap).
    pub fn fit(
        &mut self,
        features: &Array2<f64>,
        labels: &[f64],
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) {
        self.impurity_decrease = vec![0.0; features.ncols()];
        self.root = Some(self.build(features, labels, indices.to_vec(), 0, rng));
    }

    fn build(
        &mut self,
        features: &Array2<f64>,
        labels: &[f64],
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| labels[i] > 0.5).count();
        let leaf = TreeNode::Leaf {
            proba: if n == 0 { 0.0 } else { positives as f64 / n as f64 },
            n_samples: n,
        };

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
            || positives == 0
            || positives == n
        {
            return leaf;
        }

        let Some(best) = self.find_best_split(features, labels, &indices, positives, rng) else {
            return leaf;
        };

        self.impurity_decrease[best.feature] += best.decrease;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| features[[i, best.feature]] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(features, labels, left, depth + 1, rng)),
            right: Box::new(self.build(features, labels, right, depth + 1, rng)),
        }
    }

    /// Sweep sorted values of a random feature subset for the largest Gini decrease.
    fn find_best_split(
        &self,
        features: &Array2<f64>,
        labels: &[f64],
        indices: &[usize],
        positives: usize,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let n_features = features.ncols();
        let max_features = self
            .config
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));

        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(max_features);

        let parent = n as f64 * gini(positives, n);
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;

        let mut order = indices.to_vec();
        for feature in candidates {
            order.sort_by(|&a, &b| {
                features[[a, feature]]
                    .partial_cmp(&features[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_pos = 0;
            for k in 1..n {
                if labels[order[k - 1]] > 0.5 {
                    left_pos += 1;
                }
                let lo = features[[order[k - 1], feature]];
                let hi = features[[order[k], feature]];
                if hi <= lo || k < min_leaf || n - k < min_leaf {
                    continue;
                }

                let right_pos = positives - left_pos;
                let decrease = parent
                    - k as f64 * gini(left_pos, k)
                    - (n - k) as f64 * gini(right_pos, n - k);

                if decrease > 1e-12 && best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    // Midpoint can round up to `hi` for adjacent floats
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }

        best
    }

    /// Positive-class probability for one sample.
    pub fn predict_proba_one(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = match &self.root {
            Some(root) => root,
            None => return 0.0,
        };
        loop {
            match node {
                TreeNode::Leaf { proba, .. } => return *proba,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    /// Impurity-based importances normalized to sum to 1 (all zero for a stump).
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total > 0.0 {
            self.impurity_decrease.iter().map(|d| d / total).collect()
        } else {
            vec![0.0; self.impurity_decrease.len()]
        }
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }
}
