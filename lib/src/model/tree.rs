//! CART decision tree classifier.
//!
//! Nodes are grown greedily: at each node every feature is scanned in sorted
//! order and the threshold with the lowest weighted child impurity wins.
//! Thresholds sit halfway between consecutive distinct values, and a sample
//! goes left when `x[feature] <= threshold`. A node becomes a leaf when it
//! is pure, too small, at `max_depth`, or all its features are constant.

use super::{argmax, check_training_data, Classifier, FittedModel, ModelError};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Split quality measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
    /// Shannon entropy under its cross-entropy name; grows the same tree as
    /// [`Criterion::Entropy`].
    LogLoss,
}

impl Criterion {
    pub const ALL: [Criterion; 3] = [Criterion::Gini, Criterion::Entropy, Criterion::LogLoss];

    /// Impurity of a node with the given class counts.
    pub fn impurity(self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / total;
                        p * p
                    })
                    .sum::<f64>()
            }
            Criterion::Entropy | Criterion::LogLoss => counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / total;
                    -p * p.log2()
                })
                .sum(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
            Criterion::LogLoss => "log_loss",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unfitted decision tree.
#[derive(Clone, Debug)]
pub struct DecisionTree {
    criterion: Criterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn get_criterion(&self) -> Criterion {
        self.criterion
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        class: usize,
        counts: Vec<usize>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct Grower<'a> {
    tree: &'a DecisionTree,
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    fn counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    fn leaf(counts: Vec<usize>) -> Node {
        let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        Node::Leaf {
            class: argmax(&as_f64),
            counts,
        }
    }

    /// Grow the tree from the root. Nodes are numbered in creation order,
    /// so children always come after their parent.
    fn grow(&mut self, rows: Vec<usize>) {
        let root = self.nodes.len();
        let root_leaf = Self::leaf(self.counts(&rows));
        self.nodes.push(root_leaf);
        let mut pending = vec![(root, rows, 0usize)];

        while let Some((id, rows, depth)) = pending.pop() {
            let counts = self.counts(&rows);
            let parent_impurity = self.tree.criterion.impurity(&counts, rows.len());
            let stop = parent_impurity <= 0.0
                || rows.len() < self.tree.min_samples_split
                || self.tree.max_depth.is_some_and(|max| depth >= max);
            let split = if stop { None } else { self.best_split(&rows) };
            let Some(split) = split else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| self.x[[r, split.feature]] <= split.threshold);
            let (left_leaf, right_leaf) = (
                Self::leaf(self.counts(&left_rows)),
                Self::leaf(self.counts(&right_rows)),
            );
            let left = self.nodes.len();
            self.nodes.push(left_leaf);
            let right = self.nodes.len();
            self.nodes.push(right_leaf);
            self.nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            pending.push((right, right_rows, depth + 1));
            pending.push((left, left_rows, depth + 1));
        }
    }

    fn best_split(&self, rows: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        let total_counts = self.counts(rows);
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.x.ncols() {
            let column = self.x.column(feature);
            let mut order = rows.to_vec();
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left = vec![0usize; self.n_classes];
            for i in 0..n - 1 {
                left[self.y[order[i]]] += 1;
                let (here, next) = (column[order[i]], column[order[i + 1]]);
                if here == next {
                    continue;
                }
                let right: Vec<usize> = total_counts
                    .iter()
                    .zip(&left)
                    .map(|(t, l)| t - l)
                    .collect();
                let n_left = i + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * self.tree.criterion.impurity(&left, n_left)
                    + n_right as f64 * self.tree.criterion.impurity(&right, n_right))
                    / n as f64;
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: midpoint(here, next),
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    let mid = a + (b - a) / 2.0;
    // Adjacent floats can round the midpoint up to `b`.
    if mid >= b {
        a
    } else {
        mid
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> String {
        format!("Decision Tree (criterion={})", self.criterion)
    }

    fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedModel, ModelError> {
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        check_training_data(x, y, n_classes)?;

        let mut grower = Grower {
            tree: self,
            x,
            y,
            n_classes,
            nodes: Vec::new(),
        };
        grower.grow((0..x.nrows()).collect());
        let nodes = grower.nodes;
        debug!(
            criterion = %self.criterion,
            n_nodes = nodes.len(),
            "decision tree fitted"
        );

        Ok(FittedModel::DecisionTree(FittedDecisionTree {
            nodes,
            criterion: self.criterion,
            n_features: x.ncols(),
            n_classes,
        }))
    }
}

/// Fitted tree. Node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedDecisionTree {
    nodes: Vec<Node>,
    criterion: Criterion,
    n_features: usize,
    n_classes: usize,
}

impl FittedDecisionTree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Longest root-to-leaf path, counted in splits.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut pending = vec![(0usize, 0usize)];
        while let Some((id, depth)) = pending.pop() {
            match self.nodes.get(id) {
                Some(Node::Split { left, right, .. }) => {
                    pending.push((*left, depth + 1));
                    pending.push((*right, depth + 1));
                }
                _ => deepest = deepest.max(depth),
            }
        }
        deepest
    }

    /// Check the node table of a loaded tree: every child index points
    /// forward into the table, features and classes are in range.
    pub(crate) fn check_nodes(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("decision tree has no nodes".to_string());
        }
        if self.n_classes == 0 {
            return Err("decision tree has no classes".to_string());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { class, counts } => {
                    if *class >= self.n_classes || counts.len() != self.n_classes {
                        return Err(format!(
                            "leaf {id} predicts class {class} with {} counts, tree has {} classes",
                            counts.len(),
                            self.n_classes
                        ));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= self.n_features {
                        return Err(format!(
                            "split {id} uses feature {feature}, tree has {} features",
                            self.n_features
                        ));
                    }
                    for child in [*left, *right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(format!(
                                "split {id} points to node {child} of {}",
                                self.nodes.len()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { class, .. } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub(crate) fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_impurity_values() {
        assert!((Criterion::Gini.impurity(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert!((Criterion::Entropy.impurity(&[2, 2], 4) - 1.0).abs() < 1e-12);
        assert_eq!(Criterion::Gini.impurity(&[4, 0], 4), 0.0);
        assert_eq!(
            Criterion::Entropy.impurity(&[3, 1], 4),
            Criterion::LogLoss.impurity(&[3, 1], 4)
        );
    }

    #[test]
    fn test_single_split() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let FittedModel::DecisionTree(tree) =
            DecisionTree::new().fit(&x, &[0, 0, 1, 1], 2).unwrap()
        else {
            panic!("expected a tree");
        };
        assert_eq!(tree.depth(), 1);
        assert!(matches!(
            tree.nodes()[0],
            Node::Split { feature: 0, threshold, .. } if threshold == 2.5
        ));
        assert_eq!(tree.predict(&array![[0.0], [2.4], [2.6], [9.0]]), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_fits_xor() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = [0, 1, 1, 0];
        for criterion in Criterion::ALL {
            let model = DecisionTree::new()
                .criterion(criterion)
                .fit(&x, &y, 2)
                .unwrap();
            assert_eq!(model.predict(&x).unwrap(), y, "criterion {criterion}");
        }
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let FittedModel::DecisionTree(tree) = DecisionTree::new()
            .max_depth(Some(0))
            .fit(&x, &[0, 1, 1, 1], 2)
            .unwrap()
        else {
            panic!("expected a tree");
        };
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict(&x), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let x = array![[1.0], [1.0], [1.0]];
        let FittedModel::DecisionTree(tree) = DecisionTree::new().fit(&x, &[0, 1, 1], 2).unwrap()
        else {
            panic!("expected a tree");
        };
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&x), vec![1, 1, 1]);
    }

    #[test]
    fn test_invalid_min_samples_split() {
        let x = array![[1.0], [2.0]];
        let result = DecisionTree::new().min_samples_split(1).fit(&x, &[0, 1], 2);
        assert!(matches!(result, Err(ModelError::InvalidParameter(_))));
    }

    #[test]
    fn test_name_includes_criterion() {
        let tree = DecisionTree::new().criterion(Criterion::LogLoss);
        assert_eq!(tree.name(), "Decision Tree (criterion=log_loss)");
    }

    #[test]
    fn test_deep_tree_on_small_stack() {
        // Alternating labels over a sorted feature peel one row per split.
        let n = 2000;
        let x = Array2::from_shape_fn((n, 1), |(r, _)| r as f64);
        let y: Vec<usize> = (0..n).map(|r| r % 2).collect();
        let handle = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || {
                let model = DecisionTree::new().fit(&x, &y, 2).unwrap();
                let predicted = model.predict(&x).unwrap();
                let FittedModel::DecisionTree(tree) = model else {
                    panic!("expected a tree");
                };
                (predicted == y, tree.depth())
            })
            .unwrap();
        let (exact, depth) = handle.join().unwrap();
        assert!(exact);
        assert!(depth >= 1);
    }

    #[test]
    fn test_children_follow_parent() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let FittedModel::DecisionTree(tree) = DecisionTree::new().fit(&x, &[0, 1, 1, 0], 2).unwrap()
        else {
            panic!("expected a tree");
        };
        assert_eq!(tree.depth(), 2);
        assert!(tree.check_nodes().is_ok());
    }

    #[test]
    fn test_corrupt_tree_artifact_rejected() {
        use crate::serialization::{ArtifactError, ArtifactObject};

        let leaf = |class| Node::Leaf {
            class,
            counts: vec![1, 1],
        };
        let broken = [
            vec![Node::Split { feature: 0, threshold: 0.5, left: 1, right: 7 }, leaf(0)],
            vec![Node::Split { feature: 0, threshold: 0.5, left: 0, right: 1 }, leaf(0)],
            vec![Node::Split { feature: 3, threshold: 0.5, left: 1, right: 2 }, leaf(0), leaf(1)],
            vec![leaf(5)],
            Vec::new(),
        ];
        for nodes in broken {
            let tree = FittedModel::DecisionTree(FittedDecisionTree {
                nodes,
                criterion: Criterion::Gini,
                n_features: 1,
                n_classes: 2,
            });
            let bytes = tree.to_artifact_bytes().unwrap();
            assert!(matches!(
                FittedModel::from_artifact_bytes(&bytes),
                Err(ArtifactError::Corrupt(_))
            ));
        }
    }
}
