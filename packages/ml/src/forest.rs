//! Random forest classifier built from [`linfa_trees`] decision trees.
//!
//! Every tree is fit on a bootstrap resample of the training rows, restricted
//! to a random subspace of the feature columns drawn once per tree. Each
//! fitted tree is flattened into a routing table whose leaves keep the class
//! distribution of the training rows that reached them. Class probabilities
//! are the mean of those leaf distributions across trees.

use linfa::DatasetBase;
use linfa::traits::Fit;
use linfa_trees::{DecisionTree, SplitQuality, TreeNode};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use recommender_types::rand::Rng;
use recommender_types::rand::seq::index;
use recommender_types::utils::{child_seed, seeded_rng};
use recommender_types::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

/// How many feature columns each tree is fit on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    /// `ceil(sqrt(n_features))` columns per tree.
    #[default]
    Sqrt,
    Fixed(usize),
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> Result<usize> {
        match self {
            MaxFeatures::All => Ok(n_features),
            MaxFeatures::Sqrt => {
                let k = (n_features as f64).sqrt().ceil() as usize;
                Ok(k.clamp(1, n_features))
            }
            MaxFeatures::Fixed(k) if k == 0 || k > n_features => {
                bail!("max_features must be within 1..={n_features}, got {k}")
            }
            MaxFeatures::Fixed(k) => Ok(k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub seed: u64,
    /// Maximum depth of every tree. `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub bootstrap: bool,
    pub max_features: MaxFeatures,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        RandomForestParams {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            bootstrap: true,
            max_features: MaxFeatures::default(),
        }
    }
}

impl RandomForestParams {
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Fit the ensemble. `targets` must hold class indices below `n_classes`.
    pub fn fit(
        &self,
        records: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
    ) -> Result<RandomForest> {
        let (n_samples, n_features) = records.dim();
        if n_samples == 0 || n_features == 0 {
            bail!("Cannot fit a forest on an empty dataset");
        }
        if n_samples != targets.len() {
            bail!(
                "Got {} records but {} targets",
                n_samples,
                targets.len()
            );
        }
        if self.n_trees == 0 {
            bail!("A forest needs at least one tree");
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= n_classes) {
            bail!("Target {bad} is out of range for {n_classes} classes");
        }
        let n_sub = self.max_features.resolve(n_features)?;

        let mut params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(self.max_depth);
        if self.min_samples_split > 0 {
            params = params.min_weight_split(self.min_samples_split as f32);
        }

        let t0 = std::time::Instant::now();
        let mut trees = Vec::with_capacity(self.n_trees);
        for i in 0..self.n_trees {
            let mut rng = seeded_rng(child_seed(self.seed, i));

            let rows: Vec<usize> = if self.bootstrap {
                (0..n_samples)
                    .map(|_| rng.random_range(0..n_samples))
                    .collect()
            } else {
                (0..n_samples).collect()
            };
            let mut features: Vec<usize> = if n_sub < n_features {
                index::sample(&mut rng, n_features, n_sub).into_vec()
            } else {
                (0..n_features).collect()
            };
            features.sort_unstable();

            let sample = records.select(Axis(0), &rows).select(Axis(1), &features);
            let sample_targets = targets.select(Axis(0), &rows);
            let ds = DatasetBase::from(sample).with_targets(sample_targets);
            let fitted = params.fit(&ds)?;

            let mut tree = ForestTree::from_fitted(&fitted, features, n_classes)?;
            tree.fill_leaves(records, targets, &rows);
            trees.push(tree);
        }
        tracing::debug!(
            "Fit {} trees on {} samples: {:?}",
            self.n_trees,
            n_samples,
            t0.elapsed()
        );

        Ok(RandomForest {
            trees,
            n_classes,
            n_features,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Rows with `x[feature] < threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution of the training rows that reached this leaf.
    Leaf { proba: Vec<f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForestTree {
    /// Column indices of the full feature vector this tree was fit on.
    features: Vec<usize>,
    /// Preorder node table, root first.
    nodes: Vec<Node>,
}

impl ForestTree {
    /// Leaves start as a one-hot vote for the class the fitted tree predicts.
    fn from_fitted(
        tree: &DecisionTree<f64, usize>,
        features: Vec<usize>,
        n_classes: usize,
    ) -> Result<Self> {
        let mut nodes = Vec::new();
        flatten(tree.root_node(), &features, n_classes, &mut nodes)?;
        Ok(ForestTree { features, nodes })
    }

    /// Replace leaf votes by the class frequencies of the tree's own
    /// training `rows` (with bootstrap repeats). Leaves no row reaches keep
    /// their one-hot vote.
    fn fill_leaves(&mut self, records: &Array2<f64>, targets: &Array1<usize>, rows: &[usize]) {
        let mut counts: Vec<Option<Vec<f64>>> = vec![None; self.nodes.len()];
        for &row in rows {
            let leaf = self.leaf_index(records.row(row));
            if let Node::Leaf { proba } = &self.nodes[leaf] {
                let slot = counts[leaf].get_or_insert_with(|| vec![0.0; proba.len()]);
                slot[targets[row]] += 1.0;
            }
        }
        for (node, count) in self.nodes.iter_mut().zip(counts) {
            if let (Node::Leaf { proba }, Some(count)) = (node, count) {
                let total: f64 = count.iter().sum();
                *proba = count.into_iter().map(|c| c / total).collect();
            }
        }
    }

    /// `row` is a full feature vector.
    fn leaf_index(&self, row: ArrayView1<f64>) -> usize {
        let mut idx = 0;
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
        } = &self.nodes[idx]
        {
            idx = if row[*feature] < *threshold { *left } else { *right };
        }
        idx
    }

    fn leaf_proba(&self, row: ArrayView1<f64>) -> &[f64] {
        match &self.nodes[self.leaf_index(row)] {
            Node::Leaf { proba } => proba,
            Node::Split { .. } => &[],
        }
    }

    /// Children must come after their parent so routing always terminates.
    fn check(&self, n_classes: usize, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("tree has no nodes");
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    let in_order = |child: usize| child > idx && child < self.nodes.len();
                    if *feature >= n_features || !in_order(*left) || !in_order(*right) {
                        bail!("malformed split at node {idx}");
                    }
                }
                Node::Leaf { proba } if proba.len() != n_classes => {
                    bail!("leaf {idx} has {} classes, expected {n_classes}", proba.len())
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

/// Append `node` and its subtree to `nodes` in preorder, mapping subspace
/// feature indices back to full-vector columns. Returns the node's index.
fn flatten(
    node: &TreeNode<f64, usize>,
    features: &[usize],
    n_classes: usize,
    nodes: &mut Vec<Node>,
) -> Result<usize> {
    let idx = nodes.len();
    if let Some(class) = node.prediction() {
        if class >= n_classes {
            bail!("Tree predicts class {class} but the forest only knows {n_classes} classes");
        }
        let mut proba = vec![0.0; n_classes];
        proba[class] = 1.0;
        nodes.push(Node::Leaf { proba });
        return Ok(idx);
    }

    let (sub_feature, threshold, _) = node.split();
    let feature = *features
        .get(sub_feature)
        .ok_or_else(|| anyhow!("Split on unknown feature {sub_feature}"))?;
    let children = node.children();
    let (Some(left_node), Some(right_node)) = (children[0].as_deref(), children[1].as_deref())
    else {
        bail!("Split node at depth {} lacks a child", node.depth());
    };

    // Placeholder until the children indices are known.
    nodes.push(Node::Leaf { proba: Vec::new() });
    let left = flatten(left_node, features, n_classes, nodes)?;
    let right = flatten(right_node, features, n_classes, nodes)?;
    nodes[idx] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    Ok(idx)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<ForestTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Structural consistency of a forest read back from disk.
    pub fn check(&self) -> Result<()> {
        if self.trees.is_empty() {
            bail!("forest has no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check(self.n_classes, self.n_features)
                .map_err(|err| anyhow!("tree {i}: {err}"))?;
        }
        Ok(())
    }

    /// Per-row class probabilities, shape `(n_rows, n_classes)`.
    pub fn predict_proba(&self, records: &Array2<f64>) -> Result<Array2<f64>> {
        let (n_rows, n_features) = records.dim();
        if n_features != self.n_features {
            bail!(
                "Expected {} features, got {}",
                self.n_features,
                n_features
            );
        }

        let mut proba = Array2::<f64>::zeros((n_rows, self.n_classes));
        for (row, mut out) in records.outer_iter().zip(proba.outer_iter_mut()) {
            for tree in &self.trees {
                let leaf = tree.leaf_proba(row);
                if leaf.len() != self.n_classes {
                    bail!("Tree leaf covers {} classes, expected {}", leaf.len(), self.n_classes);
                }
                out += &ArrayView1::from(leaf);
            }
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    /// Class probabilities for a single feature vector.
    pub fn predict_proba_one(&self, features: &[f64]) -> Result<Vec<f64>> {
        let row = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        let proba = self.predict_proba(&row)?;
        Ok(proba.row(0).to_vec())
    }

    /// Most probable class per row, lowest class index on ties.
    pub fn predict(&self, records: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(records)?;
        Ok(proba.outer_iter().map(argmax).collect())
    }
}

fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (idx, &p) in row.iter().enumerate() {
        if p > row[best] {
            best = idx;
        }
    }
    best
}
