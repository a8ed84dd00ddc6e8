use crate::error::{AppError, Result};
use crate::model::{Classifier, Prediction};
use serde::Deserialize;
use std::path::Path;

/// One node of a decision tree. The offline trainer flattens each tree into
/// a node array; index 0 is the root.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Class probability distribution at a leaf, in class order.
    Leaf { leaf: Vec<f32> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Walk from the root to a leaf distribution. A malformed tree (cycle,
    /// out-of-range child, missing leaf) is reported rather than looping.
    fn leaf_distribution<'a>(&'a self, features: &[f32]) -> Result<&'a [f32]> {
        let mut index = 0usize;
        for _ in 0..self.nodes.len() + 1 {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { leaf }) => return Ok(leaf),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = *features.get(*feature).ok_or(AppError::ShapeMismatch {
                        expected: *feature + 1,
                        actual: features.len(),
                    })?;
                    index = if value <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(AppError::ModelUnavailable("malformed tree in model artifact".into()))
    }
}

/// Pretrained random forest over the 40-dimensional feature vector.
/// Inference averages the per-tree leaf class distributions; there is no
/// randomness at inference time.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<String>,
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
        let forest: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::ModelUnavailable(format!("invalid model artifact: {}", e)))?;

        if forest.classes.is_empty() || forest.trees.is_empty() {
            return Err(AppError::ModelUnavailable(
                "model artifact has no classes or no trees".into(),
            ));
        }
        Ok(forest)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Classifier for RandomForest {
    fn labels(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, features: &[f32]) -> Result<Prediction> {
        if features.len() != self.n_features {
            return Err(AppError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let n_classes = self.classes.len();
        let mut votes = vec![0.0f32; n_classes];

        for tree in &self.trees {
            let leaf = tree.leaf_distribution(features)?;
            if leaf.len() != n_classes {
                return Err(AppError::ModelUnavailable(
                    "leaf distribution does not match class count".into(),
                ));
            }
            // Leaves may hold raw sample counts; normalize each before voting.
            let total: f32 = leaf.iter().sum();
            if total > 0.0 {
                for (vote, &count) in votes.iter_mut().zip(leaf.iter()) {
                    *vote += count / total;
                }
            }
        }

        let n_trees = self.trees.len() as f32;
        let probabilities: Vec<(String, f32)> = self
            .classes
            .iter()
            .zip(votes.iter())
            .map(|(label, &v)| (label.clone(), v / n_trees))
            .collect();

        Prediction::from_probabilities(probabilities)
    }
}
