pub mod forest;
pub mod scaler;

pub use forest::RandomForest;
pub use scaler::StandardScaler;

use crate::error::{AppError, Result};
use std::path::Path;
use tracing::info;

/// One classification: the winning label, its probability, and the dense
/// probability map over the model's label set in the model's class order.
///
/// Invariants: every label the model knows appears exactly once, values lie
/// in [0, 1] and sum to 1 within floating tolerance, `label` is the argmax
/// (first wins on ties) and `confidence` the maximum probability.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
    pub probabilities: Vec<(String, f32)>,
}

impl Prediction {
    /// Build a prediction from a dense probability map, deriving label and
    /// confidence from the argmax. Ties keep the earlier entry.
    pub fn from_probabilities(probabilities: Vec<(String, f32)>) -> Result<Self> {
        let mut best: Option<&(String, f32)> = None;
        for entry in &probabilities {
            match best {
                // Strictly greater, so the first maximum wins on ties.
                Some(current) if entry.1 > current.1 => best = Some(entry),
                None => best = Some(entry),
                _ => {}
            }
        }
        let (label, confidence) = best
            .map(|(l, p)| (l.clone(), *p))
            .ok_or_else(|| AppError::ModelUnavailable("model has no classes".into()))?;

        Ok(Self {
            label,
            confidence,
            probabilities,
        })
    }

    /// The top `n` entries, descending by probability, ties in input order.
    pub fn top_n(&self, n: usize) -> Vec<(String, f64)> {
        let mut sorted: Vec<(String, f64)> = self
            .probabilities
            .iter()
            .map(|(label, p)| (label.clone(), *p as f64))
            .collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted.truncate(n);
        sorted
    }
}

/// Inference seam. Lets tests substitute fixed-output stubs for the
/// pretrained forest.
pub trait Classifier: Send + Sync {
    /// The fixed label set this model predicts over.
    fn labels(&self) -> &[String];

    /// Classify a standardized feature vector. Deterministic for a fixed
    /// loaded model and fixed input.
    fn predict(&self, features: &[f32]) -> Result<Prediction>;
}

/// Load the scaler and classifier artifacts from the model directory.
/// Failure here is fatal: without both, no request can be served.
pub fn load_models(model_dir: &Path) -> Result<(StandardScaler, RandomForest)> {
    let scaler = StandardScaler::load(&model_dir.join("scaler.json"))?;
    let forest = RandomForest::load(&model_dir.join("emotion_model.json"))?;

    if scaler.mean.len() != forest.n_features() {
        return Err(AppError::ModelUnavailable(format!(
            "scaler dimensionality ({}) does not match model ({})",
            scaler.mean.len(),
            forest.n_features()
        )));
    }

    info!(
        "Loaded emotion model: {} trees, {} classes, {} features",
        forest.n_trees(),
        forest.labels().len(),
        forest.n_features()
    );

    Ok((scaler, forest))
}
