use crate::error::{AppError, Result};
use serde::Deserialize;
use std::path::Path;

/// Offline-fit per-dimension standardization parameters.
/// Loaded once at startup from `scaler.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { mean, std }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
        let scaler: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::ModelUnavailable(format!("invalid scaler artifact: {}", e)))?;
        if scaler.mean.len() != scaler.std.len() {
            return Err(AppError::ModelUnavailable(
                "scaler mean/std lengths differ".into(),
            ));
        }
        Ok(scaler)
    }

    /// Elementwise `(x - mean) / std`. Stateless, safe to call concurrently.
    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.mean.len() {
            return Err(AppError::ShapeMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }
}
