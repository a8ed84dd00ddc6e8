pub mod mfcc;

use crate::error::{AppError, Result};
pub use mfcc::{mfcc_matrix, power_spectrogram, MfccConfig};

/// Dimensionality of the classifier feature vector.
pub const FEATURE_DIM: usize = 40;

/// Compute the fixed-length acoustic feature vector for a recording:
/// 40 mel-cepstral coefficients over the whole signal, reduced along the
/// time axis by arithmetic mean. Deterministic for identical input.
pub fn feature_vector(samples: &[f32], sample_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Err(AppError::Decode("no samples to extract features from".into()));
    }

    let config = MfccConfig {
        sample_rate,
        n_mfcc: FEATURE_DIM,
        ..MfccConfig::default()
    };
    let mfccs = mfcc_matrix(samples, &config);

    let frames = mfccs.ncols() as f32;
    let vector: Vec<f32> = mfccs
        .rows()
        .into_iter()
        .map(|row| row.sum() / frames)
        .collect();

    debug_assert_eq!(vector.len(), FEATURE_DIM);
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let count = (sample_rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn returns_exactly_forty_finite_values() {
        let signal = tone(440.0, 22_050, 1.0);
        let features = feature_vector(&signal, 22_050).unwrap();
        assert_eq!(features.len(), FEATURE_DIM);
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let signal = tone(220.0, 22_050, 0.5);
        let a = feature_vector(&signal, 22_050).unwrap();
        let b = feature_vector(&signal, 22_050).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_signals_produce_distinct_features() {
        let a = feature_vector(&tone(440.0, 22_050, 0.5), 22_050).unwrap();
        let b = feature_vector(&tone(880.0, 22_050, 0.5), 22_050).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn short_clip_still_yields_full_vector() {
        // Shorter than one FFT window; padding must cover it.
        let signal = tone(440.0, 22_050, 0.01);
        let features = feature_vector(&signal, 22_050).unwrap();
        assert_eq!(features.len(), FEATURE_DIM);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(feature_vector(&[], 22_050).is_err());
    }
}
