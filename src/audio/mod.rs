pub mod decoder;
pub mod resample;

pub use decoder::{decode_bytes, DecodedAudio};
pub use resample::{resample_to_target, TARGET_SAMPLE_RATE};

/// Duration of a sample buffer in milliseconds.
pub fn duration_ms(samples: &[f32], sample_rate: u32) -> i64 {
    ((samples.len() as f64 / sample_rate as f64) * 1000.0) as i64
}
