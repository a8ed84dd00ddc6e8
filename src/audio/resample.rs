use crate::error::{AppError, Result};
use rubato::{FftFixedInOut, Resampler};
use tracing::info;

/// The extractor's working rate. Matches the rate the classifier's training
/// features were computed at.
pub const TARGET_SAMPLE_RATE: u32 = 22_050;

const BLOCK_SIZE: usize = 1024;

/// Resample mono audio to the target rate, returning exactly
/// `len * 22_050 / source_rate` frames. The resampler's filter delay is
/// trimmed from the front and the flush silence from the back, so no
/// synthetic leading or trailing samples reach feature extraction.
pub fn resample_to_target(samples: &[f32], source_rate: u32) -> Result<Vec<f32>> {
    if source_rate == TARGET_SAMPLE_RATE {
        return Ok(samples.to_vec());
    }

    info!(
        "Resampling from {}Hz to {}Hz",
        source_rate, TARGET_SAMPLE_RATE
    );

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        TARGET_SAMPLE_RATE as usize,
        BLOCK_SIZE,
        1,
    )
    .map_err(|e| AppError::Decode(format!("resampler setup for {}Hz: {}", source_rate, e)))?;

    let expected =
        (samples.len() as u64 * TARGET_SAMPLE_RATE as u64 / source_rate as u64) as usize;
    let delay = resampler.output_delay();

    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);
    let mut cursor = 0usize;

    // Full blocks first.
    loop {
        let needed = resampler.input_frames_next();
        if samples.len() - cursor < needed {
            break;
        }
        let block = resampler
            .process(&[&samples[cursor..cursor + needed]], None)
            .map_err(|e| AppError::Decode(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&block[0]);
        cursor += needed;
    }

    // Short final block, then silence until the delayed tail has emerged.
    let mut tail = samples[cursor..].to_vec();
    while output.len() < expected + delay {
        let block = resampler
            .process_partial(Some(&[std::mem::take(&mut tail)]), None)
            .map_err(|e| AppError::Decode(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&block[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_already_at_target() {
        let samples = vec![0.1f32, 0.2, 0.3];
        let out = resample_to_target(&samples, TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn downsample_yields_exact_length() {
        let samples = vec![0.0f32; 44_100];
        let out = resample_to_target(&samples, 44_100).unwrap();
        assert_eq!(out.len(), 22_050);
    }

    #[test]
    fn upsample_yields_exact_length() {
        let samples = vec![0.0f32; 8_000];
        let out = resample_to_target(&samples, 8_000).unwrap();
        assert_eq!(out.len(), 8_000 * 22_050 / 8_000);
    }

    #[test]
    fn short_clip_yields_exact_length() {
        // Shorter than one resampler block.
        let samples = vec![0.25f32; 441];
        let out = resample_to_target(&samples, 44_100).unwrap();
        assert_eq!(out.len(), 441 * 22_050 / 44_100);
    }

    #[test]
    fn output_tail_carries_signal_not_padding() {
        // A constant signal must still be near its level at the very end of
        // the output; leaked pad zeros or an untrimmed delay would pull the
        // tail toward silence.
        let samples = vec![0.5f32; 44_100];
        let out = resample_to_target(&samples, 44_100).unwrap();

        let tail = &out[out.len() - 256..];
        let mean = tail.iter().sum::<f32>() / tail.len() as f32;
        assert!((mean - 0.5).abs() < 0.05, "tail mean was {}", mean);
    }
}
