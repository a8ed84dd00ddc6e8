use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// MFCC configuration.
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 40,
        }
    }
}

/// Compute a Hann-windowed STFT power spectrogram.
/// Returns a (n_fft / 2 + 1, frames) matrix.
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    // Hann window
    let window: Vec<f32> = (0..n_fft)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n_fft as f32).cos()))
        .collect();

    // Center-pad so every sample sits in the middle of some frame
    let pad_length = n_fft / 2;
    let mut padded = vec![0.0f32; pad_length];
    padded.extend_from_slice(samples);
    padded.extend(vec![0.0f32; pad_length]);

    let num_frames = (padded.len() - n_fft) / hop_length + 1;
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut spectrogram = Array2::<f32>::zeros((n_fft / 2 + 1, num_frames));

    for (frame_idx, start) in (0..padded.len() - n_fft + 1)
        .step_by(hop_length)
        .enumerate()
    {
        if frame_idx >= num_frames {
            break;
        }

        let mut buffer: Vec<Complex<f32>> = padded[start..start + n_fft]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        fft.process(&mut buffer);

        for (i, c) in buffer.iter().take(n_fft / 2 + 1).enumerate() {
            spectrogram[[i, frame_idx]] = c.norm_sqr();
        }
    }

    spectrogram
}

/// Compute an MFCC matrix of shape (n_mfcc, frames): mel-filtered power
/// spectrogram in dB, then an orthonormal DCT-II along the band axis.
pub fn mfcc_matrix(samples: &[f32], config: &MfccConfig) -> Array2<f32> {
    let spectrogram = power_spectrogram(samples, config.n_fft, config.hop_length);

    let filterbank = mel_filterbank(
        config.sample_rate,
        config.n_fft,
        config.n_mels,
        0.0,
        config.sample_rate as f32 / 2.0,
    );

    let mel_spec = filterbank.dot(&spectrogram);
    let log_mel = mel_spec.mapv(|x| 10.0 * x.max(1e-10).log10());

    dct_ii(&log_mel, config.n_mfcc)
}

/// Convert frequency to mel scale
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel to frequency
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Create a triangular mel filterbank matrix of shape (n_mels, n_fft / 2 + 1).
fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);

    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32)
        .collect();

    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();

    let bin_points: Vec<usize> = hz_points
        .iter()
        .map(|&hz| ((n_fft + 1) as f32 * hz / sample_rate as f32).floor() as usize)
        .collect();

    let mut filterbank = Array2::<f32>::zeros((n_mels, n_freqs));

    for m in 0..n_mels {
        let f_m_minus = bin_points[m];
        let f_m = bin_points[m + 1];
        let f_m_plus = bin_points[m + 2];

        // Rising slope
        for k in f_m_minus..f_m {
            if k < n_freqs {
                filterbank[[m, k]] = (k - f_m_minus) as f32 / (f_m - f_m_minus).max(1) as f32;
            }
        }

        // Falling slope
        for k in f_m..f_m_plus {
            if k < n_freqs {
                filterbank[[m, k]] = (f_m_plus - k) as f32 / (f_m_plus - f_m).max(1) as f32;
            }
        }
    }

    filterbank
}

/// Orthonormal DCT-II along the band axis, keeping the first `n_out` rows.
fn dct_ii(input: &Array2<f32>, n_out: usize) -> Array2<f32> {
    let n_bands = input.nrows();
    let n_frames = input.ncols();
    let mut output = Array2::<f32>::zeros((n_out, n_frames));

    let scale0 = (1.0 / n_bands as f32).sqrt();
    let scale = (2.0 / n_bands as f32).sqrt();

    for k in 0..n_out {
        let norm = if k == 0 { scale0 } else { scale };
        for t in 0..n_frames {
            let mut acc = 0.0f32;
            for n in 0..n_bands {
                acc += input[[n, t]]
                    * (PI * k as f32 * (2.0 * n as f32 + 1.0) / (2.0 * n_bands as f32)).cos();
            }
            output[[k, t]] = norm * acc;
        }
    }

    output
}
