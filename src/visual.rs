use crate::error::{AppError, Result};
use crate::features::{mfcc_matrix, power_spectrogram, MfccConfig};
use image::{Rgb, RgbImage};
use ndarray::Array2;

const PANEL_WIDTH: u32 = 900;
const PANEL_HEIGHT: u32 = 200;
const MARGIN: u32 = 20;

const VIZ_N_FFT: usize = 1024;
const VIZ_HOP: usize = 256;
/// The MFCC panel uses the conventional 13 display bands, not the
/// classifier's 40.
const VIZ_MFCC_BANDS: usize = 13;
const DB_FLOOR: f32 = -80.0;

/// Render the three-panel analysis image for a recording: waveform on top,
/// dB spectrogram in the middle, MFCC heatmap at the bottom. Deterministic
/// for identical samples and rate.
pub fn render_analysis(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    if samples.is_empty() {
        return Err(AppError::Render("no samples to visualize".into()));
    }

    let width = PANEL_WIDTH + 2 * MARGIN;
    let height = 3 * PANEL_HEIGHT + 4 * MARGIN;
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    draw_waveform(&mut canvas, samples, MARGIN, MARGIN);

    let spectrogram = power_spectrogram(samples, VIZ_N_FFT, VIZ_HOP);
    draw_spectrogram(&mut canvas, &spectrogram, MARGIN, 2 * MARGIN + PANEL_HEIGHT);

    let config = MfccConfig {
        sample_rate,
        n_mfcc: VIZ_MFCC_BANDS,
        ..MfccConfig::default()
    };
    let mfccs = mfcc_matrix(samples, &config);
    draw_heatmap(&mut canvas, &mfccs, MARGIN, 3 * MARGIN + 2 * PANEL_HEIGHT);

    let mut bytes = Vec::new();
    canvas
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| AppError::Render(e.to_string()))?;
    Ok(bytes)
}

/// Amplitude-vs-time panel: one min/max envelope column per pixel,
/// normalized to the clip's peak.
fn draw_waveform(canvas: &mut RgbImage, samples: &[f32], x0: u32, y0: u32) {
    let ink = Rgb([31, 78, 121]);
    let mid = y0 + PANEL_HEIGHT / 2;
    let half = (PANEL_HEIGHT / 2 - 1) as f32;

    let peak = samples
        .iter()
        .fold(0.0f32, |acc, &s| acc.max(s.abs()))
        .max(1e-6);

    for x in 0..PANEL_WIDTH {
        let start = (x as usize * samples.len()) / PANEL_WIDTH as usize;
        let end = (((x + 1) as usize * samples.len()) / PANEL_WIDTH as usize).max(start + 1);
        let window = &samples[start..end.min(samples.len())];

        let (mut lo, mut hi) = (0.0f32, 0.0f32);
        for &s in window {
            lo = lo.min(s);
            hi = hi.max(s);
        }

        let y_top = mid as i64 - ((hi / peak) * half) as i64;
        let y_bottom = mid as i64 - ((lo / peak) * half) as i64;
        for y in y_top..=y_bottom {
            if y >= y0 as i64 && y < (y0 + PANEL_HEIGHT) as i64 {
                canvas.put_pixel(x0 + x, y as u32, ink);
            }
        }
    }
}

/// Time-frequency panel: STFT magnitude in dB relative to the peak, low
/// frequencies at the bottom.
fn draw_spectrogram(canvas: &mut RgbImage, spectrogram: &Array2<f32>, x0: u32, y0: u32) {
    let peak = spectrogram.iter().fold(1e-10f32, |acc, &p| acc.max(p));

    sample_matrix(canvas, spectrogram, x0, y0, |power| {
        let db = (10.0 * (power / peak).max(1e-10).log10()).clamp(DB_FLOOR, 0.0);
        (db - DB_FLOOR) / -DB_FLOOR
    });
}

/// MFCC panel: coefficients rescaled to the matrix's own range.
fn draw_heatmap(canvas: &mut RgbImage, mfccs: &Array2<f32>, x0: u32, y0: u32) {
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    for &v in mfccs.iter() {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let span = (hi - lo).max(1e-6);

    sample_matrix(canvas, mfccs, x0, y0, |v| (v - lo) / span);
}

/// Stretch a (rows, frames) matrix across one panel, row 0 at the bottom,
/// mapping each value through `intensity` (expected in [0, 1]).
fn sample_matrix<F: Fn(f32) -> f32>(
    canvas: &mut RgbImage,
    matrix: &Array2<f32>,
    x0: u32,
    y0: u32,
    intensity: F,
) {
    let rows = matrix.nrows();
    let frames = matrix.ncols();
    if rows == 0 || frames == 0 {
        return;
    }

    for x in 0..PANEL_WIDTH {
        let frame = (x as usize * (frames - 1)) / (PANEL_WIDTH as usize - 1).max(1);
        for y in 0..PANEL_HEIGHT {
            let row = ((PANEL_HEIGHT - 1 - y) as usize * (rows - 1))
                / (PANEL_HEIGHT as usize - 1).max(1);
            let t = intensity(matrix[[row, frame]]).clamp(0.0, 1.0);
            canvas.put_pixel(x0 + x, y0 + y, colormap(t));
        }
    }
}

/// Small inferno-like gradient: black, purple, red, orange, pale yellow.
fn colormap(t: f32) -> Rgb<u8> {
    const ANCHORS: [(f32, [f32; 3]); 5] = [
        (0.0, [0.0, 0.0, 4.0]),
        (0.25, [87.0, 16.0, 110.0]),
        (0.5, [188.0, 55.0, 84.0]),
        (0.75, [249.0, 142.0, 9.0]),
        (1.0, [252.0, 255.0, 164.0]),
    ];

    let t = t.clamp(0.0, 1.0);
    for pair in ANCHORS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            return Rgb([
                (c0[0] + (c1[0] - c0[0]) * f) as u8,
                (c0[1] + (c1[1] - c0[1]) * f) as u8,
                (c0[2] + (c1[2] - c0[2]) * f) as u8,
            ]);
        }
    }
    Rgb([252, 255, 164])
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
    fn renders_a_png() {
        let samples = tone(440.0, 22_050, 0.25);
        let png = render_analysis(&samples, 22_050).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let samples = tone(440.0, 22_050, 0.1);
        let a = render_analysis(&samples, 22_050).unwrap();
        let b = render_analysis(&samples, 22_050).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_audio_renders_differently() {
        let a = render_analysis(&tone(220.0, 22_050, 0.1), 22_050).unwrap();
        let b = render_analysis(&tone(1760.0, 22_050, 0.1), 22_050).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_input_is_a_render_error() {
        assert!(matches!(
            render_analysis(&[], 22_050),
            Err(AppError::Render(_))
        ));
    }

    #[test]
    fn colormap_endpoints() {
        assert_eq!(colormap(0.0), Rgb([0, 0, 4]));
        assert_eq!(colormap(1.0), Rgb([252, 255, 164]));
    }
}
