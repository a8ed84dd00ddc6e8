use crate::artifacts::{sanitize_filename, ArtifactStore};
use crate::audio::{decode_bytes, duration_ms, resample_to_target, TARGET_SAMPLE_RATE};
use crate::error::{AppError, Result};
use crate::features::feature_vector;
use crate::history::{HistoryRecord, HistoryStore};
use crate::model::{Classifier, Prediction, StandardScaler};
use crate::{report, visual};
use tracing::{info, warn};

/// Outcome of one inference request. `visualization` and `history_saved`
/// report the auxiliary artifacts: either may be absent without the
/// classification itself having failed.
#[derive(Debug)]
pub struct Analysis {
    pub filename: String,
    pub prediction: Prediction,
    pub visualization: Option<String>,
    pub history_saved: bool,
}

/// The inference pipeline with its collaborators, constructed once at startup
/// and shared across requests.
pub struct Analyzer {
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
    history: HistoryStore,
    artifacts: ArtifactStore,
}

impl Analyzer {
    pub fn new(
        scaler: StandardScaler,
        classifier: Box<dyn Classifier>,
        history: HistoryStore,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            scaler,
            classifier,
            history,
            artifacts,
        }
    }

    /// Run the full pipeline on one uploaded recording:
    /// decode -> resample -> features -> standardize -> classify, then log
    /// history and render the visualization. Auxiliary write failures are
    /// absorbed; only the classification path itself can fail the request.
    pub fn analyze(&self, bytes: &[u8], original_name: &str) -> Result<Analysis> {
        let filename = sanitize_filename(original_name)?;

        // Serialize artifact writes per filename key.
        let key_lock = self.artifacts.lock_key(&filename);
        let _guard = key_lock.lock();

        if let Err(e) = self.artifacts.save_upload(&filename, bytes) {
            warn!("Failed to store upload '{}': {}", filename, e);
        }

        let decoded = decode_bytes(bytes, &filename)?;
        let samples = resample_to_target(&decoded.samples, decoded.sample_rate)?;
        let features = feature_vector(&samples, TARGET_SAMPLE_RATE)?;
        let scaled = self.scaler.transform(&features)?;
        let prediction = self.classifier.predict(&scaled)?;

        info!(
            "Classified '{}' ({} ms) as '{}' ({:.1}%)",
            filename,
            duration_ms(&samples, TARGET_SAMPLE_RATE),
            prediction.label,
            prediction.confidence * 100.0
        );

        let record = HistoryRecord::new(
            filename.clone(),
            prediction.label.clone(),
            prediction.confidence as f64,
            prediction.top_n(3),
        );
        let history_saved = match self.history.append(&record) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to log history for '{}': {}", filename, e);
                false
            }
        };

        let visualization = match visual::render_analysis(&samples, TARGET_SAMPLE_RATE)
            .and_then(|png| self.artifacts.write_visualization(&filename, &png))
        {
            Ok(_) => Some(self.artifacts.visualization_ref(&filename)),
            Err(e) => {
                warn!("Visualization failed for '{}': {}", filename, e);
                None
            }
        };

        Ok(Analysis {
            filename,
            prediction,
            visualization,
            history_saved,
        })
    }

    /// All history records in insertion order.
    pub fn history(&self) -> Result<Vec<HistoryRecord>> {
        self.history.all()
    }

    /// Build the PDF report for the most recent analysis of `filename`.
    pub fn report_for(&self, filename: &str) -> Result<Vec<u8>> {
        let record = self
            .history
            .latest(filename)?
            .ok_or_else(|| AppError::NotFound(format!("no analysis recorded for '{}'", filename)))?;

        let viz_ref = self
            .artifacts
            .visualization_path(filename)
            .exists()
            .then(|| self.artifacts.visualization_ref(filename));

        report::render(&record, viz_ref.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Prediction;
    use std::io::Cursor;
    use tempfile::tempdir;

    /// Fixed-output classifier for exercising the pipeline without a trained
    /// forest.
    pub struct FixedClassifier {
        labels: Vec<String>,
        probabilities: Vec<(String, f32)>,
    }

    impl FixedClassifier {
        pub fn new(probabilities: Vec<(&str, f32)>) -> Self {
            let probabilities: Vec<(String, f32)> = probabilities
                .into_iter()
                .map(|(l, p)| (l.to_string(), p))
                .collect();
            Self {
                labels: probabilities.iter().map(|(l, _)| l.clone()).collect(),
                probabilities,
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn predict(&self, _features: &[f32]) -> Result<Prediction> {
            Prediction::from_probabilities(self.probabilities.clone())
        }
    }

    fn wav_bytes() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..11_025 {
                let s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22_050.0).sin();
                writer.write_sample((s * 20_000.0) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn analyzer(dir: &std::path::Path) -> Analyzer {
        Analyzer::new(
            StandardScaler::new(vec![0.0; 40], vec![1.0; 40]),
            Box::new(FixedClassifier::new(vec![
                ("happy", 0.6),
                ("sad", 0.3),
                ("neutral", 0.1),
            ])),
            HistoryStore::open_in_memory().unwrap(),
            ArtifactStore::new(dir.join("uploads"), dir.join("viz")),
        )
    }

    #[test]
    fn classifies_and_logs_and_renders() {
        let dir = tempdir().unwrap();
        let analyzer = analyzer(dir.path());

        let analysis = analyzer.analyze(&wav_bytes(), "clip.wav").unwrap();
        assert_eq!(analysis.filename, "clip.wav");
        assert_eq!(analysis.prediction.label, "happy");
        assert!(analysis.history_saved);
        assert_eq!(
            analysis.visualization.as_deref(),
            Some("visualizations/clip.wav_analysis.png")
        );
        assert!(dir.path().join("viz/clip.wav_analysis.png").exists());
        assert!(dir.path().join("uploads/clip.wav").exists());

        let history = analyzer.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].predicted_emotion, "happy");
        assert!((history[0].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn undecodable_input_aborts_before_any_history() {
        let dir = tempdir().unwrap();
        let analyzer = analyzer(dir.path());

        let result = analyzer.analyze(b"not audio at all", "clip.wav");
        assert!(matches!(result, Err(AppError::Decode(_))));
        assert!(analyzer.history().unwrap().is_empty());
    }

    #[test]
    fn reanalysis_overwrites_visualization_and_appends_history() {
        let dir = tempdir().unwrap();
        let analyzer = analyzer(dir.path());

        analyzer.analyze(&wav_bytes(), "clip.wav").unwrap();
        let first = std::fs::read(dir.path().join("viz/clip.wav_analysis.png")).unwrap();

        analyzer.analyze(&wav_bytes(), "clip.wav").unwrap();
        let second = std::fs::read(dir.path().join("viz/clip.wav_analysis.png")).unwrap();

        // Same input, same deterministic image, same single path.
        assert_eq!(first, second);
        assert_eq!(analyzer.history().unwrap().len(), 2);
    }

    #[test]
    fn report_for_unknown_filename_is_not_found() {
        let dir = tempdir().unwrap();
        let analyzer = analyzer(dir.path());
        assert!(matches!(
            analyzer.report_for("never-analyzed.wav"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn report_for_analyzed_filename_is_a_pdf() {
        let dir = tempdir().unwrap();
        let analyzer = analyzer(dir.path());
        analyzer.analyze(&wav_bytes(), "clip.wav").unwrap();

        let pdf = analyzer.report_for("clip.wav").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
