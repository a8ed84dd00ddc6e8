use crate::config::AppConfig;
use crate::emotions::{metadata_for, suggestions_for, CANONICAL_LABELS};
use crate::error::{AppError, Result};
use crate::pipeline::{Analysis, Analyzer};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};

const ALLOWED_EXTENSIONS: [&str; 3] = ["wav", "mp3", "m4a"];

fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) | AppError::Decode(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

async fn home() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "sentisound",
        "version": env!("CARGO_PKG_VERSION"),
        "labels": CANONICAL_LABELS,
    }))
}

/// Pull the uploaded audio out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| AppError::InvalidInput("no file selected".into()))?;
        if !allowed_file(&filename) {
            return Err(AppError::InvalidInput("invalid file type".into()));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::InvalidInput("empty file".into()));
        }
        return Ok((filename, bytes.to_vec()));
    }
    Err(AppError::InvalidInput("no file uploaded".into()))
}

/// Feature extraction and classification are CPU-bound; keep them off the
/// async workers.
async fn run_analysis(
    analyzer: Arc<Analyzer>,
    bytes: Vec<u8>,
    filename: String,
) -> Result<Analysis> {
    tokio::task::spawn_blocking(move || analyzer.analyze(&bytes, &filename))
        .await
        .map_err(|e| AppError::Persistence(format!("analysis task failed: {}", e)))?
}

fn probability_map(pairs: &[(String, f32)], round: bool) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(label, p)| {
            let p = *p as f64;
            let p = if round { round3(p) } else { p };
            (label.clone(), serde_json::json!(p))
        })
        .collect()
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn rich_response(analysis: &Analysis) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "emotion": analysis.prediction.label,
        "probabilities": probability_map(&analysis.prediction.probabilities, false),
        "audio_file": analysis.filename,
        "visualization": analysis.visualization,
        "suggestions": suggestions_for(&analysis.prediction.label),
        "emotion_config": metadata_for(&analysis.prediction.label),
    }))
}

async fn predict(
    State(analyzer): State<Arc<Analyzer>>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let (filename, bytes) = read_upload(multipart).await?;
    let analysis = run_analysis(analyzer, bytes, filename).await?;
    Ok(rich_response(&analysis))
}

async fn api_predict(
    State(analyzer): State<Arc<Analyzer>>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let (filename, bytes) = read_upload(multipart).await?;
    let analysis = run_analysis(analyzer, bytes, filename).await?;
    Ok(Json(serde_json::json!({
        "emotion": analysis.prediction.label,
        "confidence": round3(analysis.prediction.confidence as f64),
        "probabilities": probability_map(&analysis.prediction.probabilities, true),
        "filename": analysis.filename,
    })))
}

#[derive(Deserialize)]
struct RecordingBody {
    audio: String,
}

/// Browser recordings arrive as a base64 data URL; they are stored and
/// analyzed under a timestamped WAV name.
async fn record(
    State(analyzer): State<Arc<Analyzer>>,
    Json(body): Json<RecordingBody>,
) -> Result<Json<serde_json::Value>> {
    let encoded = body
        .audio
        .split_once(',')
        .map(|(_, data)| data)
        .unwrap_or(body.audio.as_str());
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::InvalidInput(format!("bad audio payload: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::InvalidInput("no audio data received".into()));
    }

    let filename = format!(
        "recording_{}.wav",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    let analysis = run_analysis(analyzer, bytes, filename).await?;
    Ok(rich_response(&analysis))
}

async fn history(State(analyzer): State<Arc<Analyzer>>) -> Result<Json<serde_json::Value>> {
    let records = analyzer.history().map_err(|e| {
        AppError::Persistence(format!("failed to read history: {}", e))
    })?;
    Ok(Json(serde_json::json!({ "history": records })))
}

async fn download_report(
    State(analyzer): State<Arc<Analyzer>>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let pdf = analyzer.report_for(&filename)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"emotion_report_{}.pdf\"", filename),
        )
        .body(Body::from(pdf))
        .map_err(|e| AppError::Report(e.to_string()))
}

pub fn make_app(analyzer: Arc<Analyzer>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .route("/api/predict", post(api_predict))
        .route("/record", post(record))
        .route("/history", get(history))
        .route("/download-report/{filename}", get(download_report))
        .layer(CorsLayer::permissive())
        .with_state(analyzer)
}

pub async fn run_server(analyzer: Arc<Analyzer>, config: &AppConfig) -> anyhow::Result<()> {
    let app = make_app(analyzer)
        .nest_service("/static", ServeDir::new(config.static_dir()));

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    Ok(axum::serve(listener, app).await?)
}
