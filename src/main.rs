use sentisound::artifacts::ArtifactStore;
use sentisound::history::HistoryStore;
use sentisound::server::run_server;
use sentisound::{Analyzer, AppConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    config.ensure_dirs()?;
    info!("Data directory: {}", config.home.display());

    let (scaler, forest) = sentisound::model::load_models(&config.model_dir)?;

    let analyzer = Analyzer::new(
        scaler,
        Box::new(forest),
        HistoryStore::open(&config.history_db_path())?,
        ArtifactStore::new(config.upload_dir(), config.visualization_dir()),
    );

    run_server(Arc::new(analyzer), &config).await
}
