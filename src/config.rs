use std::path::PathBuf;

/// Runtime configuration. All paths default to the layout the service has
/// always used; `SENTISOUND_HOME` relocates the whole tree at once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base directory for all data the service writes.
    pub home: PathBuf,
    /// Directory containing `scaler.json` and `emotion_model.json`.
    pub model_dir: PathBuf,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("."),
            model_dir: PathBuf::from("models"),
            port: 5000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(home) = std::env::var_os("SENTISOUND_HOME") {
            config.home = PathBuf::from(home);
        }
        if let Some(dir) = std::env::var_os("SENTISOUND_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        } else {
            config.model_dir = config.home.join("models");
        }
        if let Ok(port) = std::env::var("SENTISOUND_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }

        config
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.home.join("static").join("audio_uploads")
    }

    pub fn visualization_dir(&self) -> PathBuf {
        self.home.join("static").join("visualizations")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.home.join("static")
    }

    pub fn history_db_path(&self) -> PathBuf {
        self.home.join("data").join("emotion_history.db")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.upload_dir())?;
        std::fs::create_dir_all(self.visualization_dir())?;
        std::fs::create_dir_all(self.home.join("data"))?;
        Ok(())
    }
}
