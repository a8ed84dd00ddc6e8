pub mod artifacts;
pub mod audio;
pub mod config;
pub mod emotions;
pub mod error;
pub mod features;
pub mod history;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod visual;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use pipeline::{Analysis, Analyzer};
