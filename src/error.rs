use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Failed to load postcodes from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("The number of valid coordinates ({resolved}) is less than the number of groups ({requested})")]
    InsufficientData { resolved: usize, requested: usize },

    #[error("Coordinate transform error: {0}")]
    Transform(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
