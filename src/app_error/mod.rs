use std::path::PathBuf;
use thiserror::Error;


#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Serialization/Deserialization Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unparseable Response: {0}")]
    UnparseableResponse(String),

    #[error("Unsafe Path '{}': {reason}", path.display())]
    UnsafePath { path: PathBuf, reason: String },

    #[error("File Write Error for '{}': {message}", path.display())]
    FileWrite { path: PathBuf, message: String },

    #[error("Staging Error: {0}")]
    Staging(String),

    #[error("No active task found in '{}'. Run with --start first.", .0.display())]
    NoActiveTask(PathBuf),
}
