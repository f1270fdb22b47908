//! Error types for tags generation and lookup

use std::time::Duration;
use tagnav_config::ConfigError;
use tagnav_symbols::ParseError;
use thiserror::Error;

/// Failure of the external tags generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Tags generator not found: {0}")]
    ProgramNotFound(String),

    #[error("Failed to spawn tags generator: {0}")]
    SpawnFailed(String),

    #[error("Tags generator exited with {}: {stderr}", exit_description(.code))]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("Tags generation was cancelled")]
    Cancelled,

    #[error("Tags generation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    IoError(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

impl From<std::io::Error> for GenerationError {
    fn from(err: std::io::Error) -> Self {
        GenerationError::IoError(err.to_string())
    }
}

/// Errors surfaced to the caller of the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("A tags regeneration is already running for this workspace")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
