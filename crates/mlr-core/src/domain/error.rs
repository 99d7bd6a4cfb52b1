//! Domain-level error taxonomy for MLR-Bench.

use std::path::PathBuf;

/// MLR-Bench core errors.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid config value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error("failed to read env file {path:?}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("failed to persist {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace error for task {task_id}: {reason}")]
    Workspace { task_id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Short tag naming the failure class, used in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::TaskNotFound(_) => "task_not_found",
            BenchError::InvalidConfig { .. } => "invalid_config",
            BenchError::EnvFile { .. } => "env_file",
            BenchError::Persistence { .. } => "persistence",
            BenchError::Workspace { .. } => "workspace",
            BenchError::Serialization(_) => "serialization",
            BenchError::Io(_) => "io",
        }
    }
}

/// Result type for MLR-Bench core operations.
pub type Result<T> = std::result::Result<T, BenchError>;
