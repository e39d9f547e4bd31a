use std::path::PathBuf;

/// Fatal audit errors. Everything below the root is recorded as an anomaly
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
