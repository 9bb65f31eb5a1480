use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid body configuration: {0}")]
    Configuration(String),

    #[error("failed to parse simulation config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
