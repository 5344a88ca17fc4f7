use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create store directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("failed to write metadata document '{0}'")]
    MetadataWrite(PathBuf, #[source] std::io::Error),

    #[error("failed to encode metadata document '{0}'")]
    MetadataEncode(PathBuf, #[source] serde_json::Error),

    #[error("I/O error writing series chunk '{0}'")]
    ChunkWriteIo(PathBuf, #[source] std::io::Error),

    #[error("encoding error writing series chunk '{0}'")]
    ChunkWritePolars(PathBuf, #[source] PolarsError),

    #[error("background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("failed to clear store at '{0}'")]
    Clear(PathBuf, #[source] std::io::Error),
}
