use thiserror::Error;

/// Failure taxonomy of the retrieval core.
///
/// Only `EmptyQuery`, `InvalidConfig` and `Operation` ever reach a caller of
/// the engine; the others are soft failures that are logged and degrade to
/// "no improvement".
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index is empty or absent")]
    EmptyIndex,

    #[error("No qualifying content for lookup: {0}")]
    LookupMiss(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("No extraction strategy succeeded for {0}")]
    Extraction(String),

    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
