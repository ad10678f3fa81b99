// One error type for the whole app.
// Every variant states *where* things went wrong.

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The snapshot (or target size) cannot be turned into a tensor.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model description missing, unreadable or inconsistent.
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// The model threw, or its output could not be interpreted.
    #[error("Classification error: {0}")]
    Classification(String),

    /// A classification is already in flight.
    #[error("Classification already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Window init error: {0}")]
    WindowInit(String),

    #[error("Window update error: {0}")]
    WindowUpdate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
