use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    #[error("Duplicate signal: {signal_id}")]
    DuplicateSignal { signal_id: String },

    #[error("Duplicate message: {message_id}")]
    DuplicateMessage { message_id: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Errors reading investigation input (bundles, CLI arguments)
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid bundle: {0}")]
    Bundle(#[from] serde_json::Error),

    #[error("Invalid edge key '{key}': expected FROM|TO")]
    EdgeKey { key: String },

    #[error("Unknown view '{value}': expected flow, timeline or map")]
    ViewMode { value: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for input parsing
pub type InputResult<T> = Result<T, InputError>;
