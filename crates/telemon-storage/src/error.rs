use telemon_common::metric::MetricKind;

/// Errors that can occur within the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No metric with the requested id (and kind, where one was requested)
    /// exists.
    #[error("storage: metric not found (id={id})")]
    NotFound { id: String },

    /// An update or read declared a kind that disagrees with the stored one.
    #[error("storage: metric '{id}' is a {stored}, not a {requested}")]
    KindMismatch {
        id: String,
        stored: MetricKind,
        requested: MetricKind,
    },

    /// A stored row carries a kind string the metric model does not know.
    #[error("storage: metric '{id}' has an unknown kind '{raw}'")]
    InvalidKind { id: String, raw: String },

    /// An underlying SQLite error.
    #[error("storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Snapshot serialization or deserialization failure.
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file I/O failure.
    #[error("storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
