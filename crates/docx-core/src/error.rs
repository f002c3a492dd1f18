use thiserror::Error;

/// Top-level error type shared by the OOXML reader/rewriter and the compare
/// engine that sits on top of them.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("malformed package {part}: {reason}")]
    MalformedPackage { part: String, reason: String },

    #[error("unsupported content in paragraph {path}: {reason}")]
    UnsupportedContent { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("failed to serialize package: {0}")]
    SerializationError(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, CompareError>;
