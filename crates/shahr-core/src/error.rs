use thiserror::Error;

/// Top-level error type for the Shahr workspace.
///
/// Chat-specific failures live in `shahr_chat::ChatError`; this type covers
/// configuration, identity persistence and the HTTP surface, so that the
/// binary can bubble everything up with `?`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShahrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Identity store error: {0}")]
    Identity(String),

    #[error("API error: {0}")]
    Api(String),
}

impl From<toml::de::Error> for ShahrError {
    fn from(err: toml::de::Error) -> Self {
        ShahrError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShahrError {
    fn from(err: toml::ser::Error) -> Self {
        ShahrError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ShahrError {
    fn from(err: serde_json::Error) -> Self {
        ShahrError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Shahr operations.
pub type Result<T> = std::result::Result<T, ShahrError>;
