//! Error types for cos-storage-core
//!
//! One error type covers configuration, filename generation and the
//! per-operation client failures surfaced by the adapter.

use thiserror::Error;

/// Result type alias for cos-storage-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cos-storage-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid adapter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the filename generator, passed through untouched
    #[error(transparent)]
    FilenameGeneration(anyhow::Error),

    /// Upload of a single file failed
    #[error("Upload failed for {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// Delete of an object failed
    #[error("Delete failed for {key}: {source}")]
    Delete {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// URL computation for an object failed
    #[error("URL lookup failed for {key}: {source}")]
    Url {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// File record has not been assigned a storage key
    #[error("File record has no storage key: {0}")]
    MissingKey(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether a host may reasonably retry the failed operation.
    ///
    /// The adapter itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Upload { source, .. }
            | Error::Delete { source, .. }
            | Error::Url { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("COS path must be absolute".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: COS path must be absolute"
        );

        let err = Error::MissingKey("photo.png".into());
        assert_eq!(err.to_string(), "File record has no storage key: photo.png");
    }

    #[test]
    fn test_wrapped_error_display() {
        let err = Error::Upload {
            key: "uploads/abc.png".into(),
            source: Box::new(Error::Network("connection reset".into())),
        };
        assert_eq!(
            err.to_string(),
            "Upload failed for uploads/abc.png: Network error: connection reset"
        );
    }

    #[test]
    fn test_filename_generation_is_transparent() {
        let err = Error::FilenameGeneration(anyhow::anyhow!("name taken"));
        assert_eq!(err.to_string(), "name taken");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Network("timeout".into()).is_retryable());
        assert!(!Error::Auth("bad key".into()).is_retryable());
        assert!(!Error::Config("bad path".into()).is_retryable());

        let err = Error::Delete {
            key: "a/b.png".into(),
            source: Box::new(Error::Network("timeout".into())),
        };
        assert!(err.is_retryable());

        let err = Error::Delete {
            key: "a/b.png".into(),
            source: Box::new(Error::NotFound("a/b.png".into())),
        };
        assert!(!err.is_retryable());
    }
}
