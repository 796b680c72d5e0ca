//! Error types for the core model

use std::path::PathBuf;

/// Core model errors (configuration and serialization)
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration failed validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Unsupported configuration file format
    #[error("unsupported config format for {0}: expected .toml or .json")]
    UnsupportedFormat(PathBuf),

    /// IO error reading a file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A payload did not serialize to a JSON object
    #[error("payload is not an object: {0}")]
    NotAnObject(String),
}

impl CoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = CoreError::Config("history_depth must be 1..=3".into());
        assert!(err.to_string().contains("configuration error"));
    }
}
