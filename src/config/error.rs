use std::{
    fmt, io,
    path::{Path, PathBuf},
    result,
};

use thiserror::Error;

/// Errors raised while locating, reading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("I/O error on '{path}': {details}")]
    Io {
        /// File being read
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// No config location could be determined
    #[error("cannot locate config directory: {0}")]
    Location(#[from] io::Error),

    /// The TOML is malformed or does not match the schema
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParse {
        /// File path, or "string" for inline content
        location: String,
        /// Parse error details
        details: String,
    },
}

/// Result alias for configuration operations.
pub type Result<T> = result::Result<T, ConfigError>;

impl ConfigError {
    /// Parse failure with optional file context.
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        ConfigError::TomlParse {
            location,
            details: error.to_string(),
        }
    }

    /// Read failure for `path`.
    pub fn io(error: impl fmt::Display, path: &Path) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }
}
