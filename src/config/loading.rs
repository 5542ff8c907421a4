use std::{fs, io::ErrorKind, path::Path};

use tracing::{debug, instrument};

use super::{Config, ConfigError, ConfigPaths, Result};

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    /// Returns `ConfigError::TomlParse` if the text is not valid configuration.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| ConfigError::toml_parse(e, None))
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::TomlParse` if it is not valid configuration.
    #[instrument]
    pub fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(e, path))?;
        toml::from_str(&content).map_err(|e| ConfigError::toml_parse(e, Some(path)))
    }

    /// Load configuration from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    /// Same as [`Config::load`] for files that exist.
    pub fn load_or_default(path: &Path) -> Result<Config> {
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::io(e, path)),
        }
    }

    /// Load the main configuration file from the standard location.
    ///
    /// # Errors
    /// Returns `ConfigError::Location` if no config directory can be
    /// determined, otherwise as [`Config::load_or_default`].
    pub fn load_main() -> Result<Config> {
        let path = ConfigPaths::main_config()?;
        Self::load_or_default(&path)
    }

    /// Render as TOML.
    ///
    /// # Errors
    /// Returns `ConfigError::TomlParse` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::toml_parse(e, None))
    }
}
