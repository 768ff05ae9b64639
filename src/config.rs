/// Application settings
///
/// Read from a TOML file. The default location is:
/// - Linux: ~/.config/aesthetic-sense/config.toml
/// - macOS: ~/Library/Application Support/aesthetic-sense/config.toml
/// - Windows: %APPDATA%\aesthetic-sense\config.toml
///
/// Every field has a default, so a missing file or a partial file is fine.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ONNX export of the aesthetic network
    pub model_path: Option<PathBuf>,
    /// Network input width in pixels
    pub input_width: u32,
    /// Network input height in pixels
    pub input_height: u32,
    /// Per-channel mean subtracted before inference, BGR order
    pub channel_mean: [f32; 3],
    /// Quiet period before a folder change is reconciled
    pub debounce_ms: u64,
    /// File extensions treated as images (lowercase, no dot)
    pub extensions: Vec<String>,
    /// Deleted images go here instead of the system trash
    pub trash_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: None,
            input_width: 227,
            input_height: 227,
            channel_mean: [104.0, 117.0, 123.0],
            debounce_ms: 500,
            extensions: vec!["jpg".to_string(), "jpeg".to_string()],
            trash_dir: None,
        }
    }
}

impl Settings {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text).map_err(|source| ConfigError::Parse { path, source }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Where the settings file lives when no path is given
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("aesthetic-sense");
        path.push("config.toml");
        Some(path)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
