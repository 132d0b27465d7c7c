use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::metadata_db::{ItemKind, PermissionMode, DEFAULT_BUSY_TIMEOUT_MS};

/// Settings of a vault, usually read from a TOML file.
///
/// ```toml
/// database_path = "/srv/media/vault.sqlite"
/// default_permission_mode = "admin"
///
/// [[media_types]]
/// extension = "ts"
/// kind = "video"
/// mime = "video/mp2t"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub database_path: String,
    /// Permission mode used when the caller does not name one ("all", "admin" or "self").
    pub default_permission_mode: String,
    pub busy_timeout_ms: u32,
    /// Extends or overrides the built-in extension table.
    pub media_types: Vec<MediaTypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaTypeEntry {
    pub extension: String,
    pub kind: ItemKind,
    pub mime: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            default_permission_mode: PermissionMode::All.as_str().to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            media_types: Vec::new(),
        }
    }
}

fn default_database_path() -> String {
    String::from("media_vault.sqlite")
}

impl VaultConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn permission_mode(&self) -> PermissionMode {
        PermissionMode::parse(&self.default_permission_mode)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IOError { source: io::Error },
    ParseError { source: toml::de::Error },
}
pub type Result<T> = std::result::Result<T, ConfigError>;

// Error Boilerplate (Error display, conversion and source)
impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IOError { source } => write!(f, "Could not read config file ({})", source),
            Self::ParseError { source } => write!(f, "Invalid config file ({})", source),
        }
    }
}
impl From<io::Error> for ConfigError {
    fn from(error: io::Error) -> Self {
        Self::IOError { source: error }
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        Self::ParseError { source: error }
    }
}
impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IOError { ref source } => Some(source),
            Self::ParseError { ref source } => Some(source),
        }
    }
}
