use super::*;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum MigrationError {
    ReadVersion {
        source: diesel::result::Error,
    },
    WriteVersion {
        version: DBVersion,
        source: diesel::result::Error,
    },
    UnsupportedVersion {
        version: DBVersion,
    },
    SchemaChange {
        source: diesel::result::Error,
    },
}
pub type Result<T> = std::result::Result<T, MigrationError>;

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadVersion { source } => write!(f, "Could not read schema version ({})", source),
            Self::WriteVersion { version, source } => {
                write!(f, "Could not set schema version {} ({})", version, source)
            }
            Self::UnsupportedVersion { version } => write!(
                f,
                "Schema version {} is unknown, this build supports up to {}",
                version, REQUIRED_DB_VERSION
            ),
            Self::SchemaChange { source } => write!(f, "Schema change failed ({})", source),
        }
    }
}
impl From<diesel::result::Error> for MigrationError {
    fn from(error: diesel::result::Error) -> Self {
        Self::SchemaChange { source: error }
    }
}
impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadVersion { ref source } => Some(source),
            Self::WriteVersion { ref source, .. } => Some(source),
            Self::UnsupportedVersion { .. } => None,
            Self::SchemaChange { ref source } => Some(source),
        }
    }
}
