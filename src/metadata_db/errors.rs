use super::*;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum MetadataDBError {
    MigrationFailed {
        source: db_migration::MigrationError,
    },
    ConnectionFailed {
        source: diesel::result::ConnectionError,
    },
    QueryFailed {
        source: diesel::result::Error,
    },
    NotFound,
    UsernameTaken {
        username: String,
    },
    RootAlreadyShared {
        path: String,
    },
}
pub type Result<T> = std::result::Result<T, MetadataDBError>;

impl fmt::Display for MetadataDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MigrationFailed { source } => {
                write!(f, "Could not bring the vault database up to date ({})", source)
            }
            Self::ConnectionFailed { source } => {
                write!(f, "Could not open the vault database ({})", source)
            }
            Self::QueryFailed { source } => write!(f, "Vault database query failed ({})", source),
            Self::NotFound => write!(f, "No such record in the vault database"),
            Self::UsernameTaken { username } => write!(f, "User '{}' already exists", username),
            Self::RootAlreadyShared { path } => write!(f, "{} is already shared", path),
        }
    }
}
impl From<db_migration::MigrationError> for MetadataDBError {
    fn from(error: db_migration::MigrationError) -> Self {
        Self::MigrationFailed { source: error }
    }
}
impl From<diesel::result::Error> for MetadataDBError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotFound,
            error => Self::QueryFailed { source: error },
        }
    }
}
impl From<diesel::result::ConnectionError> for MetadataDBError {
    fn from(error: diesel::result::ConnectionError) -> Self {
        Self::ConnectionFailed { source: error }
    }
}
impl Error for MetadataDBError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MigrationFailed { ref source } => Some(source),
            Self::ConnectionFailed { ref source } => Some(source),
            Self::QueryFailed { ref source } => Some(source),
            Self::NotFound | Self::UsernameTaken { .. } | Self::RootAlreadyShared { .. } => None,
        }
    }
}
