use crate::fs_interaction;
use crate::metadata_db;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum VaultError {
    /// The location (or something below it) could not be scanned, nothing was added.
    ScanError {
        path: String,
        source: fs_interaction::FSInteractionError,
    },
    NotFound,
    /// The backing file vanished, the item (and everything below it) was removed.
    StaleItem {
        path: String,
    },
    AccessDenied,
    NotAdministrator,
    AlreadyShared {
        path: String,
    },
    NotAFile,
    NotADirectory,
    FSInteractionError {
        source: fs_interaction::FSInteractionError,
    },
    MetadataDBError {
        source: metadata_db::MetadataDBError,
    },
}
pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// True if the requested item does not (or no longer) exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound | Self::StaleItem { .. } => true,
            _ => false,
        }
    }
}

// Error Boilerplate (Error display, conversion and source)
impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanError { path, source } => write!(f, "Could not scan {} ({})", path, source),
            Self::NotFound => write!(f, "Not found"),
            Self::StaleItem { path } => write!(f, "Item vanished from disk ({})", path),
            Self::AccessDenied => write!(f, "Access denied"),
            Self::NotAdministrator => write!(f, "Operation requires an administrator"),
            Self::AlreadyShared { path } => write!(f, "{} is already shared", path),
            Self::NotAFile => write!(f, "Item is not a file"),
            Self::NotADirectory => write!(f, "Item is not a directory"),
            Self::FSInteractionError { source } => write!(f, "File system error ({})", source),
            Self::MetadataDBError { source } => write!(f, "Database error ({})", source),
        }
    }
}
impl From<fs_interaction::FSInteractionError> for VaultError {
    fn from(error: fs_interaction::FSInteractionError) -> Self {
        VaultError::FSInteractionError { source: error }
    }
}
impl From<metadata_db::MetadataDBError> for VaultError {
    fn from(error: metadata_db::MetadataDBError) -> Self {
        match error {
            metadata_db::MetadataDBError::NotFound => VaultError::NotFound,
            metadata_db::MetadataDBError::RootAlreadyShared { path } => {
                VaultError::AlreadyShared { path }
            }
            error => VaultError::MetadataDBError { source: error },
        }
    }
}
impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ScanError { ref source, .. } => Some(source),
            Self::FSInteractionError { ref source } => Some(source),
            Self::MetadataDBError { ref source } => Some(source),
            _ => None,
        }
    }
}
