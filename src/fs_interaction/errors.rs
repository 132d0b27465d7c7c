use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum FSInteractionError {
    NonUnicodeFileName {
        path: PathBuf,
    },
    // IOError is simply our 'catch all' error type for 'non-special' issues
    IOError {
        source: io::Error,
        kind: io::ErrorKind,
    },
}
pub type Result<T> = std::result::Result<T, FSInteractionError>;

impl FSInteractionError {
    pub fn is_io_not_found(&self) -> bool {
        matches!(
            self,
            Self::IOError {
                kind: io::ErrorKind::NotFound,
                ..
            }
        )
    }
}
impl From<io::Error> for FSInteractionError {
    fn from(error: io::Error) -> Self {
        Self::IOError {
            kind: error.kind(),
            source: error,
        }
    }
}
impl fmt::Display for FSInteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error when accessing the FS ({:?})", self)
    }
}
impl Error for FSInteractionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IOError { ref source, .. } => Some(source),
            Self::NonUnicodeFileName { .. } => None,
        }
    }
}
