use filetime::FileTime;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Virtual abstraction layer above the actual FS implementation and API.
///
/// Two implementations exist:
/// 1) thin wrapper around actual FS API providing all functionality we require
/// 2) in-memory mock that allows testing without touching the disk
///    (and simulating items vanishing behind the vault's back)
///
/// We only wrap/implement functions we actually require in our code. The vault itself only
/// reads from the FS, the write operations exist to set up and change test fixtures through
/// the same interface for both implementations.
pub trait FS: Clone {
    fn default() -> Self;

    /// Metadata of the given path, NOT following symbolic links.
    fn metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata>;
    /// Metadata of the item a symbolic link points to (plain metadata for any other item).
    fn target_metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata>;
    fn list_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<DirEntry>>;
    fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Box<dyn io::Read>>;

    fn create_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()>;
    fn remove_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()>;
    fn create_file<P: AsRef<Path>>(&self, path: P, content: &[u8]) -> io::Result<()>;
    fn remove_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()>;
}

/// Represents a single entry in a directory.
/// Has the bare minimum information it needs attached to it.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub file_name: OsString,
    pub path: PathBuf,
}

/// A wrapper around the metadata we require when sharing an item.
#[derive(Debug, Clone)]
pub struct Metadata {
    file_type: FileType,
    size: u64,
    last_mod_time: FileTime,
}
impl Metadata {
    pub fn file_type(&self) -> FileType {
        self.file_type
    }
    pub fn size(&self) -> u64 {
        self.size
    }
    pub fn last_mod_time(&self) -> FileTime {
        self.last_mod_time
    }
}
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FileType {
    File,
    Dir,
    Link,
}

// Actual Implementations in Sub-Modules
mod wrapper_fs;
pub use self::wrapper_fs::WrapperFS;

mod in_memory_fs;
pub use self::in_memory_fs::InMemoryFS;
