mod errors;
pub use self::errors::*;
pub mod media_types;
pub use self::media_types::{MediaType, MediaTypes};
pub mod virtual_fs;


use chrono::NaiveDateTime;
use filetime::FileTime;
use std::io;
use std::path::Path;

use crate::metadata_db::ItemKind;

/// A single directory entry as seen by the scanner.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub name: String,
    pub path: String,
    pub kind: ItemKind,
    pub mime: String,
    pub mod_time: NaiveDateTime,
}

/// Entry of a scanned tree, referencing its parent by index into the tree.
#[derive(Debug, Clone)]
pub struct ScannedNode {
    pub parent: Option<usize>,
    pub entry: ScanEntry,
}

/// A fully scanned directory hierarchy held in memory before anything is written to the DB.
///
/// Nodes are stored in pre-order (every parent precedes its children, children are sorted
/// by name), so inserting them front to back always finds the parent already present.
#[derive(Debug, Clone)]
pub struct ScannedTree {
    nodes: Vec<ScannedNode>,
}
impl ScannedTree {
    fn new(root: ScanEntry) -> Self {
        Self {
            nodes: vec![ScannedNode {
                parent: None,
                entry: root,
            }],
        }
    }

    fn push(&mut self, parent: usize, entry: ScanEntry) -> usize {
        self.nodes.push(ScannedNode {
            parent: Some(parent),
            entry,
        });
        self.nodes.len() - 1
    }

    pub fn root(&self) -> &ScanEntry {
        &self.nodes[0].entry
    }

    pub fn nodes(&self) -> &[ScannedNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Read-only view on the file system holding the shared media.
pub struct FSInteraction<FS: virtual_fs::FS> {
    fs: FS,
    media_types: MediaTypes,
}
pub type DefaultFSInteraction = FSInteraction<virtual_fs::WrapperFS>;

impl<FS: virtual_fs::FS> FSInteraction<FS> {
    pub fn with_fs(fs: FS, media_types: MediaTypes) -> Self {
        Self { fs, media_types }
    }

    pub fn fs(&self) -> &FS {
        &self.fs
    }

    pub fn media_types(&self) -> &MediaTypes {
        &self.media_types
    }

    /// True if the location (or the target of a shared link) is still present.
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.fs.target_metadata(path).is_ok()
    }

    pub fn metadata<P: AsRef<Path>>(&self, path: P) -> Result<virtual_fs::Metadata> {
        Ok(self.fs.metadata(path)?)
    }

    /// Opens the file for streaming its content, returns the reader and the file size.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<(Box<dyn io::Read>, u64)> {
        let metadata = self.fs.target_metadata(&path)?;
        if metadata.file_type() != virtual_fs::FileType::File {
            return Err(io::Error::from(io::ErrorKind::InvalidInput).into());
        }

        Ok((self.fs.read_file(&path)?, metadata.size()))
    }

    /// Describes the item located at path (without looking at its children).
    ///
    /// A symbolic link is described by what it points to, a dangling link fails as not found.
    /// Links below a shared location never get here, list_entries drops them.
    pub fn describe<P: AsRef<Path>>(&self, path: P) -> Result<ScanEntry> {
        let path = path.as_ref();
        let metadata = self.fs.target_metadata(path)?;

        let path_string = Self::path_to_string(path)?;
        let name = match path.file_name() {
            Some(name) => name
                .to_str()
                .ok_or_else(|| FSInteractionError::NonUnicodeFileName {
                    path: path.to_path_buf(),
                })?
                .to_string(),
            // The FS root has no name of its own.
            None => path_string.clone(),
        };

        let media_type = match metadata.file_type() {
            virtual_fs::FileType::Dir => MediaTypes::directory(),
            virtual_fs::FileType::File => self.media_types.classify(path),
            virtual_fs::FileType::Link => {
                return Err(io::Error::from(io::ErrorKind::InvalidInput).into())
            }
        };

        Ok(ScanEntry {
            name,
            path: path_string,
            kind: media_type.kind,
            mime: media_type.mime,
            mod_time: to_naive_date_time(metadata.last_mod_time()),
        })
    }

    /// Lists the immediate entries of the given directory, sorted by name.
    /// Symbolic links are skipped, we never follow them out of the shared location.
    pub fn list_entries<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ScanEntry>> {
        let mut result = Vec::new();

        for dir_entry in self.fs.list_dir(path)? {
            let metadata = self.fs.metadata(&dir_entry.path)?;
            if metadata.file_type() == virtual_fs::FileType::Link {
                continue;
            }

            result.push(self.describe(&dir_entry.path)?);
        }
        result.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(result)
    }

    /// Scans the given location and everything below it.
    ///
    /// Fails if the location or ANY directory below it can not be read,
    /// i.e. a successful result always is a complete picture of the hierarchy.
    pub fn scan_tree<P: AsRef<Path>>(&self, path: P) -> Result<ScannedTree> {
        let root = self.describe(path)?;
        let root_is_dir = root.kind == ItemKind::Directory;

        let mut tree = ScannedTree::new(root);
        if root_is_dir {
            self.scan_children(&mut tree, 0)?;
        }

        Ok(tree)
    }

    fn scan_children(&self, tree: &mut ScannedTree, parent: usize) -> Result<()> {
        let parent_path = tree.nodes[parent].entry.path.clone();

        for entry in self.list_entries(&parent_path)? {
            let is_dir = entry.kind == ItemKind::Directory;
            let index = tree.push(parent, entry);
            if is_dir {
                self.scan_children(tree, index)?;
            }
        }

        Ok(())
    }

    fn path_to_string(path: &Path) -> Result<String> {
        path.to_str()
            .map(|path| path.to_string())
            .ok_or_else(|| FSInteractionError::NonUnicodeFileName {
                path: path.to_path_buf(),
            })
    }
}

fn to_naive_date_time(file_time: FileTime) -> NaiveDateTime {
    NaiveDateTime::from_timestamp_opt(file_time.unix_seconds(), file_time.nanoseconds())
        .unwrap_or_default()
}
