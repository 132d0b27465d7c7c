use super::*;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// FS mock keeping all items in a map.
///
/// Clones share the same underlying items, so a test can keep one handle to manipulate
/// the 'disk' while the vault works on another one.
#[derive(Clone)]
pub struct InMemoryFS {
    items: Rc<RefCell<HashMap<PathBuf, InMemoryItem>>>,
    clock: Rc<Cell<i64>>,
}

impl InMemoryFS {
    pub fn new() -> InMemoryFS {
        let mut initial_items = HashMap::new();
        initial_items.insert(PathBuf::from("/"), InMemoryItem::new(FileType::Dir, Vec::new(), 0));

        InMemoryFS {
            items: Rc::new(RefCell::new(initial_items)),
            clock: Rc::new(Cell::new(0)),
        }
    }

    /// Convenience for test setups, creates a symbolic link entry that points nowhere.
    pub fn create_link<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.insert_item(path, FileType::Link, Vec::new())
    }

    fn normalize<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        path.as_ref().components().collect()
    }

    fn tick(&self) -> i64 {
        let time = self.clock.get() + 1;
        self.clock.set(time);
        time
    }

    fn parent_is_dir(&self, path: &Path) -> bool {
        if let Some(parent) = path.parent() {
            self.items
                .borrow()
                .get(parent)
                .map_or(false, |entry| entry.metadata.file_type() == FileType::Dir)
        } else {
            false
        }
    }

    fn children_exist(&self, path: &Path) -> bool {
        self.items
            .borrow()
            .keys()
            .any(|item_path| item_path.parent() == Some(path))
    }

    fn insert_item<P: AsRef<Path>>(
        &self,
        path: P,
        file_type: FileType,
        content: Vec<u8>,
    ) -> io::Result<()> {
        let path = self.normalize(path);

        if !self.parent_is_dir(&path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if self.items.borrow().contains_key(&path) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }

        let item = InMemoryItem::new(file_type, content, self.tick());
        self.items.borrow_mut().insert(path, item);

        Ok(())
    }

    fn remove_item(&self, path: &Path, expected_type: FileType) -> io::Result<()> {
        let path = self.normalize(path);

        match self.items.borrow().get(&path) {
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
            Some(item) if item.metadata.file_type() != expected_type => {
                return Err(io::Error::from(io::ErrorKind::InvalidInput));
            }
            Some(_) => (),
        }
        if path.parent().is_none() || self.children_exist(&path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }

        self.items.borrow_mut().remove(&path);
        Ok(())
    }
}
impl FS for InMemoryFS {
    fn default() -> Self {
        Self::new()
    }

    fn metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata> {
        let path = self.normalize(path);

        let metadata = match self.items.borrow().get(&path) {
            Some(item) => item.metadata.clone(),
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
        };

        Ok(metadata)
    }

    fn target_metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata> {
        let metadata = self.metadata(path)?;
        // Links created in memory never point anywhere.
        if metadata.file_type() == FileType::Link {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        Ok(metadata)
    }

    fn list_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<DirEntry>> {
        let path = self.normalize(path);

        match self.items.borrow().get(&path) {
            Some(item) if item.metadata.file_type() == FileType::Dir => (),
            Some(_) => return Err(io::Error::from(io::ErrorKind::InvalidInput)),
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
        }

        let entries = self
            .items
            .borrow()
            .keys()
            .filter(|item_path| item_path.parent() == Some(path.as_path()))
            .filter_map(|item_path| {
                item_path.file_name().map(|file_name| DirEntry {
                    file_name: file_name.to_os_string(),
                    path: item_path.clone(),
                })
            })
            .collect();

        Ok(entries)
    }

    fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Box<dyn io::Read>> {
        let path = self.normalize(path);

        let content = match self.items.borrow().get(&path) {
            Some(item) if item.metadata.file_type() == FileType::File => item.content.clone(),
            Some(_) => return Err(io::Error::from(io::ErrorKind::InvalidInput)),
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
        };

        Ok(Box::new(io::Cursor::new(content)))
    }

    fn create_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.insert_item(path, FileType::Dir, Vec::new())
    }
    fn remove_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.remove_item(path.as_ref(), FileType::Dir)
    }

    fn create_file<P: AsRef<Path>>(&self, path: P, content: &[u8]) -> io::Result<()> {
        self.insert_item(path, FileType::File, content.to_vec())
    }
    fn remove_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.remove_item(path.as_ref(), FileType::File)
    }
}

#[derive(Debug)]
struct InMemoryItem {
    metadata: Metadata,
    content: Vec<u8>,
}
impl InMemoryItem {
    fn new(file_type: FileType, content: Vec<u8>, mod_time: i64) -> InMemoryItem {
        Self {
            metadata: Metadata {
                file_type,
                size: content.len() as u64,
                last_mod_time: FileTime::from_unix_time(mod_time, 0),
            },
            content,
        }
    }
}
