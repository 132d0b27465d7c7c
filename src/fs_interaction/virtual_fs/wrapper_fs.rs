use super::*;
use std::fs;

#[derive(Clone)]
pub struct WrapperFS {}
impl FS for WrapperFS {
    fn default() -> Self {
        Self {}
    }

    fn metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata> {
        to_metadata(fs::symlink_metadata(path)?)
    }

    fn target_metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata> {
        to_metadata(fs::metadata(path)?)
    }

    fn list_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<DirEntry>> {
        let result: Result<Vec<_>, _> = fs::read_dir(path)?
            .map(|entry| {
                entry.map(|entry| DirEntry {
                    file_name: entry.file_name(),
                    path: entry.path(),
                })
            })
            .collect();

        result
    }

    fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Box<dyn io::Read>> {
        let reader = fs::OpenOptions::new()
            .create(false)
            .read(true)
            .write(false)
            .open(path.as_ref())?;

        Ok(Box::new(reader))
    }

    fn create_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::DirBuilder::new().recursive(false).create(&path)
    }
    fn remove_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn create_file<P: AsRef<Path>>(&self, path: P, content: &[u8]) -> io::Result<()> {
        use std::io::Write;

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)?;
        file.write_all(content)?;

        Ok(())
    }
    fn remove_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::remove_file(path)
    }
}

fn to_metadata(native_metadata: fs::Metadata) -> io::Result<Metadata> {
    Ok(Metadata {
        file_type: match native_metadata.file_type() {
            t if t.is_symlink() => FileType::Link,
            t if t.is_file() => FileType::File,
            t if t.is_dir() => FileType::Dir,
            _ => return Err(io::Error::from(io::ErrorKind::Other)),
        },
        size: native_metadata.len(),
        last_mod_time: FileTime::from_last_modification_time(&native_metadata),
    })
}
