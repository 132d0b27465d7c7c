use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;

/// Registry of item trees currently being mutated, keyed by the path of the tree's root.
///
/// Shared by all handles of a vault. Mutations of the same tree wait for each other,
/// mutations of different trees run side by side.
#[derive(Default)]
pub struct SubtreeLocks {
    locked_roots: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Holds the lock of one tree root, released on drop.
pub struct SubtreeGuard<'a> {
    locks: &'a SubtreeLocks,
    root_path: String,
}

impl SubtreeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the tree rooted at root_path is free and takes it.
    pub fn lock(&self, root_path: &str) -> SubtreeGuard<'_> {
        let mut locked_roots = self.locked_roots.lock();
        while locked_roots.contains(root_path) {
            self.released.wait(&mut locked_roots);
        }
        locked_roots.insert(root_path.to_string());

        SubtreeGuard {
            locks: self,
            root_path: root_path.to_string(),
        }
    }

    pub fn try_lock(&self, root_path: &str) -> Option<SubtreeGuard<'_>> {
        let mut locked_roots = self.locked_roots.lock();
        if !locked_roots.insert(root_path.to_string()) {
            return None;
        }

        Some(SubtreeGuard {
            locks: self,
            root_path: root_path.to_string(),
        })
    }

    pub fn is_locked(&self, root_path: &str) -> bool {
        self.locked_roots.lock().contains(root_path)
    }
}

impl<'a> SubtreeGuard<'a> {
    pub fn root_path(&self) -> &str {
        &self.root_path
    }
}

impl<'a> Drop for SubtreeGuard<'a> {
    fn drop(&mut self) {
        self.locks.locked_roots.lock().remove(&self.root_path);
        self.locks.released.notify_all();
    }
}
