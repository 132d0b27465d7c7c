mod errors;
pub use self::errors::*;
mod subtree_locks;
pub use self::subtree_locks::{SubtreeGuard, SubtreeLocks};

#[cfg(test)]
mod tests;

use std::io;
use std::sync::Arc;

use crate::config::VaultConfig;
use crate::fs_interaction::virtual_fs;
use crate::fs_interaction::{FSInteraction, MediaTypes};
use crate::metadata_db::{Item, MetadataDB, PermissionMode, Suggestion, User};

pub const DEFAULT_SUGGESTION_LIMIT: i64 = 15;
pub const MIN_RATING: i32 = 0;
pub const MAX_RATING: i32 = 10;

/// Byte stream of a media file together with what a client needs to serve it.
pub struct MediaStream {
    pub reader: Box<dyn io::Read>,
    pub mime: String,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
}

/// Entry point to a media vault: the shared item hierarchy, the users allowed to see it
/// and the file system locations backing it.
///
/// Every call receives the acting user explicitly. A Vault is used from one thread,
/// concurrent callers open additional handles through open_handle.
pub struct Vault<FS: virtual_fs::FS> {
    config: VaultConfig,
    fs_access: FSInteraction<FS>,
    db_access: MetadataDB,
    locks: Arc<SubtreeLocks>,
}
pub type DefaultVault = Vault<virtual_fs::WrapperFS>;

impl<FS: virtual_fs::FS> Vault<FS> {
    pub fn open(config: VaultConfig) -> Result<Self> {
        Self::open_with_fs(config, FS::default())
    }
    pub fn open_with_fs(config: VaultConfig, fs: FS) -> Result<Self> {
        let db_access =
            MetadataDB::open_with_busy_timeout(&config.database_path, config.busy_timeout_ms)?;
        let fs_access = FSInteraction::with_fs(fs, MediaTypes::with_entries(&config.media_types));

        tracing::debug!(database = %config.database_path, "opened vault");
        Ok(Self {
            config,
            fs_access,
            db_access,
            locks: Arc::new(SubtreeLocks::new()),
        })
    }

    /// Opens a second handle on the same vault with its own database connection.
    /// Handles share the subtree locks, i.e. their mutations are serialized per tree.
    /// Only meaningful for file backed databases.
    pub fn open_handle(&self) -> Result<Self> {
        let db_access = MetadataDB::open_with_busy_timeout(
            &self.config.database_path,
            self.config.busy_timeout_ms,
        )?;

        Ok(Self {
            config: self.config.clone(),
            fs_access: FSInteraction::with_fs(
                self.fs_access.fs().clone(),
                self.fs_access.media_types().clone(),
            ),
            db_access,
            locks: Arc::clone(&self.locks),
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn default_permission_mode(&self) -> PermissionMode {
        self.config.permission_mode()
    }

    ///////////////////////////////////////////
    // Users
    ///////////////////////////////////////////
    /// Registers a principal handed to us by the authentication layer.
    pub fn register_user(&self, username: &str, is_administrator: bool) -> Result<User> {
        let result = self
            .db_access
            .create_user(username, is_administrator)
            .map_err(VaultError::from);
        if let Ok(ref user) = result {
            tracing::info!(user_id = user.id, username, is_administrator, "registered user");
        }

        log_failure("register_user", result)
    }

    pub fn get_user(&self, user_id: i64) -> Result<User> {
        Ok(self.db_access.get_user(user_id)?)
    }

    pub fn get_user_by_name(&self, username: &str) -> Result<User> {
        self.db_access
            .get_user_by_name(username)?
            .ok_or(VaultError::NotFound)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.db_access.get_users()?)
    }

    pub fn set_administrator(
        &self,
        actor: &User,
        user_id: i64,
        is_administrator: bool,
    ) -> Result<User> {
        let result = require_administrator(actor).and_then(|_| {
            Ok(self
                .db_access
                .set_administrator(user_id, is_administrator)?)
        });

        log_failure("set_administrator", result)
    }

    /// Removes the user with all its access records, ratings and suggestions.
    pub fn delete_user(&self, actor: &User, user_id: i64) -> Result<()> {
        let result = require_administrator(actor)
            .and_then(|_| Ok(self.db_access.delete_user(user_id)?));
        if result.is_ok() {
            tracing::info!(user_id, "deleted user");
        }

        log_failure("delete_user", result)
    }

    ///////////////////////////////////////////
    // Hierarchy Mutations
    ///////////////////////////////////////////
    /// Shares the file system location at path as a new root item.
    ///
    /// The location is scanned completely before anything is stored, the items and their
    /// access records are then inserted in a single transaction.
    /// Returns the number of created items.
    pub fn add_item_recursive(
        &self,
        path: &str,
        owner: &User,
        mode: PermissionMode,
    ) -> Result<usize> {
        let path = normalize_path(path);
        let result = self.add_item_recursive_locked(&path, owner, mode);
        if let Ok(count) = result {
            tracing::info!(path = %path, count, mode = mode.as_str(), "added items");
        }

        log_failure("add_item_recursive", result)
    }

    fn add_item_recursive_locked(
        &self,
        path: &str,
        owner: &User,
        mode: PermissionMode,
    ) -> Result<usize> {
        require_administrator(owner)?;
        self.db_access.get_user(owner.id)?;

        let _guard = self.locks.lock(path);
        if self.db_access.get_root_item_by_path(path)?.is_some() {
            return Err(VaultError::AlreadyShared {
                path: path.to_string(),
            });
        }

        let tree = self
            .fs_access
            .scan_tree(path)
            .map_err(|source| VaultError::ScanError {
                path: path.to_string(),
                source,
            })?;
        let item_ids = self.db_access.insert_tree(&tree, owner, mode)?;

        Ok(item_ids.len())
    }

    /// Removes the item, everything below it and every record referencing them.
    /// Returns the number of removed items.
    pub fn remove_item_recursive(&self, actor: &User, item_id: i64) -> Result<usize> {
        let result = require_administrator(actor).and_then(|_| self.remove_subtree(item_id));
        if let Ok(count) = result {
            tracing::info!(item_id, count, "removed items");
        }

        log_failure("remove_item_recursive", result)
    }

    /// Grants every given user access to the item and everything below it.
    /// Returns the number of written access records.
    pub fn grant_permission_recursive(
        &self,
        actor: &User,
        item_id: i64,
        users: &[User],
        overwrite: bool,
    ) -> Result<usize> {
        let result = require_administrator(actor).and_then(|_| {
            let user_ids = self.known_user_ids(users)?;
            let _guard = self.lock_tree_of(item_id)?;

            Ok(self
                .db_access
                .grant_access_recursive(item_id, &user_ids, overwrite)?)
        });
        if let Ok(count) = result {
            tracing::info!(item_id, count, overwrite, "granted access");
        }

        log_failure("grant_permission_recursive", result)
    }

    /// Denies every given user access to the item and everything below it.
    /// Administrators keep their implicit access.
    /// Returns the number of written access records.
    pub fn remove_permission_recursive(
        &self,
        actor: &User,
        item_id: i64,
        users: &[User],
    ) -> Result<usize> {
        let result = require_administrator(actor).and_then(|_| {
            let user_ids = self.known_user_ids(users)?;
            let _guard = self.lock_tree_of(item_id)?;

            Ok(self.db_access.revoke_access_recursive(item_id, &user_ids)?)
        });
        if let Ok(count) = result {
            tracing::info!(item_id, count, "revoked access");
        }

        log_failure("remove_permission_recursive", result)
    }

    ///////////////////////////////////////////
    // Item Tree
    ///////////////////////////////////////////
    /// Root items the user may see, ordered by name.
    pub fn get_root_items(&self, user: &User) -> Result<Vec<Item>> {
        Ok(self.db_access.get_root_items(visibility_of(user))?)
    }

    /// Direct children of the item ordered by name, regardless of their accessibility.
    pub fn get_children(&self, item_id: i64) -> Result<Vec<Item>> {
        self.db_access.get_item(item_id)?;
        Ok(self.db_access.get_child_items(item_id, None)?)
    }

    pub fn get_item(&self, item_id: i64) -> Result<Item> {
        Ok(self.db_access.get_item(item_id)?)
    }

    /// Administrators can access everything, everybody else needs a granting access record.
    pub fn accessible(&self, item_id: i64, user: &User) -> Result<bool> {
        self.db_access.get_item(item_id)?;
        if user.is_administrator {
            return Ok(true);
        }

        Ok(self.db_access.is_accessible(item_id, user.id)?)
    }

    /// Checks whether the backing file system location still exists.
    pub fn exists(&self, item_id: i64) -> Result<bool> {
        let item = self.db_access.get_item(item_id)?;
        Ok(self.fs_access.exists(&item.path))
    }

    pub fn media_type(&self, item_id: i64) -> Result<&'static str> {
        Ok(self.db_access.get_item(item_id)?.media_type())
    }

    /// Users holding an access record for the item, split into (allowed, denied).
    pub fn item_users(&self, actor: &User, item_id: i64) -> Result<(Vec<User>, Vec<User>)> {
        require_administrator(actor)?;
        self.db_access.get_item(item_id)?;

        Ok(self.db_access.get_item_users(item_id)?)
    }

    ///////////////////////////////////////////
    // Guarded Access
    ///////////////////////////////////////////
    /// Looks up an item on behalf of the user.
    ///
    /// Items whose backing location vanished are removed on the spot (together with
    /// everything below them) and reported as StaleItem.
    pub fn open_item(&self, item_id: i64, user: &User) -> Result<Item> {
        let result = self.open_item_checked(item_id, user);
        log_failure("open_item", result)
    }

    fn open_item_checked(&self, item_id: i64, user: &User) -> Result<Item> {
        let item = self.db_access.get_item(item_id)?;
        if !self.accessible(item.id, user)? {
            return Err(VaultError::AccessDenied);
        }

        if !self.fs_access.exists(&item.path) {
            let removed = match self.remove_subtree(item.id) {
                Ok(count) => count,
                // Somebody else cleaned up first.
                Err(VaultError::NotFound) => 0,
                Err(error) => return Err(error),
            };
            tracing::warn!(item_id, path = %item.path, removed, "removed stale item");

            return Err(VaultError::StaleItem { path: item.path });
        }

        Ok(item)
    }

    pub fn record_view(&self, item_id: i64) -> Result<Item> {
        Ok(self.db_access.increment_views(item_id)?)
    }

    /// Opens the item for the user and counts the view.
    pub fn view_item(&self, item_id: i64, user: &User) -> Result<Item> {
        self.open_item(item_id, user)?;
        self.record_view(item_id)
    }

    /// Children of a directory item the user may see.
    pub fn explore(&self, item_id: i64, user: &User) -> Result<Vec<Item>> {
        let item = self.open_item(item_id, user)?;
        if !item.is_directory() {
            return Err(VaultError::NotADirectory);
        }

        Ok(self
            .db_access
            .get_child_items(item.id, visibility_of(user))?)
    }

    /// Hands out a reader over the bytes of a media file, counting the view.
    pub fn open_media(&self, item_id: i64, user: &User) -> Result<MediaStream> {
        let item = self.open_item(item_id, user)?;
        if item.is_directory() {
            return Err(VaultError::NotAFile);
        }

        let (reader, length) = log_failure(
            "open_media",
            self.fs_access.open_file(&item.path).map_err(VaultError::from),
        )?;
        self.record_view(item.id)?;

        Ok(MediaStream {
            reader,
            mime: item.mime_type,
            length,
        })
    }

    ///////////////////////////////////////////
    // Ratings, Suggestions and Listings
    ///////////////////////////////////////////
    /// Stores the users rating (clamped to 0..=10) and returns the stored value.
    pub fn rate_item(&self, item_id: i64, user: &User, rating: i32) -> Result<i32> {
        let item = self.open_item(item_id, user)?;
        let rating = rating.max(MIN_RATING).min(MAX_RATING);
        self.db_access.set_rating(item.id, user.id, rating)?;

        tracing::debug!(item_id, user_id = user.id, rating, "rated item");
        Ok(rating)
    }

    /// Average rating of an item the user can access, None if nobody rated it yet.
    pub fn rating_summary(&self, item_id: i64, user: &User) -> Result<Option<RatingSummary>> {
        let item = self.open_item(item_id, user)?;
        let ratings = self.db_access.get_ratings(item.id)?;
        if ratings.is_empty() {
            return Ok(None);
        }

        let total: i64 = ratings.iter().map(|rating| i64::from(rating.rating)).sum();
        Ok(Some(RatingSummary {
            average: total as f64 / ratings.len() as f64,
            count: ratings.len(),
        }))
    }

    /// Suggests an item the sender can access to another user.
    pub fn suggest_item(&self, from: &User, to_user_id: i64, item_id: i64) -> Result<Suggestion> {
        let item = self.open_item(item_id, from)?;
        let receiver = self.db_access.get_user(to_user_id)?;
        let suggestion = self
            .db_access
            .create_suggestion(from.id, receiver.id, item.id)?;

        tracing::debug!(item_id, from = from.id, to = receiver.id, "suggested item");
        Ok(suggestion)
    }

    /// Suggestions received by the user, newest first (DEFAULT_SUGGESTION_LIMIT if no limit is given).
    pub fn suggestions_for(&self, user: &User, limit: Option<i64>) -> Result<Vec<Suggestion>> {
        Ok(self
            .db_access
            .get_suggestions_for(user.id, limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT))?)
    }

    /// Distinct items suggested to the user that the user may access.
    pub fn suggested_items(&self, user: &User) -> Result<Vec<Item>> {
        let mut result = Vec::new();
        for item in self.db_access.get_suggested_items(user.id)? {
            if user.is_administrator || self.db_access.is_accessible(item.id, user.id)? {
                result.push(item);
            }
        }

        Ok(result)
    }

    /// Most recently added files the user may access, newest first.
    pub fn latest_items(&self, user: &User, limit: i64) -> Result<Vec<Item>> {
        Ok(self
            .db_access
            .get_latest_items(visibility_of(user), limit)?)
    }

    ///////////////////////////////////////////
    // Helpers
    ///////////////////////////////////////////
    fn remove_subtree(&self, item_id: i64) -> Result<usize> {
        let _guard = self.lock_tree_of(item_id)?;
        Ok(self.db_access.delete_item_recursive(item_id)?)
    }

    fn lock_tree_of(&self, item_id: i64) -> Result<SubtreeGuard<'_>> {
        let root = self.db_access.get_root_of(item_id)?;
        Ok(self.locks.lock(&root.path))
    }

    fn known_user_ids(&self, users: &[User]) -> Result<Vec<i64>> {
        users
            .iter()
            .map(|user| -> Result<i64> { Ok(self.db_access.get_user(user.id)?.id) })
            .collect()
    }
}

fn require_administrator(user: &User) -> Result<()> {
    if user.is_administrator {
        Ok(())
    } else {
        Err(VaultError::NotAdministrator)
    }
}

fn visibility_of(user: &User) -> Option<i64> {
    if user.is_administrator {
        None
    } else {
        Some(user.id)
    }
}

/// Strips trailing separators, a lone "/" stays the file system root.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        String::from("/")
    } else {
        trimmed.to_string()
    }
}

fn log_failure<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(ref error) = result {
        match error {
            VaultError::NotFound
            | VaultError::StaleItem { .. }
            | VaultError::AccessDenied
            | VaultError::NotAdministrator
            | VaultError::AlreadyShared { .. } => {
                tracing::warn!(operation, error = %error, "vault operation rejected")
            }
            _ => tracing::error!(operation, error = %error, "vault operation failed"),
        }
    }

    result
}
