mod db_migration;
// Database schema - must be kept up to date manually
mod entity;
pub use self::entity::*;
mod errors;
pub use self::errors::*;
mod permission_mode;
pub use self::permission_mode::PermissionMode;
mod schema;


use chrono::NaiveDateTime;
use diesel::dsl::{exists, select};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sqlite::SqliteConnection;
use std::collections::HashSet;

use crate::fs_interaction::ScannedTree;

pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

// SQLite refuses statements with more than 999 bound variables,
// lists used in IN (...) clauses are split into chunks of this size.
const MAX_IN_CLAUSE_LENGTH: usize = 400;

no_arg_sql_function!(last_insert_rowid, diesel::sql_types::BigInt);

/// Persistent store of users, the item hierarchy and per user access records.
///
/// Every public method that writes to the database runs inside its own
/// immediate (write locked) transaction, i.e. either all of its changes become
/// visible or none of them do.
/// Every MetadataDB holds its own connection, concurrent users should each open their own.
pub struct MetadataDB {
    conn: SqliteConnection,
}

impl MetadataDB {
    /// Opens the metadata db file located at the given path and performs data migrations to
    /// the current application version if required.
    pub fn open(path: &str) -> Result<MetadataDB> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Same as open, but waits at most busy_timeout_ms for locks held by other connections.
    pub fn open_with_busy_timeout(path: &str, busy_timeout_ms: u32) -> Result<MetadataDB> {
        let result = MetadataDB {
            conn: SqliteConnection::establish(path)?,
        };

        result.default_db_settings(busy_timeout_ms)?;
        result.upgrade_db()?;

        Ok(result)
    }

    ///////////////////////////////////////////
    // Users
    ///////////////////////////////////////////
    /// Registers a new user, usernames must be unique.
    pub fn create_user(&self, username: &str, is_administrator: bool) -> Result<User> {
        use self::schema::users;

        self.conn.immediate_transaction(|| {
            let name_taken: bool = select(exists(users::table.filter(users::username.eq(username))))
                .get_result(&self.conn)?;
            if name_taken {
                return Err(MetadataDBError::UsernameTaken {
                    username: username.to_string(),
                });
            }

            diesel::insert_into(users::table)
                .values(user::InsertFull {
                    username,
                    is_administrator,
                })
                .execute(&self.conn)?;
            let user_id = self.last_insert_id()?;

            Ok(users::table.find(user_id).first::<User>(&self.conn)?)
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<User> {
        use self::schema::users;

        Ok(users::table.find(user_id).first::<User>(&self.conn)?)
    }

    pub fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        use self::schema::users;

        Ok(users::table
            .filter(users::username.eq(username))
            .first::<User>(&self.conn)
            .optional()?)
    }

    /// All users ordered by their name.
    pub fn get_users(&self) -> Result<Vec<User>> {
        use self::schema::users;

        Ok(users::table
            .order(users::username.asc())
            .load::<User>(&self.conn)?)
    }

    pub fn get_administrators(&self) -> Result<Vec<User>> {
        use self::schema::users;

        Ok(users::table
            .filter(users::is_administrator.eq(true))
            .order(users::username.asc())
            .load::<User>(&self.conn)?)
    }

    pub fn set_administrator(&self, user_id: i64, is_administrator: bool) -> Result<User> {
        use self::schema::users;

        self.conn.immediate_transaction(|| {
            let updated = diesel::update(users::table.find(user_id))
                .set(users::is_administrator.eq(is_administrator))
                .execute(&self.conn)?;
            if updated == 0 {
                return Err(MetadataDBError::NotFound);
            }

            Ok(users::table.find(user_id).first::<User>(&self.conn)?)
        })
    }

    /// Removes the user together with everything referencing it.
    /// Items the user added stay in the vault, they simply lose their creator.
    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        use self::schema::{item_accessibilities, item_ratings, items, suggestions, users};

        self.conn.immediate_transaction(|| {
            users::table.find(user_id).first::<User>(&self.conn)?;

            diesel::delete(item_accessibilities::table.filter(item_accessibilities::user_id.eq(user_id)))
                .execute(&self.conn)?;
            diesel::delete(item_ratings::table.filter(item_ratings::user_id.eq(user_id)))
                .execute(&self.conn)?;
            diesel::delete(
                suggestions::table.filter(
                    suggestions::from_user_id
                        .eq(user_id)
                        .or(suggestions::to_user_id.eq(user_id)),
                ),
            )
            .execute(&self.conn)?;
            diesel::update(items::table.filter(items::created_by.eq(user_id)))
                .set(items::created_by.eq(None::<i64>))
                .execute(&self.conn)?;
            diesel::delete(users::table.find(user_id)).execute(&self.conn)?;

            Ok(())
        })
    }

    ///////////////////////////////////////////
    // Item Hierarchy
    ///////////////////////////////////////////
    pub fn get_item(&self, item_id: i64) -> Result<Item> {
        use self::schema::items;

        Ok(items::table.find(item_id).first::<Item>(&self.conn)?)
    }

    pub fn get_root_item_by_path(&self, path: &str) -> Result<Option<Item>> {
        use self::schema::items;

        Ok(items::table
            .filter(items::parent_id.is_null())
            .filter(items::path.eq(path))
            .first::<Item>(&self.conn)
            .optional()?)
    }

    /// Root items ordered by name.
    /// visible_to limits the result to items the given user id has access to,
    /// None returns all of them.
    pub fn get_root_items(&self, visible_to: Option<i64>) -> Result<Vec<Item>> {
        use self::schema::{item_accessibilities, items};

        let result = match visible_to {
            None => items::table
                .filter(items::parent_id.is_null())
                .order(items::name.asc())
                .load::<Item>(&self.conn)?,
            Some(user_id) => items::table
                .inner_join(item_accessibilities::table)
                .filter(items::parent_id.is_null())
                .filter(item_accessibilities::user_id.eq(user_id))
                .filter(item_accessibilities::accessible.eq(true))
                .select(items::all_columns)
                .order(items::name.asc())
                .load::<Item>(&self.conn)?,
        };

        Ok(result)
    }

    /// Direct children of the given item ordered by name, see get_root_items for visible_to.
    pub fn get_child_items(&self, parent_id: i64, visible_to: Option<i64>) -> Result<Vec<Item>> {
        use self::schema::{item_accessibilities, items};

        let result = match visible_to {
            None => items::table
                .filter(items::parent_id.eq(parent_id))
                .order(items::name.asc())
                .load::<Item>(&self.conn)?,
            Some(user_id) => items::table
                .inner_join(item_accessibilities::table)
                .filter(items::parent_id.eq(parent_id))
                .filter(item_accessibilities::user_id.eq(user_id))
                .filter(item_accessibilities::accessible.eq(true))
                .select(items::all_columns)
                .order(items::name.asc())
                .load::<Item>(&self.conn)?,
        };

        Ok(result)
    }

    /// Follows the parent links of the given item up to the root of its tree.
    pub fn get_root_of(&self, item_id: i64) -> Result<Item> {
        let mut current = self.get_item(item_id)?;
        while let Some(parent_id) = current.parent_id {
            current = self.get_item(parent_id)?;
        }

        Ok(current)
    }

    /// Ids of the given item and all its descendants in pre-order
    /// (parents before children, siblings ordered by name).
    pub fn get_subtree_ids(&self, item_id: i64) -> Result<Vec<i64>> {
        use self::schema::items;

        let root_id = items::table
            .find(item_id)
            .select(items::id)
            .first::<i64>(&self.conn)?;

        let mut result = Vec::new();
        let mut open_items = vec![root_id];
        while let Some(current_id) = open_items.pop() {
            result.push(current_id);

            // Reverse name order on the stack pops siblings in ascending order.
            let child_ids = items::table
                .filter(items::parent_id.eq(current_id))
                .select(items::id)
                .order(items::name.desc())
                .load::<i64>(&self.conn)?;
            open_items.extend(child_ids);
        }

        Ok(result)
    }

    /// Inserts a scanned tree as a new root item and seeds access records for the
    /// users selected by the permission mode.
    /// Returns the ids of the inserted items in the order of the scanned tree.
    pub fn insert_tree(
        &self,
        tree: &ScannedTree,
        owner: &User,
        mode: PermissionMode,
    ) -> Result<Vec<i64>> {
        use self::schema::items;

        self.conn.immediate_transaction(|| {
            if self.get_root_item_by_path(&tree.root().path)?.is_some() {
                return Err(MetadataDBError::RootAlreadyShared {
                    path: tree.root().path.clone(),
                });
            }

            let created_at = now();
            let mut item_ids: Vec<i64> = Vec::with_capacity(tree.len());
            for node in tree.nodes() {
                let entry = &node.entry;
                let parent_id = node.parent.map(|index| item_ids[index]);

                diesel::insert_into(items::table)
                    .values(item::InsertFull {
                        parent_id,
                        name: &entry.name,
                        path: &entry.path,
                        kind: entry.kind,
                        mime_type: &entry.mime,
                        views: 0,
                        created_at,
                        created_by: Some(owner.id),
                        file_mod_time: entry.mod_time,
                    })
                    .execute(&self.conn)?;
                item_ids.push(self.last_insert_id()?);
            }

            let user_ids = self.user_ids_for_mode(owner, mode)?;
            self.write_access_records(&item_ids, &user_ids, true)?;

            Ok(item_ids)
        })
    }

    /// Deletes the item, all its descendants and every record referencing them.
    /// Returns the number of deleted items.
    pub fn delete_item_recursive(&self, item_id: i64) -> Result<usize> {
        use self::schema::{item_accessibilities, item_ratings, items, suggestions};

        self.conn.immediate_transaction(|| {
            let subtree = self.get_subtree_ids(item_id)?;

            for chunk in subtree.chunks(MAX_IN_CLAUSE_LENGTH) {
                diesel::delete(
                    item_accessibilities::table.filter(item_accessibilities::item_id.eq_any(chunk)),
                )
                .execute(&self.conn)?;
                diesel::delete(item_ratings::table.filter(item_ratings::item_id.eq_any(chunk)))
                    .execute(&self.conn)?;
                diesel::delete(suggestions::table.filter(suggestions::item_id.eq_any(chunk)))
                    .execute(&self.conn)?;
            }
            // Children first, parents are referenced by their foreign keys.
            for id in subtree.iter().rev() {
                diesel::delete(items::table.find(*id)).execute(&self.conn)?;
            }

            Ok(subtree.len())
        })
    }

    pub fn increment_views(&self, item_id: i64) -> Result<Item> {
        use self::schema::items;

        self.conn.immediate_transaction(|| {
            let updated = diesel::update(items::table.find(item_id))
                .set(items::views.eq(items::views + 1i64))
                .execute(&self.conn)?;
            if updated == 0 {
                return Err(MetadataDBError::NotFound);
            }

            Ok(items::table.find(item_id).first::<Item>(&self.conn)?)
        })
    }

    /// Most recently added non-directory items, newest first.
    pub fn get_latest_items(&self, visible_to: Option<i64>, limit: i64) -> Result<Vec<Item>> {
        use self::schema::{item_accessibilities, items};

        let result = match visible_to {
            None => items::table
                .filter(items::kind.ne(ItemKind::Directory))
                .order((items::created_at.desc(), items::id.desc()))
                .limit(limit)
                .load::<Item>(&self.conn)?,
            Some(user_id) => items::table
                .inner_join(item_accessibilities::table)
                .filter(items::kind.ne(ItemKind::Directory))
                .filter(item_accessibilities::user_id.eq(user_id))
                .filter(item_accessibilities::accessible.eq(true))
                .select(items::all_columns)
                .order((items::created_at.desc(), items::id.desc()))
                .limit(limit)
                .load::<Item>(&self.conn)?,
        };

        Ok(result)
    }

    ///////////////////////////////////////////
    // Accessibility
    ///////////////////////////////////////////
    /// True only if an access record exists for the pair AND it grants access.
    pub fn is_accessible(&self, item_id: i64, user_id: i64) -> Result<bool> {
        use self::schema::item_accessibilities;

        Ok(select(exists(
            item_accessibilities::table
                .filter(item_accessibilities::item_id.eq(item_id))
                .filter(item_accessibilities::user_id.eq(user_id))
                .filter(item_accessibilities::accessible.eq(true)),
        ))
        .get_result(&self.conn)?)
    }

    pub fn get_accessibility(&self, item_id: i64, user_id: i64) -> Result<Option<ItemAccessibility>> {
        use self::schema::item_accessibilities;

        Ok(item_accessibilities::table
            .filter(item_accessibilities::item_id.eq(item_id))
            .filter(item_accessibilities::user_id.eq(user_id))
            .first::<ItemAccessibility>(&self.conn)
            .optional()?)
    }

    /// Grants the users access to the item and all its descendants.
    ///
    /// Without overwrite only missing or denying records are written, with overwrite
    /// every record of the subtree is rewritten. Returns the number of written records.
    pub fn grant_access_recursive(
        &self,
        item_id: i64,
        user_ids: &[i64],
        overwrite: bool,
    ) -> Result<usize> {
        self.conn.immediate_transaction(|| {
            let subtree = self.get_subtree_ids(item_id)?;
            let already_granted = if overwrite {
                HashSet::new()
            } else {
                self.granted_pairs(&subtree, user_ids)?
            };

            let records: Vec<_> = subtree
                .iter()
                .flat_map(|item_id| user_ids.iter().map(move |user_id| (*item_id, *user_id)))
                .filter(|pair| !already_granted.contains(pair))
                .map(|(item_id, user_id)| item_accessibility::InsertFull {
                    item_id,
                    user_id,
                    accessible: true,
                })
                .collect();

            self.replace_access_records(&records)
        })
    }

    /// Denies the users access to the item and all its descendants.
    /// Returns the number of written records.
    pub fn revoke_access_recursive(&self, item_id: i64, user_ids: &[i64]) -> Result<usize> {
        self.conn.immediate_transaction(|| {
            let subtree = self.get_subtree_ids(item_id)?;
            self.write_access_records(&subtree, user_ids, false)
        })
    }

    /// Splits the users holding a record for the item into (allowed, denied),
    /// both ordered by username. Users without any record are in neither list.
    pub fn get_item_users(&self, item_id: i64) -> Result<(Vec<User>, Vec<User>)> {
        use self::schema::{item_accessibilities, users};

        let records = users::table
            .inner_join(item_accessibilities::table)
            .filter(item_accessibilities::item_id.eq(item_id))
            .select((users::all_columns, item_accessibilities::accessible))
            .order(users::username.asc())
            .load::<(User, bool)>(&self.conn)?;

        let (allowed, denied): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|(_, accessible)| *accessible);
        Ok((
            allowed.into_iter().map(|(user, _)| user).collect(),
            denied.into_iter().map(|(user, _)| user).collect(),
        ))
    }

    ///////////////////////////////////////////
    // Ratings and Suggestions
    ///////////////////////////////////////////
    /// Stores the users rating of an item, replacing an earlier one.
    pub fn set_rating(&self, item_id: i64, user_id: i64, rating: i32) -> Result<()> {
        use self::schema::item_ratings;

        self.conn.immediate_transaction(|| {
            diesel::replace_into(item_ratings::table)
                .values(item_rating::InsertFull {
                    item_id,
                    user_id,
                    rating,
                })
                .execute(&self.conn)?;

            Ok(())
        })
    }

    pub fn get_rating(&self, item_id: i64, user_id: i64) -> Result<Option<ItemRating>> {
        use self::schema::item_ratings;

        Ok(item_ratings::table
            .filter(item_ratings::item_id.eq(item_id))
            .filter(item_ratings::user_id.eq(user_id))
            .first::<ItemRating>(&self.conn)
            .optional()?)
    }

    pub fn get_ratings(&self, item_id: i64) -> Result<Vec<ItemRating>> {
        use self::schema::item_ratings;

        Ok(item_ratings::table
            .filter(item_ratings::item_id.eq(item_id))
            .load::<ItemRating>(&self.conn)?)
    }

    pub fn create_suggestion(
        &self,
        from_user_id: i64,
        to_user_id: i64,
        item_id: i64,
    ) -> Result<Suggestion> {
        use self::schema::suggestions;

        self.conn.immediate_transaction(|| {
            diesel::insert_into(suggestions::table)
                .values(suggestion::InsertFull {
                    from_user_id,
                    to_user_id,
                    item_id,
                    created_at: now(),
                })
                .execute(&self.conn)?;
            let suggestion_id = self.last_insert_id()?;

            Ok(suggestions::table
                .find(suggestion_id)
                .first::<Suggestion>(&self.conn)?)
        })
    }

    /// Suggestions received by the user, newest first.
    pub fn get_suggestions_for(&self, to_user_id: i64, limit: i64) -> Result<Vec<Suggestion>> {
        use self::schema::suggestions;

        Ok(suggestions::table
            .filter(suggestions::to_user_id.eq(to_user_id))
            .order((suggestions::created_at.desc(), suggestions::id.desc()))
            .limit(limit)
            .load::<Suggestion>(&self.conn)?)
    }

    /// Distinct items suggested to the user, most recently suggested first.
    pub fn get_suggested_items(&self, to_user_id: i64) -> Result<Vec<Item>> {
        use self::schema::{items, suggestions};

        let suggested = suggestions::table
            .inner_join(items::table)
            .filter(suggestions::to_user_id.eq(to_user_id))
            .select(items::all_columns)
            .order((suggestions::created_at.desc(), suggestions::id.desc()))
            .load::<Item>(&self.conn)?;

        let mut seen = HashSet::new();
        Ok(suggested
            .into_iter()
            .filter(|item| seen.insert(item.id))
            .collect())
    }

    ///////////////////////////////////////////
    // Internal helpers (never open their own transaction)
    ///////////////////////////////////////////
    fn user_ids_for_mode(&self, owner: &User, mode: PermissionMode) -> Result<Vec<i64>> {
        let user_ids = match mode {
            PermissionMode::Owner => vec![owner.id],
            PermissionMode::Administrators => self
                .get_administrators()?
                .into_iter()
                .map(|user| user.id)
                .collect(),
            PermissionMode::All => self.get_users()?.into_iter().map(|user| user.id).collect(),
        };

        Ok(user_ids)
    }

    fn granted_pairs(&self, item_ids: &[i64], user_ids: &[i64]) -> Result<HashSet<(i64, i64)>> {
        use self::schema::item_accessibilities;

        let mut result = HashSet::new();
        for item_chunk in item_ids.chunks(MAX_IN_CLAUSE_LENGTH / 2) {
            for user_chunk in user_ids.chunks(MAX_IN_CLAUSE_LENGTH / 2) {
                let pairs = item_accessibilities::table
                    .filter(item_accessibilities::item_id.eq_any(item_chunk))
                    .filter(item_accessibilities::user_id.eq_any(user_chunk))
                    .filter(item_accessibilities::accessible.eq(true))
                    .select((item_accessibilities::item_id, item_accessibilities::user_id))
                    .load::<(i64, i64)>(&self.conn)?;
                result.extend(pairs);
            }
        }

        Ok(result)
    }

    fn write_access_records(
        &self,
        item_ids: &[i64],
        user_ids: &[i64],
        accessible: bool,
    ) -> Result<usize> {
        let records: Vec<_> = item_ids
            .iter()
            .flat_map(|item_id| {
                user_ids
                    .iter()
                    .map(move |user_id| item_accessibility::InsertFull {
                        item_id: *item_id,
                        user_id: *user_id,
                        accessible,
                    })
            })
            .collect();

        self.replace_access_records(&records)
    }

    fn replace_access_records(&self, records: &[item_accessibility::InsertFull]) -> Result<usize> {
        use self::schema::item_accessibilities;

        if records.is_empty() {
            return Ok(0);
        }
        diesel::replace_into(item_accessibilities::table)
            .values(records)
            .execute(&self.conn)?;

        Ok(records.len())
    }

    fn last_insert_id(&self) -> Result<i64> {
        Ok(select(last_insert_rowid).get_result::<i64>(&self.conn)?)
    }

    fn upgrade_db(&self) -> db_migration::Result<()> {
        // Concurrent openers serialize on the write lock, the second one sees the upgraded DB.
        self.conn
            .immediate_transaction(|| db_migration::upgrade_db(&self.conn))?;

        Ok(())
    }

    fn default_db_settings(&self, busy_timeout_ms: u32) -> Result<()> {
        // Readers do not block the single writer and vice versa.
        sql_query("PRAGMA journal_mode = WAL").execute(&self.conn)?;
        sql_query(format!("PRAGMA busy_timeout = {}", busy_timeout_ms)).execute(&self.conn)?;
        sql_query("PRAGMA foreign_keys = 1").execute(&self.conn)?;

        Ok(())
    }
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
