use super::schema::items;
use super::ItemKind;

#[derive(Debug, Queryable, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub parent_id: Option<i64>,

    pub name: String,
    pub path: String,
    pub kind: ItemKind,
    pub mime_type: String,

    pub views: i64,
    pub created_at: chrono::NaiveDateTime,
    pub created_by: Option<i64>,
    pub file_mod_time: chrono::NaiveDateTime,
}
impl Item {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_directory(&self) -> bool {
        self.kind == ItemKind::Directory
    }

    /// "directory" or the media classification of the item.
    pub fn media_type(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[derive(Insertable)]
#[table_name = "items"]
pub struct InsertFull<'a> {
    pub parent_id: Option<i64>,

    pub name: &'a str,
    pub path: &'a str,
    pub kind: ItemKind,
    pub mime_type: &'a str,

    pub views: i64,
    pub created_at: chrono::NaiveDateTime,
    pub created_by: Option<i64>,
    pub file_mod_time: chrono::NaiveDateTime,
}
