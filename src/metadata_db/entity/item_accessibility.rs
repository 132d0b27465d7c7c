use super::schema::item_accessibilities;

#[derive(Debug, Queryable, Clone, PartialEq)]
pub struct ItemAccessibility {
    pub id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub accessible: bool,
}

#[derive(Insertable)]
#[table_name = "item_accessibilities"]
pub struct InsertFull {
    pub item_id: i64,
    pub user_id: i64,
    pub accessible: bool,
}
