use super::schema::item_ratings;

#[derive(Debug, Queryable, Clone, PartialEq)]
pub struct ItemRating {
    pub id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub rating: i32,
}

#[derive(Insertable)]
#[table_name = "item_ratings"]
pub struct InsertFull {
    pub item_id: i64,
    pub user_id: i64,
    pub rating: i32,
}
