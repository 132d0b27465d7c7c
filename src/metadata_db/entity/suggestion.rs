use super::schema::suggestions;

#[derive(Debug, Queryable, Clone, PartialEq)]
pub struct Suggestion {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub item_id: i64,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "suggestions"]
pub struct InsertFull {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub item_id: i64,
    pub created_at: chrono::NaiveDateTime,
}
