use super::schema::users;

/// A principal known to the vault.
///
/// Users are owned by the authentication layer, the vault only keeps the information
/// it needs to seed and check permissions.
#[derive(Debug, Queryable, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_administrator: bool,
}

#[derive(Insertable)]
#[table_name = "users"]
pub struct InsertFull<'a> {
    pub username: &'a str,
    pub is_administrator: bool,
}
