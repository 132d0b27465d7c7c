use super::*;

pub fn migrate(conn: &SqliteConnection) -> Result<()> {
    create_table_users(&conn)?;
    create_table_items(&conn)?;
    create_table_item_accessibilities(&conn)?;
    create_table_item_ratings(&conn)?;
    create_table_suggestions(&conn)?;

    Ok(())
}

// Principals known to the vault. They are managed by the authentication layer,
// we only mirror what is needed to seed and check permissions.
fn create_table_users(conn: &SqliteConnection) -> Result<()> {
    sql_query(
        "CREATE TABLE users(
                id                  INTEGER PRIMARY KEY NOT NULL,
                username            TEXT NOT NULL UNIQUE,
                is_administrator    INTEGER NOT NULL DEFAULT 0
             )",
    )
    .execute(conn)?;

    Ok(())
}

// A shared item is a directory or media file on disk.
// Items form a tree like structure by defining their parent_id,
// every item without a parent is a location that was shared explicitly.
fn create_table_items(conn: &SqliteConnection) -> Result<()> {
    sql_query(
        "CREATE TABLE items(
                id                  INTEGER PRIMARY KEY NOT NULL,
                parent_id           INTEGER,

                name                TEXT NOT NULL,
                path                TEXT NOT NULL,
                kind                INTEGER NOT NULL,
                mime_type           TEXT NOT NULL,

                views               INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                created_by          INTEGER,
                file_mod_time       TEXT NOT NULL,

                UNIQUE(parent_id, path),
                FOREIGN KEY(parent_id)      REFERENCES items(id),
                FOREIGN KEY(created_by)     REFERENCES users(id)
            )",
    )
    .execute(conn)?;

    Ok(())
}

// Explicit visibility of an item for a user.
// Administrators see everything, everybody else needs an entry with accessible = 1.
fn create_table_item_accessibilities(conn: &SqliteConnection) -> Result<()> {
    sql_query(
        "CREATE TABLE item_accessibilities(
                id              INTEGER PRIMARY KEY NOT NULL,
                item_id         INTEGER NOT NULL,
                user_id         INTEGER NOT NULL,
                accessible      INTEGER NOT NULL,

                UNIQUE(item_id, user_id),
                FOREIGN KEY(item_id)    REFERENCES items(id),
                FOREIGN KEY(user_id)    REFERENCES users(id)
            )",
    )
    .execute(conn)?;

    Ok(())
}

fn create_table_item_ratings(conn: &SqliteConnection) -> Result<()> {
    sql_query(
        "CREATE TABLE item_ratings(
                id              INTEGER PRIMARY KEY NOT NULL,
                item_id         INTEGER NOT NULL,
                user_id         INTEGER NOT NULL,
                rating          INTEGER NOT NULL,

                UNIQUE(item_id, user_id),
                FOREIGN KEY(item_id)    REFERENCES items(id),
                FOREIGN KEY(user_id)    REFERENCES users(id)
            )",
    )
    .execute(conn)?;

    Ok(())
}

// Suggestions are recommendation events, they are only ever appended.
fn create_table_suggestions(conn: &SqliteConnection) -> Result<()> {
    sql_query(
        "CREATE TABLE suggestions(
                id              INTEGER PRIMARY KEY NOT NULL,
                from_user_id    INTEGER NOT NULL,
                to_user_id      INTEGER NOT NULL,
                item_id         INTEGER NOT NULL,
                created_at      TEXT NOT NULL,

                FOREIGN KEY(from_user_id)   REFERENCES users(id),
                FOREIGN KEY(to_user_id)     REFERENCES users(id),
                FOREIGN KEY(item_id)        REFERENCES items(id)
            )",
    )
    .execute(conn)?;

    Ok(())
}
