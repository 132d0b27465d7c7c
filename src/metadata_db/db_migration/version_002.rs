use super::*;

pub fn migrate(conn: &SqliteConnection) -> Result<()> {
    create_index_item_parent(&conn)?;
    create_index_root_item_path(&conn)?;
    create_index_accessibility_user(&conn)?;
    create_index_suggestion_receiver(&conn)?;

    Ok(())
}

// Children are looked up by their parent all the time (tree walks, listings).
fn create_index_item_parent(conn: &SqliteConnection) -> Result<()> {
    sql_query("CREATE INDEX item_parent_idx ON items(parent_id, name)").execute(conn)?;
    Ok(())
}

// UNIQUE(parent_id, path) does not cover roots, as NULL never equals NULL in SQLite.
fn create_index_root_item_path(conn: &SqliteConnection) -> Result<()> {
    sql_query("CREATE UNIQUE INDEX item_root_path_idx ON items(path) WHERE parent_id IS NULL")
        .execute(conn)?;
    Ok(())
}

fn create_index_accessibility_user(conn: &SqliteConnection) -> Result<()> {
    sql_query("CREATE INDEX item_accessibility_user_idx ON item_accessibilities(user_id)")
        .execute(conn)?;
    Ok(())
}

fn create_index_suggestion_receiver(conn: &SqliteConnection) -> Result<()> {
    sql_query("CREATE INDEX suggestion_receiver_idx ON suggestions(to_user_id, created_at)")
        .execute(conn)?;
    Ok(())
}
