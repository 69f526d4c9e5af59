use novelkit_core::db::migrations::{
    apply_migrations, current_user_version, latest_version, pending_migrations,
};
use novelkit_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    for table in ["projects", "chapters", "scenes", "entities", "relations"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn pending_steps_are_listed_until_applied() {
    let mut conn = Connection::open_in_memory().unwrap();
    assert_eq!(
        pending_migrations(&conn).unwrap(),
        vec!["manuscript", "relation_graph"]
    );

    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    assert_eq!(pending_migrations(&conn).unwrap(), vec!["relation_graph"]);

    conn.execute_batch("PRAGMA user_version = 0;").unwrap();
    apply_migrations(&mut conn).unwrap();
    assert!(pending_migrations(&conn).unwrap().is_empty());
    assert_table_exists(&conn, "relations");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("novel.db");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO projects (uuid, title) VALUES ('p-1', 'Roman');",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(current_user_version(&second).unwrap(), latest_version());
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO chapters (uuid, project_uuid, title) VALUES ('c-1', 'missing', 'Eins');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn relation_strength_is_checked_by_schema() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO projects (uuid, title) VALUES ('p', 'Roman');
         INSERT INTO entities (uuid, project_uuid, kind, name) VALUES ('a', 'p', 'character', 'Anna');
         INSERT INTO entities (uuid, project_uuid, kind, name) VALUES ('b', 'p', 'character', 'Ben');",
    )
    .unwrap();

    let too_strong = conn.execute(
        "INSERT INTO relations (owner_uuid, slot, to_uuid, type, strength) VALUES ('a', 0, 'b', 'Freund', 9);",
        [],
    );
    assert!(too_strong.is_err());

    let self_edge = conn.execute(
        "INSERT INTO relations (owner_uuid, slot, to_uuid, type, strength) VALUES ('a', 0, 'a', 'Freund', 3);",
        [],
    );
    assert!(self_edge.is_err());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
