#![cfg(feature = "sqlite")]

use sql_session::prelude::*;

#[test]
fn test05_embedded_identity_matches_the_new_key() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = Database::new(
        EngineKind::EmbeddedFile,
        ConnectionParameters::Embedded {
            path: dir.path().join("identity.db"),
        },
    )?;
    db.execute_script(
        "CREATE TABLE persons (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
         INSERT INTO persons (name) VALUES ('seed-1'), ('seed-2');",
    )?;

    let conn = db.get_connection()?;
    let mut cursor = db.get_cursor(&conn)?;

    // no insert yet on this cursor
    assert!(db.last_insert_id(&cursor, None, None).unwrap_err().is_usage());

    cursor.execute("INSERT INTO persons (name) VALUES (?)", &["ines".into()])?;
    let id = db.last_insert_id(&cursor, None, None)?;
    assert_eq!(cursor.lastrowid(), Some(id));

    let row = db
        .query_one("SELECT id FROM persons WHERE name = ?", &["ines".into()])?
        .expect("inserted person");
    assert_eq!(row.get("ID").and_then(RowValues::as_int), Some(&id));
    assert_eq!(id, 3);

    // a later select keeps the captured id
    cursor.execute("SELECT COUNT(*) FROM persons", &[])?;
    assert_eq!(db.last_insert_id(&cursor, Some("persons"), Some("id"))?, 3);
    Ok(())
}

#[test]
fn test05_commented_insert_refreshes_the_identity() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = Database::new(
        EngineKind::EmbeddedFile,
        ConnectionParameters::Embedded {
            path: dir.path().join("tenants.db"),
        },
    )?;
    db.execute_script("CREATE TABLE tenants (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);")?;

    let conn = db.get_connection()?;
    let mut cursor = db.get_cursor(&conn)?;
    cursor.execute("INSERT INTO tenants (name) VALUES (?)", &["a".into()])?;
    assert_eq!(db.last_insert_id(&cursor, None, None)?, 1);

    cursor.execute("-- second tenant\nINSERT INTO tenants (name) VALUES (?)", &["b".into()])?;
    let b_id = db
        .query_one("SELECT id FROM tenants WHERE name = ?", &["b".into()])?
        .and_then(|row| row.get("ID").and_then(RowValues::as_int).copied());
    assert_eq!(b_id, Some(2));
    assert_eq!(db.last_insert_id(&cursor, None, None)?, 2);

    cursor.execute(
        "WITH src(name) AS (VALUES (?)) INSERT INTO tenants (name) SELECT name FROM src",
        &["c".into()],
    )?;
    assert_eq!(cursor.lastrowid(), Some(3));
    Ok(())
}
