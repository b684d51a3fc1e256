use sql_session::prelude::*;
use sql_session::{CANONICAL_PLACEHOLDER, rewrite, split_statements};

#[test]
fn test03_marker_lands_where_the_canonical_one_was() {
    let sql = "SELECT * FROM t WHERE id = ?";
    let at = sql.find(CANONICAL_PLACEHOLDER).unwrap();

    let embedded = rewrite(sql, EngineKind::EmbeddedFile);
    assert_eq!(&embedded[at..], "?");

    let networked = rewrite(sql, EngineKind::NetworkServer);
    assert_eq!(&networked[at..], "$1");
    assert_eq!(&networked[..at], &sql[..at]);
}

#[test]
fn test03_literals_and_comments_are_left_alone() {
    let sql = "SELECT '?' AS q, name -- who?\nFROM persons WHERE a = ? /* or ? */ AND b = ?";
    assert_eq!(
        rewrite(sql, EngineKind::NetworkServer),
        "SELECT '?' AS q, name -- who?\nFROM persons WHERE a = $1 /* or ? */ AND b = $2"
    );
}

#[test]
fn test03_dialect_literals() {
    assert_eq!(EngineKind::EmbeddedFile.boolean_literal(true), "1");
    assert_eq!(EngineKind::NetworkServer.boolean_literal(false), "FALSE");
    assert_eq!(EngineKind::NetworkServer.placeholder(3), "$3");
    assert_eq!(EngineKind::EmbeddedFile.placeholder(3), "?");
}

#[test]
fn test03_scripts_split_outside_literals() {
    let parts = split_statements("CREATE TABLE a (v TEXT DEFAULT ';'); -- done;\nINSERT INTO a VALUES ('x');");
    assert_eq!(parts.len(), 2);
    assert!(parts[0].contains("DEFAULT ';'"));
    assert!(parts[1].starts_with("-- done;"));
    assert!(parts[1].ends_with("VALUES ('x')"));
}

#[cfg(feature = "sqlite")]
#[test]
fn test03_rewritten_query_finds_the_row_on_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = Database::new(
        EngineKind::EmbeddedFile,
        ConnectionParameters::Embedded {
            path: dir.path().join("rewrite.db"),
        },
    )?;
    db.execute_script(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT);
         INSERT INTO t (id, note) VALUES (1, 'first?'), (2, 'second');",
    )?;

    let row = db
        .query_one("SELECT note FROM t WHERE id = ?", &[2_i64.into()])?
        .expect("row 2");
    assert_eq!(row.get("NOTE").and_then(RowValues::as_text), Some("second"));

    let conn = db.get_connection()?;
    let mut cursor = db.get_cursor(&conn)?;
    let query = db
        .sql_builder()
        .sql("SELECT id FROM t WHERE note = '?' OR note = ")
        .bind("first?")
        .build(db.engine_kind());
    let ids: Vec<i64> = cursor
        .execute_built(&query)?
        .filter_map(|row| row.get("ID").and_then(RowValues::as_int).copied())
        .collect();
    assert_eq!(ids, [1]);

    let other = SqlBuilder::new().sql("SELECT 1").build(EngineKind::NetworkServer);
    assert!(cursor.execute_built(&other).unwrap_err().is_usage());
    Ok(())
}
