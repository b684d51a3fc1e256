#![cfg(feature = "sqlite")]

use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;

use sql_session::prelude::*;
use tempfile::TempDir;

fn embedded_db() -> Result<(TempDir, Database), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = Database::new(
        EngineKind::EmbeddedFile,
        ConnectionParameters::Embedded {
            path: dir.path().join("registry.db"),
        },
    )?;
    Ok((dir, db))
}

#[test]
fn test01_threads_never_share_a_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = embedded_db()?;
    let workers = 4;
    let barrier = Barrier::new(workers);

    let ids = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| -> Result<u64, SessionDbError> {
                    // every worker asks at the same moment
                    barrier.wait();
                    let first = db.get_connection()?;
                    let again = db.get_connection()?;
                    assert_eq!(first.id(), again.id());
                    let mut cursor = db.get_cursor(&first)?;
                    cursor.execute("SELECT 1 AS x", &[])?;
                    Ok(first.id())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect::<Result<HashSet<u64>, SessionDbError>>()
    })?;

    assert_eq!(ids.len(), workers);
    assert_eq!(db.stats().open_sessions, workers);
    Ok(())
}

#[test]
fn test01_same_thread_gets_the_same_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (dir, db) = embedded_db()?;
    let first = db.get_connection()?;
    let second = db.get_connection()?;
    assert_eq!(first.id(), second.id());
    assert_eq!(first.owner(), thread::current().id());
    assert_eq!(db.stats().reconnects, 0);

    first.with(|c| c.ping())??;
    let path = first.with(|c| c.as_sqlite_mut().map(|s| s.path().to_path_buf()))?;
    assert_eq!(path.as_deref(), Some(dir.path().join("registry.db").as_path()));
    assert_eq!(first.with(|c| c.kind())?, EngineKind::EmbeddedFile);
    Ok(())
}

#[test]
fn test01_close_all_resets_the_registry() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = embedded_db()?;
    let conn = db.get_connection()?;
    let mut cursor = db.get_cursor(&conn)?;

    assert_eq!(db.close_all(), 1);
    assert_eq!(db.stats().open_sessions, 0);
    assert!(!conn.is_open());
    assert!(matches!(
        cursor.execute("SELECT 1", &[]),
        Err(SessionDbError::ConnectionError(_))
    ));

    let fresh = db.get_connection()?;
    assert_ne!(fresh.id(), conn.id());
    assert_eq!(
        db.query_one("SELECT 2 AS two", &[])?
            .and_then(|row| row.get("TWO").and_then(RowValues::as_int).copied()),
        Some(2)
    );
    Ok(())
}

#[test]
fn test01_users_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = embedded_db()?;
    db.execute_script("CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);")?;

    let conn = db.get_connection()?;
    let mut cursor = db.get_cursor(&conn)?;
    db.transactional_scope(|_| {
        cursor.execute("INSERT INTO users (name) VALUES (?)", &["ana".into()])?;
        Ok::<_, SessionDbError>(())
    })?;

    let count = db
        .query_one("SELECT COUNT(*) AS n FROM users", &[])?
        .and_then(|row| row.get("N").and_then(RowValues::as_int).copied());
    assert_eq!(count, Some(1));

    let id = db.last_insert_id(&cursor, Some("users"), Some("id"))?;
    let stored = db
        .query_one("SELECT id FROM users WHERE name = ?", &["ana".into()])?
        .and_then(|row| row.get("ID").and_then(RowValues::as_int).copied());
    assert_eq!(stored, Some(id));
    Ok(())
}
