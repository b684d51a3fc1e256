#![cfg(feature = "sqlite")]

use std::panic::{self, AssertUnwindSafe};

use sql_session::prelude::*;
use tempfile::TempDir;

#[derive(Debug)]
enum LeaseError {
    Db(SessionDbError),
    Overbooked,
}

impl From<SessionDbError> for LeaseError {
    fn from(e: SessionDbError) -> Self {
        LeaseError::Db(e)
    }
}

fn leases_db() -> Result<(TempDir, Database), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = Database::new(
        EngineKind::EmbeddedFile,
        ConnectionParameters::Embedded {
            path: dir.path().join("leases.db"),
        },
    )?;
    db.execute_script("CREATE TABLE leases (id INTEGER PRIMARY KEY, tenant TEXT NOT NULL);")?;
    Ok((dir, db))
}

fn lease_count(db: &Database) -> Result<i64, SessionDbError> {
    Ok(db
        .query_one("SELECT COUNT(*) AS n FROM leases", &[])?
        .and_then(|row| row.get("N").and_then(RowValues::as_int).copied())
        .unwrap_or_default())
}

#[test]
fn test04_error_rolls_back_and_is_returned_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    let outcome: Result<(), LeaseError> = db.transactional_scope(|conn| {
        let mut cursor = conn.cursor()?;
        cursor.execute("INSERT INTO leases (tenant) VALUES (?)", &["bruno".into()])?;
        Err(LeaseError::Overbooked)
    });

    assert!(matches!(outcome, Err(LeaseError::Overbooked)));
    assert_eq!(lease_count(&db)?, 0);
    let conn = db.get_connection()?;
    assert!(!conn.with(|c| c.in_transaction())?);
    Ok(())
}

#[test]
fn test04_ok_commits_and_is_visible_in_a_fresh_scope() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    let inserted = db.transactional_scope(|conn| {
        let mut cursor = conn.cursor()?;
        cursor.execute("INSERT INTO leases (tenant) VALUES (?)", &["carla".into()])?;
        Ok::<_, SessionDbError>(cursor.rowcount())
    })?;
    assert_eq!(inserted, 1);

    let seen = db.transactional_scope(|conn| {
        let mut cursor = conn.cursor()?;
        let row = cursor
            .execute("SELECT tenant FROM leases", &[])?
            .fetchone();
        Ok::<_, SessionDbError>(row.and_then(|r| r.get("TENANT").and_then(RowValues::as_text).map(str::to_string)))
    })?;
    assert_eq!(seen.as_deref(), Some("carla"));
    Ok(())
}

#[test]
fn test04_driver_error_inside_scope_propagates() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    let outcome = db.transactional_scope(|conn| {
        let mut cursor = conn.cursor()?;
        cursor.execute("INSERT INTO leases (tenant) VALUES (?)", &["dora".into()])?;
        cursor.execute("INSERT INTO leases (tenant) VALUES (?)", &[RowValues::Null])?;
        Ok::<_, SessionDbError>(())
    });

    assert!(matches!(outcome, Err(SessionDbError::SqliteError(_))));
    assert_eq!(lease_count(&db)?, 0);
    Ok(())
}

#[test]
fn test04_panic_inside_scope_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = db.transactional_scope(|conn| -> Result<(), SessionDbError> {
            let mut cursor = conn.cursor()?;
            cursor.execute("INSERT INTO leases (tenant) VALUES (?)", &["eli".into()])?;
            panic!("handler crashed mid-transaction")
        });
    }));

    assert!(result.is_err());
    assert_eq!(lease_count(&db)?, 0);
    Ok(())
}

#[test]
fn test04_nested_scope_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    let inner = db.transactional_scope(|conn| {
        let mut cursor = conn.cursor()?;
        cursor.execute("INSERT INTO leases (tenant) VALUES (?)", &["fay".into()])?;
        let nested = db.transactional_scope(|_| Ok::<_, SessionDbError>(()));
        Ok::<_, SessionDbError>(nested)
    })?;

    assert!(inner.unwrap_err().is_usage());
    // the outer scope still committed
    assert_eq!(lease_count(&db)?, 1);
    Ok(())
}

#[test]
fn test04_guard_supports_manual_control() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;
    let conn = db.get_connection()?;

    {
        let _guard = TransactionGuard::begin(&conn)?;
        conn.cursor()?
            .execute("INSERT INTO leases (tenant) VALUES (?)", &["gus".into()])?;
        // dropped without commit
    }
    assert_eq!(lease_count(&db)?, 0);

    let guard = TransactionGuard::begin(&conn)?;
    conn.cursor()?
        .execute("INSERT INTO leases (tenant) VALUES (?)", &["hana".into()])?;
    guard.commit()?;
    assert_eq!(lease_count(&db)?, 1);
    Ok(())
}

#[test]
fn test04_script_may_manage_its_own_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    db.execute_script(
        "BEGIN TRANSACTION;
         CREATE TABLE ledger (x INTEGER);
         INSERT INTO ledger VALUES (1);
         COMMIT;",
    )?;
    let count = db
        .query_one("SELECT COUNT(*) AS n FROM ledger", &[])?
        .and_then(|row| row.get("N").and_then(RowValues::as_int).copied());
    assert_eq!(count, Some(1));

    // a script that breaks after its own BEGIN leaves nothing pending
    let broken = db.execute_script(
        "BEGIN;
         INSERT INTO ledger VALUES (2);
         INSERT INTO missing_table VALUES (3);
         COMMIT;",
    );
    assert!(matches!(broken, Err(SessionDbError::SqliteError(_))));
    let conn = db.get_connection()?;
    assert!(!conn.with(|c| c.in_transaction())?);
    assert_eq!(db.query_all("SELECT x FROM ledger", &[])?.len(), 1);
    Ok(())
}

#[test]
fn test04_script_inside_a_scope_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, db) = leases_db()?;

    let inner = db.transactional_scope(|conn| {
        conn.cursor()?
            .execute("INSERT INTO leases (tenant) VALUES (?)", &["ivo".into()])?;
        Ok::<_, SessionDbError>(db.execute_script("INSERT INTO leases (tenant) VALUES ('jan');"))
    })?;

    assert!(inner.unwrap_err().is_usage());
    assert_eq!(lease_count(&db)?, 1);
    Ok(())
}
