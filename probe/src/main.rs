mod args;
mod logging;

use std::error::Error;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use serde_json::{Value, json};
use sql_session::prelude::*;
use tracing::{Level, error, info};

use crate::args::{Args, Command};
use crate::logging::LogWriter;

fn main() -> ExitCode {
    let args = Args::parse();
    let writer = LogWriter::new(args.log.clone()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "probe failed");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(args: &Args) -> Result<DatabaseSettings, Box<dyn Error>> {
    let mut settings = match &args.settings {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => DatabaseSettings::from_env()?,
    };
    if let Some(mode) = args.mode {
        settings.mode = Some(mode);
    }
    Ok(settings)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let db = Database::from_settings(&load_settings(&args)?)?;
    info!("config: {}", serde_json::to_string(&db.info())?);

    match args.command {
        Command::Info => {
            println!("{}", serde_json::to_string_pretty(&db.info())?);
        }
        Command::Ping { threads } => ping(&db, threads.max(1))?,
        Command::Script { path } => {
            let started = Instant::now();
            let script = std::fs::read_to_string(&path)?;
            db.execute_script(&script)?;
            info!(path = %path.display(), elapsed = ?started.elapsed(), "script applied");
        }
        Command::Query { sql, params } => {
            let params: Vec<RowValues> = params.into_iter().map(RowValues::Text).collect();
            let rows: Vec<Value> = db
                .query_all(&sql, &params)?
                .iter()
                .map(row_to_json)
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    db.close_all();
    Ok(())
}

fn ping(db: &Database, threads: usize) -> Result<(), SessionDbError> {
    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| -> Result<(u64, Duration), SessionDbError> {
                    let started = Instant::now();
                    let conn = db.get_connection()?;
                    db.get_cursor(&conn)?.execute("SELECT 1 AS ok", &[])?;
                    let id = conn.id();
                    drop(conn);
                    db.release_connection();
                    Ok((id, started.elapsed()))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(SessionDbError::ConnectionError("ping worker panicked".into()))
                })
            })
            .collect::<Vec<_>>()
    });

    for result in results {
        let (session, elapsed) = result?;
        info!(session, ?elapsed, "ping ok");
    }
    let stats = db.stats();
    info!(
        open_sessions = stats.open_sessions,
        reconnects = stats.reconnects,
        "registry"
    );
    Ok(())
}

fn row_to_json(row: &NormalizedRow) -> Value {
    let map = row
        .iter()
        .map(|(name, value)| (name.to_string(), value_to_json(value)))
        .collect();
    Value::Object(map)
}

fn value_to_json(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => json!(i),
        RowValues::Float(f) => json!(f),
        RowValues::Text(s) => json!(s),
        RowValues::Bool(b) => json!(b),
        RowValues::Timestamp(ts) => json!(ts.to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(v) => v.clone(),
        RowValues::Blob(bytes) => json!(format!("<{} bytes>", bytes.len())),
    }
}
