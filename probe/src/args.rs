use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sql_session::EngineKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check sql-session connectivity and run scripts")]
pub(crate) struct Args {
    /// JSON settings file; when absent, settings come from `.env` and the environment.
    #[arg(long, global = true)]
    pub(crate) settings: Option<PathBuf>,
    /// Override the mode flag; a postgres `DATABASE_URL` still wins.
    #[arg(long, value_enum, global = true)]
    pub(crate) mode: Option<EngineKind>,
    /// Tee log output into this file.
    #[arg(long, global = true)]
    pub(crate) log: Option<PathBuf>,
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Print the resolved configuration (never the password).
    Info,
    /// Open a session per worker thread and round-trip `SELECT 1` on each.
    Ping {
        #[arg(long, default_value_t = 1)]
        threads: usize,
    },
    /// Run a schema or data script.
    Script { path: PathBuf },
    /// Run a query written with `?` placeholders and print the rows as JSON.
    Query {
        sql: String,
        /// Text parameters, bound in order.
        #[arg(long = "param")]
        params: Vec<String>,
    },
}
