//! Read-only execution of generated statements against the fact table.
//!
//! The generated text is hostile input. Three independent gates apply: a
//! textual read-only/single-statement check, a connection opened read-only
//! with `query_only` set, and a store that contains nothing but the fact
//! table. The executor also caps materialized rows and bounds wall-clock
//! statement time, whatever the statement itself says.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

use crate::schema::RESULT_ROW_CAP;
use crate::sqlgen::GeneratedQuery;

const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(15);

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    fn from_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(v) => CellValue::Integer(v),
            ValueRef::Real(v) => CellValue::Real(v),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Text(format!("<{} byte blob>", b.len())),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Real(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Rows returned by one executed statement. Owned by the run that produced
/// it; never shared across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// The statement that produced these rows, verbatim.
    pub sql: String,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The statement does not begin with a read-only query keyword.
    #[error("statement is not a read-only query")]
    NotReadOnly,

    /// More than one statement in the generated text.
    #[error("statement contains multiple SQL statements")]
    MultipleStatements,

    /// The statement ran fine and matched nothing. Distinct terminal state,
    /// never an input to the insight step.
    #[error("query returned no rows")]
    NoRows,

    /// The statement exceeded the bounded execution time.
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("task join error: {0}")]
    Join(String),
}

/// Executes one statement per call against the analytical store.
///
/// Each call opens its own read-only connection, scoped to the call, and
/// releases it on every exit path.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    db_path: PathBuf,
    statement_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub async fn run(&self, query: &GeneratedQuery) -> Result<QueryResult, ExecutionError> {
        validate_statement(&query.sql)?;

        let path = self.db_path.clone();
        let limit = self.statement_timeout;
        let sql = query.sql.clone();
        let executed_sql = query.sql.clone();

        let (columns, rows) = tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| map_sqlite_error(e, limit))?;
            conn.execute_batch("PRAGMA query_only = ON;")
                .map_err(|e| map_sqlite_error(e, limit))?;

            // Watchdog: interrupt the statement if it outlives the bound.
            let handle = conn.get_interrupt_handle();
            let (done_tx, done_rx) = mpsc::channel::<()>();
            std::thread::spawn(move || {
                if matches!(done_rx.recv_timeout(limit), Err(RecvTimeoutError::Timeout)) {
                    handle.interrupt();
                }
            });

            let result = collect_rows(&conn, &sql);
            let _ = done_tx.send(());
            result.map_err(|e| map_sqlite_error(e, limit))
        })
        .await
        .map_err(|e| ExecutionError::Join(e.to_string()))??;

        if rows.is_empty() {
            return Err(ExecutionError::NoRows);
        }

        Ok(QueryResult {
            columns,
            rows,
            sql: executed_sql,
        })
    }
}

type Rows = (Vec<String>, Vec<Vec<CellValue>>);

fn collect_rows(conn: &Connection, sql: &str) -> Result<Rows, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut out = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        if out.len() >= RESULT_ROW_CAP {
            break;
        }
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(CellValue::from_ref(row.get_ref(i)?));
        }
        out.push(cells);
    }

    Ok((columns, out))
}

fn map_sqlite_error(err: rusqlite::Error, limit: Duration) -> ExecutionError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.code == rusqlite::ErrorCode::OperationInterrupted {
            return ExecutionError::Timeout(limit);
        }
    }
    ExecutionError::Sqlite(err)
}

/// Cheap textual gate: one statement, starting with a read-only keyword.
/// A trailing semicolon is tolerated; anything after one is not.
fn validate_statement(sql: &str) -> Result<(), ExecutionError> {
    let trimmed = sql.trim();
    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    if first != "SELECT" && first != "WITH" {
        return Err(ExecutionError::NotReadOnly);
    }
    if trimmed.trim_end_matches(';').contains(';') {
        return Err(ExecutionError::MultipleStatements);
    }
    Ok(())
}
