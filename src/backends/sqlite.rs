//! SQLite backend implementation
//!
//! Implements the connection trait over bundled rusqlite. Parameters are
//! bound by name using SQLite's `@name` placeholder syntax; constraint
//! violations reported by the driver are surfaced as
//! [`DbError::ConstraintViolation`].

use crate::core::bind::NamedParams;
use crate::core::connection::{Connection, ConnectionFactory, CursorScope, IsolationLevel};
use crate::core::error::{DbError, Result};
use crate::core::materialize::Record;
use crate::core::statement::Dialect;
use crate::core::value::Value;
use rusqlite::types::{ToSqlOutput, ValueRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// SQLite connection speaking the [`Dialect::Sqlite`] statement shapes
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    in_transaction: bool,
}

impl SqliteConnection {
    /// Open a connection to a database file, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_rusqlite(rusqlite::Connection::open(path)?)
    }

    /// Open a connection to a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_rusqlite(rusqlite::Connection::open_in_memory()?)
    }

    fn from_rusqlite(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    fn bind(stmt: &mut rusqlite::Statement<'_>, params: &NamedParams) -> Result<()> {
        for (name, value) in params.iter() {
            let placeholder = format!("@{name}");
            let index = stmt
                .parameter_index(&placeholder)?
                .ok_or_else(|| {
                    DbError::query(format!("statement has no parameter named {placeholder}"))
                })?;
            stmt.raw_bind_parameter(index, value)?;
        }
        Ok(())
    }
}

/// Map driver faults, surfacing constraint violations under their own
/// error so plain inserts fail loudly and recognizably on duplicates
fn map_driver_error(err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return DbError::ConstraintViolation(err.to_string());
        }
    }
    DbError::Sqlite(err)
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as SqlValue;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            Value::Long(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v as f64)),
            Value::Double(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Uuid(u) => ToSqlOutput::Owned(SqlValue::Blob(u.as_bytes().to_vec())),
            Value::Timestamp(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Json(j) => ToSqlOutput::Owned(SqlValue::Text(j.to_string())),
        })
    }
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Long(v),
        ValueRef::Real(v) => Value::Double(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).to_string()),
        ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
    }
}

struct SqliteCursor<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    columns: Arc<[String]>,
}

impl crate::core::connection::RecordCursor for SqliteCursor<'_> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        match self.rows.next().map_err(map_driver_error)? {
            Some(row) => {
                let mut values = Vec::with_capacity(self.columns.len());
                for i in 0..self.columns.len() {
                    values.push(column_value(row.get_ref(i)?));
                }
                Ok(Some(Record::new(Arc::clone(&self.columns), values)))
            }
            None => Ok(None),
        }
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<u64> {
        let mut stmt = self.conn.prepare(sql)?;
        Self::bind(&mut stmt, params)?;
        let affected = stmt.raw_execute().map_err(map_driver_error)?;
        Ok(affected as u64)
    }

    fn with_cursor(
        &mut self,
        sql: &str,
        params: &NamedParams,
        scope: CursorScope<'_>,
    ) -> Result<()> {
        let mut stmt = self.conn.prepare(sql)?;
        Self::bind(&mut stmt, params)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into();
        let rows = stmt.raw_query();
        let mut cursor = SqliteCursor { rows, columns };
        scope(&mut cursor)
    }

    fn begin(&mut self, isolation: Option<IsolationLevel>) -> Result<()> {
        if self.in_transaction {
            return Err(DbError::transaction("already in a transaction"));
        }
        // SQLite transactions are always serializable; stricter levels map
        // to earlier lock acquisition.
        let sql = match isolation {
            Some(IsolationLevel::Serializable) => "BEGIN EXCLUSIVE TRANSACTION",
            Some(IsolationLevel::ReadCommitted) | Some(IsolationLevel::RepeatableRead) => {
                "BEGIN IMMEDIATE TRANSACTION"
            }
            Some(IsolationLevel::ReadUncommitted) | None => "BEGIN TRANSACTION",
        };
        self.conn.execute_batch(sql)?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DbError::transaction("not in a transaction"));
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DbError::transaction("not in a transaction"));
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

/// Factory producing independent SQLite connections.
///
/// A path-based factory opens the same database file on every call; the
/// in-memory variant yields a private, empty database per connection.
#[derive(Debug, Clone)]
pub struct SqliteFactory {
    path: Option<PathBuf>,
}

impl SqliteFactory {
    /// Factory over a database file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Factory over private in-memory databases
    pub fn in_memory() -> Self {
        Self { path: None }
    }
}

impl ConnectionFactory for SqliteFactory {
    type Conn = SqliteConnection;

    fn connect(&self) -> Result<SqliteConnection> {
        match &self.path {
            Some(path) => SqliteConnection::open(path),
            None => SqliteConnection::open_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interceptors::Interceptors;

    fn params(pairs: &[(&str, Value)]) -> NamedParams {
        let interceptors = Interceptors::new();
        let mut params = NamedParams::new();
        for (name, value) in pairs {
            params.bind(*name, value.clone(), &interceptors).unwrap();
        }
        params
    }

    #[test]
    fn test_execute_and_scalar() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)",
            &NamedParams::new(),
        )
        .unwrap();

        let affected = conn
            .execute(
                "INSERT INTO test (name) VALUES (@p0)",
                &params(&[("p0", Value::Text("Alice".into()))]),
            )
            .unwrap();
        assert_eq!(affected, 1);

        let count = conn
            .query_scalar("SELECT COUNT(*) FROM test", &NamedParams::new())
            .unwrap();
        assert_eq!(count, Value::Long(1));
    }

    #[test]
    fn test_cursor_preserves_column_order() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE test (a INTEGER, b TEXT)", &NamedParams::new())
            .unwrap();
        conn.execute(
            "INSERT INTO test (a, b) VALUES (1, 'x')",
            &NamedParams::new(),
        )
        .unwrap();

        conn.with_cursor(
            "SELECT b, a FROM test",
            &NamedParams::new(),
            &mut |cursor| {
                let record = cursor.next_record()?.unwrap();
                assert_eq!(record.columns(), ["b", "a"]);
                assert_eq!(record.value_at(0), Some(&Value::Text("x".into())));
                assert!(cursor.next_record()?.is_none());
                Ok(())
            },
        )
        .unwrap();
    }

    #[test]
    fn test_constraint_violation_is_surfaced() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test (id INTEGER PRIMARY KEY, v INTEGER)",
            &NamedParams::new(),
        )
        .unwrap();
        conn.execute(
            "INSERT INTO test (id, v) VALUES (1, 1)",
            &NamedParams::new(),
        )
        .unwrap();

        let err = conn
            .execute(
                "INSERT INTO test (id, v) VALUES (1, 2)",
                &NamedParams::new(),
            )
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }

    #[test]
    fn test_unknown_parameter_name_is_rejected() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE test (a INTEGER)", &NamedParams::new())
            .unwrap();
        let err = conn
            .execute(
                "INSERT INTO test (a) VALUES (@p0)",
                &params(&[("nope", Value::Int(1))]),
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[test]
    fn test_transaction_flag_tracking() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        assert!(!conn.in_transaction());
        conn.begin(None).unwrap();
        assert!(conn.in_transaction());
        assert!(matches!(
            conn.begin(None),
            Err(DbError::Transaction(_))
        ));
        conn.rollback().unwrap();
        assert!(!conn.in_transaction());
        assert!(matches!(conn.commit(), Err(DbError::Transaction(_))));
    }
}
