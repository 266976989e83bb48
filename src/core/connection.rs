//! Connection abstraction
//!
//! This module defines the capability set a database driver must expose for
//! the layer to drive it: execute a statement with named parameters, stream
//! a row cursor, return a scalar, and control transactions. Any relational
//! driver implementing [`Connection`] is pluggable.

use super::bind::NamedParams;
use super::error::Result;
use super::materialize::Record;
use super::statement::Dialect;
use super::value::Value;

/// Transaction isolation levels requested at begin time.
///
/// Absent a value, the driver's default isolation is used. How each level
/// maps onto a concrete driver is the backend's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Reads may observe uncommitted changes
    ReadUncommitted,
    /// Reads observe only committed changes
    ReadCommitted,
    /// Repeated reads within the transaction are stable
    RepeatableRead,
    /// Full serializable isolation
    Serializable,
}

/// One pass over a result set, a record at a time
pub trait RecordCursor {
    /// Advance to the next row, or `None` at end of data
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Scope callback handed a live row cursor by [`Connection::with_cursor`]
pub type CursorScope<'a> = &'a mut dyn FnMut(&mut dyn RecordCursor) -> Result<()>;

/// Core connection trait every database backend implements.
///
/// All calls block the calling thread until the driver returns; the layer
/// adds no internal threads and no retry logic. A connection is exclusively
/// owned by the call or scope that opened it.
pub trait Connection {
    /// The SQL dialect this connection speaks
    fn dialect(&self) -> Dialect;

    /// Execute a statement that returns no rows, yielding the affected-row
    /// count reported by the driver
    fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<u64>;

    /// Run a query and hand a live cursor to `scope`.
    ///
    /// The cursor is lazy, single-pass and non-restartable; it stays open
    /// exactly for the duration of the callback. This is the one streaming
    /// primitive a backend must provide; every read shape is layered on it.
    fn with_cursor(&mut self, sql: &str, params: &NamedParams, scope: CursorScope<'_>)
        -> Result<()>;

    /// Run a query and return the first column of the first row, or
    /// [`Value::Null`] when the cursor yields no rows
    fn query_scalar(&mut self, sql: &str, params: &NamedParams) -> Result<Value> {
        let mut scalar = Value::Null;
        self.with_cursor(sql, params, &mut |cursor| {
            if let Some(record) = cursor.next_record()? {
                scalar = record.value_at(0).cloned().unwrap_or(Value::Null);
            }
            Ok(())
        })?;
        Ok(scalar)
    }

    /// Begin a transaction, requesting an isolation level when given
    fn begin(&mut self, isolation: Option<IsolationLevel>) -> Result<()>;

    /// Commit the current transaction
    fn commit(&mut self) -> Result<()>;

    /// Rollback the current transaction
    fn rollback(&mut self) -> Result<()>;

    /// Check if currently in a transaction
    fn in_transaction(&self) -> bool;
}

/// Producer of fresh connections.
///
/// Every factory-level entry point opens an independent connection, runs its
/// operation, and releases the connection on every exit path.
pub trait ConnectionFactory {
    /// The connection type this factory produces
    type Conn: Connection;

    /// Open a fresh connection
    fn connect(&self) -> Result<Self::Conn>;
}

/// Any `Fn() -> Result<C>` closure is a connection factory
impl<C, F> ConnectionFactory for F
where
    C: Connection,
    F: Fn() -> Result<C>,
{
    type Conn = C;

    fn connect(&self) -> Result<C> {
        self()
    }
}
