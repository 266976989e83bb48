//! Row materialization
//!
//! Converts a driver row cursor into records: either the generic ordered
//! field-map preserving cursor column order, or a strongly-typed value via
//! [`FromRecord`]. Also hosts every read shape layered on the streaming
//! primitive: collect-all, first-row, visit-with-early-stop, and the scoped
//! lazy stream.

use super::bind::NamedParams;
use super::connection::{Connection, RecordCursor};
use super::error::{DbError, Result};
use super::interceptors::Interceptors;
use super::projection::ValueSource;
use super::value::Value;
use std::sync::Arc;

/// The materialized result of one row: an ordered column-to-value mapping
/// preserving the cursor's column order. Column names are shared across all
/// records of one cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Assemble a record from a cursor's column names and one row of values
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// The column names in cursor order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get a value by exact column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Get a value by case-insensitive column name
    ///
    /// This is the lookup typed materialization uses; unmatched names are
    /// simply `None` so the target's field keeps its default.
    pub fn opt(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    /// Get a value by case-insensitive column name, or fail with
    /// [`DbError::ColumnNotFound`]
    pub fn field(&self, column: &str) -> Result<&Value> {
        self.opt(column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string()))
    }

    /// Get a value by position in cursor order
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Iterate (column, value) pairs in cursor order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A record round-trips as a source, so a read row can be written back
impl ValueSource for Record {
    fn fields(&self) -> Vec<(String, Value)> {
        self.iter().map(|(n, v)| (n.to_string(), v.clone())).collect()
    }
}

/// Strongly-typed materialization of one record.
///
/// Implementations match their fields against columns case-insensitively
/// via [`Record::opt`]/[`Record::field`], ignore columns they do not know,
/// and default fields without a matching column:
///
/// ```
/// use sqlbag::core::error::Result;
/// use sqlbag::core::materialize::{FromRecord, Record};
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRecord for User {
///     fn from_record(record: &Record) -> Result<Self> {
///         Ok(Self {
///             id: record.field("Id")?.as_long().unwrap_or_default(),
///             name: record.opt("Name").map(|v| v.as_string()).unwrap_or_default(),
///         })
///     }
/// }
/// ```
pub trait FromRecord: Sized {
    /// Build a value from one materialized record
    fn from_record(record: &Record) -> Result<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(record.clone())
    }
}

/// The lazy, single-pass, non-restartable record sequence handed to a
/// streaming read's scope closure. The underlying cursor and connection
/// stay open until the scope exits.
pub struct Records<'a> {
    cursor: &'a mut dyn RecordCursor,
}

impl<'a> Records<'a> {
    pub(crate) fn new(cursor: &'a mut dyn RecordCursor) -> Self {
        Self { cursor }
    }

    /// Advance to the next record, or `None` at end of data
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        self.cursor.next_record()
    }

    /// Advance and materialize the next record as `T`
    pub fn next_as<T: FromRecord>(&mut self) -> Result<Option<T>> {
        match self.next_record()? {
            Some(record) => Ok(Some(T::from_record(&record)?)),
            None => Ok(None),
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Run a query and hand the scoped lazy stream to `scope`
pub(crate) fn read_stream_on<R>(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    query: &str,
    parameters: &dyn ValueSource,
    scope: impl FnOnce(&mut Records<'_>) -> Result<R>,
) -> Result<R> {
    let params = NamedParams::from_source(parameters, interceptors)?;
    let mut scope = Some(scope);
    let mut out = None;
    conn.with_cursor(query, &params, &mut |cursor| {
        if let Some(scope) = scope.take() {
            let mut records = Records::new(cursor);
            out = Some(scope(&mut records)?);
        }
        Ok(())
    })?;
    out.ok_or_else(|| DbError::query("driver produced no row cursor"))
}

/// Visit records in cursor order while `visit` returns true; later rows are
/// left unread after the first false
pub(crate) fn for_each_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    query: &str,
    parameters: &dyn ValueSource,
    mut visit: impl FnMut(Record) -> Result<bool>,
) -> Result<()> {
    read_stream_on(conn, interceptors, query, parameters, |records| {
        while let Some(record) = records.next_record()? {
            if !visit(record)? {
                break;
            }
        }
        Ok(())
    })
}

/// Materialize every row of a query
pub(crate) fn read_all_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    query: &str,
    parameters: &dyn ValueSource,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for_each_on(conn, interceptors, query, parameters, |record| {
        records.push(record);
        Ok(true)
    })?;
    Ok(records)
}

/// Materialize the first row of a query, or `None` for an empty cursor
pub(crate) fn read_one_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    query: &str,
    parameters: &dyn ValueSource,
) -> Result<Option<Record>> {
    read_stream_on(conn, interceptors, query, parameters, |records| {
        records.next_record()
    })
}

/// Materialize every row of a query as `T`
pub(crate) fn read_all_as_on<T: FromRecord>(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    query: &str,
    parameters: &dyn ValueSource,
) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for_each_on(conn, interceptors, query, parameters, |record| {
        rows.push(T::from_record(&record)?);
        Ok(true)
    })?;
    Ok(rows)
}

/// Materialize the first row of a query as `T`
pub(crate) fn read_one_as_on<T: FromRecord>(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    query: &str,
    parameters: &dyn ValueSource,
) -> Result<Option<T>> {
    read_stream_on(conn, interceptors, query, parameters, |records| {
        records.next_as::<T>()
    })
}
