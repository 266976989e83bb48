//! Chunked multi-row insertion
//!
//! Partitions a sequence of heterogeneously-shaped sources into fixed-size
//! chunks and emits one multi-row INSERT per chunk. The column list of a
//! chunk is the union of its members' projections in first-seen order;
//! members lacking a column are inserted with the column's table default.

use super::bind::NamedParams;
use super::connection::Connection;
use super::error::{DbError, Result};
use super::interceptors::Interceptors;
use super::projection::{Filter, Projection, ValueSource};
use super::statement::{Dialect, Statement};

/// Build the statements inserting one chunk of projected members.
///
/// For a dialect accepting `DEFAULT` inside multi-row `VALUES` lists the
/// whole chunk becomes a single statement. SQLite has no such keyword, so a
/// chunk is emitted as consecutive runs of members sharing a column set,
/// which preserves both insertion order and per-row default semantics; a
/// member projecting no columns at all becomes `INSERT INTO t DEFAULT
/// VALUES`. Fails with [`DbError::EmptyBatch`] when the chunk's column union
/// is empty.
pub fn chunk_statements(
    dialect: Dialect,
    table: &str,
    members: &[Projection],
    interceptors: &Interceptors,
) -> Result<Vec<Statement>> {
    let mut union: Vec<&str> = Vec::new();
    for member in members {
        for column in member.columns() {
            if !union.contains(&column) {
                union.push(column);
            }
        }
    }
    if union.is_empty() {
        return Err(DbError::EmptyBatch);
    }

    if dialect.supports_values_default() {
        return Ok(vec![union_statement(table, &union, members, interceptors)?]);
    }

    let mut statements = Vec::new();
    let mut start = 0;
    while start < members.len() {
        let key = column_set(&members[start]);
        let mut end = start + 1;
        while end < members.len() && column_set(&members[end]) == key {
            end += 1;
        }
        run_statements(table, &members[start..end], interceptors, &mut statements)?;
        start = end;
    }
    Ok(statements)
}

/// One statement covering the whole chunk, missing columns filled with the
/// `DEFAULT` keyword
fn union_statement(
    table: &str,
    union: &[&str],
    members: &[Projection],
    interceptors: &Interceptors,
) -> Result<Statement> {
    let mut params = NamedParams::new();
    let mut counter = 0usize;
    let mut rows = String::new();
    for (r, member) in members.iter().enumerate() {
        if r > 0 {
            rows.push(',');
        }
        rows.push('(');
        for (c, column) in union.iter().enumerate() {
            if c > 0 {
                rows.push(',');
            }
            match member.get(column) {
                Some(value) => {
                    let name = format!("p{counter}");
                    counter += 1;
                    rows.push('@');
                    rows.push_str(&name);
                    params.bind(name, value.clone(), interceptors)?;
                }
                None => rows.push_str("DEFAULT"),
            }
        }
        rows.push(')');
    }
    Ok(Statement {
        sql: format!("INSERT INTO {table} ({}) VALUES {rows}", union.join(",")),
        params,
    })
}

/// Statements for a run of members sharing one column set. A run of empty
/// projections yields one all-defaults insert per member.
fn run_statements(
    table: &str,
    run: &[Projection],
    interceptors: &Interceptors,
    statements: &mut Vec<Statement>,
) -> Result<()> {
    if run[0].is_empty() {
        for _ in run {
            statements.push(Statement {
                sql: format!("INSERT INTO {table} DEFAULT VALUES"),
                params: NamedParams::new(),
            });
        }
        return Ok(());
    }

    let columns: Vec<&str> = run[0].columns().collect();
    let mut params = NamedParams::new();
    let mut counter = 0usize;
    let mut rows = String::new();
    for (r, member) in run.iter().enumerate() {
        if r > 0 {
            rows.push(',');
        }
        rows.push('(');
        for (c, column) in columns.iter().enumerate() {
            if c > 0 {
                rows.push(',');
            }
            let value = member
                .get(column)
                .cloned()
                .ok_or_else(|| DbError::query(format!("batch member lost column {column}")))?;
            let name = format!("p{counter}");
            counter += 1;
            rows.push('@');
            rows.push_str(&name);
            params.bind(name, value, interceptors)?;
        }
        rows.push(')');
    }
    statements.push(Statement {
        sql: format!("INSERT INTO {table} ({}) VALUES {rows}", columns.join(",")),
        params,
    });
    Ok(())
}

fn column_set(projection: &Projection) -> Vec<&str> {
    let mut columns: Vec<&str> = projection.columns().collect();
    columns.sort_unstable();
    columns
}

/// Chunk the batch and execute the resulting inserts, accumulating the
/// affected-row total. A chunk size below one means the whole batch is one
/// chunk. Fails with [`DbError::EmptyBatch`] before touching the database
/// when the input is empty.
pub(crate) fn save_batch_on<S, I>(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    table: &str,
    batch: I,
    chunk_size: usize,
    filter: Option<&Filter>,
) -> Result<u64>
where
    I: IntoIterator<Item = S>,
    S: ValueSource,
{
    let dialect = conn.dialect();
    let mut total = 0u64;
    let mut seen_any = false;
    let mut chunk: Vec<Projection> = Vec::new();
    for member in batch {
        seen_any = true;
        if chunk_size >= 1 && chunk.len() >= chunk_size {
            total += flush_chunk(conn, interceptors, dialect, table, &chunk)?;
            chunk.clear();
        }
        chunk.push(Projection::from_source(&member, filter));
    }
    if !seen_any {
        return Err(DbError::EmptyBatch);
    }
    if !chunk.is_empty() {
        total += flush_chunk(conn, interceptors, dialect, table, &chunk)?;
    }
    Ok(total)
}

fn flush_chunk(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    dialect: Dialect,
    table: &str,
    members: &[Projection],
) -> Result<u64> {
    let mut affected = 0u64;
    for statement in chunk_statements(dialect, table, members, interceptors)? {
        affected += conn.execute(&statement.sql, &statement.params)?;
    }
    Ok(affected)
}
