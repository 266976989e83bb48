//! Statement synthesis
//!
//! Builds the four mutating statement kinds (insert, upsert, update, delete)
//! and the raw passthrough command from a projection, with sequentially
//! named parameters (`p0`, `p1`, …) bound in projection order. Statement
//! text is deterministic for a given projection.

use super::bind::NamedParams;
use super::connection::Connection;
use super::error::{DbError, Result};
use super::interceptors::Interceptors;
use super::projection::{project, Filter, ValueSource};
use serde::{Deserialize, Serialize};

/// SQL dialects the synthesizer can target.
///
/// The dialect decides the conflict-resolution clause used by upserts, the
/// last-inserted-identity query, and whether multi-row `VALUES` lists accept
/// the `DEFAULT` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// SQLite
    #[default]
    Sqlite,
    /// MySQL/MariaDB
    Mysql,
}

impl Dialect {
    /// Convert dialect to string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
        }
    }

    /// The scalar query retrieving the identity generated by the last
    /// insert on the same connection
    pub fn last_insert_id_query(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "SELECT last_insert_rowid()",
            Dialect::Mysql => "SELECT LAST_INSERT_ID()",
        }
    }

    /// Whether a multi-row `VALUES` list may carry the `DEFAULT` keyword
    pub(crate) fn supports_values_default(&self) -> bool {
        matches!(self, Dialect::Mysql)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// A synthesized statement: SQL text plus its bound parameter list.
///
/// Created immediately before execution, executed exactly once, discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// The statement text, with `@name` placeholders
    pub sql: String,
    /// The named parameters bound to the text
    pub params: NamedParams,
}

/// Bind a source's properties onto arbitrary statement text, for callers
/// who write raw SQL
pub fn command(
    text: &str,
    parameters: &dyn ValueSource,
    interceptors: &Interceptors,
) -> Result<Statement> {
    Ok(Statement {
        sql: text.to_string(),
        params: NamedParams::from_source(parameters, interceptors)?,
    })
}

/// Build `INSERT INTO table (cols) VALUES (@p0,@p1,…)` from a filtered
/// source. Fails with [`DbError::EmptyProjection`] when nothing projects.
pub fn insert(
    table: &str,
    values: &dyn ValueSource,
    filter: Option<&Filter>,
    interceptors: &Interceptors,
) -> Result<Statement> {
    let projection = project(values, filter)?;
    let mut params = NamedParams::new();
    let mut columns = String::new();
    let mut placeholders = String::new();
    for (i, (column, value)) in projection.into_entries().into_iter().enumerate() {
        if i > 0 {
            columns.push(',');
            placeholders.push(',');
        }
        let name = format!("p{i}");
        columns.push_str(&column);
        placeholders.push('@');
        placeholders.push_str(&name);
        params.bind(name, value, interceptors)?;
    }
    Ok(Statement {
        sql: format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"),
        params,
    })
}

/// Build an insert-or-update-on-conflict statement.
///
/// Whether or not a conflicting row existed, exactly one row matching the
/// source's key remains afterwards, with the full projected column set
/// overwritten. MySQL gets the `ON DUPLICATE KEY UPDATE` clause setting
/// every projected column; SQLite, whose update clause would need an
/// explicit conflict target, gets `INSERT OR REPLACE`.
pub fn upsert(
    dialect: Dialect,
    table: &str,
    values: &dyn ValueSource,
    filter: Option<&Filter>,
    interceptors: &Interceptors,
) -> Result<Statement> {
    let projection = project(values, filter)?;
    let mut params = NamedParams::new();
    let mut columns = String::new();
    let mut placeholders = String::new();
    let mut updates = String::new();
    for (i, (column, value)) in projection.into_entries().into_iter().enumerate() {
        if i > 0 {
            columns.push(',');
            placeholders.push(',');
            updates.push(',');
        }
        let name = format!("p{i}");
        columns.push_str(&column);
        placeholders.push('@');
        placeholders.push_str(&name);
        updates.push_str(&format!("{column}=@{name}"));
        params.bind(name, value, interceptors)?;
    }
    let sql = match dialect {
        Dialect::Mysql => format!(
            "INSERT INTO {table} ({columns}) VALUES ({placeholders}) ON DUPLICATE KEY UPDATE {updates}"
        ),
        Dialect::Sqlite => {
            format!("INSERT OR REPLACE INTO {table} ({columns}) VALUES ({placeholders})")
        }
    };
    Ok(Statement { sql, params })
}

/// Build `UPDATE table SET col=@p0,… WHERE where_clause`.
///
/// The caller's where parameters are bound by their own property names in
/// addition to the synthesized `pN` set names; a name collision between the
/// two is rejected rather than silently shadowed.
pub fn update(
    table: &str,
    values: &dyn ValueSource,
    where_clause: &str,
    where_params: &dyn ValueSource,
    filter: Option<&Filter>,
    interceptors: &Interceptors,
) -> Result<Statement> {
    let projection = project(values, filter)?;
    let mut params = NamedParams::new();
    let mut assignments = String::new();
    for (i, (column, value)) in projection.into_entries().into_iter().enumerate() {
        if i > 0 {
            assignments.push(',');
        }
        let name = format!("p{i}");
        assignments.push_str(&format!("{column}=@{name}"));
        params.bind(name, value, interceptors)?;
    }
    params.bind_source(where_params, interceptors)?;
    Ok(Statement {
        sql: format!("UPDATE {table} SET {assignments} WHERE {where_clause}"),
        params,
    })
}

/// Build `DELETE FROM table WHERE where_clause`
pub fn delete(
    table: &str,
    where_clause: &str,
    where_params: &dyn ValueSource,
    interceptors: &Interceptors,
) -> Result<Statement> {
    Ok(Statement {
        sql: format!("DELETE FROM {table} WHERE {where_clause}"),
        params: NamedParams::from_source(where_params, interceptors)?,
    })
}

pub(crate) fn execute_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    sql: &str,
    parameters: &dyn ValueSource,
) -> Result<u64> {
    let statement = command(sql, parameters, interceptors)?;
    conn.execute(&statement.sql, &statement.params)
}

pub(crate) fn save_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    table: &str,
    values: &dyn ValueSource,
    filter: Option<&Filter>,
) -> Result<u64> {
    let statement = insert(table, values, filter, interceptors)?;
    conn.execute(&statement.sql, &statement.params)
}

/// Insert, then retrieve the generated identity with the dialect's
/// last-inserted-identity scalar on the same connection. Safe against other
/// connections, but not atomic against other users of this connection.
pub(crate) fn save_retrieving_id_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    table: &str,
    values: &dyn ValueSource,
    filter: Option<&Filter>,
) -> Result<(u64, i64)> {
    let affected = save_on(conn, interceptors, table, values, filter)?;
    let query = conn.dialect().last_insert_id_query();
    let scalar = conn.query_scalar(query, &NamedParams::new())?;
    let id = scalar
        .as_long()
        .ok_or_else(|| DbError::type_mismatch("integer identity", scalar.kind()))?;
    Ok((affected, id))
}

pub(crate) fn upsert_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    table: &str,
    values: &dyn ValueSource,
    filter: Option<&Filter>,
) -> Result<u64> {
    let statement = upsert(conn.dialect(), table, values, filter, interceptors)?;
    conn.execute(&statement.sql, &statement.params)
}

pub(crate) fn update_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    table: &str,
    values: &dyn ValueSource,
    where_clause: &str,
    where_params: &dyn ValueSource,
    filter: Option<&Filter>,
) -> Result<u64> {
    let statement = update(
        table,
        values,
        where_clause,
        where_params,
        filter,
        interceptors,
    )?;
    conn.execute(&statement.sql, &statement.params)
}

pub(crate) fn delete_on(
    conn: &mut dyn Connection,
    interceptors: &Interceptors,
    table: &str,
    where_clause: &str,
    where_params: &dyn ValueSource,
) -> Result<u64> {
    let statement = delete(table, where_clause, where_params, interceptors)?;
    conn.execute(&statement.sql, &statement.params)
}
