//! Connection sessions and factory-level entry points
//!
//! A [`Session`] owns one open connection and exposes the whole operation
//! surface on it. [`FactoryCrud`] provides the same surface on any
//! connection factory, opening a fresh connection per call and releasing it
//! on every exit path. Every entry point here is a thin variant over the
//! component operations; the statement and row machinery lives with its
//! component.

use super::batch;
use super::connection::{Connection, ConnectionFactory};
use super::error::Result;
use super::interceptors::{default_interceptors, Interceptors};
use super::materialize::{self, FromRecord, Record, Records};
use super::projection::{Filter, ValueSource};
use super::statement::{self, Dialect};
use super::transaction::{FactoryTransactionScope, TransactionScope};

/// One open connection plus the interceptor set its operations use.
///
/// Sessions are stateless beyond the connection itself: every operation
/// round-trips the database, and nothing is tracked between calls.
pub struct Session<C: Connection> {
    conn: C,
    interceptors: Interceptors,
}

impl<C: Connection> Session<C> {
    /// Wrap an already-open connection, picking up the process-wide default
    /// interceptors
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            interceptors: default_interceptors(),
        }
    }

    /// Open a fresh connection from a factory
    pub fn connect<F>(factory: &F) -> Result<Self>
    where
        F: ConnectionFactory<Conn = C>,
    {
        Ok(Self::new(factory.connect()?))
    }

    /// Replace the session's interceptor set
    #[must_use]
    pub fn with_interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// The SQL dialect of the underlying connection
    pub fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    /// Borrow the underlying connection
    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Release the session, yielding the underlying connection
    pub fn into_connection(self) -> C {
        self.conn
    }

    /// Execute a non-query statement with named-property binding
    pub fn execute<P: ValueSource>(&mut self, sql: &str, parameters: &P) -> Result<u64> {
        statement::execute_on(&mut self.conn, &self.interceptors, sql, parameters)
    }

    /// Materialize every row of a query
    pub fn read_all<P: ValueSource>(&mut self, query: &str, parameters: &P) -> Result<Vec<Record>> {
        materialize::read_all_on(&mut self.conn, &self.interceptors, query, parameters)
    }

    /// Materialize the first row of a query, or `None`
    pub fn read_one<P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
    ) -> Result<Option<Record>> {
        materialize::read_one_on(&mut self.conn, &self.interceptors, query, parameters)
    }

    /// Hand a lazy, single-pass record stream over the query's rows to
    /// `scope`. The cursor stays open exactly until the scope returns.
    pub fn read_stream<P, R>(
        &mut self,
        query: &str,
        parameters: &P,
        scope: impl FnOnce(&mut Records<'_>) -> Result<R>,
    ) -> Result<R>
    where
        P: ValueSource,
    {
        materialize::read_stream_on(&mut self.conn, &self.interceptors, query, parameters, scope)
    }

    /// Visit rows in cursor order while `visit` returns true; rows after
    /// the first false are never read
    pub fn for_each<P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
        visit: impl FnMut(Record) -> Result<bool>,
    ) -> Result<()> {
        materialize::for_each_on(&mut self.conn, &self.interceptors, query, parameters, visit)
    }

    /// Materialize every row of a query as `T`
    pub fn read_all_as<T: FromRecord, P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
    ) -> Result<Vec<T>> {
        materialize::read_all_as_on(&mut self.conn, &self.interceptors, query, parameters)
    }

    /// Materialize the first row of a query as `T`, or `None`
    pub fn read_one_as<T: FromRecord, P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
    ) -> Result<Option<T>> {
        materialize::read_one_as_on(&mut self.conn, &self.interceptors, query, parameters)
    }

    /// Insert a filtered source into a table, returning the affected-row
    /// count
    pub fn save<V: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        statement::save_on(&mut self.conn, &self.interceptors, table, values, filter)
    }

    /// Insert a filtered source and retrieve the generated identity on the
    /// same connection
    pub fn save_retrieving_id<V: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<(u64, i64)> {
        statement::save_retrieving_id_on(&mut self.conn, &self.interceptors, table, values, filter)
    }

    /// Insert, or overwrite the full projected column set on key conflict
    pub fn upsert<V: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        statement::upsert_on(&mut self.conn, &self.interceptors, table, values, filter)
    }

    /// Update rows matching a where clause with a filtered source
    pub fn update<V: ValueSource, P: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        where_clause: &str,
        where_params: &P,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        statement::update_on(
            &mut self.conn,
            &self.interceptors,
            table,
            values,
            where_clause,
            where_params,
            filter,
        )
    }

    /// Delete rows matching a where clause
    pub fn delete<P: ValueSource>(
        &mut self,
        table: &str,
        where_clause: &str,
        where_params: &P,
    ) -> Result<u64> {
        statement::delete_on(
            &mut self.conn,
            &self.interceptors,
            table,
            where_clause,
            where_params,
        )
    }

    /// Chunked multi-row insert of heterogeneously-shaped sources
    pub fn save_batch<S, I>(
        &mut self,
        table: &str,
        batch: I,
        chunk_size: usize,
        filter: Option<&Filter>,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: ValueSource,
    {
        batch::save_batch_on(
            &mut self.conn,
            &self.interceptors,
            table,
            batch,
            chunk_size,
            filter,
        )
    }

    /// Open a transaction scope on this session's connection.
    ///
    /// Autocommit is off by default; see
    /// [`TransactionScope::with_autocommit`].
    pub fn in_transaction(&mut self) -> TransactionScope<'_> {
        TransactionScope::new(&mut self.conn, self.interceptors.clone())
    }
}

/// One-shot operations on a connection factory.
///
/// Every method opens a fresh connection, runs the operation, and releases
/// the connection whether it succeeds or fails. Blanket-implemented for all
/// factories, including plain `Fn() -> Result<C>` closures.
pub trait FactoryCrud: ConnectionFactory + Sized {
    /// Execute a non-query statement on a fresh connection
    fn execute<P: ValueSource>(&self, sql: &str, parameters: &P) -> Result<u64> {
        Session::connect(self)?.execute(sql, parameters)
    }

    /// Materialize every row of a query on a fresh connection
    fn read_all<P: ValueSource>(&self, query: &str, parameters: &P) -> Result<Vec<Record>> {
        Session::connect(self)?.read_all(query, parameters)
    }

    /// Materialize the first row of a query on a fresh connection
    fn read_one<P: ValueSource>(&self, query: &str, parameters: &P) -> Result<Option<Record>> {
        Session::connect(self)?.read_one(query, parameters)
    }

    /// Stream rows on a fresh connection; the connection stays open until
    /// the scope returns
    fn read_stream<P, R>(
        &self,
        query: &str,
        parameters: &P,
        scope: impl FnOnce(&mut Records<'_>) -> Result<R>,
    ) -> Result<R>
    where
        P: ValueSource,
    {
        Session::connect(self)?.read_stream(query, parameters, scope)
    }

    /// Visit rows on a fresh connection while `visit` returns true
    fn for_each<P: ValueSource>(
        &self,
        query: &str,
        parameters: &P,
        visit: impl FnMut(Record) -> Result<bool>,
    ) -> Result<()> {
        Session::connect(self)?.for_each(query, parameters, visit)
    }

    /// Materialize every row of a query as `T` on a fresh connection
    fn read_all_as<T: FromRecord, P: ValueSource>(
        &self,
        query: &str,
        parameters: &P,
    ) -> Result<Vec<T>> {
        Session::connect(self)?.read_all_as(query, parameters)
    }

    /// Materialize the first row of a query as `T` on a fresh connection
    fn read_one_as<T: FromRecord, P: ValueSource>(
        &self,
        query: &str,
        parameters: &P,
    ) -> Result<Option<T>> {
        Session::connect(self)?.read_one_as(query, parameters)
    }

    /// Insert on a fresh connection
    fn save<V: ValueSource>(
        &self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        Session::connect(self)?.save(table, values, filter)
    }

    /// Insert and retrieve the generated identity on one fresh connection
    fn save_retrieving_id<V: ValueSource>(
        &self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<(u64, i64)> {
        Session::connect(self)?.save_retrieving_id(table, values, filter)
    }

    /// Upsert on a fresh connection
    fn upsert<V: ValueSource>(
        &self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        Session::connect(self)?.upsert(table, values, filter)
    }

    /// Update on a fresh connection
    fn update<V: ValueSource, P: ValueSource>(
        &self,
        table: &str,
        values: &V,
        where_clause: &str,
        where_params: &P,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        Session::connect(self)?.update(table, values, where_clause, where_params, filter)
    }

    /// Delete on a fresh connection
    fn delete<P: ValueSource>(
        &self,
        table: &str,
        where_clause: &str,
        where_params: &P,
    ) -> Result<u64> {
        Session::connect(self)?.delete(table, where_clause, where_params)
    }

    /// Chunked multi-row insert on a fresh connection
    fn save_batch<S, I>(
        &self,
        table: &str,
        batch: I,
        chunk_size: usize,
        filter: Option<&Filter>,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: ValueSource,
    {
        Session::connect(self)?.save_batch(table, batch, chunk_size, filter)
    }

    /// Open a transaction scope on a fresh connection; the connection is
    /// released when the scope exits
    fn in_transaction(&self) -> FactoryTransactionScope<'_, Self> {
        FactoryTransactionScope::new(self, default_interceptors())
    }
}

impl<F: ConnectionFactory> FactoryCrud for F {}
