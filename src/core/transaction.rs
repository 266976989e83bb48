//! Scoped transactions
//!
//! A [`TransactionScope`] begins a transaction, hands the caller an
//! exclusive [`Transaction`] handle carrying the full operation surface,
//! and settles the transaction when the scope exits: commit when autocommit
//! is enabled and the handle is still active, rollback otherwise. Once the
//! handle has observed an explicit commit or rollback, the deferred
//! settlement step is a no-op.

use super::batch;
use super::connection::{Connection, ConnectionFactory, IsolationLevel};
use super::error::{DbError, Result};
use super::interceptors::Interceptors;
use super::materialize::{self, FromRecord, Record, Records};
use super::projection::{Filter, ValueSource};
use super::statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// Exclusive handle on a live transaction.
///
/// Every operation invoked on the handle participates in the transaction
/// and observes its uncommitted writes. The handle is the sole writer of
/// commit and rollback calls for its transaction.
pub struct Transaction<'c> {
    conn: &'c mut dyn Connection,
    interceptors: &'c Interceptors,
    state: TxState,
}

impl<'c> Transaction<'c> {
    fn new(conn: &'c mut dyn Connection, interceptors: &'c Interceptors) -> Self {
        Self {
            conn,
            interceptors,
            state: TxState::Active,
        }
    }

    fn active(&mut self) -> Result<&mut dyn Connection> {
        if self.state != TxState::Active {
            return Err(DbError::TransactionFinished);
        }
        Ok(&mut *self.conn)
    }

    /// Commit the transaction now.
    ///
    /// After an explicit commit the scope's deferred settlement does
    /// nothing; committing twice is [`DbError::TransactionFinished`].
    pub fn commit(&mut self) -> Result<()> {
        self.active()?.commit()?;
        self.state = TxState::Committed;
        Ok(())
    }

    /// Roll the transaction back now
    pub fn rollback(&mut self) -> Result<()> {
        self.active()?.rollback()?;
        self.state = TxState::RolledBack;
        Ok(())
    }

    /// Check if the transaction has been committed
    pub fn is_committed(&self) -> bool {
        self.state == TxState::Committed
    }

    /// Check if the transaction has been rolled back
    pub fn is_rolled_back(&self) -> bool {
        self.state == TxState::RolledBack
    }

    /// Execute a non-query statement within the transaction
    pub fn execute<P: ValueSource>(&mut self, sql: &str, parameters: &P) -> Result<u64> {
        let interceptors = self.interceptors;
        statement::execute_on(self.active()?, interceptors, sql, parameters)
    }

    /// Materialize every row of a query within the transaction
    pub fn read_all<P: ValueSource>(&mut self, query: &str, parameters: &P) -> Result<Vec<Record>> {
        let interceptors = self.interceptors;
        materialize::read_all_on(self.active()?, interceptors, query, parameters)
    }

    /// Materialize the first row of a query, or `None`
    pub fn read_one<P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
    ) -> Result<Option<Record>> {
        let interceptors = self.interceptors;
        materialize::read_one_on(self.active()?, interceptors, query, parameters)
    }

    /// Hand a lazy record stream over the query's rows to `scope`
    pub fn read_stream<P, R>(
        &mut self,
        query: &str,
        parameters: &P,
        scope: impl FnOnce(&mut Records<'_>) -> Result<R>,
    ) -> Result<R>
    where
        P: ValueSource,
    {
        let interceptors = self.interceptors;
        materialize::read_stream_on(self.active()?, interceptors, query, parameters, scope)
    }

    /// Visit rows in cursor order while `visit` returns true
    pub fn for_each<P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
        visit: impl FnMut(Record) -> Result<bool>,
    ) -> Result<()> {
        let interceptors = self.interceptors;
        materialize::for_each_on(self.active()?, interceptors, query, parameters, visit)
    }

    /// Materialize every row of a query as `T`
    pub fn read_all_as<T: FromRecord, P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
    ) -> Result<Vec<T>> {
        let interceptors = self.interceptors;
        materialize::read_all_as_on(self.active()?, interceptors, query, parameters)
    }

    /// Materialize the first row of a query as `T`, or `None`
    pub fn read_one_as<T: FromRecord, P: ValueSource>(
        &mut self,
        query: &str,
        parameters: &P,
    ) -> Result<Option<T>> {
        let interceptors = self.interceptors;
        materialize::read_one_as_on(self.active()?, interceptors, query, parameters)
    }

    /// Insert a filtered source into a table
    pub fn save<V: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        let interceptors = self.interceptors;
        statement::save_on(self.active()?, interceptors, table, values, filter)
    }

    /// Insert and retrieve the generated identity within the transaction
    pub fn save_retrieving_id<V: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<(u64, i64)> {
        let interceptors = self.interceptors;
        statement::save_retrieving_id_on(self.active()?, interceptors, table, values, filter)
    }

    /// Insert or overwrite on key conflict
    pub fn upsert<V: ValueSource>(
        &mut self,
        table: &str,
        values: &V,
        filter: Option<&Filter>,
    ) -> Result<u64> {
        let interceptors = self.interceptors;
        statement::upsert_on(self.active()?, interceptors, table, values, filter)
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
        let interceptors = self.interceptors;
        statement::update_on(
            self.active()?,
            interceptors,
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
        let interceptors = self.interceptors;
        statement::delete_on(self.active()?, interceptors, table, where_clause, where_params)
    }

    /// Chunked multi-row insert within the transaction
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
        let interceptors = self.interceptors;
        batch::save_batch_on(
            self.active()?,
            interceptors,
            table,
            batch,
            chunk_size,
            filter,
        )
    }
}

/// Scoped transaction over a borrowed connection.
///
/// Built by [`Session::in_transaction`](super::session::Session::in_transaction);
/// autocommit is off by default, so a scope that never commits rolls its
/// writes back on exit.
pub struct TransactionScope<'c> {
    conn: &'c mut dyn Connection,
    interceptors: Interceptors,
    autocommit: bool,
    isolation: Option<IsolationLevel>,
}

impl<'c> TransactionScope<'c> {
    pub(crate) fn new(conn: &'c mut dyn Connection, interceptors: Interceptors) -> Self {
        Self {
            conn,
            interceptors,
            autocommit: false,
            isolation: None,
        }
    }

    /// Commit automatically when the scope's action finishes without having
    /// settled the transaction itself
    #[must_use]
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Request an isolation level at transaction begin
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    /// Begin the transaction, run `action` with its handle, then settle.
    ///
    /// On a successful action: commit when autocommit is on and the handle
    /// is still active, rollback when it is off (releasing an uncommitted
    /// transaction rolls it back). On a failed action the transaction is
    /// rolled back and the action's error propagates.
    pub fn run<R>(self, action: impl FnOnce(&mut Transaction<'_>) -> Result<R>) -> Result<R> {
        self.conn.begin(self.isolation)?;
        let (result, state) = {
            let mut tx = Transaction::new(&mut *self.conn, &self.interceptors);
            let result = action(&mut tx);
            (result, tx.state)
        };
        match result {
            Ok(value) => {
                if state == TxState::Active {
                    if self.autocommit {
                        self.conn.commit()?;
                    } else {
                        self.conn.rollback()?;
                    }
                }
                Ok(value)
            }
            Err(err) => {
                if state == TxState::Active {
                    if let Err(rollback_err) = self.conn.rollback() {
                        log::warn!(
                            "rollback after failed transaction action also failed: {rollback_err}"
                        );
                    }
                }
                Err(err)
            }
        }
    }
}

/// Scoped transaction over a factory-sourced connection: a fresh connection
/// is opened for the scope and released when it exits
pub struct FactoryTransactionScope<'f, F: ConnectionFactory> {
    factory: &'f F,
    interceptors: Interceptors,
    autocommit: bool,
    isolation: Option<IsolationLevel>,
}

impl<'f, F: ConnectionFactory> FactoryTransactionScope<'f, F> {
    pub(crate) fn new(factory: &'f F, interceptors: Interceptors) -> Self {
        Self {
            factory,
            interceptors,
            autocommit: false,
            isolation: None,
        }
    }

    /// Commit automatically when the scope's action finishes without having
    /// settled the transaction itself
    #[must_use]
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Request an isolation level at transaction begin
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    /// Open a connection, run the scope on it, release the connection
    pub fn run<R>(self, action: impl FnOnce(&mut Transaction<'_>) -> Result<R>) -> Result<R> {
        let mut conn = self.factory.connect()?;
        let mut scope = TransactionScope::new(&mut conn, self.interceptors);
        scope.autocommit = self.autocommit;
        scope.isolation = self.isolation;
        scope.run(action)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::sqlite::SqliteConnection;
    use crate::bag;
    use crate::core::session::Session;

    fn session() -> Session<SqliteConnection> {
        let mut session = Session::new(SqliteConnection::open_in_memory().unwrap());
        session
            .execute("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)", &())
            .unwrap();
        session
    }

    #[test]
    fn test_autocommit_scope_commits() {
        let mut session = session();
        session
            .in_transaction()
            .with_autocommit(true)
            .run(|tx| tx.save("test", &bag! { "value" => "one" }, None))
            .unwrap();

        let rows = session.read_all("SELECT * FROM test", &()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_scope_without_autocommit_rolls_back() {
        let mut session = session();
        session
            .in_transaction()
            .run(|tx| tx.save("test", &bag! { "value" => "one" }, None))
            .unwrap();

        let rows = session.read_all("SELECT * FROM test", &()).unwrap();
        assert_eq!(rows.len(), 0);
    }

    #[test]
    fn test_explicit_commit_disarms_autocommit() {
        let mut session = session();
        session
            .in_transaction()
            .with_autocommit(true)
            .run(|tx| {
                tx.save("test", &bag! { "value" => "one" }, None)?;
                tx.commit()?;
                assert!(tx.is_committed());
                Ok(())
            })
            .unwrap();

        let rows = session.read_all("SELECT * FROM test", &()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_explicit_rollback_wins_over_autocommit() {
        let mut session = session();
        session
            .in_transaction()
            .with_autocommit(true)
            .run(|tx| {
                tx.save("test", &bag! { "value" => "one" }, None)?;
                tx.rollback()
            })
            .unwrap();

        let rows = session.read_all("SELECT * FROM test", &()).unwrap();
        assert_eq!(rows.len(), 0);
    }

    #[test]
    fn test_double_commit_is_transaction_finished() {
        let mut session = session();
        let err = session
            .in_transaction()
            .run(|tx| {
                tx.commit()?;
                tx.commit()
            })
            .unwrap_err();
        assert!(matches!(err, DbError::TransactionFinished));
    }

    #[test]
    fn test_operations_after_settlement_are_rejected() {
        let mut session = session();
        let err = session
            .in_transaction()
            .run(|tx| {
                tx.commit()?;
                tx.save("test", &bag! { "value" => "late" }, None)
            })
            .unwrap_err();
        assert!(matches!(err, DbError::TransactionFinished));
    }

    #[test]
    fn test_failed_action_rolls_back() {
        let mut session = session();
        let err = session
            .in_transaction()
            .with_autocommit(true)
            .run(|tx| {
                tx.save("test", &bag! { "value" => "one" }, None)?;
                Err::<(), _>(DbError::query("boom"))
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Query(_)));

        let rows = session.read_all("SELECT * FROM test", &()).unwrap();
        assert_eq!(rows.len(), 0);
    }

    #[test]
    fn test_reads_inside_scope_see_uncommitted_writes() {
        let mut session = session();
        session
            .in_transaction()
            .run(|tx| {
                tx.save("test", &bag! { "value" => "one" }, None)?;
                let rows = tx.read_all("SELECT * FROM test", &())?;
                assert_eq!(rows.len(), 1);
                Ok(())
            })
            .unwrap();
    }
}
