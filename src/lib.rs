//! # sqlbag
//!
//! A driver-agnostic data-access layer that maps in-memory property bags to
//! parameterized SQL statements and maps result rows back to dynamically- or
//! strongly-typed records, with chunked batch insertion and scoped
//! transaction management.
//!
//! The layer sits on a small connection abstraction: anything that can
//! execute a statement with named parameters, stream a row cursor, return a
//! scalar and control transactions is a usable backend. It never parses SQL,
//! never pools connections, and tracks no state between calls: every
//! operation is a fresh round-trip.
//!
//! ## Features
//!
//! - **Property-bag writes**: insert, upsert, update and delete synthesized
//!   from any source of named values, sliced through whitelist/blacklist
//!   filters
//! - **Batch insertion**: heterogeneously-shaped objects grouped into
//!   chunked multi-row INSERT statements, missing columns falling back to
//!   the table default
//! - **Row materialization**: ordered generic records or strongly-typed
//!   values, eagerly, one row at a time, or via a lazy scoped stream
//! - **Scoped transactions**: autocommit and isolation-level control, with
//!   rollback on every non-committed exit path
//! - **Pluggable value handling**: an unknown-value interceptor turns
//!   arbitrary structured data into something storable (JSON text by
//!   default)
//!
//! ## Quick Start
//!
//! ```rust
//! use sqlbag::prelude::*;
//! use sqlbag::bag;
//!
//! fn main() -> Result<()> {
//!     let mut session = Session::new(SqliteConnection::open_in_memory()?);
//!
//!     session.execute(
//!         "CREATE TABLE Users (Id INTEGER PRIMARY KEY, Name TEXT, Age INTEGER)",
//!         &(),
//!     )?;
//!
//!     // Insert a property bag and get the generated identity back
//!     let (affected, id) =
//!         session.save_retrieving_id("Users", &bag! { "Name" => "Anne", "Age" => 31 }, None)?;
//!     assert_eq!((affected, id), (1, 1));
//!
//!     // Read it back as a generic record
//!     let anne = session
//!         .read_one("SELECT * FROM Users WHERE Id = @Id", &bag! { "Id" => id })?
//!         .expect("row just inserted");
//!     assert_eq!(anne.field("Name")?.as_str(), Some("Anne"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```rust
//! use sqlbag::prelude::*;
//! use sqlbag::bag;
//!
//! fn main() -> Result<()> {
//!     let mut session = Session::new(SqliteConnection::open_in_memory()?);
//!     session.execute("CREATE TABLE Accounts (Id INTEGER PRIMARY KEY, Balance REAL)", &())?;
//!
//!     session.in_transaction().with_autocommit(true).run(|tx| {
//!         tx.save("Accounts", &bag! { "Balance" => 100.0 }, None)?;
//!         tx.save("Accounts", &bag! { "Balance" => 250.0 }, None)?;
//!         Ok(())
//!     })?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! sqlbag/
//! ├── src/
//! │   ├── core/                # Core types and traits
//! │   │   ├── value.rs         # Value types
//! │   │   ├── error.rs         # Error types
//! │   │   ├── projection.rs    # Sources, filters, projections
//! │   │   ├── bind.rs          # Parameter binding and normalization
//! │   │   ├── statement.rs     # Statement synthesis
//! │   │   ├── batch.rs         # Chunked multi-row insertion
//! │   │   ├── materialize.rs   # Row materialization
//! │   │   ├── transaction.rs   # Scoped transactions
//! │   │   ├── session.rs       # Sessions and factory entry points
//! │   │   ├── connection.rs    # Driver abstraction
//! │   │   └── interceptors.rs  # Unknown-value hook
//! │   └── backends/            # Driver implementations
//! │       └── sqlite.rs        # SQLite over bundled rusqlite
//! ├── tests/                   # Integration and property tests
//! └── benches/                 # Criterion benchmarks
//! ```

/// Core data-access types and traits
pub mod core;

/// Database backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use sqlbag::prelude::*;
///
/// fn main() -> Result<()> {
///     let mut session = Session::new(SqliteConnection::open_in_memory()?);
///     session.execute("CREATE TABLE t (id INTEGER)", &())?;
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        Bag, Connection, ConnectionFactory, DbError, Dialect, FactoryCrud, Filter, FromRecord,
        Interceptors, IsolationLevel, Record, Result, Session, Value,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::{SqliteConnection, SqliteFactory};
}

// Re-export at root level for convenience
pub use crate::core::{
    Bag, Connection, ConnectionFactory, DbError, Dialect, FactoryCrud, Filter, FromRecord,
    Interceptors, IsolationLevel, NamedParams, Record, Result, Session, Value,
};

#[cfg(feature = "sqlite")]
pub use crate::backends::{SqliteConnection, SqliteFactory};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use prelude::*;

        let dialect = Dialect::Sqlite;
        assert_eq!(dialect.to_str(), "sqlite");
        assert_eq!(dialect.last_insert_id_query(), "SELECT last_insert_rowid()");
    }

    #[test]
    fn test_value_conversions() {
        let val: Value = 42.into();
        assert_eq!(val.as_int(), Some(42));

        let val: Value = "test".into();
        assert_eq!(val.as_string(), "test");

        let val: Value = true.into();
        assert_eq!(val.as_bool(), Some(true));
    }
}
