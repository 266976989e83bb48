//! Core data-access types and traits
//!
//! This module provides the building blocks of the layer: value and error
//! types, property projection, parameter binding, statement synthesis,
//! batch insertion, row materialization, sessions and transactions.

pub mod batch;
pub mod bind;
pub mod connection;
pub mod error;
pub mod interceptors;
pub mod materialize;
pub mod projection;
pub mod session;
pub mod statement;
pub mod transaction;
pub mod value;

// Re-export commonly used types
pub use bind::NamedParams;
pub use connection::{Connection, ConnectionFactory, IsolationLevel, RecordCursor};
pub use error::{DbError, Result};
pub use interceptors::{default_interceptors, set_default_interceptors, Interceptors};
pub use materialize::{FromRecord, Record, Records};
pub use projection::{project, Bag, Filter, Projection, ValueSource};
pub use session::{FactoryCrud, Session};
pub use statement::{Dialect, Statement};
pub use transaction::{FactoryTransactionScope, Transaction, TransactionScope};
pub use value::Value;
