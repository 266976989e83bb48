//! Database backend implementations
//!
//! This module contains concrete implementations of the connection trait
//! for various database drivers.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteFactory};
