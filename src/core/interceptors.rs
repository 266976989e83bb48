//! Pluggable value interceptors
//!
//! The unknown-value interceptor gives callers a chance to turn a value the
//! layer does not natively understand into a database-storable one, e.g. to
//! serialize nested structures to text or binary blobs before insertion.

use super::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Transform applied to values of unknown kind before parameter binding.
///
/// The interceptor never receives [`Value::Null`]; nulls are bound as
/// database NULL without consulting it.
pub type UnknownValueFn = dyn Fn(Value) -> Value + Send + Sync;

/// The set of interceptors carried by sessions, transactions and factory
/// calls. Defaults to the identity transform.
#[derive(Clone)]
pub struct Interceptors {
    unknown_value: Arc<UnknownValueFn>,
}

impl Interceptors {
    /// Create an interceptor set with the identity unknown-value transform
    pub fn new() -> Self {
        Self {
            unknown_value: Arc::new(|value| value),
        }
    }

    /// Create an interceptor set with a custom unknown-value transform
    pub fn with_unknown_value<F>(transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            unknown_value: Arc::new(transform),
        }
    }

    /// Apply the unknown-value transform to a value of unknown kind
    pub fn transform_unknown(&self, value: Value) -> Value {
        (self.unknown_value)(value)
    }
}

impl Default for Interceptors {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors").finish_non_exhaustive()
    }
}

static DEFAULT_INTERCEPTORS: RwLock<Option<Interceptors>> = RwLock::new(None);

/// Get the process-wide default interceptor set.
///
/// Sessions pick this up at construction time; prefer
/// [`Session::with_interceptors`](crate::core::session::Session::with_interceptors)
/// in tests so there is no cross-test interference.
pub fn default_interceptors() -> Interceptors {
    DEFAULT_INTERCEPTORS.read().as_ref().cloned().unwrap_or_default()
}

/// Replace the process-wide default interceptor set.
///
/// There is no built-in synchronization against operations already in
/// flight; callers mutating the default concurrently with running
/// operations must coordinate externally.
pub fn set_default_interceptors(interceptors: Interceptors) {
    *DEFAULT_INTERCEPTORS.write() = Some(interceptors);
}
