//! Property sources, filters and projections
//!
//! A write operation starts from any value enumerable as named fields, slices
//! it through an optional whitelist/blacklist filter, and ends up with a
//! projection: the ordered column-to-value mapping a statement is built from.

use super::error::{DbError, Result};
use super::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Anything enumerable as ordered (name, value) pairs.
///
/// The built-in implementations cover the statically-typed path ([`Bag`],
/// maps, slices of pairs) and the dynamic path (`serde_json::Value` objects,
/// whose nested structures surface as [`Value::Json`] and flow through the
/// unknown-value interceptor at bind time).
pub trait ValueSource {
    /// Snapshot the source's fields. Order must be stable within one call.
    fn fields(&self) -> Vec<(String, Value)>;
}

/// An ordered, insertion-preserving bag of named values.
///
/// This is the primary way to hand ad-hoc records to the layer:
///
/// ```
/// use sqlbag::core::projection::Bag;
///
/// let user = Bag::new().set("Name", "Anne").set("Age", 31);
/// assert_eq!(user.len(), 2);
/// ```
///
/// The [`bag!`](crate::bag) macro builds one inline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    fields: Vec<(String, Value)>,
}

impl Bag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named value, consuming and returning the bag.
    ///
    /// Setting an existing name replaces the value in place.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a named value in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Get a value by exact name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of fields in the bag
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the bag has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl ValueSource for Bag {
    fn fields(&self) -> Vec<(String, Value)> {
        self.fields.clone()
    }
}

impl ValueSource for () {
    fn fields(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

impl ValueSource for Vec<(String, Value)> {
    fn fields(&self) -> Vec<(String, Value)> {
        self.clone()
    }
}

impl ValueSource for [(&str, Value)] {
    fn fields(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect()
    }
}

impl<const N: usize> ValueSource for [(&str, Value); N] {
    fn fields(&self) -> Vec<(String, Value)> {
        self.as_slice().fields()
    }
}

impl ValueSource for HashMap<String, Value> {
    fn fields(&self) -> Vec<(String, Value)> {
        self.iter().map(|(n, v)| (n.clone(), v.clone())).collect()
    }
}

impl ValueSource for BTreeMap<String, Value> {
    fn fields(&self) -> Vec<(String, Value)> {
        self.iter().map(|(n, v)| (n.clone(), v.clone())).collect()
    }
}

/// JSON objects are the dynamic source path: scalar members map to their
/// native kinds, nested arrays and objects stay [`Value::Json`]. Anything
/// that is not an object enumerates as no fields.
impl ValueSource for serde_json::Value {
    fn fields(&self) -> Vec<(String, Value)> {
        match self {
            serde_json::Value::Object(members) => members
                .iter()
                .map(|(name, member)| (name.clone(), json_member_value(member)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn json_member_value(member: &serde_json::Value) -> Value {
    match member {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Long(v)
            } else {
                Value::Double(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        nested => Value::Json(nested.clone()),
    }
}

impl<T: ValueSource + ?Sized> ValueSource for &T {
    fn fields(&self) -> Vec<(String, Value)> {
        (**self).fields()
    }
}

/// Build a [`Bag`] inline:
///
/// ```
/// use sqlbag::bag;
///
/// let user = bag! { "Name" => "Anne", "Age" => 31 };
/// assert_eq!(user.len(), 2);
/// ```
#[macro_export]
macro_rules! bag {
    () => { $crate::core::projection::Bag::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut bag = $crate::core::projection::Bag::new();
        $( bag.insert($name, $value); )+
        bag
    }};
}

/// Whitelist/blacklist pair restricting which properties participate in a
/// projection. With a whitelist only the listed names survive; with a
/// blacklist the listed names are dropped; with neither, everything passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    whitelist: Option<Vec<String>>,
    blacklist: Option<Vec<String>>,
}

impl Filter {
    /// Keep only the listed property names
    pub fn whitelist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            whitelist: Some(names.into_iter().map(Into::into).collect()),
            blacklist: None,
        }
    }

    /// Drop the listed property names
    pub fn blacklist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            whitelist: None,
            blacklist: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Check whether a property name survives this filter
    pub fn keeps(&self, name: &str) -> bool {
        if let Some(whitelist) = &self.whitelist {
            if !whitelist.iter().any(|n| n == name) {
                return false;
            }
        }
        if let Some(blacklist) = &self.blacklist {
            if blacklist.iter().any(|n| n == name) {
                return false;
            }
        }
        true
    }
}

/// The filtered, ordered column-to-value mapping derived from a source for
/// one write operation. Built fresh per call, never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    entries: Vec<(String, Value)>,
}

impl Projection {
    /// Project a source through an optional filter.
    ///
    /// The result may be empty; write operations reject empty projections
    /// via [`project`]. Duplicate names keep their first position with the
    /// last value winning.
    pub fn from_source(source: &dyn ValueSource, filter: Option<&Filter>) -> Self {
        let mut entries: Vec<(String, Value)> = Vec::new();
        for (name, value) in source.fields() {
            if filter.is_some_and(|f| !f.keeps(&name)) {
                continue;
            }
            if let Some(slot) = entries.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = value;
            } else {
                entries.push((name, value));
            }
        }
        Self { entries }
    }

    /// The projected (column, value) entries in projection order
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Iterate the projected column names in projection order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Get a projected value by exact column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, v)| v)
    }

    /// Number of projected columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was projected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the projection, yielding its entries
    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

/// Project a source through an optional filter, failing with
/// [`DbError::EmptyProjection`] when nothing survives.
///
/// This is the entry point used by every write operation; the failure
/// happens before any statement is sent.
pub fn project(source: &dyn ValueSource, filter: Option<&Filter>) -> Result<Projection> {
    let projection = Projection::from_source(source, filter);
    if projection.is_empty() {
        return Err(DbError::EmptyProjection);
    }
    Ok(projection)
}
