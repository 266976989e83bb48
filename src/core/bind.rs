//! Parameter binding and value normalization
//!
//! Converts named values into the parameter list attached to a statement.
//! Normalization happens here: nulls stay database NULL, 128-bit identifiers
//! become fixed 16-byte blobs, recognized scalars pass through unchanged, and
//! unknown kinds are offered to the unknown-value interceptor first.

use super::error::{DbError, Result};
use super::interceptors::Interceptors;
use super::projection::ValueSource;
use super::value::Value;

/// Named parameter list bound to one statement.
///
/// Parameter names are unique within one list; binding a duplicate name is
/// an error so synthesized and caller-supplied parameters can never collide
/// silently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    params: Vec<(String, Value)>,
}

impl NamedParams {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parameter list from every field of a source
    pub fn from_source(source: &dyn ValueSource, interceptors: &Interceptors) -> Result<Self> {
        let mut params = Self::new();
        params.bind_source(source, interceptors)?;
        Ok(params)
    }

    /// Bind one named parameter, normalizing the value
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        value: Value,
        interceptors: &Interceptors,
    ) -> Result<()> {
        let name = name.into();
        if self.params.iter().any(|(n, _)| *n == name) {
            return Err(DbError::DuplicateParameter(name));
        }
        self.params.push((name, normalize(value, interceptors)));
        Ok(())
    }

    /// Bind one named parameter for each field of a source
    pub fn bind_source(
        &mut self,
        source: &dyn ValueSource,
        interceptors: &Interceptors,
    ) -> Result<()> {
        for (name, value) in source.fields() {
            self.bind(name, value, interceptors)?;
        }
        Ok(())
    }

    /// Iterate the bound (name, value) pairs in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Look up a bound value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Normalize a value into its database-storable form.
///
/// The unknown-value interceptor is consulted only for [`Value::Json`] and
/// never for [`Value::Null`]. A value the interceptor leaves unknown is
/// stored as its compact JSON text.
fn normalize(value: Value, interceptors: &Interceptors) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Uuid(id) => Value::Bytes(id.into_bytes().to_vec()),
        Value::Json(_) => match interceptors.transform_unknown(value) {
            Value::Json(json) => Value::Text(json.to_string()),
            Value::Uuid(id) => Value::Bytes(id.into_bytes().to_vec()),
            other => other,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag;

    #[test]
    fn test_bind_normalizes_uuid_to_sixteen_bytes() {
        let interceptors = Interceptors::new();
        let id = uuid::Uuid::new_v4();
        let mut params = NamedParams::new();
        params.bind("p0", Value::Uuid(id), &interceptors).unwrap();

        match params.get("p0").unwrap() {
            Value::Bytes(bytes) => {
                assert_eq!(bytes.len(), 16);
                assert_eq!(bytes.as_slice(), id.as_bytes());
            }
            other => panic!("expected bytes, got {}", other.kind()),
        }
    }

    #[test]
    fn test_bind_keeps_null_and_scalars() {
        let interceptors = Interceptors::new();
        let mut params = NamedParams::new();
        params.bind("a", Value::Null, &interceptors).unwrap();
        params.bind("b", Value::Long(7), &interceptors).unwrap();
        assert_eq!(params.get("a"), Some(&Value::Null));
        assert_eq!(params.get("b"), Some(&Value::Long(7)));
    }

    #[test]
    fn test_unknown_kind_defaults_to_json_text() {
        let interceptors = Interceptors::new();
        let mut params = NamedParams::new();
        params
            .bind("p0", Value::Json(serde_json::json!({"a": 1})), &interceptors)
            .unwrap();
        assert_eq!(params.get("p0"), Some(&Value::Text("{\"a\":1}".into())));
    }

    #[test]
    fn test_unknown_kind_goes_through_interceptor() {
        let interceptors = Interceptors::with_unknown_value(|value| match value {
            Value::Json(json) => Value::Bytes(json.to_string().into_bytes()),
            other => other,
        });
        let mut params = NamedParams::new();
        params
            .bind("p0", Value::Json(serde_json::json!([1, 2])), &interceptors)
            .unwrap();
        assert_eq!(params.get("p0"), Some(&Value::Bytes(b"[1,2]".to_vec())));
    }

    #[test]
    fn test_duplicate_name_is_an_error() {
        let interceptors = Interceptors::new();
        let mut params = NamedParams::new();
        params.bind("p0", Value::Int(1), &interceptors).unwrap();
        let err = params.bind("p0", Value::Int(2), &interceptors).unwrap_err();
        assert!(matches!(err, DbError::DuplicateParameter(name) if name == "p0"));
    }

    #[test]
    fn test_bind_source_preserves_order() {
        let interceptors = Interceptors::new();
        let source = bag! { "Id" => 5, "Name" => "x" };
        let params = NamedParams::from_source(&source, &interceptors).unwrap();
        let names: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Id", "Name"]);
    }
}
