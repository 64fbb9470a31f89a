//! Field descriptors and the record construction layer.
//!
//! Records are built from loosely-typed keyword arguments (a JSON object).
//! Each field is described by a [`FieldSpec`] carrying its name, declared
//! [`ValueKind`] and [`DefaultProvider`]. Validator hooks read the raw
//! keyword argument for their field out of a [`RecordBuilder`], then
//! assign the finalized value back into it; the record type extracts its
//! typed fields once every hook has run.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::ValidationError;

/// The runtime kind of a loosely-typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Classify `value`.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Zero-argument value factory.
pub type Factory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Where a field's value comes from when the input omits it.
#[derive(Clone, Default)]
pub enum DefaultProvider {
    /// No declared default; a missing value becomes `null`.
    #[default]
    None,
    /// A literal value, cloned on each use.
    Literal(Value),
    /// A factory invoked on each use, so every record gets a fresh value.
    Factory(Factory),
}

impl DefaultProvider {
    /// Wrap a closure as a [`DefaultProvider::Factory`].
    pub fn factory(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self::Factory(Arc::new(f))
    }

    /// Produce the default value.
    #[must_use]
    pub fn produce(&self) -> Value {
        match self {
            Self::None => Value::Null,
            Self::Literal(value) => value.clone(),
            Self::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Descriptor of one record field, supplied by the record type.
///
/// Hooks read it but never modify it.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name; also the keyword argument name.
    pub name: String,
    /// Declared kind, if the field has a concrete one.
    pub kind: Option<ValueKind>,
    /// Default used when the input omits the field.
    pub default: DefaultProvider,
}

impl FieldSpec {
    /// A field with no declared kind and no default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            default: DefaultProvider::None,
        }
    }

    /// Declare the kind the field holds.
    #[must_use]
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Use `value` when the field is absent.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = DefaultProvider::Literal(value);
        self
    }

    /// Produce a fresh default from `f` each time the field is absent.
    #[must_use]
    pub fn with_factory(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = DefaultProvider::factory(f);
        self
    }
}

type ConvertFn = dyn Fn(&str, Value) -> Result<Value, ValidationError> + Send + Sync;

/// A value coercion with an optional known target kind.
///
/// The target kind stands in for the field's declared kind when the field
/// has none: values already of that kind are not converted.
#[derive(Clone)]
pub struct Converter {
    target: Option<ValueKind>,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// A converter producing values of `target`.
    pub fn new(
        target: ValueKind,
        f: impl Fn(&str, Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: Some(target),
            func: Arc::new(f),
        }
    }

    /// A converter with no known target kind; it is applied to every
    /// present value whose field declares no kind.
    pub fn untyped(
        f: impl Fn(&str, Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: None,
            func: Arc::new(f),
        }
    }

    /// The kind this converter produces, if known.
    #[must_use]
    pub const fn target(&self) -> Option<ValueKind> {
        self.target
    }

    /// Apply the conversion to `value` of field `field`.
    ///
    /// # Errors
    ///
    /// Propagates the converter's error.
    pub fn apply(&self, field: &str, value: Value) -> Result<Value, ValidationError> {
        (self.func)(field, value)
    }

    /// Wrap any non-array value in a one-element array.
    #[must_use]
    pub fn array() -> Self {
        Self::new(ValueKind::Array, |_, value| {
            Ok(match value {
                Value::Array(_) => value,
                other => Value::Array(vec![other]),
            })
        })
    }

    /// Render scalars as strings; arrays and objects are rejected.
    #[must_use]
    pub fn string() -> Self {
        Self::new(ValueKind::String, |field, value| match value {
            Value::String(_) => Ok(value),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            other => Err(ValidationError::conversion(
                field,
                format!("cannot convert {} to string", ValueKind::of(&other)),
            )),
        })
    }

    /// Parse numeric strings into numbers. Integral strings become
    /// integers; non-finite values are rejected.
    #[must_use]
    pub fn number() -> Self {
        Self::new(ValueKind::Number, |field, value| {
            if value.is_number() {
                return Ok(value);
            }
            let parsed = value.as_str().map(str::trim).and_then(|s| {
                s.parse::<i64>().ok().map(serde_json::Number::from).or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                })
            });
            parsed.map(Value::Number).ok_or_else(|| {
                ValidationError::conversion(field, format!("cannot convert {value} to number"))
            })
        })
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// A record under construction.
///
/// Holds the keyword arguments not yet consumed by a field hook and the
/// field values assigned so far.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    record: String,
    kwargs: Map<String, Value>,
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// A builder with no keyword arguments.
    pub fn new(record: impl Into<String>) -> Self {
        Self::from_kwargs(record, Map::new())
    }

    /// A builder for `record` fed by `kwargs`.
    pub fn from_kwargs(record: impl Into<String>, kwargs: Map<String, Value>) -> Self {
        Self {
            record: record.into(),
            kwargs,
            fields: Map::new(),
        }
    }

    /// Name of the record being built.
    #[must_use]
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Remove and return the raw keyword argument for `name`.
    pub fn kwarg(&mut self, name: &str) -> Option<Value> {
        self.kwargs.remove(name)
    }

    /// Assign the finalized value of field `name`.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_owned(), value);
    }

    /// The value assigned to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether field `name` has been assigned.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove field `name` and deserialize it as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Conversion`] if the field was never
    /// assigned or does not deserialize as `T`.
    pub fn take_as<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ValidationError> {
        let value = self.fields.remove(name).ok_or_else(|| {
            ValidationError::conversion(
                name,
                format!("never assigned while building `{}`", self.record),
            )
        })?;
        serde_json::from_value(value).map_err(|e| ValidationError::conversion(name, e.to_string()))
    }

    /// Check that every keyword argument was consumed by some field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnexpectedField`] naming the first
    /// leftover keyword (in key order).
    pub fn ensure_consumed(&self) -> Result<(), ValidationError> {
        match self.kwargs.keys().next() {
            Some(field) => Err(ValidationError::UnexpectedField {
                record: self.record.clone(),
                field: field.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// A record type constructible from keyword arguments.
pub trait Record: Sized {
    /// Record name used in error messages.
    const NAME: &'static str;

    /// Build the record from raw keyword arguments, running every field
    /// hook.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] raised by a field hook.
    fn from_kwargs(kwargs: Map<String, Value>) -> Result<Self, ValidationError>;
}

/// A nested record field value: either already built or still raw.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    /// An already constructed record.
    Built(T),
    /// Keyword arguments to construct one from.
    Raw(Map<String, Value>),
}

impl<T> Nested<T> {
    /// Interpret a raw JSON value as constructor keyword arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Conversion`] if `value` is not an object.
    pub fn from_value(field: &str, value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(kwargs) => Ok(Self::Raw(kwargs)),
            other => Err(ValidationError::conversion(
                field,
                format!(
                    "expected an object of keyword arguments, got {}",
                    ValueKind::of(&other)
                ),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn value_kind_classifies_every_variant() {
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
        assert_eq!(ValueKind::of(&json!(false)), ValueKind::Bool);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!("a")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!([])), ValueKind::Array);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Object);
    }

    #[test]
    fn value_kind_display() {
        assert_eq!(ValueKind::Array.to_string(), "array");
        assert_eq!(ValueKind::Null.to_string(), "null");
    }

    #[test]
    fn default_provider_none_produces_null() {
        assert_eq!(DefaultProvider::None.produce(), Value::Null);
    }

    #[test]
    fn default_provider_literal_is_cloned() {
        let provider = DefaultProvider::Literal(json!([1, 2]));
        assert_eq!(provider.produce(), json!([1, 2]));
        assert_eq!(provider.produce(), json!([1, 2]));
    }

    #[test]
    fn default_provider_factory_runs_each_time() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let counter = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&counter);
        let provider = DefaultProvider::factory(move || json!(c.fetch_add(1, Ordering::SeqCst)));
        assert_eq!(provider.produce(), json!(0));
        assert_eq!(provider.produce(), json!(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn field_spec_builders() {
        let spec = FieldSpec::new("labels")
            .with_kind(ValueKind::Array)
            .with_default(json!([]));
        assert_eq!(spec.name, "labels");
        assert_eq!(spec.kind, Some(ValueKind::Array));
        assert_eq!(spec.default.produce(), json!([]));
    }

    #[test]
    fn converter_array_wraps_scalars() {
        let conv = Converter::array();
        assert_eq!(conv.target(), Some(ValueKind::Array));
        assert_eq!(conv.apply("f", json!("nose")).unwrap(), json!(["nose"]));
        assert_eq!(conv.apply("f", json!([1])).unwrap(), json!([1]));
    }

    #[test]
    fn converter_string_renders_scalars() {
        let conv = Converter::string();
        assert_eq!(conv.apply("f", json!(3)).unwrap(), json!("3"));
        assert_eq!(conv.apply("f", json!(true)).unwrap(), json!("true"));
        assert!(matches!(
            conv.apply("f", json!([1])),
            Err(ValidationError::Conversion { .. })
        ));
    }

    #[test]
    fn converter_number_parses_strings() {
        let conv = Converter::number();
        assert_eq!(conv.apply("f", json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(conv.apply("f", json!(7)).unwrap(), json!(7));
        assert!(conv.apply("f", json!("abc")).is_err());
        assert!(conv.apply("f", json!("nan")).is_err());
    }

    #[test]
    fn builder_consumes_kwargs() {
        let kwargs = json!({"a": 1, "b": 2}).as_object().unwrap().clone();
        let mut builder = RecordBuilder::from_kwargs("R", kwargs);
        assert_eq!(builder.kwarg("a"), Some(json!(1)));
        assert_eq!(builder.kwarg("a"), None);
        let err = builder.ensure_consumed().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnexpectedField {
                record: "R".to_string(),
                field: "b".to_string(),
            }
        );
        builder.kwarg("b");
        assert!(builder.ensure_consumed().is_ok());
    }

    #[test]
    fn builder_set_get_take() {
        let mut builder = RecordBuilder::new("R");
        assert!(!builder.is_set("labels"));
        builder.set("labels", json!(["a", "b"]));
        assert!(builder.is_set("labels"));
        assert_eq!(builder.get("labels"), Some(&json!(["a", "b"])));
        let labels: Vec<String> = builder.take_as("labels").unwrap();
        assert_eq!(labels, vec!["a", "b"]);
        assert!(!builder.is_set("labels"));
    }

    #[test]
    fn builder_take_as_reports_type_mismatch() {
        let mut builder = RecordBuilder::new("R");
        builder.set("count", json!("many"));
        let err = builder.take_as::<u32>("count").unwrap_err();
        assert!(matches!(err, ValidationError::Conversion { ref field, .. } if field == "count"));
    }

    #[test]
    fn builder_take_as_reports_unassigned_field() {
        let mut builder = RecordBuilder::new("R");
        assert!(builder.take_as::<u32>("missing").is_err());
    }

    #[test]
    fn nested_from_object_is_raw() {
        let nested: Nested<()> = Nested::from_value("f", json!({"labels": []})).unwrap();
        assert!(matches!(nested, Nested::Raw(ref kw) if kw.contains_key("labels")));
    }

    #[test]
    fn nested_from_non_object_is_rejected() {
        let result: Result<Nested<()>, _> = Nested::from_value("f", json!([1, 2]));
        assert!(matches!(result, Err(ValidationError::Conversion { .. })));
    }
}
