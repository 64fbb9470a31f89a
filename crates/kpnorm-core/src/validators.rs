//! Validator and converter hooks run while a record is constructed.
//!
//! Every hook receives the [`RecordBuilder`] being filled, the
//! [`FieldSpec`] of the field being set, and the raw value. Checking hooks
//! ([`not_empty`], [`has_length`], [`has_exact_length`]) only inspect the
//! value. Assigning hooks ([`default_if_none`], [`validate_points_positions`])
//! write the finalized value into the builder, and leave the field unset
//! when they fail.

use serde_json::{Map, Value};

use crate::field::{Converter, FieldSpec, Nested, Record, RecordBuilder, ValueKind};
use crate::format::PointsParser;
use crate::normalize::normalize_points_with;
use crate::types::{Point, PointsConfig, ValidationError};

/// Fail unless `value` is present and has a non-zero length.
///
/// Arrays, strings and objects have a length; any other kind fails.
///
/// # Errors
///
/// Returns [`ValidationError::PreconditionFailure`] if the value is
/// absent, has no length, or is empty.
pub fn not_empty(
    _instance: &RecordBuilder,
    field: &FieldSpec,
    value: Option<&Value>,
) -> Result<(), ValidationError> {
    if length_of(field, value)? == 0 {
        return Err(ValidationError::precondition(&field.name, "must not be empty"));
    }
    Ok(())
}

/// Validator accepting a length but enforcing only non-emptiness.
///
/// Existing annotation data relies on this lenient behavior, so a value
/// whose length differs from `expected` is logged rather than rejected.
/// Use [`has_exact_length`] to enforce the length.
pub fn has_length(
    expected: usize,
) -> impl Fn(&RecordBuilder, &FieldSpec, Option<&Value>) -> Result<(), ValidationError> {
    move |instance: &RecordBuilder, field: &FieldSpec, value: Option<&Value>| {
        not_empty(instance, field, value)?;
        let len = length_of(field, value)?;
        if len != expected {
            tracing::debug!(
                field = %field.name,
                expected,
                len,
                "length differs from declared length; only non-emptiness is enforced"
            );
        }
        Ok(())
    }
}

/// Validator requiring exactly `expected` elements.
pub fn has_exact_length(
    expected: usize,
) -> impl Fn(&RecordBuilder, &FieldSpec, Option<&Value>) -> Result<(), ValidationError> {
    move |_instance: &RecordBuilder, field: &FieldSpec, value: Option<&Value>| {
        let len = length_of(field, value)?;
        if len != expected {
            return Err(ValidationError::precondition(
                &field.name,
                format!("must have exactly {expected} elements, got {len}"),
            ));
        }
        Ok(())
    }
}

fn length_of(field: &FieldSpec, value: Option<&Value>) -> Result<usize, ValidationError> {
    match value {
        None => Err(ValidationError::precondition(&field.name, "value is absent")),
        Some(Value::Array(items)) => Ok(items.len()),
        Some(Value::Object(entries)) => Ok(entries.len()),
        Some(Value::String(s)) => Ok(s.chars().count()),
        Some(other) => Err(ValidationError::precondition(
            &field.name,
            format!("{} value has no length", ValueKind::of(other)),
        )),
    }
}

/// Hook substituting defaults for missing values and coercing the rest.
///
/// - An absent or `null` value is replaced by the field's default (a
///   factory is invoked on every call).
/// - A present value is kept if it already has the field's declared kind,
///   or `conv`'s target kind when the field declares none. Otherwise it is
///   passed through `conv`.
///
/// The resulting value is assigned into the field.
pub fn default_if_none(
    conv: Converter,
) -> impl Fn(&mut RecordBuilder, &FieldSpec, Option<Value>) -> Result<(), ValidationError> {
    move |instance: &mut RecordBuilder, field: &FieldSpec, value: Option<Value>| {
        let value = match value {
            None | Some(Value::Null) => {
                tracing::debug!(field = %field.name, "value missing, using default");
                field.default.produce()
            }
            Some(value) => match field.kind.or(conv.target()) {
                Some(kind) if ValueKind::of(&value) == kind => value,
                _ => conv.apply(&field.name, value)?,
            },
        };
        instance.set(&field.name, value);
        Ok(())
    }
}

/// Converter accepting either a built `T` or keyword arguments for one.
///
/// A built value is returned unchanged (moved, never copied); keyword
/// arguments are passed to [`Record::from_kwargs`].
pub fn ensure_cls<T: Record>() -> impl Fn(Nested<T>) -> Result<T, ValidationError> {
    ensure_cls_with(T::from_kwargs)
}

/// Like [`ensure_cls`], with an explicit constructor for the raw case.
pub fn ensure_cls_with<T, F>(construct: F) -> impl Fn(Nested<T>) -> Result<T, ValidationError>
where
    F: Fn(Map<String, Value>) -> Result<T, ValidationError>,
{
    move |arg: Nested<T>| match arg {
        Nested::Built(record) => Ok(record),
        Nested::Raw(kwargs) => construct(kwargs),
    }
}

/// Parse, validate and normalize raw keypoint positions.
///
/// Uses the default [`PointsConfig`]; see
/// [`validate_points_positions_with`].
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFormat`] if the positions are not a
/// sequence of numeric pairs.
pub fn validate_points_positions(
    instance: &mut RecordBuilder,
    field: &FieldSpec,
    positions: Option<Value>,
) -> Result<Vec<Point>, ValidationError> {
    validate_points_positions_with(instance, field, positions, &PointsConfig::default())
}

/// Parse, validate and normalize raw keypoint positions.
///
/// An absent, `null` or empty input yields an empty sequence. Anything
/// else must be an array in the shape selected by `config.format`; the
/// parsed points are normalized into the unit box. On success the points
/// are assigned into the field (as `[x, y]` pairs) and returned. On
/// failure the field is left unset.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFormat`] if the positions are not a
/// sequence of numeric pairs, or [`ValidationError::InvalidConfig`] if
/// `config` is invalid.
pub fn validate_points_positions_with(
    instance: &mut RecordBuilder,
    field: &FieldSpec,
    positions: Option<Value>,
    config: &PointsConfig,
) -> Result<Vec<Point>, ValidationError> {
    config.validate()?;

    let points = match positions {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) if values.is_empty() => Vec::new(),
        Some(Value::Array(values)) => {
            let raw = config.format.parse(&field.name, &values)?;
            let normalized = normalize_points_with(&raw, config.degenerate_epsilon);
            tracing::debug!(
                field = %field.name,
                count = normalized.len(),
                "normalized keypoint positions"
            );
            normalized
        }
        Some(other) => {
            return Err(ValidationError::invalid_format(
                &field.name,
                format!(
                    "expected a sequence of coordinates, got {}",
                    ValueKind::of(&other)
                ),
            ));
        }
    };

    instance.set(&field.name, points_to_value(&points));
    Ok(points)
}

/// Render points in the canonical pair form.
#[must_use]
pub fn points_to_value(points: &[Point]) -> Value {
    Value::Array(
        points
            .iter()
            .map(|p| serde_json::json!([p.x, p.y]))
            .collect(),
    )
}
