//! kpnorm-core: keypoint validation and normalization (sans-IO).
//!
//! Turns loosely-typed keypoint annotations (parsed JSON) into validated,
//! unit-box-normalized point sequences through:
//!
//! raw value -> shape detection -> coordinate parsing -> normalization ->
//! field assignment.
//!
//! Alongside the point pipeline it provides the generic field hooks used
//! when building annotation records from keyword arguments
//! ([`not_empty`], [`has_length`], [`default_if_none`], [`ensure_cls`]),
//! and the [`PointsCategories`] record built with them.
//!
//! This crate has **no I/O dependencies**. Reading files and printing
//! results lives in the `kpnorm` binary.

pub mod category;
pub mod field;
pub mod format;
pub mod normalize;
pub mod types;
pub mod validators;

pub use category::{PointsCategories, PointsCategory};
pub use field::{
    Converter, DefaultProvider, Factory, FieldSpec, Nested, Record, RecordBuilder, ValueKind,
};
pub use format::{PointsFormat, PointsParser};
pub use normalize::{DEGENERATE_EXTENT_EPSILON, normalize_points, normalize_points_with};
pub use types::{BoundingBox, Point, PointsConfig, ValidationError};
pub use validators::{
    default_if_none, ensure_cls, ensure_cls_with, has_exact_length, has_length, not_empty,
    points_to_value, validate_points_positions, validate_points_positions_with,
};

/// Validate and normalize a standalone set of raw point positions.
///
/// Convenience wrapper running [`validate_points_positions_with`] against a
/// scratch record with a single field named `field`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFormat`] if `positions` is not a
/// sequence of numeric pairs, or [`ValidationError::InvalidConfig`] if
/// `config` is invalid.
pub fn process_positions(
    field: &str,
    positions: serde_json::Value,
    config: &PointsConfig,
) -> Result<Vec<Point>, ValidationError> {
    let spec = FieldSpec::new(field).with_kind(ValueKind::Array);
    let mut scratch = RecordBuilder::new("positions");
    validate_points_positions_with(&mut scratch, &spec, Some(positions), config)
}
