//! Raw point input shapes.
//!
//! Point positions arrive as loosely-typed JSON in one of two shapes:
//!
//! - **pairs** (canonical): `[[x1, y1], [x2, y2], ...]`
//! - **flat**: `[x1, y1, x2, y2, ...]`
//!
//! [`PointsFormat`] selects which shape to accept. The default,
//! [`Auto`](PointsFormat::Auto), detects the shape from the elements and
//! rejects sequences that mix both.
//!
//! A coordinate is a JSON number or a string holding a number. Values that
//! do not parse, or parse to NaN or infinity, are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::ValueKind;
use crate::types::{Point, ValidationError};

/// Selects which raw point shape to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsFormat {
    /// Detect the shape: all elements arrays means pairs, no arrays means
    /// flat, anything else is rejected.
    #[default]
    Auto,
    /// Interleaved scalars `x1, y1, x2, y2, ...`.
    Flat,
    /// Two-element groups `[x, y]`.
    Pairs,
}

/// Trait for turning a raw JSON sequence into points.
pub trait PointsParser {
    /// Parse `values` into points, naming `field` in any error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFormat`] if the values do not
    /// form a sequence of numeric pairs.
    fn parse(&self, field: &str, values: &[Value]) -> Result<Vec<Point>, ValidationError>;
}

impl PointsParser for PointsFormat {
    fn parse(&self, field: &str, values: &[Value]) -> Result<Vec<Point>, ValidationError> {
        match self.resolve(field, values)? {
            Self::Flat => parse_flat(field, values),
            Self::Pairs | Self::Auto => parse_pairs(field, values),
        }
    }
}

impl PointsFormat {
    /// Resolve [`Auto`](Self::Auto) to a concrete shape for `values`.
    ///
    /// Concrete formats resolve to themselves. An empty sequence resolves
    /// to [`Pairs`](Self::Pairs).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFormat`] when `Auto` sees a mix of
    /// arrays and scalars.
    pub fn resolve(self, field: &str, values: &[Value]) -> Result<Self, ValidationError> {
        if self != Self::Auto {
            return Ok(self);
        }
        let groups = values.iter().filter(|v| v.is_array()).count();
        if groups == values.len() {
            Ok(Self::Pairs)
        } else if groups == 0 {
            Ok(Self::Flat)
        } else {
            Err(ValidationError::invalid_format(
                field,
                format!(
                    "mixes coordinate pairs and bare scalars ({groups} of {} elements are arrays)",
                    values.len()
                ),
            ))
        }
    }
}

fn parse_flat(field: &str, values: &[Value]) -> Result<Vec<Point>, ValidationError> {
    let coords = values
        .iter()
        .enumerate()
        .map(|(i, v)| coordinate(field, v, &format!("element {i}")))
        .collect::<Result<Vec<f64>, _>>()?;

    if coords.len() % 2 != 0 {
        return Err(ValidationError::invalid_format(
            field,
            format!(
                "must have an even number of elements, got {}",
                coords.len()
            ),
        ));
    }

    Ok(coords
        .chunks_exact(2)
        .map(|xy| Point::new(xy[0], xy[1]))
        .collect())
}

fn parse_pairs(field: &str, values: &[Value]) -> Result<Vec<Point>, ValidationError> {
    values
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let Value::Array(members) = group else {
                return Err(ValidationError::invalid_format(
                    field,
                    format!(
                        "element {i} must be an [x, y] pair, got {}",
                        ValueKind::of(group)
                    ),
                ));
            };
            let [x, y] = members.as_slice() else {
                return Err(ValidationError::invalid_format(
                    field,
                    format!(
                        "element {i} must have exactly 2 coordinates, got {}",
                        members.len()
                    ),
                ));
            };
            Ok(Point::new(
                coordinate(field, x, &format!("element {i}.x"))?,
                coordinate(field, y, &format!("element {i}.y"))?,
            ))
        })
        .collect()
}

/// Convert one raw coordinate to a finite `f64`.
fn coordinate(field: &str, value: &Value, position: &str) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(c) if c.is_finite() => Ok(c),
        Some(_) => Err(ValidationError::invalid_format(
            field,
            format!("{position} ({value}) is not a finite number"),
        )),
        None => Err(ValidationError::invalid_format(
            field,
            format!("cannot convert {position} ({value}) to a number"),
        )),
    }
}
