//! Shared types for keypoint validation and normalization.

use serde::{Deserialize, Serialize};

use crate::format::PointsFormat;
use crate::normalize::DEGENERATE_EXTENT_EPSILON;

/// A 2D keypoint.
///
/// Serializes as a two-element array `[x, y]`, the canonical pair-grouped
/// representation of point sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Minimal axis-aligned box containing a set of points.
///
/// Only used as an intermediate for normalization; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Per-axis minimum.
    pub min: Point,
    /// Per-axis maximum.
    pub max: Point,
}

impl BoundingBox {
    /// Compute the bounding box of `points`.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn of(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let init = Self {
            min: *first,
            max: *first,
        };
        Some(rest.iter().fold(init, |bbox, p| Self {
            min: Point::new(bbox.min.x.min(p.x), bbox.min.y.min(p.y)),
            max: Point::new(bbox.max.x.max(p.x), bbox.max.y.max(p.y)),
        }))
    }

    /// Extent along the x axis.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Extent along the y axis.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Configuration for point validation and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    /// Accepted input shape for raw point positions.
    pub format: PointsFormat,

    /// Extent substituted for an axis on which every point shares the
    /// same coordinate. Must be finite and positive.
    pub degenerate_epsilon: f64,
}

impl PointsConfig {
    /// Default input format policy.
    pub const DEFAULT_FORMAT: PointsFormat = PointsFormat::Auto;

    /// Default degenerate-axis extent.
    pub const DEFAULT_DEGENERATE_EPSILON: f64 = DEGENERATE_EXTENT_EPSILON;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConfig`] if `degenerate_epsilon`
    /// is not a finite positive number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.degenerate_epsilon.is_finite() || self.degenerate_epsilon <= 0.0 {
            return Err(ValidationError::InvalidConfig(format!(
                "degenerate_epsilon must be finite and positive, got {}",
                self.degenerate_epsilon
            )));
        }
        Ok(())
    }
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            format: Self::DEFAULT_FORMAT,
            degenerate_epsilon: Self::DEFAULT_DEGENERATE_EPSILON,
        }
    }
}

/// Errors raised while validating or converting record fields.
///
/// None of these are recovered internally: they propagate out of the
/// record construction call unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// A value required to be non-empty was empty.
    #[error("precondition failed for field `{field}`: {reason}")]
    PreconditionFailure {
        /// Name of the offending field.
        field: String,
        /// Human-readable description.
        reason: String,
    },

    /// Raw point input could not be parsed into numeric pairs.
    #[error("invalid format for field `{field}`: {reason}")]
    InvalidFormat {
        /// Name of the offending field.
        field: String,
        /// Human-readable description.
        reason: String,
    },

    /// A converter rejected the value, or a typed field could not be
    /// extracted from it.
    #[error("cannot convert field `{field}`: {reason}")]
    Conversion {
        /// Name of the offending field.
        field: String,
        /// Human-readable description.
        reason: String,
    },

    /// A keyword argument did not correspond to any field of the record.
    #[error("unexpected field `{field}` for record `{record}`")]
    UnexpectedField {
        /// Record being constructed.
        record: String,
        /// The unknown keyword.
        field: String,
    },

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ValidationError {
    /// Name of the field the error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::PreconditionFailure { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::Conversion { field, .. }
            | Self::UnexpectedField { field, .. } => Some(field),
            Self::InvalidConfig(_) => None,
        }
    }

    /// Qualify the field name with `prefix`, producing `prefix.field`.
    ///
    /// Used when a nested record fails so the error points at the full
    /// path of the field inside the outer record.
    #[must_use]
    pub fn with_field_prefix(self, prefix: &str) -> Self {
        let qualify = |field: String| format!("{prefix}.{field}");
        match self {
            Self::PreconditionFailure { field, reason } => Self::PreconditionFailure {
                field: qualify(field),
                reason,
            },
            Self::InvalidFormat { field, reason } => Self::InvalidFormat {
                field: qualify(field),
                reason,
            },
            Self::Conversion { field, reason } => Self::Conversion {
                field: qualify(field),
                reason,
            },
            Self::UnexpectedField { record, field } => Self::UnexpectedField {
                record,
                field: qualify(field),
            },
            Self::InvalidConfig(msg) => Self::InvalidConfig(msg),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn precondition(field: &str, reason: impl Into<String>) -> Self {
        Self::PreconditionFailure {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conversion(field: &str, reason: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}
