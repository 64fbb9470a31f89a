//! Keypoint categories.
//!
//! A [`PointsCategory`] describes the keypoint layout of one annotation
//! label: the name of each keypoint, the skeleton edges joining them and,
//! optionally, a template pose normalized into the unit box.
//! [`PointsCategories`] maps label ids to their category.
//!
//! Both are built from loosely-typed JSON through the validator hooks in
//! [`crate::validators`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field::{Converter, FieldSpec, Nested, Record, RecordBuilder, ValueKind};
use crate::normalize::normalize_points;
use crate::types::{Point, PointsConfig, ValidationError};
use crate::validators::{
    default_if_none, ensure_cls, ensure_cls_with, not_empty, validate_points_positions_with,
};

const LABELS: &str = "labels";
const JOINTS: &str = "joints";
const POSITIONS: &str = "positions";
const CATEGORIES: &str = "categories";

/// Keypoint layout of one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsCategory {
    labels: Vec<String>,
    joints: BTreeSet<(u32, u32)>,
    positions: Vec<Point>,
}

impl PointsCategory {
    /// Build a category from typed parts.
    ///
    /// `positions` are normalized into the unit box; joints are stored
    /// with the smaller index first.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PreconditionFailure`] for an empty label
    /// name, or [`ValidationError::InvalidFormat`] if `positions` is
    /// non-empty and its length differs from the number of labels.
    pub fn new(
        labels: Vec<String>,
        joints: impl IntoIterator<Item = (u32, u32)>,
        positions: &[Point],
    ) -> Result<Self, ValidationError> {
        let builder = RecordBuilder::new(Self::NAME);
        for (i, label) in labels.iter().enumerate() {
            let item = FieldSpec::new(format!("{LABELS}[{i}]"));
            not_empty(&builder, &item, Some(&Value::String(label.clone())))?;
        }
        Self::assemble(labels, joints, normalize_points(positions))
    }

    /// Build a category from keyword arguments with an explicit config.
    ///
    /// Accepted keywords are `labels`, `joints` and `positions`; all are
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] raised by a field hook, or
    /// [`ValidationError::UnexpectedField`] for an unknown keyword.
    pub fn from_kwargs_with(
        kwargs: Map<String, Value>,
        config: &PointsConfig,
    ) -> Result<Self, ValidationError> {
        let mut builder = RecordBuilder::from_kwargs(Self::NAME, kwargs);

        let labels = FieldSpec::new(LABELS)
            .with_kind(ValueKind::Array)
            .with_factory(|| Value::Array(Vec::new()));
        let raw = builder.kwarg(LABELS);
        default_if_none(Converter::array())(&mut builder, &labels, raw)?;

        let joints = FieldSpec::new(JOINTS)
            .with_kind(ValueKind::Array)
            .with_factory(|| Value::Array(Vec::new()));
        let raw = builder.kwarg(JOINTS);
        default_if_none(Converter::array())(&mut builder, &joints, raw)?;

        let positions = FieldSpec::new(POSITIONS).with_kind(ValueKind::Array);
        let raw = builder.kwarg(POSITIONS);
        let positions = validate_points_positions_with(&mut builder, &positions, raw, config)?;

        builder.ensure_consumed()?;

        let labels = builder
            .take_as::<Vec<Value>>(LABELS)?
            .into_iter()
            .enumerate()
            .map(|(i, raw)| label_at(&builder, i, raw))
            .collect::<Result<Vec<_>, _>>()?;
        let joints = builder.take_as::<Vec<(u32, u32)>>(JOINTS)?;

        Self::assemble(labels, joints, positions)
    }

    fn assemble(
        labels: Vec<String>,
        joints: impl IntoIterator<Item = (u32, u32)>,
        positions: Vec<Point>,
    ) -> Result<Self, ValidationError> {
        if !positions.is_empty() && positions.len() != labels.len() {
            return Err(ValidationError::invalid_format(
                POSITIONS,
                format!(
                    "expected one position per label ({}), got {}",
                    labels.len(),
                    positions.len()
                ),
            ));
        }
        let joints = joints
            .into_iter()
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        Ok(Self {
            labels,
            joints,
            positions,
        })
    }

    /// Keypoint names, in keypoint index order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Skeleton edges as `(lower, higher)` keypoint index pairs.
    #[must_use]
    pub const fn joints(&self) -> &BTreeSet<(u32, u32)> {
        &self.joints
    }

    /// Template pose in the unit box; empty when none was given.
    #[must_use]
    pub fn positions(&self) -> &[Point] {
        &self.positions
    }
}

fn label_at(builder: &RecordBuilder, index: usize, raw: Value) -> Result<String, ValidationError> {
    let item = FieldSpec::new(format!("{LABELS}[{index}]")).with_kind(ValueKind::String);
    let label = Converter::string().apply(&item.name, raw)?;
    not_empty(builder, &item, Some(&label))?;
    Ok(label.as_str().unwrap_or_default().to_owned())
}

impl Record for PointsCategory {
    const NAME: &'static str = "PointsCategory";

    fn from_kwargs(kwargs: Map<String, Value>) -> Result<Self, ValidationError> {
        Self::from_kwargs_with(kwargs, &PointsConfig::default())
    }
}

impl<'de> Deserialize<'de> for PointsCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kwargs = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_kwargs(kwargs).map_err(serde::de::Error::custom)
    }
}

/// Keypoint categories indexed by label id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PointsCategories {
    items: BTreeMap<u32, PointsCategory>,
}

impl PointsCategories {
    /// An empty set of categories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse categories from a JSON object mapping label ids to category
    /// keyword arguments, using the default [`PointsConfig`].
    ///
    /// # Errors
    ///
    /// See [`from_json_with`](Self::from_json_with).
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        Self::from_json_with(value, &PointsConfig::default())
    }

    /// Parse categories from a JSON object mapping label ids to category
    /// keyword arguments.
    ///
    /// Errors from a category are reported with the field qualified by
    /// its label id, e.g. `3.positions`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFormat`] if `value` is not an
    /// object or a key is not a label id, or the first error raised while
    /// building a category.
    pub fn from_json_with(value: Value, config: &PointsConfig) -> Result<Self, ValidationError> {
        config.validate()?;

        let Value::Object(entries) = value else {
            return Err(ValidationError::invalid_format(
                CATEGORIES,
                format!(
                    "expected an object keyed by label id, got {}",
                    ValueKind::of(&value)
                ),
            ));
        };

        let convert = ensure_cls_with(|kwargs: Map<String, Value>| {
            PointsCategory::from_kwargs_with(kwargs, config)
        });

        let mut categories = Self::new();
        for (key, raw) in entries {
            let label_id = key.trim().parse::<u32>().map_err(|_| {
                ValidationError::invalid_format(
                    CATEGORIES,
                    format!("`{key}` is not a label id"),
                )
            })?;
            let category = Nested::from_value(&key, raw)
                .and_then(|nested| convert(nested).map_err(|e| e.with_field_prefix(&key)))?;
            categories.insert(label_id, category);
        }

        tracing::debug!(count = categories.len(), "loaded points categories");
        Ok(categories)
    }

    /// Add the category for `label_id`, given either built or as keyword
    /// arguments. An existing category for the same label is replaced.
    ///
    /// # Errors
    ///
    /// Returns the error raised while building a raw category, with the
    /// field qualified by `label_id`.
    pub fn add(
        &mut self,
        label_id: u32,
        category: Nested<PointsCategory>,
    ) -> Result<(), ValidationError> {
        let category = ensure_cls::<PointsCategory>()(category)
            .map_err(|e| e.with_field_prefix(&label_id.to_string()))?;
        self.insert(label_id, category);
        Ok(())
    }

    fn insert(&mut self, label_id: u32, category: PointsCategory) {
        if self.items.insert(label_id, category).is_some() {
            tracing::warn!(label_id, "replacing existing points category");
        }
    }

    /// The category for `label_id`, if any.
    #[must_use]
    pub fn get(&self, label_id: u32) -> Option<&PointsCategory> {
        self.items.get(&label_id)
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate categories in label id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PointsCategory)> {
        self.items.iter().map(|(&id, category)| (id, category))
    }
}

impl<'de> Deserialize<'de> for PointsCategories {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(serde::de::Error::custom)
    }
}
