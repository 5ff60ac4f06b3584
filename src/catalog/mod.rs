pub mod preset;
pub mod validation;

pub use preset::{hei_2010, PRESETS};
pub use validation::validate_catalog;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::HeiError;
use crate::scoring::functions;

/// Shape of the curve that turns a prepared category value into points.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Linear credit up to `goal`, capped at `total_points`.
    SaturatingMoreIsBetter,
    /// Full credit at or below `goal`, zero at or above `clamp_bound`.
    SaturatingLessIsBetter,
    /// Full credit at or above `goal`, zero at or below the floor (`clamp_bound`).
    RatioWithFloor,
    /// Like less-is-better, applied to a fraction of total energy.
    ModerationThreshold,
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::SaturatingMoreIsBetter => "saturating_more_is_better",
            Shape::SaturatingLessIsBetter => "saturating_less_is_better",
            Shape::RatioWithFloor => "ratio_with_floor",
            Shape::ModerationThreshold => "moderation_threshold",
        }
    }

    /// Whether the composed quantity is divided by `kcal / 1000` before scoring.
    pub fn requires_energy_density(&self) -> bool {
        matches!(
            self,
            Shape::SaturatingMoreIsBetter | Shape::SaturatingLessIsBetter
        )
    }

    /// Whether a `clamp_bound` must be configured for this shape.
    pub fn requires_bound(&self) -> bool {
        !matches!(self, Shape::SaturatingMoreIsBetter)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One scored dimension of the index.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryDefinition {
    pub id: String,
    pub display_name: String,
    pub goal: f64,
    pub total_points: f64,
    #[serde(default)]
    pub clamp_bound: Option<f64>,
    pub shape: Shape,
}

impl CategoryDefinition {
    /// Score an already prepared value (density, ratio, or energy fraction).
    ///
    /// A bounded shape with no `clamp_bound` scores zero; `Catalog::new`
    /// rejects such definitions, so this only matters for hand-built values.
    pub fn score(&self, x: f64) -> f64 {
        let total = self.total_points;
        match (self.shape, self.clamp_bound) {
            (Shape::SaturatingMoreIsBetter, _) => functions::more_is_better(x, self.goal, total),
            (Shape::SaturatingLessIsBetter, Some(bound)) => {
                functions::less_is_better(x, self.goal, bound, total)
            }
            (Shape::RatioWithFloor, Some(floor)) => {
                functions::ratio_with_floor(x, self.goal, floor, total)
            }
            (Shape::ModerationThreshold, Some(bound)) => {
                functions::moderation(x, self.goal, bound, total)
            }
            (_, None) => 0.0,
        }
    }
}

/// An immutable set of category definitions for one edition of the index.
#[derive(Debug, Clone)]
pub struct Catalog {
    edition: String,
    categories: Vec<CategoryDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting it with every validation problem at once.
    pub fn new(
        edition: impl Into<String>,
        categories: Vec<CategoryDefinition>,
    ) -> Result<Self, HeiError> {
        validate_catalog(&categories).map_err(HeiError::InvalidCatalog)?;
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Ok(Self {
            edition: edition.into(),
            categories,
            index,
        })
    }

    /// Look up a built-in edition by name (e.g. "hei-2010").
    pub fn preset(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        PRESETS
            .iter()
            .find(|(preset, _)| *preset == normalized)
            .and_then(|(preset, build)| Self::new(*preset, build()).ok())
    }

    pub fn edition(&self) -> &str {
        &self.edition
    }

    pub fn lookup(&self, category_id: &str) -> Result<&CategoryDefinition, HeiError> {
        self.index
            .get(category_id)
            .map(|&i| &self.categories[i])
            .ok_or_else(|| HeiError::UnknownCategory(category_id.to_string()))
    }

    pub fn contains(&self, category_id: &str) -> bool {
        self.index.contains_key(category_id)
    }

    /// Categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Upper bound of the composite index.
    pub fn max_points(&self) -> f64 {
        self.categories.iter().map(|c| c.total_points).sum()
    }
}
