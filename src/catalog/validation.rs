use std::collections::HashSet;

use super::{CategoryDefinition, Shape};

/// Lowest floor a fatty acid ratio category may use.
const MIN_RATIO_FLOOR: f64 = 1.0;

/// Validate a set of category definitions.
/// Returns all validation errors at once (not just the first).
pub fn validate_catalog(categories: &[CategoryDefinition]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if categories.is_empty() {
        errors.push("catalog: must define at least one category".to_string());
    }

    let mut seen = HashSet::new();
    for category in categories {
        let id = &category.id;

        if id.trim().is_empty() {
            errors.push("catalog: category id must not be empty".to_string());
        } else if !seen.insert(id.as_str()) {
            errors.push(format!("{}: duplicate category id", id));
        }

        if !category.goal.is_finite() || category.goal <= 0.0 {
            errors.push(format!(
                "{}.goal: must be a finite positive number, got {}",
                id, category.goal
            ));
        }

        if !category.total_points.is_finite() || category.total_points <= 0.0 {
            errors.push(format!(
                "{}.total_points: must be a finite positive number, got {}",
                id, category.total_points
            ));
        }

        match (category.shape, category.clamp_bound) {
            (Shape::SaturatingMoreIsBetter, _) => {}
            (shape, None) => {
                errors.push(format!("{}.clamp_bound: required for {}", id, shape));
            }
            (_, Some(bound)) if !bound.is_finite() => {
                errors.push(format!("{}.clamp_bound: must be finite, got {}", id, bound));
            }
            (Shape::SaturatingLessIsBetter | Shape::ModerationThreshold, Some(bound)) => {
                if bound <= category.goal {
                    errors.push(format!(
                        "{}.clamp_bound: must be greater than goal {}, got {}",
                        id, category.goal, bound
                    ));
                }
            }
            (Shape::RatioWithFloor, Some(floor)) => {
                if floor < MIN_RATIO_FLOOR || floor >= category.goal {
                    errors.push(format!(
                        "{}.clamp_bound: ratio floor must lie in [{}, {}), got {}",
                        id, MIN_RATIO_FLOOR, category.goal, floor
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
