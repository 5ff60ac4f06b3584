use super::{CategoryDefinition, Shape};

/// Built-in editions, addressable by name.
pub const PRESETS: &[(&str, fn() -> Vec<CategoryDefinition>)] = &[("hei-2010", hei_2010)];

fn category(
    id: &str,
    display_name: &str,
    goal: f64,
    total_points: f64,
    clamp_bound: Option<f64>,
    shape: Shape,
) -> CategoryDefinition {
    CategoryDefinition {
        id: id.to_string(),
        display_name: display_name.to_string(),
        goal,
        total_points,
        clamp_bound,
        shape,
    }
}

/// HEI-2010 standards.
///
/// Adequacy components are per 1000 kcal (cup or ounce equivalents), sodium
/// is grams per 1000 kcal, the fatty acid ratio is dimensionless and empty
/// calories are a fraction of total energy.
pub fn hei_2010() -> Vec<CategoryDefinition> {
    use Shape::*;

    vec![
        category("fruit_total", "Total Fruit", 0.8, 5.0, None, SaturatingMoreIsBetter),
        category("fruit_whole", "Whole Fruit", 0.4, 5.0, None, SaturatingMoreIsBetter),
        category("veg", "Vegetables", 1.1, 5.0, None, SaturatingMoreIsBetter),
        category("grn_bean", "Greens and Beans", 0.2, 5.0, None, SaturatingMoreIsBetter),
        category("whl_grn", "Whole Grains", 1.5, 10.0, None, SaturatingMoreIsBetter),
        category("dairy", "Dairy", 1.3, 10.0, None, SaturatingMoreIsBetter),
        category("prot", "Total Protein", 2.5, 5.0, None, SaturatingMoreIsBetter),
        category(
            "sf_plant",
            "Seafood and Plant Proteins",
            0.3,
            5.0,
            None,
            SaturatingMoreIsBetter,
        ),
        // zero at or below a ratio of 1.2
        category("fa", "Fatty Acids (MUFA+PUFA)/SFA", 2.5, 10.0, Some(1.2), RatioWithFloor),
        // zero at or above 4.3 oz per 1000 kcal
        category("rf_grn", "Refined Grains", 1.8, 10.0, Some(4.3), SaturatingLessIsBetter),
        // zero at or above 2.0 g per 1000 kcal
        category("sodium", "Sodium", 1.1, 10.0, Some(2.0), SaturatingLessIsBetter),
        // zero at or above 50% of energy
        category(
            "empty_cal",
            "Empty Calories (solid fats, added sugars, alcohol)",
            0.19,
            20.0,
            Some(0.5),
            ModerationThreshold,
        ),
    ]
}
