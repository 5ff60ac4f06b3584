use serde::{Deserialize, Serialize};

use crate::catalog::{CategoryDefinition, Shape};
use crate::error::HeiError;
use crate::table::SubjectRecord;

/// Alcohol energy density (per 1000 kcal) exempt from the empty calorie penalty.
pub const ALCOHOL_ALLOWANCE: f64 = 13.0;

pub const KCAL_PER_GRAM_SUGAR: f64 = 4.0;
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;
pub const KCAL_PER_GRAM_ALCOHOL: f64 = 7.0;

/// How a category's input quantity is built from raw nutrient columns.
///
/// Example YAML:
/// ```yaml
/// composition:
///   grn_bean: { sum: [V_DRKGR, LEGUMES] }
///   fa:
///     ratio: { numerator: [DT_MFAT, DT_PFAT], denominator: [DT_SFAT] }
///   empty_cal:
///     weighted_energy: { added_sugar: ADD_SUG, solid_fat: DFAT_SOL, alcohol: DT_ALCO }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// Sum of the listed columns.
    Sum(Vec<String>),
    /// Sum of numerator columns over sum of denominator columns.
    Ratio(RatioColumns),
    /// Energy from added sugar, solid fat and excess alcohol, per 1000 kcal.
    WeightedEnergy(EnergyColumns),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RatioColumns {
    pub numerator: Vec<String>,
    pub denominator: Vec<String>,
}

/// Gram columns feeding the empty calorie composition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EnergyColumns {
    pub added_sugar: String,
    pub solid_fat: String,
    pub alcohol: String,
}

impl Composition {
    pub fn sum<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Composition::Sum(columns.into_iter().map(Into::into).collect())
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Composition::Sum(_) => "sum",
            Composition::Ratio(_) => "ratio",
            Composition::WeightedEnergy(_) => "weighted_energy",
        }
    }

    /// Raw columns this composition reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Composition::Sum(columns) => columns.iter().map(String::as_str).collect(),
            Composition::Ratio(ratio) => ratio
                .numerator
                .iter()
                .chain(ratio.denominator.iter())
                .map(String::as_str)
                .collect(),
            Composition::WeightedEnergy(energy) => vec![
                energy.added_sugar.as_str(),
                energy.solid_fat.as_str(),
                energy.alcohol.as_str(),
            ],
        }
    }

    pub fn accepts(&self, shape: Shape) -> bool {
        match self {
            Composition::Sum(_) => matches!(
                shape,
                Shape::SaturatingMoreIsBetter | Shape::SaturatingLessIsBetter
            ),
            Composition::Ratio(_) => shape == Shape::RatioWithFloor,
            Composition::WeightedEnergy(_) => shape == Shape::ModerationThreshold,
        }
    }

    pub fn check_shape(&self, category: &CategoryDefinition) -> Result<(), HeiError> {
        if self.accepts(category.shape) {
            Ok(())
        } else {
            Err(HeiError::CompositionMismatch {
                category: category.id.clone(),
                mode: self.mode(),
                shape: category.shape.name(),
            })
        }
    }

    /// Composed quantity for one subject, in the category's native unit.
    ///
    /// `kcal_norm` is the subject's energy divisor; only the weighted-energy
    /// mode reads it.
    pub fn compose(
        &self,
        category_id: &str,
        record: &SubjectRecord,
        kcal_norm: &Result<f64, HeiError>,
    ) -> Result<f64, HeiError> {
        match self {
            Composition::Sum(columns) => sum_columns(record, columns),
            Composition::Ratio(ratio) => compose_ratio(category_id, record, ratio),
            Composition::WeightedEnergy(energy) => {
                compose_weighted_energy(record, energy, kcal_norm.clone()?)
            }
        }
    }
}

/// Sum of the named columns. A missing value is an error, never zero.
pub fn sum_columns(record: &SubjectRecord, columns: &[String]) -> Result<f64, HeiError> {
    columns
        .iter()
        .map(|column| record.nutrient(column))
        .sum()
}

/// `sum(numerator) / sum(denominator)`; a zero denominator is `DivisionByZero`.
pub fn compose_ratio(
    category_id: &str,
    record: &SubjectRecord,
    ratio: &RatioColumns,
) -> Result<f64, HeiError> {
    let numerator = sum_columns(record, &ratio.numerator)?;
    let denominator = sum_columns(record, &ratio.denominator)?;
    if denominator == 0.0 {
        return Err(HeiError::DivisionByZero {
            category: category_id.to_string(),
            subject: record.id().to_string(),
        });
    }
    Ok(numerator / denominator)
}

/// Empty calorie energy per 1000 kcal.
///
/// Gram amounts are scaled by the energy divisor and weighted by their energy
/// content. Only alcohol beyond `ALCOHOL_ALLOWANCE` counts.
pub fn compose_weighted_energy(
    record: &SubjectRecord,
    columns: &EnergyColumns,
    kcal_norm: f64,
) -> Result<f64, HeiError> {
    let sugar = record.nutrient(&columns.added_sugar)? / kcal_norm;
    let fat = record.nutrient(&columns.solid_fat)? / kcal_norm;
    let alcohol = excess_alcohol(record.nutrient(&columns.alcohol)? / kcal_norm);

    Ok(sugar * KCAL_PER_GRAM_SUGAR + fat * KCAL_PER_GRAM_FAT + alcohol * KCAL_PER_GRAM_ALCOHOL)
}

fn excess_alcohol(density: f64) -> f64 {
    if density < ALCOHOL_ALLOWANCE {
        0.0
    } else {
        density - ALCOHOL_ALLOWANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn energy_columns() -> EnergyColumns {
        EnergyColumns {
            added_sugar: "ADD_SUG".to_string(),
            solid_fat: "DFAT_SOL".to_string(),
            alcohol: "DT_ALCO".to_string(),
        }
    }

    fn fat_ratio() -> RatioColumns {
        RatioColumns {
            numerator: vec!["DT_MFAT".to_string(), "DT_PFAT".to_string()],
            denominator: vec!["DT_SFAT".to_string()],
        }
    }

    #[test]
    fn test_sum_columns() {
        let record = SubjectRecord::new("s1").with("V_DRKGR", 0.3).with("LEGUMES", 0.2);
        let total = sum_columns(&record, &["V_DRKGR".to_string(), "LEGUMES".to_string()]).unwrap();
        assert!((total - 0.5).abs() < EPS);
    }

    #[test]
    fn test_sum_missing_value_is_error() {
        let record = SubjectRecord::new("s1").with("V_DRKGR", 0.3);
        let err = sum_columns(&record, &["V_DRKGR".to_string(), "LEGUMES".to_string()]).unwrap_err();
        assert!(matches!(err, HeiError::MissingValue { column, .. } if column == "LEGUMES"));
    }

    #[test]
    fn test_ratio_composition() {
        let record = SubjectRecord::new("s1")
            .with("DT_SFAT", 10.0)
            .with("DT_MFAT", 8.0)
            .with("DT_PFAT", 6.0);
        let ratio = compose_ratio("fa", &record, &fat_ratio()).unwrap();
        assert!((ratio - 1.4).abs() < EPS);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        let record = SubjectRecord::new("s1")
            .with("DT_SFAT", 0.0)
            .with("DT_MFAT", 8.0)
            .with("DT_PFAT", 6.0);
        assert_eq!(
            compose_ratio("fa", &record, &fat_ratio()),
            Err(HeiError::DivisionByZero {
                category: "fa".to_string(),
                subject: "s1".to_string()
            })
        );
    }

    #[test]
    fn test_weighted_energy_without_alcohol_excess() {
        // 2000 kcal: 50 g sugar -> 25 * 4, 20 g fat -> 10 * 9, 10 g alcohol -> 5 < 13
        let record = SubjectRecord::new("s1")
            .with("ADD_SUG", 50.0)
            .with("DFAT_SOL", 20.0)
            .with("DT_ALCO", 10.0);
        let composed = compose_weighted_energy(&record, &energy_columns(), 2.0).unwrap();
        assert!((composed - 190.0).abs() < EPS);
    }

    #[test]
    fn test_weighted_energy_counts_only_excess_alcohol() {
        // 1000 kcal: 20 g alcohol -> 20 - 13 = 7 -> 49 kcal
        let record = SubjectRecord::new("s1")
            .with("ADD_SUG", 0.0)
            .with("DFAT_SOL", 0.0)
            .with("DT_ALCO", 20.0);
        let composed = compose_weighted_energy(&record, &energy_columns(), 1.0).unwrap();
        assert!((composed - 49.0).abs() < EPS);
    }

    #[test]
    fn test_alcohol_allowance_boundary() {
        assert_eq!(excess_alcohol(12.999), 0.0);
        assert_eq!(excess_alcohol(13.0), 0.0);
        assert_eq!(excess_alcohol(14.5), 1.5);
    }

    #[test]
    fn test_weighted_energy_propagates_energy_error() {
        let record = SubjectRecord::new("s1")
            .with("ADD_SUG", 1.0)
            .with("DFAT_SOL", 1.0)
            .with("DT_ALCO", 1.0);
        let composition = Composition::WeightedEnergy(energy_columns());
        let kcal_norm = Err(HeiError::InvalidEnergyIntake { kcal: 0.0 });
        assert_eq!(
            composition.compose("empty_cal", &record, &kcal_norm),
            Err(HeiError::InvalidEnergyIntake { kcal: 0.0 })
        );
    }

    #[test]
    fn test_sum_ignores_energy_error() {
        let record = SubjectRecord::new("s1").with("F_TOT", 1.6);
        let composition = Composition::sum(["F_TOT"]);
        let kcal_norm = Err(HeiError::InvalidEnergyIntake { kcal: 0.0 });
        assert_eq!(composition.compose("fruit_total", &record, &kcal_norm), Ok(1.6));
    }

    #[test]
    fn test_accepts_matching_shapes() {
        let sum = Composition::sum(["F_TOT"]);
        assert!(sum.accepts(Shape::SaturatingMoreIsBetter));
        assert!(sum.accepts(Shape::SaturatingLessIsBetter));
        assert!(!sum.accepts(Shape::RatioWithFloor));
        assert!(Composition::Ratio(fat_ratio()).accepts(Shape::RatioWithFloor));
        assert!(!Composition::WeightedEnergy(energy_columns()).accepts(Shape::RatioWithFloor));
    }

    #[test]
    fn test_columns_lists_every_input() {
        assert_eq!(
            Composition::Ratio(fat_ratio()).columns(),
            vec!["DT_MFAT", "DT_PFAT", "DT_SFAT"]
        );
        assert_eq!(
            Composition::WeightedEnergy(energy_columns()).columns(),
            vec!["ADD_SUG", "DFAT_SOL", "DT_ALCO"]
        );
    }

    #[test]
    fn test_composition_parse_from_yaml() {
        let yaml = r#"
ratio:
  numerator: [DT_MFAT, DT_PFAT]
  denominator: [DT_SFAT]
"#;
        let composition: Composition = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(composition, Composition::Ratio(fat_ratio()));

        let sum: Composition = serde_saphyr::from_str("sum: [F_TOT]").unwrap();
        assert_eq!(sum, Composition::sum(["F_TOT"]));
    }
}
