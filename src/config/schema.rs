use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::CategoryDefinition;
use crate::scoring::{Composition, CompositionPlan, EnergyColumns, RatioColumns};
use crate::table::Conversion;

pub const DEFAULT_PRESET: &str = "hei-2010";

/// Main configuration.
///
/// Example YAML:
/// ```yaml
/// subject_column: StudyID
/// energy_column: DT_KCAL
/// catalog:
///   preset: hei-2010
/// conversions:
///   - { column: SODIUM, source: DT_SODI, factor: 0.001 }
/// composition:
///   fruit_total: { sum: [F_TOT] }
///   fa:
///     ratio: { numerator: [DT_MFAT, DT_PFAT], denominator: [DT_SFAT] }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Column holding the subject identifier
    #[serde(default = "default_subject_column")]
    pub subject_column: String,

    /// Column holding total energy intake in kcal
    #[serde(default = "default_energy_column")]
    pub energy_column: String,

    /// Which edition (or custom category table) to score against
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Unit pre-conversions applied to the table before scoring
    #[serde(default = "default_conversions")]
    pub conversions: Vec<Conversion>,

    /// Raw columns feeding each category
    #[serde(default = "default_composition")]
    pub composition: CompositionPlan,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "hei_score=debug")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Also append log output to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subject_column: default_subject_column(),
            energy_column: default_energy_column(),
            catalog: CatalogConfig::default(),
            conversions: default_conversions(),
            composition: default_composition(),
            log_level: Some("info".to_string()),
            log_file: None,
        }
    }
}

/// Catalog selection: a built-in preset or an inline category list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Built-in edition name (e.g. "hei-2010")
    #[serde(default)]
    pub preset: Option<String>,

    /// Label for a custom catalog (default: "custom")
    #[serde(default)]
    pub edition: Option<String>,

    /// Custom category definitions, replacing any preset wholesale
    #[serde(default)]
    pub categories: Option<Vec<CategoryDefinition>>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            preset: Some(DEFAULT_PRESET.to_string()),
            edition: None,
            categories: None,
        }
    }
}

fn default_subject_column() -> String {
    "StudyID".to_string()
}

fn default_energy_column() -> String {
    "DT_KCAL".to_string()
}

/// Unit conversions for the NuMoM food frequency questionnaire export.
pub fn default_conversions() -> Vec<Conversion> {
    let convert = |column: &str, source: &str, factor: f64| Conversion {
        column: column.to_string(),
        source: source.to_string(),
        factor,
    };
    vec![
        // teaspoons -> grams
        convert("ADD_SUG", "ADD_SUG", 4.0),
        // cup equivalents -> ounce equivalents
        convert("LEG_MEAT", "LEGUMES", 4.0),
        convert("SOY_MEAT", "M_SOY", 4.0),
        // mg -> g
        convert("SODIUM", "DT_SODI", 0.001),
    ]
}

/// HEI-2010 composition over NuMoM food frequency questionnaire columns.
pub fn default_composition() -> CompositionPlan {
    let mut plan = CompositionPlan::new();
    let mut sum = |id: &str, columns: &[&str]| {
        plan.insert(id.to_string(), Composition::sum(columns.iter().copied()));
    };

    sum("fruit_total", &["F_TOT"]);
    sum("fruit_whole", &["F_SOLID"]);
    sum("veg", &["V_TOT"]);
    sum("grn_bean", &["V_DRKGR", "LEGUMES"]);
    sum("whl_grn", &["G_WHL"]);
    sum("dairy", &["D_TOT"]);
    sum("prot", &["M_MPF", "M_EGG", "M_NUTSD", "M_SOY", "LEG_MEAT"]);
    sum("sf_plant", &["M_FISH_HI", "M_FISH_LO", "M_SOY", "LEGUMES", "M_NUTSD"]);
    sum("rf_grn", &["G_NWHL"]);
    sum("sodium", &["SODIUM"]);

    plan.insert(
        "fa".to_string(),
        Composition::Ratio(RatioColumns {
            numerator: vec!["DT_MFAT".to_string(), "DT_PFAT".to_string()],
            denominator: vec!["DT_SFAT".to_string()],
        }),
    );
    plan.insert(
        "empty_cal".to_string(),
        Composition::WeightedEnergy(EnergyColumns {
            added_sugar: "ADD_SUG".to_string(),
            solid_fat: "DFAT_SOL".to_string(),
            alcohol: "DT_ALCO".to_string(),
        }),
    );
    plan
}
