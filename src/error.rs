use thiserror::Error;

/// Errors raised while composing, scoring, or aggregating HEI categories.
///
/// Every variant is surfaced to the caller as-is. None of them is retried and
/// none is replaced by a default value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeiError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("missing column '{column}' in subject table")]
    MissingColumn { column: String },

    #[error("subject '{subject}' has no value for column '{column}'")]
    MissingValue { column: String, subject: String },

    #[error("subject '{subject}' has invalid value {value} for column '{column}': must be finite and non-negative")]
    InvalidNutrientValue {
        column: String,
        subject: String,
        value: f64,
    },

    #[error("invalid energy intake {kcal} kcal: must be a finite positive number")]
    InvalidEnergyIntake { kcal: f64 },

    #[error("division by zero composing '{category}' for subject '{subject}'")]
    DivisionByZero { category: String, subject: String },

    #[error("category '{0}' was never composed")]
    UnscoredCategory(String),

    #[error("subject '{subject}' has no sub-score for category '{category}'")]
    IncompleteScore { subject: String, category: String },

    #[error("subject '{subject}' has more than one sub-score for category '{category}'")]
    DuplicateCategory { subject: String, category: String },

    #[error("category '{category}' ({shape}) cannot use {mode} composition")]
    CompositionMismatch {
        category: String,
        mode: &'static str,
        shape: &'static str,
    },

    #[error("duplicate subject '{0}'")]
    DuplicateSubject(String),

    #[error("invalid catalog: {}", .0.join("; "))]
    InvalidCatalog(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_catalog_lists_every_problem() {
        let err = HeiError::InvalidCatalog(vec![
            "fruit_total.goal: must be positive".to_string(),
            "sodium.clamp_bound: required".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid catalog: fruit_total.goal: must be positive; sodium.clamp_bound: required"
        );
    }

    #[test]
    fn test_energy_error_message() {
        let err = HeiError::InvalidEnergyIntake { kcal: 0.0 };
        assert!(err.to_string().contains("0 kcal"));
    }
}
