use super::schema::Config;
use crate::catalog::validate_catalog;
use crate::scoring::Composition;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.subject_column.trim().is_empty() {
        errors.push("subject_column: must not be empty".to_string());
    }
    if config.energy_column.trim().is_empty() {
        errors.push("energy_column: must not be empty".to_string());
    }
    if config.subject_column == config.energy_column {
        errors.push("energy_column: must differ from subject_column".to_string());
    }

    // Catalog: resolve preset or validate inline categories
    let catalog = match config.catalog.build() {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            match &config.catalog.categories {
                Some(categories) if config.catalog.preset.is_none() => {
                    if let Err(catalog_errors) = validate_catalog(categories) {
                        errors.extend(catalog_errors.into_iter().map(|e| format!("catalog.{}", e)));
                    }
                }
                _ => errors.push(format!("catalog: {}", e)),
            }
            None
        }
    };

    for (i, conversion) in config.conversions.iter().enumerate() {
        if conversion.column.trim().is_empty() || conversion.source.trim().is_empty() {
            errors.push(format!("conversions[{}]: column and source must not be empty", i));
        }
        if !conversion.factor.is_finite() || conversion.factor <= 0.0 {
            errors.push(format!(
                "conversions[{}].factor: must be a finite positive number, got {}",
                i, conversion.factor
            ));
        }
    }

    for (id, composition) in &config.composition {
        match composition {
            Composition::Sum(columns) if columns.is_empty() => {
                errors.push(format!("composition.{}.sum: must list at least one column", id));
            }
            Composition::Ratio(ratio) if ratio.numerator.is_empty() || ratio.denominator.is_empty() => {
                errors.push(format!(
                    "composition.{}.ratio: numerator and denominator must list at least one column",
                    id
                ));
            }
            _ => {}
        }
        if composition.columns().iter().any(|c| c.trim().is_empty()) {
            errors.push(format!("composition.{}: column names must not be empty", id));
        }

        if let Some(catalog) = &catalog {
            match catalog.lookup(id) {
                Ok(category) => {
                    if let Err(e) = composition.check_shape(category) {
                        errors.push(format!("composition.{}: {}", id, e));
                    }
                }
                Err(_) => errors.push(format!(
                    "composition.{}: not a category of catalog '{}'",
                    id,
                    catalog.edition()
                )),
            }
        }
    }

    if let Some(catalog) = &catalog {
        for id in catalog.ids() {
            if !config.composition.contains_key(id) {
                errors.push(format!("composition.{}: missing (every catalog category needs one)", id));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
