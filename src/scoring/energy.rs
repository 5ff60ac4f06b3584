use crate::error::HeiError;

/// Energy reference the index standards are expressed against.
pub const KCAL_PER_UNIT: f64 = 1000.0;

/// Energy divisor for a subject: `total_kcal / 1000`.
///
/// Fails with `InvalidEnergyIntake` when the intake is zero, negative, or not
/// finite, so that a density can never come out as infinity or NaN.
pub fn kcal_norm(total_kcal: f64) -> Result<f64, HeiError> {
    if !total_kcal.is_finite() || total_kcal <= 0.0 {
        return Err(HeiError::InvalidEnergyIntake { kcal: total_kcal });
    }
    Ok(total_kcal / KCAL_PER_UNIT)
}

/// Amount per 1000 kcal of intake.
pub fn normalize(raw_quantity: f64, total_kcal: f64) -> Result<f64, HeiError> {
    Ok(raw_quantity / kcal_norm(total_kcal)?)
}
