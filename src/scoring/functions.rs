//! Scoring curves.
//!
//! Each function maps a prepared value `x` to points in `[0, total]`. Boundary
//! comparisons are inclusive so that a value sitting exactly on `goal` or on
//! the bound gets the saturated score rather than an interpolated one. A NaN
//! input scores zero.

/// Linear credit up to `goal`, capped at `total`.
pub fn more_is_better(x: f64, goal: f64, total: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    if x >= goal {
        return total;
    }
    ((x / goal) * total).clamp(0.0, total)
}

/// Full credit at or below `goal`, zero at or above `bound`, linear in between.
pub fn less_is_better(x: f64, goal: f64, bound: f64, total: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    if x <= goal {
        total
    } else if x >= bound {
        0.0
    } else {
        (total * (x - bound) / (goal - bound)).clamp(0.0, total)
    }
}

/// Full credit at or above `goal`, zero at or below `floor`, linear in between.
pub fn ratio_with_floor(x: f64, goal: f64, floor: f64, total: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    if x >= goal {
        total
    } else if x <= floor {
        0.0
    } else {
        (total * (x - floor) / (goal - floor)).clamp(0.0, total)
    }
}

/// Moderation curve over a fraction of total energy.
///
/// Full credit at or below `goal` (e.g. 19% of energy), zero at or above
/// `bound` (e.g. 50%). The interpolation band is `bound - goal` wide.
pub fn moderation(energy_fraction: f64, goal: f64, bound: f64, total: f64) -> f64 {
    less_is_better(energy_fraction, goal, bound, total)
}
