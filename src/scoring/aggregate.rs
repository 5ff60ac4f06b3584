use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::error::HeiError;

/// Points awarded for one category of one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubScore {
    pub category_id: String,
    /// Value handed to the scoring curve (density, ratio, or energy fraction).
    pub value: f64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectScore {
    pub subject_id: String,
    pub sub_scores: Vec<SubScore>,
    pub composite_index: f64,
}

impl SubjectScore {
    pub fn points(&self, category_id: &str) -> Option<f64> {
        self.sub_scores
            .iter()
            .find(|s| s.category_id == category_id)
            .map(|s| s.points)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectFailure {
    pub subject_id: String,
    pub error: HeiError,
}

/// Sub-scores for one subject, or the reason it could not be scored.
pub type SubjectOutcome = (String, Result<Vec<SubScore>, HeiError>);

/// Result of a scoring pass: scored subjects plus per-subject failures.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub edition: String,
    pub categories: Vec<String>,
    pub max_points: f64,
    pub scored: Vec<SubjectScore>,
    pub failures: Vec<SubjectFailure>,
}

impl ScoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn subject(&self, subject_id: &str) -> Option<&SubjectScore> {
        self.scored.iter().find(|s| s.subject_id == subject_id)
    }
}

/// Sum a subject's sub-scores into the composite index.
///
/// Every catalog category must be present exactly once. A missing category is
/// `IncompleteScore`, a repeated one is `DuplicateCategory` and a category
/// outside the catalog is `UnknownCategory`.
/// Sub-scores come back in catalog order.
pub fn aggregate(
    catalog: &Catalog,
    subject_id: &str,
    sub_scores: Vec<SubScore>,
) -> Result<SubjectScore, HeiError> {
    if let Some(extra) = sub_scores.iter().find(|s| !catalog.contains(&s.category_id)) {
        return Err(HeiError::UnknownCategory(extra.category_id.clone()));
    }

    let mut seen = HashSet::with_capacity(sub_scores.len());
    if let Some(repeated) = sub_scores.iter().find(|s| !seen.insert(s.category_id.as_str())) {
        return Err(HeiError::DuplicateCategory {
            subject: subject_id.to_string(),
            category: repeated.category_id.clone(),
        });
    }

    let mut ordered = Vec::with_capacity(catalog.len());
    for category in catalog.iter() {
        let score = sub_scores
            .iter()
            .find(|s| s.category_id == category.id)
            .ok_or_else(|| HeiError::IncompleteScore {
                subject: subject_id.to_string(),
                category: category.id.clone(),
            })?;
        ordered.push(score.clone());
    }

    let composite_index = ordered.iter().map(|s| s.points).sum();
    Ok(SubjectScore {
        subject_id: subject_id.to_string(),
        sub_scores: ordered,
        composite_index,
    })
}

/// Concatenate worker partitions, rejecting a subject that appears twice.
pub fn merge_partitions(
    partitions: Vec<Vec<SubjectOutcome>>,
) -> Result<Vec<SubjectOutcome>, HeiError> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(partitions.iter().map(Vec::len).sum());
    for outcome in partitions.into_iter().flatten() {
        if !seen.insert(outcome.0.clone()) {
            return Err(HeiError::DuplicateSubject(outcome.0));
        }
        merged.push(outcome);
    }
    Ok(merged)
}

/// Aggregate every outcome, splitting scored subjects from failed ones.
pub fn build_report(catalog: &Catalog, outcomes: Vec<SubjectOutcome>) -> ScoreReport {
    let mut scored = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for (subject_id, result) in outcomes {
        match result.and_then(|subs| aggregate(catalog, &subject_id, subs)) {
            Ok(score) => scored.push(score),
            Err(error) => {
                tracing::warn!(subject = %subject_id, %error, "subject not scored");
                failures.push(SubjectFailure { subject_id, error });
            }
        }
    }

    ScoreReport {
        edition: catalog.edition().to_string(),
        categories: catalog.ids().map(str::to_string).collect(),
        max_points: catalog.max_points(),
        scored,
        failures,
    }
}
