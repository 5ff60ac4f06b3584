use std::collections::{BTreeMap, HashMap};

use super::aggregate::{build_report, merge_partitions, ScoreReport, SubScore, SubjectOutcome};
use super::compose::Composition;
use super::energy::{kcal_norm, KCAL_PER_UNIT};
use crate::catalog::{Catalog, CategoryDefinition, Shape};
use crate::error::HeiError;
use crate::table::SubjectTable;

/// Composition per category id.
pub type CompositionPlan = BTreeMap<String, Composition>;

/// Scores one subject table against one catalog.
///
/// Usage is two passes: every catalog category is composed (raw columns to a
/// per-subject quantity), then scored and aggregated. The catalog is bound for
/// the engine's lifetime and the table is only read.
pub struct ScoringEngine<'a> {
    catalog: Catalog,
    table: &'a SubjectTable,
    energy_column: String,
    kcal_norms: Vec<Result<f64, HeiError>>,
    inputs: HashMap<String, Vec<Result<f64, HeiError>>>,
}

impl<'a> ScoringEngine<'a> {
    /// Bind a catalog to a table. The energy divisor is computed here, once per
    /// subject; a subject with unusable intake fails later, on its own row.
    pub fn new(
        catalog: Catalog,
        table: &'a SubjectTable,
        energy_column: &str,
    ) -> Result<Self, HeiError> {
        table.require_columns([energy_column])?;

        let kcal_norms = table
            .records()
            .iter()
            .map(|record| {
                let kcal = record.raw(energy_column).ok_or_else(|| HeiError::MissingValue {
                    column: energy_column.to_string(),
                    subject: record.id().to_string(),
                })?;
                kcal_norm(kcal)
            })
            .collect();

        Ok(Self {
            catalog,
            table,
            energy_column: energy_column.to_string(),
            kcal_norms,
            inputs: HashMap::new(),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn energy_column(&self) -> &str {
        &self.energy_column
    }

    /// Check a plan against the catalog and the table before composing.
    ///
    /// Every catalog category needs a composition of the right mode and every
    /// column it reads must exist in the table.
    pub fn validate_plan(&self, plan: &CompositionPlan) -> Result<(), HeiError> {
        for (category_id, composition) in plan {
            let category = self.catalog.lookup(category_id)?;
            composition.check_shape(category)?;
            self.table.require_columns(composition.columns())?;
        }
        if let Some(missing) = self.catalog.ids().find(|id| !plan.contains_key(*id)) {
            return Err(HeiError::UnscoredCategory(missing.to_string()));
        }
        Ok(())
    }

    /// Compose one category for every subject.
    pub fn compose(&mut self, category_id: &str, composition: &Composition) -> Result<(), HeiError> {
        let category = self.catalog.lookup(category_id)?;
        composition.check_shape(category)?;
        self.table.require_columns(composition.columns())?;
        self.compose_checked(category_id, composition);
        Ok(())
    }

    /// Validate a whole plan once, then compose each of its categories.
    pub fn compose_plan(&mut self, plan: &CompositionPlan) -> Result<(), HeiError> {
        self.validate_plan(plan)?;
        for (category_id, composition) in plan {
            self.compose_checked(category_id, composition);
        }
        Ok(())
    }

    /// Category, shape and columns are already checked.
    fn compose_checked(&mut self, category_id: &str, composition: &Composition) {
        let columns = composition.columns();
        let values = self
            .table
            .records()
            .iter()
            .zip(&self.kcal_norms)
            .map(|(record, norm)| composition.compose(category_id, record, norm))
            .collect();

        tracing::info!(
            category = category_id,
            mode = composition.mode(),
            ?columns,
            "composed category"
        );
        self.inputs.insert(category_id.to_string(), values);
    }

    pub fn is_composed(&self, category_id: &str) -> bool {
        self.inputs.contains_key(category_id)
    }

    /// Sub-scores of one category, one entry per subject in table order.
    pub fn score_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<Result<SubScore, HeiError>>, HeiError> {
        let category = self.catalog.lookup(category_id)?;
        let inputs = self
            .inputs
            .get(category_id)
            .ok_or_else(|| HeiError::UnscoredCategory(category_id.to_string()))?;

        Ok((0..self.table.len())
            .map(|subject| self.sub_score(category, &inputs[subject], subject))
            .collect())
    }

    /// Score and aggregate every subject in table order.
    pub fn score(&self) -> Result<ScoreReport, HeiError> {
        self.ensure_composed()?;
        let outcomes = (0..self.table.len()).map(|i| self.outcome(i)).collect();
        Ok(build_report(&self.catalog, outcomes))
    }

    /// Same result as `score`, with subjects split into contiguous partitions
    /// scored on `workers` threads.
    pub fn score_partitioned(&self, workers: usize) -> Result<ScoreReport, HeiError> {
        self.ensure_composed()?;

        let subjects = self.table.len();
        let workers = workers.clamp(1, subjects.max(1));
        let chunk = subjects.div_ceil(workers).max(1);

        let partitions: Vec<Vec<SubjectOutcome>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..subjects)
                .step_by(chunk)
                .map(|start| {
                    let end = (start + chunk).min(subjects);
                    scope.spawn(move || (start..end).map(|i| self.outcome(i)).collect::<Vec<_>>())
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        tracing::debug!(workers, partitions = partitions.len(), "scored partitions");
        let outcomes = merge_partitions(partitions)?;
        Ok(build_report(&self.catalog, outcomes))
    }

    fn ensure_composed(&self) -> Result<(), HeiError> {
        match self.catalog.ids().find(|id| !self.is_composed(id)) {
            Some(id) => Err(HeiError::UnscoredCategory(id.to_string())),
            None => Ok(()),
        }
    }

    fn outcome(&self, subject: usize) -> SubjectOutcome {
        let subject_id = self.table.records()[subject].id().to_string();
        let result = self
            .catalog
            .iter()
            .map(|category| {
                let inputs = self
                    .inputs
                    .get(&category.id)
                    .ok_or_else(|| HeiError::UnscoredCategory(category.id.clone()))?;
                self.sub_score(category, &inputs[subject], subject)
            })
            .collect();
        (subject_id, result)
    }

    fn sub_score(
        &self,
        category: &CategoryDefinition,
        composed: &Result<f64, HeiError>,
        subject: usize,
    ) -> Result<SubScore, HeiError> {
        let composed = composed.clone()?;
        let value = match category.shape {
            shape if shape.requires_energy_density() => composed / self.kcal_norms[subject].clone()?,
            Shape::ModerationThreshold => composed / KCAL_PER_UNIT,
            _ => composed,
        };
        Ok(SubScore {
            category_id: category.id.clone(),
            value,
            points: category.score(value),
        })
    }
}

/// Compose and score a table in one call.
pub fn score_table(
    catalog: Catalog,
    table: &SubjectTable,
    energy_column: &str,
    plan: &CompositionPlan,
) -> Result<ScoreReport, HeiError> {
    let mut engine = ScoringEngine::new(catalog, table, energy_column)?;
    engine.compose_plan(plan)?;
    engine.score()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_composition;
    use crate::table::SubjectRecord;

    const EPS: f64 = 1e-9;

    fn hei_2010() -> Catalog {
        Catalog::preset("hei-2010").unwrap()
    }

    /// Meets every adequacy goal and stays under every moderation limit at 1000 kcal.
    fn ideal_subject(id: &str) -> SubjectRecord {
        SubjectRecord::new(id)
            .with("DT_KCAL", 1000.0)
            .with("F_TOT", 1.0)
            .with("F_SOLID", 0.5)
            .with("V_TOT", 1.2)
            .with("V_DRKGR", 0.3)
            .with("LEGUMES", 0.1)
            .with("G_WHL", 2.0)
            .with("D_TOT", 2.0)
            .with("M_MPF", 2.0)
            .with("M_EGG", 0.5)
            .with("M_NUTSD", 0.5)
            .with("M_SOY", 0.0)
            .with("LEG_MEAT", 0.4)
            .with("M_FISH_HI", 0.2)
            .with("M_FISH_LO", 0.2)
            .with("G_NWHL", 1.0)
            .with("SODIUM", 1.0)
            .with("DT_MFAT", 20.0)
            .with("DT_PFAT", 10.0)
            .with("DT_SFAT", 10.0)
            .with("ADD_SUG", 10.0)
            .with("DFAT_SOL", 5.0)
            .with("DT_ALCO", 0.0)
    }

    /// Misses every adequacy goal and exceeds every moderation limit.
    fn poor_subject(id: &str) -> SubjectRecord {
        let mut record = ideal_subject(id);
        for column in [
            "F_TOT", "F_SOLID", "V_TOT", "V_DRKGR", "LEGUMES", "G_WHL", "D_TOT", "M_MPF", "M_EGG",
            "M_NUTSD", "LEG_MEAT", "M_FISH_HI", "M_FISH_LO", "DT_MFAT", "DT_PFAT",
        ] {
            record.insert(column, 0.0);
        }
        record.insert("G_NWHL", 5.0);
        record.insert("SODIUM", 3.0);
        record.insert("ADD_SUG", 200.0);
        record
    }

    fn table(records: Vec<SubjectRecord>) -> SubjectTable {
        SubjectTable::from_records(records).unwrap()
    }

    #[test]
    fn test_ideal_and_poor_subjects() {
        let table = table(vec![ideal_subject("best"), poor_subject("worst")]);
        let report = score_table(hei_2010(), &table, "DT_KCAL", &default_composition()).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.subject("best").unwrap().composite_index, 100.0);
        assert_eq!(report.subject("worst").unwrap().composite_index, 0.0);
    }

    #[test]
    fn test_fruit_density_end_to_end() {
        // 1.6 cups at 2000 kcal -> 0.8 per 1000 kcal -> full 5 points
        let table = table(vec![SubjectRecord::new("s1")
            .with("DT_KCAL", 2000.0)
            .with("F_TOT", 1.6)]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine.compose("fruit_total", &Composition::sum(["F_TOT"])).unwrap();

        let scores = engine.score_category("fruit_total").unwrap();
        let score = scores[0].as_ref().unwrap();
        assert_eq!(score.value, 0.8);
        assert_eq!(score.points, 5.0);
    }

    #[test]
    fn test_fatty_acid_ratio_end_to_end() {
        let table = table(vec![SubjectRecord::new("s1")
            .with("DT_KCAL", 2000.0)
            .with("DT_SFAT", 10.0)
            .with("DT_MFAT", 8.0)
            .with("DT_PFAT", 6.0)]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine
            .compose("fa", &default_composition()["fa"])
            .unwrap();

        let scores = engine.score_category("fa").unwrap();
        let score = scores[0].as_ref().unwrap();
        assert!((score.value - 1.4).abs() < EPS);
        assert!((score.points - 1.538_461_5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_calories_scored_as_energy_fraction() {
        // 2000 kcal: 172.5 g sugar -> 345 kcal per 1000 kcal -> 0.345 -> half of 20
        let table = table(vec![SubjectRecord::new("s1")
            .with("DT_KCAL", 2000.0)
            .with("ADD_SUG", 172.5)
            .with("DFAT_SOL", 0.0)
            .with("DT_ALCO", 0.0)]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine
            .compose("empty_cal", &default_composition()["empty_cal"])
            .unwrap();

        let scores = engine.score_category("empty_cal").unwrap();
        let score = scores[0].as_ref().unwrap();
        assert!((score.value - 0.345).abs() < EPS);
        assert!((score.points - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_scoring_before_composition_fails() {
        let table = table(vec![ideal_subject("s1")]);
        let engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();

        assert_eq!(
            engine.score_category("veg").unwrap_err(),
            HeiError::UnscoredCategory("veg".to_string())
        );
        assert!(matches!(engine.score(), Err(HeiError::UnscoredCategory(_))));
    }

    #[test]
    fn test_partial_plan_cannot_aggregate() {
        let table = table(vec![ideal_subject("s1")]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine.compose("veg", &Composition::sum(["V_TOT"])).unwrap();

        assert_eq!(
            engine.score().unwrap_err(),
            HeiError::UnscoredCategory("fruit_total".to_string())
        );
    }

    #[test]
    fn test_unknown_category() {
        let table = table(vec![ideal_subject("s1")]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        assert_eq!(
            engine.compose("candy", &Composition::sum(["ADD_SUG"])),
            Err(HeiError::UnknownCategory("candy".to_string()))
        );
    }

    #[test]
    fn test_missing_column_on_compose() {
        let table = table(vec![ideal_subject("s1")]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        assert_eq!(
            engine.compose("veg", &Composition::sum(["V_TOT", "V_POTATO"])),
            Err(HeiError::MissingColumn {
                column: "V_POTATO".to_string()
            })
        );
        assert!(!engine.is_composed("veg"));
    }

    #[test]
    fn test_missing_energy_column() {
        let table = table(vec![SubjectRecord::new("s1").with("F_TOT", 1.0)]);
        assert!(matches!(
            ScoringEngine::new(hei_2010(), &table, "DT_KCAL"),
            Err(HeiError::MissingColumn { column }) if column == "DT_KCAL"
        ));
    }

    #[test]
    fn test_composition_mode_must_match_shape() {
        let table = table(vec![ideal_subject("s1")]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        assert_eq!(
            engine.compose("fa", &Composition::sum(["DT_MFAT"])),
            Err(HeiError::CompositionMismatch {
                category: "fa".to_string(),
                mode: "sum",
                shape: "ratio_with_floor",
            })
        );
    }

    #[test]
    fn test_validate_plan_requires_every_category() {
        let table = table(vec![ideal_subject("s1")]);
        let engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();

        let mut plan = default_composition();
        plan.remove("sodium");
        assert_eq!(
            engine.validate_plan(&plan),
            Err(HeiError::UnscoredCategory("sodium".to_string()))
        );
    }

    #[test]
    fn test_validate_plan_checks_columns_up_front() {
        let table = table(vec![SubjectRecord::new("s1").with("DT_KCAL", 1000.0)]);
        let engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        assert!(matches!(
            engine.validate_plan(&default_composition()),
            Err(HeiError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_compose_plan_composes_nothing_when_a_column_is_missing() {
        let table = table(vec![SubjectRecord::new("s1")
            .with("DT_KCAL", 1000.0)
            .with("F_TOT", 1.0)]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        assert!(matches!(
            engine.compose_plan(&default_composition()),
            Err(HeiError::MissingColumn { .. })
        ));
        assert!(!engine.is_composed("fruit_total"));
    }

    #[test]
    fn test_compose_plan_composes_every_category() {
        let table = table(vec![ideal_subject("s1")]);
        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine.compose_plan(&default_composition()).unwrap();
        assert!(hei_2010().ids().all(|id| engine.is_composed(id)));
    }

    #[test]
    fn test_invalid_energy_fails_only_that_subject() {
        let mut broken = ideal_subject("zero_kcal");
        broken.insert("DT_KCAL", 0.0);
        let mut negative = ideal_subject("negative_kcal");
        negative.insert("DT_KCAL", -500.0);

        let table = table(vec![ideal_subject("ok"), broken, negative]);
        let report = score_table(hei_2010(), &table, "DT_KCAL", &default_composition()).unwrap();

        assert_eq!(report.scored.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(
            report.failures[0].error,
            HeiError::InvalidEnergyIntake { kcal: 0.0 }
        );
        assert_eq!(
            report.failures[1].error,
            HeiError::InvalidEnergyIntake { kcal: -500.0 }
        );
    }

    #[test]
    fn test_zero_saturated_fat_fails_only_that_subject() {
        let mut no_sfat = ideal_subject("no_sfat");
        no_sfat.insert("DT_SFAT", 0.0);

        let table = table(vec![no_sfat, ideal_subject("ok")]);
        let report = score_table(hei_2010(), &table, "DT_KCAL", &default_composition()).unwrap();

        assert_eq!(report.scored[0].subject_id, "ok");
        assert_eq!(
            report.failures[0].error,
            HeiError::DivisionByZero {
                category: "fa".to_string(),
                subject: "no_sfat".to_string()
            }
        );
    }

    #[test]
    fn test_missing_value_fails_only_that_subject() {
        let table = table(vec![
            ideal_subject("ok"),
            SubjectRecord::new("sparse").with("DT_KCAL", 2000.0),
        ]);
        let report = score_table(hei_2010(), &table, "DT_KCAL", &default_composition()).unwrap();
        assert_eq!(report.scored.len(), 1);
        assert!(matches!(
            &report.failures[0].error,
            HeiError::MissingValue { subject, .. } if subject == "sparse"
        ));
    }

    #[test]
    fn test_composite_equals_sum_and_stays_bounded() {
        let mut mixed = ideal_subject("mixed");
        mixed.insert("F_TOT", 0.2);
        mixed.insert("SODIUM", 1.55);
        mixed.insert("G_NWHL", 3.0);

        let table = table(vec![ideal_subject("best"), mixed, poor_subject("worst")]);
        let report = score_table(hei_2010(), &table, "DT_KCAL", &default_composition()).unwrap();

        for subject in &report.scored {
            let sum: f64 = subject.sub_scores.iter().map(|s| s.points).sum();
            assert_eq!(subject.composite_index, sum);
            assert!(subject.composite_index <= report.max_points);
            for sub in &subject.sub_scores {
                assert!(sub.points.is_finite());
            }
        }

        let mixed = report.subject("mixed").unwrap();
        assert!((mixed.points("fruit_total").unwrap() - 1.25).abs() < EPS);
        assert!((mixed.points("sodium").unwrap() - 5.0).abs() < EPS);
    }

    #[test]
    fn test_partitioned_matches_sequential() {
        let mut records = Vec::new();
        for i in 0..25 {
            let mut record = ideal_subject(&format!("s{:02}", i));
            record.insert("F_TOT", i as f64 * 0.05);
            record.insert("DT_KCAL", 1500.0 + i as f64 * 40.0);
            records.push(record);
        }
        records.push(SubjectRecord::new("sparse").with("DT_KCAL", 2000.0));
        let table = table(records);

        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine.compose_plan(&default_composition()).unwrap();

        let sequential = engine.score().unwrap();
        for workers in [1, 3, 8, 100] {
            let partitioned = engine.score_partitioned(workers).unwrap();
            assert_eq!(partitioned.scored, sequential.scored);
            assert_eq!(partitioned.failures, sequential.failures);
        }
    }

    #[test]
    fn test_empty_table_scores_nothing() {
        let plan = default_composition();
        let mut columns: Vec<&str> = plan.values().flat_map(|c| c.columns()).collect();
        columns.push("DT_KCAL");
        let table = SubjectTable::new(columns);

        let mut engine = ScoringEngine::new(hei_2010(), &table, "DT_KCAL").unwrap();
        engine.compose_plan(&plan).unwrap();
        let report = engine.score_partitioned(4).unwrap();

        assert!(report.scored.is_empty());
        assert!(report.is_complete());
        assert_eq!(report.categories.len(), 12);
    }
}
