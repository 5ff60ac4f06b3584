pub mod aggregate;
pub mod compose;
pub mod energy;
pub mod engine;
pub mod functions;

pub use aggregate::{aggregate, ScoreReport, SubScore, SubjectFailure, SubjectScore};
pub use compose::{Composition, EnergyColumns, RatioColumns};
pub use energy::{kcal_norm, normalize};
pub use engine::{score_table, CompositionPlan, ScoringEngine};
