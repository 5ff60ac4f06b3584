pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod scoring;
pub mod table;
pub mod telemetry;

pub use catalog::{Catalog, CategoryDefinition, Shape};
pub use error::HeiError;
pub use scoring::{score_table, Composition, CompositionPlan, ScoreReport, ScoringEngine};
pub use table::{load_table, SubjectRecord, SubjectTable, TableError};
