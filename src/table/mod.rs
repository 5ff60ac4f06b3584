pub mod loader;

pub use loader::{delimiter_for, load_table, read_table};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

use crate::error::HeiError;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read subject table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid subject table data: {0}")]
    Csv(#[from] csv::Error),
    #[error("subject column '{0}' not found in table header")]
    MissingSubjectColumn(String),
    #[error("column '{0}' appears more than once in table header")]
    DuplicateColumn(String),
    #[error("row {row}: empty subject id")]
    EmptySubjectId { row: usize },
    #[error("duplicate subject '{0}'")]
    DuplicateSubject(String),
    #[error("conversion source column '{0}' not found")]
    MissingSourceColumn(String),
}

/// Unit pre-conversion applied before scoring: `column = source * factor`.
///
/// Example YAML:
/// ```yaml
/// conversions:
///   - { column: SODIUM, source: DT_SODI, factor: 0.001 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Conversion {
    pub column: String,
    pub source: String,
    pub factor: f64,
}

/// Raw nutrient values for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    id: String,
    values: HashMap<String, f64>,
}

impl SubjectRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: HashMap::new(),
        }
    }

    /// Builder form of `insert`.
    pub fn with(mut self, column: impl Into<String>, value: f64) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.values.insert(column.into(), value);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// A nutrient quantity: present, finite, and non-negative.
    pub fn nutrient(&self, column: &str) -> Result<f64, HeiError> {
        let value = self.raw(column).ok_or_else(|| HeiError::MissingValue {
            column: column.to_string(),
            subject: self.id.clone(),
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(HeiError::InvalidNutrientValue {
                column: column.to_string(),
                subject: self.id.clone(),
                value,
            });
        }
        Ok(value)
    }
}

/// In-memory subject table handed to the scoring engine.
///
/// Rows keep their insertion order and subject ids are unique.
#[derive(Debug, Clone, Default)]
pub struct SubjectTable {
    columns: BTreeSet<String>,
    records: Vec<SubjectRecord>,
    ids: HashSet<String>,
}

impl SubjectTable {
    /// Create an empty table with a declared set of columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Build a table whose columns are the union of the records' fields.
    pub fn from_records(records: Vec<SubjectRecord>) -> Result<Self, TableError> {
        let mut table = Self::default();
        for record in records {
            table.push(record)?;
        }
        Ok(table)
    }

    pub fn push(&mut self, record: SubjectRecord) -> Result<(), TableError> {
        if !self.ids.insert(record.id.clone()) {
            return Err(TableError::DuplicateSubject(record.id));
        }
        for column in record.values.keys() {
            if !self.columns.contains(column) {
                self.columns.insert(column.clone());
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Fail with `MissingColumn` on the first column the table does not carry.
    pub fn require_columns<'a, I>(&self, columns: I) -> Result<(), HeiError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match columns.into_iter().find(|c| !self.has_column(c)) {
            Some(column) => Err(HeiError::MissingColumn {
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn records(&self) -> &[SubjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derive or overwrite columns from other columns. Subjects with no value
    /// in the source column get no value in the derived column.
    pub fn apply_conversions(&mut self, conversions: &[Conversion]) -> Result<(), TableError> {
        for conversion in conversions {
            if !self.has_column(&conversion.source) {
                return Err(TableError::MissingSourceColumn(conversion.source.clone()));
            }
            for record in &mut self.records {
                match record.raw(&conversion.source) {
                    Some(value) => record.insert(conversion.column.clone(), value * conversion.factor),
                    None => {
                        record.values.remove(&conversion.column);
                    }
                }
            }
            self.columns.insert(conversion.column.clone());
            tracing::debug!(
                column = %conversion.column,
                source = %conversion.source,
                factor = conversion.factor,
                "applied unit conversion"
            );
        }
        Ok(())
    }
}
