use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{SubjectRecord, SubjectTable, TableError};

/// Tab for `.tsv`/`.tab` files, comma otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

/// Load a subject table from a delimited file.
pub fn load_table<P: AsRef<Path>>(path: P, subject_column: &str) -> Result<SubjectTable, TableError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_table(file, delimiter_for(path), subject_column)
}

/// Read a subject table from delimited text with a header row.
///
/// Every column other than `subject_column` is read as a number. Empty, `NA`,
/// and non-numeric cells are left absent for that subject, never read as zero.
pub fn read_table<R: Read>(
    reader: R,
    delimiter: u8,
    subject_column: &str,
) -> Result<SubjectTable, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut seen = HashSet::with_capacity(headers.len());
    if let Some(repeated) = headers.iter().find(|h| !seen.insert(*h)) {
        return Err(TableError::DuplicateColumn(repeated.to_string()));
    }
    let subject_idx = headers
        .iter()
        .position(|h| h == subject_column)
        .ok_or_else(|| TableError::MissingSubjectColumn(subject_column.to_string()))?;

    let mut table = SubjectTable::new(
        headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != subject_idx)
            .map(|(_, h)| h.to_string()),
    );

    let mut skipped_cells = 0usize;
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let id = record.get(subject_idx).unwrap_or_default();
        if id.is_empty() {
            return Err(TableError::EmptySubjectId { row: row + 1 });
        }

        let mut subject = SubjectRecord::new(id);
        for (i, (header, cell)) in headers.iter().zip(record.iter()).enumerate() {
            if i == subject_idx {
                continue;
            }
            match parse_cell(cell) {
                Some(value) => subject.insert(header, value),
                None => skipped_cells += 1,
            }
        }
        table.push(subject)?;
    }

    tracing::debug!(
        subjects = table.len(),
        skipped_cells,
        "loaded subject table"
    );
    Ok(table)
}

fn parse_cell(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }
    trimmed.parse().ok()
}
