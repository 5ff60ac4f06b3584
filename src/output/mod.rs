pub mod formatter;

pub use formatter::{
    format_breakdown, format_catalog, format_failures, format_json, format_points,
    format_score_table, format_tsv, rating, score_column, should_use_colors, COMPOSITE_COLUMN,
};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::io::Write;
use std::path::Path;

/// Write rendered output to `path` atomically, with a trailing newline.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .with_context(|| format!("Failed to write output to {}", path.display()))?;
    file.commit()
        .with_context(|| format!("Failed to save output to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn test_write_output_replaces_file() {
        let path = env::temp_dir().join("hei_score_test_output.tsv");
        fs::write(&path, "stale").unwrap();

        write_output(&path, "subject_id\tcomposite_index").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "subject_id\tcomposite_index\n");

        let _ = fs::remove_file(&path);
    }
}
