use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::schema::Config;

const HEADER: &str = "\
# hei-score configuration
#
# catalog:      built-in preset (hei-2010) or an inline list of categories
# conversions:  unit pre-conversions applied to input columns (column = source * factor)
# composition:  raw columns feeding each category (sum, ratio, or weighted_energy)
";

/// Write the built-in configuration to `path`.
///
/// Refuses to replace an existing file unless `force` is set. The file is
/// written atomically so it is never left half-written.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory at {}", parent.display()))?;
    }

    let yaml = serde_saphyr::to_string(&Config::default())
        .context("Failed to serialize default config")?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(HEADER.as_bytes())
        .and_then(|_| file.write_all(yaml.as_bytes()))
        .context("Failed to write config")?;
    file.commit().context("Failed to save config")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use std::env;

    #[test]
    fn test_write_and_load_roundtrip() {
        let path = env::temp_dir().join("hei_score_test_init").join("config.yaml");
        let _ = fs::remove_file(&path);

        write_default_config(&path, false).unwrap();
        let loaded = load_config(Some(path.clone())).unwrap();
        assert_eq!(loaded, Config::default());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let path = env::temp_dir().join("hei_score_test_init_exists.yaml");
        fs::write(&path, "log_level: warn\n").unwrap();

        let err = write_default_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        write_default_config(&path, true).unwrap();
        let loaded = load_config(Some(path.clone())).unwrap();
        assert_eq!(loaded.log_level.as_deref(), Some("info"));

        let _ = fs::remove_file(&path);
    }
}
