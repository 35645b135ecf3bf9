use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::config::LoggingConfig;

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config").join("logging.json")
}

/// Never fails: a missing file is created with defaults, and an unreadable
/// or unparsable one is left alone and replaced by defaults in memory.
pub fn read_config(root: &Path) -> LoggingConfig {
    let path = config_path(root);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let cfg = LoggingConfig::default();
            if let Err(err) = write_config_atomic(root, &cfg) {
                eprintln!("piboy-logging: cannot write {}: {err:#}", path.display());
            }
            return cfg;
        }
        Err(_) => return LoggingConfig::default(),
    };
    serde_json::from_str(&contents).unwrap_or_else(|err| {
        eprintln!("piboy-logging: ignoring {}: {err}", path.display());
        LoggingConfig::default()
    })
}

/// Writes through a temp file in the same directory, then renames over the
/// old file, so a watcher never sees a half-written config.
pub fn write_config_atomic(root: &Path, cfg: &LoggingConfig) -> Result<()> {
    let path = config_path(root);
    let dir = path
        .parent()
        .context("logging config path has no parent")?;
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp =
        NamedTempFile::new_in(dir).with_context(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), cfg).context("serializing logging config")?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all().context("syncing logging config")?;
    tmp.persist(&path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = read_config(dir.path());
        assert_eq!(cfg, LoggingConfig::default());
        assert!(config_path(dir.path()).exists());
    }

    #[test]
    fn garbage_config_falls_back_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let cfg = read_config(dir.path());
        assert_eq!(cfg, LoggingConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn written_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            level: "piboy_ui=debug,warn".into(),
            keep_days: 3,
            ..LoggingConfig::default()
        };
        write_config_atomic(dir.path(), &cfg).unwrap();
        assert_eq!(read_config(dir.path()), cfg);
        let leftovers = fs::read_dir(config_path(dir.path()).parent().unwrap())
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }
}
