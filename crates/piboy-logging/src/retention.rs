use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use crate::config::LoggingConfig;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Deletes rotated logs older than `keep_days`, then the oldest survivors
/// until `<root>/logs` fits in `max_total_mb`.
pub fn run_retention(root: &Path, cfg: &LoggingConfig) -> Result<()> {
    let cutoff = SystemTime::now()
        .checked_sub(DAY * u32::try_from(cfg.keep_days).unwrap_or(u32::MAX))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let removed = prune(&root.join("logs"), cutoff, cfg.max_total_bytes())?;
    if removed > 0 {
        tracing::info!(removed, "Pruned old log files");
    }
    Ok(())
}

/// Returns how many files were deleted.
fn prune(dir: &Path, cutoff: SystemTime, max_bytes: u64) -> Result<usize> {
    let mut logs = log_files(dir)?;
    logs.sort_by_key(|(_, modified, _)| *modified);

    let mut remaining: u64 = logs.iter().map(|(_, _, size)| size).sum();
    let mut removed = 0;
    for (path, modified, size) in logs {
        if modified >= cutoff && remaining <= max_bytes {
            break;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                remaining = remaining.saturating_sub(size);
                removed += 1;
            }
            Err(err) => tracing::warn!("Failed to remove log {}: {}", path.display(), err),
        }
    }
    Ok(removed)
}

/// Files whose name contains `.log`, covering the dated rotations.
fn log_files(dir: &Path) -> Result<Vec<(PathBuf, SystemTime, u64)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("reading {}", dir.display())),
    };

    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".log"))
        .filter_map(|entry| {
            let meta = entry.metadata().ok().filter(|m| m.is_file())?;
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((entry.path(), modified, meta.len()))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        run_retention(dir.path(), &LoggingConfig::default()).unwrap();
    }

    #[test]
    fn size_cap_removes_files_until_under_limit() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["piboy-ui.log.2026-01-01", "game.log.2026-01-02", "media.log.2026-01-03"] {
            fs::write(dir.path().join(name), vec![b'x'; 100]).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), vec![b'x'; 500]).unwrap();

        let removed = prune(dir.path(), SystemTime::UNIX_EPOCH, 150).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(log_files(dir.path()).unwrap().len(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn expired_logs_go_even_under_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("net.log.2026-01-01"), b"old").unwrap();

        let future = SystemTime::now() + DAY;
        assert_eq!(prune(dir.path(), future, u64::MAX).unwrap(), 1);
        assert!(log_files(dir.path()).unwrap().is_empty());
    }
}
