use std::path::Path;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::config::LoggingConfig;
use crate::fs::{config_path, read_config};
use crate::init::apply;

/// Re-applies `<root>/config/logging.json` whenever it changes on disk, so
/// the level can be raised on a running device without a restart.
pub fn spawn_watcher(root: &Path, component: &str) -> Result<JoinHandle<()>> {
    let config_file = config_path(root);
    let dir = config_file
        .parent()
        .context("logging config path has no parent")?
        .to_path_buf();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("creating file watcher")?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching {}", dir.display()))?;

    let root = root.to_path_buf();
    thread::Builder::new()
        .name(format!("{component}-logwatch"))
        .spawn(move || {
            // Owned by the thread so events keep flowing.
            let _watcher = watcher;
            let mut current = read_config(&root);
            for event in rx {
                match event {
                    Ok(event) if touches(&event, &config_file) => reload(&root, &mut current),
                    Ok(_) => {}
                    Err(err) => tracing::warn!("Logging watcher error: {}", err),
                }
            }
        })
        .context("spawning logging watcher")
}

fn touches(event: &Event, file: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| p == file)
}

/// Editors fire several events per save; only a real change is applied.
fn reload(root: &Path, current: &mut LoggingConfig) {
    let next = read_config(root);
    if next == *current {
        return;
    }
    match apply(&next) {
        Ok(()) => {
            tracing::info!(level = %next.level, enabled = next.enabled, "Logging config reloaded");
            *current = next;
        }
        Err(err) => tracing::warn!("Failed to apply logging config: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;

    #[test]
    fn only_changes_to_the_config_file_count() {
        let file = PathBuf::from("/data/config/logging.json");
        let hit = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(file.clone());
        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/data/config/piboy.json"));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any)).add_path(file.clone());

        assert!(touches(&hit, &file));
        assert!(!touches(&other, &file));
        assert!(!touches(&access, &file));
    }
}
