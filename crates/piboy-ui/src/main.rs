#![deny(unsafe_op_in_unsafe_fn)]

use std::path::PathBuf;

use anyhow::Result;
use piboy_ui::config::{resolve_root, ShellConfig};
use piboy_ui::{signals, App};

const COMPONENT: &str = "piboy-ui";

fn main() -> Result<()> {
    let root = resolve_root(std::env::args_os().nth(1).map(PathBuf::from))?;
    let log_cfg = piboy_logging::fs::read_config(&root);
    let _logging_guards = piboy_logging::init(COMPONENT, &root, &log_cfg)?;
    let _log_watcher = match piboy_logging::spawn_watcher(&root, COMPONENT) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!("Logging watcher disabled: {}", err);
            None
        }
    };
    if let Err(err) = piboy_logging::run_retention(&root, &log_cfg) {
        tracing::warn!("Log retention failed: {:#}", err);
    }

    let span = tracing::info_span!("piboy-ui", component = COMPONENT);
    let _span_guard = span.enter();
    tracing::info!(root = %root.display(), "Starting");

    let config = ShellConfig::load(&root)?;
    config.ensure_dirs()?;
    let stop = signals::install()?;

    App::new(&config)?.run(stop)
}
