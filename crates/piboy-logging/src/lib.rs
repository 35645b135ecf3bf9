//! Logging for the handheld shell: a JSON config under `<root>/config`,
//! daily log files under `<root>/logs`, per-subsystem files selected by
//! tracing target, and a live-reloadable level.

pub mod config;
pub mod fs;
pub mod init;
pub mod retention;
pub mod targets;
pub mod watch;

pub use config::LoggingConfig;
pub use fs::read_config;
pub use init::{apply, init, LoggingGuards};
pub use retention::run_retention;
pub use targets::{T_GAME, T_MEDIA, T_NET};
pub use watch::spawn_watcher;
