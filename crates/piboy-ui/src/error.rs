//! Typed errors for cartridge loading, external commands and the shell.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a cartridge could not be started. Every variant is recoverable: the
/// game list stays as it was.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read cartridge {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cartridge {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("no game registered as '{id}'")]
    Unknown { id: String },

    #[error("cartridge '{id}' does not export {entry}")]
    MissingEntryPoint { id: String, entry: &'static str },

    #[error("cartridge '{id}' faulted: {message}")]
    Fault { id: String, message: String },
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("{program} exited with {}: {}", status_label(.status), .stderr.trim())]
    Failed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShellError {
    #[error("mode registry is empty")]
    NoModes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_command_message_is_short() {
        let err = CommandError::Failed {
            program: "nmcli".into(),
            status: Some(4),
            stderr: "Error: No network with SSID 'x'.\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "nmcli exited with status 4: Error: No network with SSID 'x'."
        );
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = CommandError::Timeout {
            program: "sleep".into(),
            after: Duration::from_secs(15),
        };
        assert_eq!(err.to_string(), "sleep timed out after 15s");
    }
}
