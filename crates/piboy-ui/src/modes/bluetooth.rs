use std::time::Duration;

use piboy_logging::targets::T_NET;

use crate::display::Canvas;
use crate::error::CommandError;
use crate::input::Key;
use crate::process::{run_with_timeout, CommandOutput};
use crate::shell::Mode;
use crate::task::Sampler;
use crate::ui::draw_header;

const UNKNOWN: &str = "N/A";

/// Turns one `bluetoothctl info` run into the text shown under the hostname.
pub fn connection_status(result: Result<CommandOutput, CommandError>) -> String {
    let output = match result {
        Ok(output) => output,
        Err(err) => {
            tracing::debug!(target: T_NET, "bluetoothctl: {}", err);
            return UNKNOWN.to_string();
        }
    };
    if !output.success() {
        return "Waiting for a\n connection...".to_string();
    }
    output
        .stdout
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Name:"))
        .map(|name| format!("Connected to:\n {}", name.trim()))
        .unwrap_or_else(|| "Status Unknown".to_string())
}

pub struct BluetoothMode {
    refresh: Duration,
    timeout: Duration,
    hostname: String,
    sampler: Option<Sampler<String>>,
}

impl BluetoothMode {
    pub fn new(refresh: Duration, timeout: Duration) -> Self {
        Self {
            refresh,
            timeout,
            hostname: UNKNOWN.to_string(),
            sampler: None,
        }
    }

    fn status(&self) -> String {
        self.sampler
            .as_ref()
            .map(Sampler::snapshot)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

impl Mode for BluetoothMode {
    fn name(&self) -> &str {
        "BLUETOOTH"
    }

    fn activate(&mut self) {
        self.hostname = nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let timeout = self.timeout;
        self.sampler = Some(Sampler::spawn("bt-status", self.refresh, move || {
            connection_status(run_with_timeout("bluetoothctl", ["info"], None, timeout))
        }));
    }

    fn deactivate(&mut self) {
        self.sampler = None;
    }

    fn handle_input(&mut self, _key: Option<Key>) {}

    fn draw(&mut self, canvas: &mut Canvas, _active_mode: &str) {
        draw_header(canvas, "BLUETOOTH AUDIO");
        canvas.text(&format!("Name: {}", self.hostname), 5, 16);
        canvas.text(&self.status(), 5, 32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(status: i32, stdout: &str) -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput {
            status: Some(status),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    #[test]
    fn connected_device_shows_its_name() {
        let info = "Device AA:BB:CC:DD:EE:FF (public)\n\tName: Pixel 7\n\tConnected: yes\n";
        assert_eq!(connection_status(output(0, info)), "Connected to:\n Pixel 7");
    }

    #[test]
    fn no_device_is_waiting() {
        assert_eq!(
            connection_status(output(1, "Missing device address argument\n")),
            "Waiting for a\n connection..."
        );
    }

    #[test]
    fn nameless_and_failed_queries() {
        assert_eq!(connection_status(output(0, "Device AA\n")), "Status Unknown");
        let timeout = Err(CommandError::Timeout {
            program: "bluetoothctl".into(),
            after: Duration::from_secs(15),
        });
        assert_eq!(connection_status(timeout), "N/A");
    }

    #[test]
    fn draws_before_first_sample() {
        let mut mode = BluetoothMode::new(Duration::from_secs(5), Duration::from_secs(1));
        let mut canvas = Canvas::new(128, 64);
        mode.draw(&mut canvas, "BLUETOOTH");
        assert!(canvas.lit_pixels() > 0);
        mode.deactivate();
    }
}
