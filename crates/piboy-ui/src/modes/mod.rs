//! The concrete screens, in the order MODE-SWITCH cycles through them.

pub mod bluetooth;
pub mod game;
pub mod music;
pub mod stats;
pub mod terminal;
pub mod wifi;

use std::sync::Arc;

pub use bluetooth::BluetoothMode;
pub use game::GameMode;
pub use music::MusicMode;
pub use stats::StatsMode;
pub use terminal::TerminalMode;
pub use wifi::{Nmcli, WifiBackend, WifiMode};

use crate::cartridge::{CartridgeRegistry, DeviceInfo};
use crate::config::ShellConfig;
use crate::shell::Mode;

pub fn build(cfg: &ShellConfig) -> Vec<Box<dyn Mode>> {
    let timing = &cfg.timing;
    let device = DeviceInfo {
        width: cfg.display.width,
        height: cfg.display.height,
    };
    vec![
        Box::new(StatsMode::new(timing.command_timeout())),
        Box::new(MusicMode::new(
            cfg.paths.music_dir.clone(),
            cfg.media.clone(),
            timing.stop_grace(),
        )),
        Box::new(GameMode::new(
            cfg.paths.roms_dir.clone(),
            cfg.games.extension.clone(),
            CartridgeRegistry::builtin(),
            device,
        )),
        Box::new(BluetoothMode::new(
            timing.status_refresh(),
            timing.command_timeout(),
        )),
        Box::new(WifiMode::new(
            Arc::new(Nmcli::new(timing.command_timeout())),
            timing.status_refresh(),
        )),
        Box::new(TerminalMode::new(
            cfg.terminal.keyboard_device.clone(),
            cfg.terminal.shell.clone(),
            timing.command_timeout(),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_is_fixed() {
        let modes = build(&ShellConfig::default());
        let names: Vec<&str> = modes.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["STATS", "MUSIC", "GAME", "BLUETOOTH", "WIFI", "TERMINAL"]);
    }
}
