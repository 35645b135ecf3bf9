use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::input::Key;

pub const CONFIG_FILE: &str = "piboy.json";
const DEFAULT_ROOT: &str = "/home/pi/piboy";

/// Picks the data root: explicit path, `PIBOY_ROOT`, the device default if
/// present, then the working directory.
pub fn resolve_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if let Some(env) = std::env::var_os("PIBOY_ROOT").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(env));
    }
    let default = PathBuf::from(DEFAULT_ROOT);
    if default.is_dir() {
        return Ok(default);
    }
    std::env::current_dir().context("resolving working directory")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub pins: PinConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub paths: PathConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub games: GamesConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl ShellConfig {
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            let mut default = ShellConfig::default();
            default.paths.apply_defaults(root);
            default.save(&path)?;
            tracing::info!("Wrote default config to {}", path.display());
            return Ok(default);
        }

        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let mut config: ShellConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.paths.apply_defaults(root);
        config
            .validate()
            .with_context(|| format!("validating {}", path.display()))?;
        Ok(config)
    }

    /// Writes pretty JSON next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let rows = self.pins.rows.len();
        let cols = self.pins.cols.len();
        if rows == 0 || cols == 0 {
            bail!("button matrix needs at least one row and one column");
        }
        if self.pins.layout.len() != rows || self.pins.layout.iter().any(|r| r.len() != cols) {
            bail!("key layout must be {rows}x{cols} to match the pin lists");
        }
        if self.timing.tick_ms == 0 {
            bail!("timing.tick_ms must be non-zero");
        }
        if self.display.width < 32 || self.display.height < 16 {
            bail!(
                "display {}x{} is too small",
                self.display.width,
                self.display.height
            );
        }
        Ok(())
    }

    /// Creates the media and cartridge directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.paths.music_dir, &self.paths.roms_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating directory {}", dir.display()))?;
                tracing::info!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    #[serde(default = "PinConfig::default_chip")]
    pub chip: String,
    #[serde(default = "PinConfig::default_rows")]
    pub rows: Vec<u32>,
    #[serde(default = "PinConfig::default_cols")]
    pub cols: Vec<u32>,
    /// Row-major; `layout[row][col]` is the key wired at that crossing.
    #[serde(default = "PinConfig::default_layout")]
    pub layout: Vec<Vec<Key>>,
}

impl PinConfig {
    fn default_chip() -> String {
        "/dev/gpiochip0".to_string()
    }

    fn default_rows() -> Vec<u32> {
        vec![23, 24, 25, 26]
    }

    fn default_cols() -> Vec<u32> {
        vec![5, 6]
    }

    fn default_layout() -> Vec<Vec<Key>> {
        vec![
            vec![Key::Up, Key::Secondary],
            vec![Key::Down, Key::Primary],
            vec![Key::Left, Key::Start],
            vec![Key::Right, Key::ModeSwitch],
        ]
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            chip: Self::default_chip(),
            rows: Self::default_rows(),
            cols: Self::default_cols(),
            layout: Self::default_layout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_bus")]
    pub i2c_bus: String,
    #[serde(default = "DisplayConfig::default_address")]
    pub address: u8,
    #[serde(default = "DisplayConfig::default_width")]
    pub width: u32,
    #[serde(default = "DisplayConfig::default_height")]
    pub height: u32,
    #[serde(default = "DisplayConfig::default_column_offset")]
    pub column_offset: u8,
}

impl DisplayConfig {
    fn default_bus() -> String {
        "/dev/i2c-1".to_string()
    }

    const fn default_address() -> u8 {
        0x3C
    }

    const fn default_width() -> u32 {
        128
    }

    const fn default_height() -> u32 {
        64
    }

    const fn default_column_offset() -> u8 {
        2
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            i2c_bus: Self::default_bus(),
            address: Self::default_address(),
            width: Self::default_width(),
            height: Self::default_height(),
            column_offset: Self::default_column_offset(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default)]
    pub music_dir: PathBuf,
    #[serde(default)]
    pub roms_dir: PathBuf,
}

impl PathConfig {
    pub fn apply_defaults(&mut self, root: &Path) {
        if self.music_dir.as_os_str().is_empty() {
            self.music_dir = root.join("Music");
        }
        if self.roms_dir.as_os_str().is_empty() {
            self.roms_dir = root.join("roms");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "TimingConfig::default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "TimingConfig::default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "TimingConfig::default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "TimingConfig::default_status_refresh_secs")]
    pub status_refresh_secs: u64,
}

impl TimingConfig {
    const fn default_tick_ms() -> u64 {
        50
    }

    const fn default_debounce_ms() -> u64 {
        200
    }

    const fn default_command_timeout_secs() -> u64 {
        15
    }

    const fn default_stop_grace_ms() -> u64 {
        500
    }

    const fn default_status_refresh_secs() -> u64 {
        5
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn status_refresh(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs.max(1))
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: Self::default_tick_ms(),
            debounce_ms: Self::default_debounce_ms(),
            command_timeout_secs: Self::default_command_timeout_secs(),
            stop_grace_ms: Self::default_stop_grace_ms(),
            status_refresh_secs: Self::default_status_refresh_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "MediaConfig::default_player")]
    pub player: String,
    #[serde(default = "MediaConfig::default_player_args")]
    pub player_args: Vec<String>,
    #[serde(default = "MediaConfig::default_extensions")]
    pub extensions: Vec<String>,
}

impl MediaConfig {
    fn default_player() -> String {
        "mpg123".to_string()
    }

    fn default_player_args() -> Vec<String> {
        vec!["-q".into(), "-o".into(), "alsa".into()]
    }

    fn default_extensions() -> Vec<String> {
        vec!["mp3".into()]
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            player: Self::default_player(),
            player_args: Self::default_player_args(),
            extensions: Self::default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    #[serde(default = "GamesConfig::default_extension")]
    pub extension: String,
}

impl GamesConfig {
    fn default_extension() -> String {
        "cart".to_string()
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            extension: Self::default_extension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default = "TerminalConfig::default_keyboard_device")]
    pub keyboard_device: PathBuf,
    #[serde(default = "TerminalConfig::default_shell")]
    pub shell: String,
}

impl TerminalConfig {
    fn default_keyboard_device() -> PathBuf {
        PathBuf::from("/dev/input/event2")
    }

    fn default_shell() -> String {
        "/bin/sh".to_string()
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            keyboard_device: Self::default_keyboard_device(),
            shell: Self::default_shell(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_written_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ShellConfig::load(dir.path()).unwrap();

        assert!(ShellConfig::path(dir.path()).exists());
        assert_eq!(cfg.paths.roms_dir, dir.path().join("roms"));
        assert_eq!(cfg.timing.tick_ms, 50);
        assert_eq!(cfg.pins.layout[3][1], Key::ModeSwitch);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            ShellConfig::path(dir.path()),
            r#"{"timing":{"tick_ms":20},"paths":{"music_dir":"/srv/music"}}"#,
        )
        .unwrap();

        let cfg = ShellConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.timing.tick_ms, 20);
        assert_eq!(cfg.timing.debounce_ms, 200);
        assert_eq!(cfg.paths.music_dir, PathBuf::from("/srv/music"));
        assert_eq!(cfg.paths.roms_dir, dir.path().join("roms"));
        assert_eq!(cfg.display.address, 0x3C);
    }

    #[test]
    fn layout_shape_must_match_pins() {
        let cfg = ShellConfig {
            pins: PinConfig {
                rows: vec![1, 2, 3],
                ..PinConfig::default()
            },
            ..ShellConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_tick_is_rejected() {
        let mut cfg = ShellConfig::default();
        cfg.timing.tick_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn keys_serialize_in_screaming_case() {
        let json = serde_json::to_string(&PinConfig::default()).unwrap();
        assert!(json.contains("\"MODE_SWITCH\""));
        let back: PinConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layout, PinConfig::default_layout());
    }

    #[test]
    fn ensure_dirs_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = ShellConfig::default();
        cfg.paths.apply_defaults(dir.path());
        cfg.ensure_dirs().unwrap();
        assert!(dir.path().join("Music").is_dir());
        assert!(dir.path().join("roms").is_dir());
    }
}
