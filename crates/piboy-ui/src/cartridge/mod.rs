//! Game cartridges: compiled-in games selected by small manifest files.
//!
//! A cartridge file `<id>.cart` names a registered game. An empty file
//! binds to the game registered under the file stem. A JSON body may name
//! a different game and must then list the entry points it exports:
//!
//! ```json
//! { "game": "snake", "exports": ["init", "handle_input", "draw"] }
//! ```
//!
//! Every load builds a fresh instance, so no state carries over between
//! plays.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::display::Canvas;
use crate::error::LoadError;
use crate::input::Key;
use crate::listing::list_files;

pub mod breakout;
pub mod frogger;
pub mod invaders;
pub mod pong;
pub mod snake;
pub mod tetris;

/// What a cartridge learns about the hardware at `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub width: u32,
    pub height: u32,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            width: 128,
            height: 64,
        }
    }
}

/// A game that owns the screen while it runs.
///
/// `draw` doubles as the simulation step and runs once per tick.
/// Returning false from `handle_input` ends the game; the instance is
/// dropped right after.
pub trait Cartridge {
    fn init(&mut self, device: &DeviceInfo);
    fn handle_input(&mut self, key: Option<Key>) -> bool;
    fn draw(&mut self, canvas: &mut Canvas);
}

pub const ENTRY_POINTS: [&str; 3] = ["init", "handle_input", "draw"];

type Factory = Box<dyn Fn() -> Box<dyn Cartridge>>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    game: Option<String>,
    exports: Option<Vec<String>>,
}

#[derive(Default)]
pub struct CartridgeRegistry {
    factories: BTreeMap<String, Factory>,
}

impl CartridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("breakout", || Box::new(breakout::Breakout::new()));
        registry.register("frogger", || Box::new(frogger::Frogger::new()));
        registry.register("invaders", || Box::new(invaders::Invaders::new()));
        registry.register("pong", || Box::new(pong::Pong::new()));
        registry.register("snake", || Box::new(snake::Snake::new()));
        registry.register("tetris", || Box::new(tetris::Tetris::new()));
        registry
    }

    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Box<dyn Cartridge> + 'static,
    {
        self.factories.insert(id.to_string(), Box::new(factory));
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolves a cartridge file to a fresh, not yet initialised instance.
    pub fn load(&self, path: &Path) -> Result<(String, Box<dyn Cartridge>), LoadError> {
        let body = fs::read_to_string(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest = if body.trim().is_empty() {
            Manifest::default()
        } else {
            serde_json::from_str::<Manifest>(&body).map_err(|err| LoadError::Malformed {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?
        };

        let id = match manifest.game {
            Some(game) => game.to_ascii_lowercase(),
            None => cartridge_id(path).ok_or_else(|| LoadError::Malformed {
                path: path.to_path_buf(),
                message: "file name is not valid UTF-8".to_string(),
            })?,
        };

        if let Some(exports) = &manifest.exports {
            if let Some(entry) = ENTRY_POINTS
                .iter()
                .copied()
                .find(|entry| !exports.iter().any(|e| e.as_str() == *entry))
            {
                return Err(LoadError::MissingEntryPoint { id, entry });
            }
        }

        let factory = self
            .factories
            .get(&id)
            .ok_or_else(|| LoadError::Unknown { id: id.clone() })?;
        Ok((id, factory()))
    }
}

/// Registry key for a cartridge file: the lowercased file stem.
pub fn cartridge_id(path: &Path) -> Option<String> {
    path.file_stem()?.to_str().map(str::to_ascii_lowercase)
}

/// Menu label for a listed file name: its stem, case kept.
pub fn display_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Cartridge files in `dir` with the given extension, sorted by name.
pub fn list_cartridges(dir: &Path, extension: &str) -> Vec<String> {
    list_files(dir, &[extension])
}
