//! Cartridge browser. While a cartridge runs it owns input and the screen.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use piboy_logging::targets::T_GAME;

use crate::cartridge::{
    cartridge_id, display_name, list_cartridges, Cartridge, CartridgeRegistry, DeviceInfo,
};
use crate::display::Canvas;
use crate::error::LoadError;
use crate::input::Key;
use crate::shell::Mode;
use crate::ui::{draw_menu, PagedList, MENU_WINDOW};

enum State {
    Browsing,
    Running { id: String, cartridge: Box<dyn Cartridge> },
}

pub struct GameMode {
    roms_dir: PathBuf,
    extension: String,
    registry: CartridgeRegistry,
    device: DeviceInfo,
    files: Vec<String>,
    labels: Vec<String>,
    list: PagedList,
    state: State,
    last_error: Option<String>,
    faults: usize,
}

impl GameMode {
    pub fn new(
        roms_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        registry: CartridgeRegistry,
        device: DeviceInfo,
    ) -> Self {
        Self {
            roms_dir: roms_dir.into(),
            extension: extension.into(),
            registry,
            device,
            files: Vec::new(),
            labels: Vec::new(),
            list: PagedList::new(MENU_WINDOW),
            state: State::Browsing,
            last_error: None,
            faults: 0,
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// What the list shows for each file.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn selection(&self) -> usize {
        self.list.selection()
    }

    pub fn running(&self) -> Option<&str> {
        match &self.state {
            State::Running { id, .. } => Some(id),
            State::Browsing => None,
        }
    }

    /// Cartridge faults reported since construction.
    pub fn faults(&self) -> usize {
        self.faults
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn launch(&mut self) {
        let Some(name) = self.files.get(self.list.selection()) else {
            return;
        };
        let path = self.roms_dir.join(name);
        match self.load(&path) {
            Ok((id, cartridge)) => {
                tracing::info!(target: T_GAME, id = %id, "Cartridge started");
                self.last_error = None;
                self.state = State::Running { id, cartridge };
            }
            Err(err) => self.report(&err),
        }
    }

    /// Resolves and initialises a fresh instance. Panics count as faults.
    fn load(&self, path: &Path) -> Result<(String, Box<dyn Cartridge>), LoadError> {
        let device = self.device;
        let registry = &self.registry;
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let (id, mut cartridge) = registry.load(path)?;
            cartridge.init(&device);
            Ok((id, cartridge))
        }));
        attempt.unwrap_or_else(|payload| {
            Err(LoadError::Fault {
                id: cartridge_id(path).unwrap_or_else(|| path.display().to_string()),
                message: panic_message(payload.as_ref()),
            })
        })
    }

    fn report(&mut self, err: &LoadError) {
        tracing::error!(target: T_GAME, "{}", err);
        self.faults += 1;
        self.last_error = Some(err.to_string());
    }

    fn unload(&mut self, reason: &str) {
        if let State::Running { id, .. } = std::mem::replace(&mut self.state, State::Browsing) {
            tracing::info!(target: T_GAME, id = %id, "Cartridge unloaded ({reason})");
        }
    }

    fn fault(&mut self, stage: &str, payload: Box<dyn Any + Send>) {
        let id = self.running().unwrap_or_default().to_string();
        let err = LoadError::Fault {
            id,
            message: format!("{stage}: {}", panic_message(payload.as_ref())),
        };
        self.report(&err);
        self.unload("fault");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panicked".to_string()
    }
}

impl Mode for GameMode {
    fn name(&self) -> &str {
        "GAME"
    }

    fn activate(&mut self) {
        self.files = list_cartridges(&self.roms_dir, &self.extension);
        self.labels = self.files.iter().map(|name| display_name(name)).collect();
        self.list.reset();
        self.last_error = None;
        tracing::debug!(target: T_GAME, count = self.files.len(), "Listed cartridges");
    }

    fn deactivate(&mut self) {
        self.unload("mode deactivated");
    }

    fn handle_input(&mut self, key: Option<Key>) {
        if let State::Running { cartridge, .. } = &mut self.state {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| cartridge.handle_input(key)));
            match outcome {
                Ok(true) => {}
                Ok(false) => self.unload("exit requested"),
                Err(payload) => self.fault("handle_input", payload),
            }
            return;
        }

        let len = self.files.len();
        match key {
            Some(Key::Up) => {
                self.list.move_up(len);
                self.last_error = None;
            }
            Some(Key::Down) => {
                self.list.move_down(len);
                self.last_error = None;
            }
            Some(Key::Primary | Key::Start) => self.launch(),
            _ => {}
        }
    }

    fn draw(&mut self, canvas: &mut Canvas, _active_mode: &str) {
        if let State::Running { cartridge, .. } = &mut self.state {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| cartridge.draw(canvas)));
            if let Err(payload) = outcome {
                self.fault("draw", payload);
            }
            return;
        }

        let title = if self.last_error.is_some() {
            "LOAD FAILED"
        } else {
            "GAMES"
        };
        draw_menu(canvas, title, &self.labels, &self.list);
    }

    fn is_busy(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }
}
