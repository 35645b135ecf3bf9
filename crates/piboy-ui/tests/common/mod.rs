#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;
use piboy_ui::cartridge::{Cartridge, DeviceInfo};
use piboy_ui::display::Canvas;
use piboy_ui::input::{Key, KeySource};
use piboy_ui::Mode;

/// Replays a fixed key sequence, then reports no key.
pub struct ScriptedKeys(VecDeque<Option<Key>>);

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Option<Key>>) -> Self {
        Self(keys.into_iter().collect())
    }
}

impl KeySource for ScriptedKeys {
    fn poll(&mut self) -> Result<Option<Key>> {
        Ok(self.0.pop_front().flatten())
    }
}

/// Everything a [`RecordingMode`] saw, shared with the test.
#[derive(Default)]
pub struct ModeLog {
    pub activations: Cell<usize>,
    pub deactivations: Cell<usize>,
    pub ticks: Cell<usize>,
    pub draws: Cell<usize>,
    pub inputs: RefCell<Vec<Option<Key>>>,
    pub busy: Cell<bool>,
}

pub struct RecordingMode {
    name: String,
    pub log: Rc<ModeLog>,
}

impl RecordingMode {
    pub fn new(name: &str) -> (Self, Rc<ModeLog>) {
        let log = Rc::new(ModeLog::default());
        (
            Self {
                name: name.to_string(),
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl Mode for RecordingMode {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self) {
        self.log.activations.set(self.log.activations.get() + 1);
    }

    fn deactivate(&mut self) {
        self.log.deactivations.set(self.log.deactivations.get() + 1);
    }

    fn handle_input(&mut self, key: Option<Key>) {
        self.log.inputs.borrow_mut().push(key);
    }

    fn tick(&mut self) {
        self.log.ticks.set(self.log.ticks.get() + 1);
    }

    fn draw(&mut self, canvas: &mut Canvas, active_mode: &str) {
        self.log.draws.set(self.log.draws.get() + 1);
        canvas.text(active_mode, 0, 0);
    }

    fn is_busy(&self) -> bool {
        self.log.busy.get()
    }
}

/// What the probe cartridges report back.
#[derive(Default)]
pub struct CartProbe {
    pub inits: Cell<usize>,
    pub drops: Cell<usize>,
    pub last_score: Cell<u32>,
}

/// Scores one point per PRIMARY press, exits on MODE-SWITCH.
pub struct ScoreCart {
    score: u32,
    probe: Rc<CartProbe>,
}

impl ScoreCart {
    pub fn new(probe: Rc<CartProbe>) -> Self {
        Self { score: 0, probe }
    }
}

impl Cartridge for ScoreCart {
    fn init(&mut self, _device: &DeviceInfo) {
        self.probe.inits.set(self.probe.inits.get() + 1);
    }

    fn handle_input(&mut self, key: Option<Key>) -> bool {
        match key {
            Some(Key::ModeSwitch) => false,
            Some(Key::Primary) => {
                self.score += 1;
                self.probe.last_score.set(self.score);
                true
            }
            _ => true,
        }
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        canvas.text(&self.score.to_string(), 0, 0);
    }
}

impl Drop for ScoreCart {
    fn drop(&mut self) {
        self.probe.drops.set(self.probe.drops.get() + 1);
    }
}

/// Panics as soon as it is initialised.
pub struct PanickingCart;

impl Cartridge for PanickingCart {
    fn init(&mut self, _device: &DeviceInfo) {
        panic!("init exploded");
    }

    fn handle_input(&mut self, _key: Option<Key>) -> bool {
        true
    }

    fn draw(&mut self, _canvas: &mut Canvas) {}
}

/// Panics on the first frame.
pub struct CrashOnDrawCart;

impl Cartridge for CrashOnDrawCart {
    fn init(&mut self, _device: &DeviceInfo) {}

    fn handle_input(&mut self, _key: Option<Key>) -> bool {
        true
    }

    fn draw(&mut self, _canvas: &mut Canvas) {
        panic!("draw exploded");
    }
}
