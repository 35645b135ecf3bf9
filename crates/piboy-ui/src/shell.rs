//! The mode dispatcher: one key poll, one dispatch and one frame per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::display::{Canvas, FrameSink, Screen};
use crate::error::ShellError;
use crate::input::{Key, KeySource};

/// One application screen.
///
/// Nothing here may block for longer than a tick. Faults from collaborators
/// are turned into on-screen state by the mode itself.
pub trait Mode {
    fn name(&self) -> &str;

    /// Called every time the mode becomes current. Must cope with missing
    /// resources by showing an empty state.
    fn activate(&mut self);

    /// Called every time the mode stops being current, and at shutdown.
    /// Releases anything exclusive; must be safe without a prior activate.
    fn deactivate(&mut self);

    /// Called once per tick, with `None` when no key was pressed.
    fn handle_input(&mut self, key: Option<Key>);

    /// Passive per-tick work, run after input dispatch.
    fn tick(&mut self) {}

    /// Renders the current state. Called exactly once per tick.
    fn draw(&mut self, canvas: &mut Canvas, active_mode: &str);

    /// While true the mode-switch key is delivered to the mode instead of
    /// switching away from it.
    fn is_busy(&self) -> bool {
        false
    }
}

pub struct Shell {
    modes: Vec<Box<dyn Mode>>,
    names: Vec<String>,
    active: usize,
    started: bool,
    poll_failures: u64,
}

impl Shell {
    pub fn new(modes: Vec<Box<dyn Mode>>) -> Result<Self, ShellError> {
        if modes.is_empty() {
            return Err(ShellError::NoModes);
        }
        let names = modes.iter().map(|m| m.name().to_string()).collect();
        Ok(Self {
            modes,
            names,
            active: 0,
            started: false,
            poll_failures: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_name(&self) -> &str {
        &self.names[self.active]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Activates the first mode. Repeated calls do nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.active = 0;
        self.started = true;
        tracing::info!(mode = %self.names[0], "Starting shell");
        self.modes[0].activate();
    }

    /// Routes one poll result. Returns true when it switched modes.
    pub fn dispatch(&mut self, key: Option<Key>) -> bool {
        self.start();
        let current = &mut self.modes[self.active];
        if key == Some(Key::ModeSwitch) && !current.is_busy() {
            current.deactivate();
            self.active = (self.active + 1) % self.modes.len();
            tracing::info!(mode = %self.names[self.active], "Switched mode");
            self.modes[self.active].activate();
            return true;
        }
        current.handle_input(key);
        false
    }

    pub fn tick(&mut self) {
        self.modes[self.active].tick();
    }

    pub fn draw(&mut self, canvas: &mut Canvas) {
        let name = &self.names[self.active];
        self.modes[self.active].draw(canvas, name);
    }

    /// A whole tick minus the sleep: dispatch, per-tick hook, one frame.
    pub fn step<S: FrameSink>(&mut self, key: Option<Key>, screen: &mut Screen<S>) {
        self.dispatch(key);
        self.tick();
        let mut frame = screen.frame();
        self.draw(&mut frame);
    }

    /// Runs ticks every `period` until `stop` is set, then deactivates the
    /// current mode.
    pub fn run<K, S>(&mut self, keys: &mut K, screen: &mut Screen<S>, period: Duration, stop: &AtomicBool)
    where
        K: KeySource + ?Sized,
        S: FrameSink,
    {
        self.start();
        while !stop.load(Ordering::Relaxed) {
            let started = Instant::now();
            let key = self.poll(keys);
            self.step(key, screen);
            if let Some(rest) = period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        self.shutdown();
    }

    fn poll<K: KeySource + ?Sized>(&mut self, keys: &mut K) -> Option<Key> {
        match keys.poll() {
            Ok(key) => key,
            Err(err) => {
                if self.poll_failures % 200 == 0 {
                    tracing::warn!(failures = self.poll_failures + 1, "Key poll failed: {:#}", err);
                }
                self.poll_failures += 1;
                None
            }
        }
    }

    /// Deactivates the current mode. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        tracing::info!(mode = %self.names[self.active], "Shutting down shell");
        self.modes[self.active].deactivate();
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.shutdown();
    }
}
