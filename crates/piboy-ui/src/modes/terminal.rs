use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::display::Canvas;
use crate::input::Key;
use crate::keyboard::{Keyboard, TypedKey};
use crate::process::run_with_timeout;
use crate::shell::Mode;
use crate::task::Worker;
use crate::ui::{hard_wrap, max_scroll_offset, tail_ellipsize, LINE_CHARS};

const OUTPUT_ROWS: usize = 4;
const BLINK: Duration = Duration::from_millis(500);

struct Output {
    lines: Vec<String>,
    scroll: usize,
}

impl Output {
    fn new(lines: Vec<String>) -> Self {
        Self { lines, scroll: 0 }
    }
}

pub struct TerminalMode {
    device: PathBuf,
    shell: String,
    timeout: Duration,
    keyboard: Option<Keyboard>,
    buffer: String,
    cwd: PathBuf,
    output: Option<Output>,
    running: Worker<Vec<String>>,
    epoch: Instant,
}

impl TerminalMode {
    pub fn new(device: impl Into<PathBuf>, shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            device: device.into(),
            shell: shell.into(),
            timeout,
            keyboard: None,
            buffer: String::new(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            output: Some(Output::new(vec!["Connect a USB keyboard.".to_string()])),
            running: Worker::new("terminal-cmd"),
            epoch: Instant::now(),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn keyboard_connected(&self) -> bool {
        self.keyboard.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_running()
    }

    /// Lines currently on screen in the output view, if it is open.
    pub fn output(&self) -> Option<&[String]> {
        self.output.as_ref().map(|o| o.lines.as_slice())
    }

    fn show(&mut self, lines: Vec<String>) {
        self.output = Some(Output::new(lines));
    }

    fn open_keyboard(&mut self) {
        match Keyboard::open(&self.device) {
            Ok(keyboard) => {
                tracing::info!("Listening to keyboard '{}'", keyboard.name());
                self.show(vec!["Keyboard connected:".to_string(), keyboard.name().to_string()]);
                self.keyboard = Some(keyboard);
            }
            Err(err) => {
                let lines = match err.kind() {
                    io::ErrorKind::PermissionDenied => {
                        vec!["Error: Permission denied.".to_string(), "Run as root.".to_string()]
                    }
                    io::ErrorKind::NotFound => vec![
                        "Keyboard not found at:".to_string(),
                        self.device.display().to_string(),
                    ],
                    _ => hard_wrap(&format!("Error: {err}"), LINE_CHARS),
                };
                tracing::warn!("Keyboard {}: {}", self.device.display(), err);
                self.keyboard = None;
                self.show(lines);
            }
        }
    }

    /// Submits the command line. `cd` is handled here, everything else runs
    /// through the shell off the UI thread.
    pub fn submit(&mut self) {
        let command = std::mem::take(&mut self.buffer);
        let command = command.trim();
        if command.is_empty() {
            self.show(vec![String::new()]);
            return;
        }
        if command == "cd" || command.starts_with("cd ") {
            let target = command[2..].trim();
            let lines = self.change_dir(target);
            self.show(lines);
            return;
        }

        let shell = self.shell.clone();
        let cwd = self.cwd.clone();
        let timeout = self.timeout;
        let line = command.to_string();
        tracing::debug!(command = %line, "Running terminal command");
        let started = self.running.start(move || {
            match run_with_timeout(&shell, ["-c", line.as_str()], Some(&cwd), timeout) {
                Ok(out) => {
                    let text = format!("{}{}", out.stdout, out.stderr);
                    hard_wrap(text.trim(), LINE_CHARS)
                }
                Err(err) => {
                    let mut lines = vec!["Failed:".to_string()];
                    lines.extend(hard_wrap(&err.to_string(), LINE_CHARS));
                    lines
                }
            }
        });
        if started {
            self.show(vec!["Running...".to_string()]);
        }
    }

    fn change_dir(&mut self, target: &str) -> Vec<String> {
        let expanded = expand_tilde(target);
        let candidate = if expanded.is_absolute() {
            expanded
        } else {
            self.cwd.join(expanded)
        };
        match candidate.canonicalize() {
            Ok(path) if path.is_dir() => {
                self.cwd = path;
                let mut lines = vec!["New Dir:".to_string()];
                lines.extend(hard_wrap(&self.cwd.display().to_string(), LINE_CHARS));
                lines
            }
            Ok(path) => hard_wrap(&format!("Error: not a directory: {}", path.display()), LINE_CHARS),
            Err(err) => hard_wrap(&format!("Error: {err}"), LINE_CHARS),
        }
    }

    fn on_typed(&mut self, key: TypedKey) {
        if self.output.is_some() {
            if !self.running.is_running() {
                self.output = None;
            }
            return;
        }
        match key {
            TypedKey::Char(c) => self.buffer.push(c),
            TypedKey::Backspace => {
                self.buffer.pop();
            }
            TypedKey::Enter => self.submit(),
        }
    }

    fn poll_keyboard(&mut self) {
        let Some(keyboard) = self.keyboard.as_mut() else {
            return;
        };
        match keyboard.drain() {
            Ok(keys) => {
                for key in keys {
                    self.on_typed(key);
                }
            }
            Err(err) => {
                tracing::warn!("Keyboard read failed: {}", err);
                self.keyboard = None;
                self.show(vec!["Keyboard disconnected.".to_string()]);
            }
        }
    }

    fn draw_output(canvas: &mut Canvas, output: &Output) {
        canvas.text("--- Output ---", 0, 0);
        for (row, line) in output.lines.iter().skip(output.scroll).take(OUTPUT_ROWS).enumerate() {
            canvas.text(line, 0, 11 + row as i32 * 10);
        }
        canvas.text("Any key to close", 0, 54);
    }

    fn draw_prompt(&self, canvas: &mut Canvas) {
        let cursor = if (self.epoch.elapsed().as_millis() / BLINK.as_millis()) % 2 == 0 {
            "_"
        } else {
            " "
        };
        let prompt = format!("> {}{}", self.buffer, cursor);
        let lines = hard_wrap(&prompt, LINE_CHARS);
        let skip = lines.len().saturating_sub(OUTPUT_ROWS);
        for (row, line) in lines.iter().skip(skip).enumerate() {
            canvas.text(line, 0, row as i32 * 10);
        }
        canvas.text(&tail_ellipsize(&self.cwd.display().to_string(), LINE_CHARS), 0, 54);
    }
}

fn expand_tilde(target: &str) -> PathBuf {
    let home = || std::env::var_os("HOME").map(PathBuf::from);
    if target.is_empty() || target == "~" {
        return home().unwrap_or_else(|| PathBuf::from("/"));
    }
    if let Some(rest) = target.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    PathBuf::from(target)
}

impl Mode for TerminalMode {
    fn name(&self) -> &str {
        "TERMINAL"
    }

    fn activate(&mut self) {
        self.buffer.clear();
        self.open_keyboard();
    }

    fn deactivate(&mut self) {
        self.keyboard = None;
        self.output = None;
    }

    fn handle_input(&mut self, key: Option<Key>) {
        let Some(key) = key else {
            return;
        };
        let running = self.running.is_running();
        let Some(output) = self.output.as_mut() else {
            return;
        };
        match key {
            Key::Up => output.scroll = output.scroll.saturating_sub(1),
            Key::Down => {
                output.scroll = (output.scroll + 1).min(max_scroll_offset(output.lines.len(), OUTPUT_ROWS));
            }
            _ if !running => self.output = None,
            _ => {}
        }
    }

    fn tick(&mut self) {
        if let Some(lines) = self.running.take() {
            self.show(lines);
        }
        self.poll_keyboard();
    }

    fn draw(&mut self, canvas: &mut Canvas, _active_mode: &str) {
        match self.output.as_ref() {
            Some(output) => Self::draw_output(canvas, output),
            None => self.draw_prompt(canvas),
        }
    }
}
