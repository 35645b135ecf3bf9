use std::sync::Arc;
use std::time::{Duration, Instant};

use piboy_logging::targets::T_NET;

use crate::display::Canvas;
use crate::error::CommandError;
use crate::input::Key;
use crate::process::{run_checked, run_with_timeout};
use crate::shell::Mode;
use crate::task::{Sampler, ScanTask, Worker};
use crate::ui::{draw_menu, ellipsize, PagedList, MENU_WINDOW};

pub const PASSWORD_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=";
const WHEEL_WIDTH: usize = 16;

/// The network manager behind the WIFI screen.
pub trait WifiBackend: Send + Sync + 'static {
    /// Visible SSIDs, deduplicated, in the order the manager reports them.
    fn scan(&self) -> Vec<String>;
    /// One-line connection status for the title bar.
    fn status(&self) -> String;
    fn connect(&self, ssid: &str, password: &str) -> Result<(), CommandError>;
}

/// NetworkManager via `nmcli`. Arguments are passed straight to the
/// program, never through a shell.
pub struct Nmcli {
    timeout: Duration,
}

impl Nmcli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl WifiBackend for Nmcli {
    fn scan(&self) -> Vec<String> {
        match run_checked("nmcli", ["--terse", "--fields", "SSID", "dev", "wifi", "list"], self.timeout) {
            Ok(output) => parse_ssids(&output.stdout),
            Err(err) => {
                tracing::warn!(target: T_NET, "WiFi scan failed: {}", err);
                Vec::new()
            }
        }
    }

    fn status(&self) -> String {
        match run_with_timeout("nmcli", ["-t", "-f", "ACTIVE,SSID", "dev", "wifi"], None, self.timeout) {
            Ok(output) if output.success() => parse_active_ssid(&output.stdout)
                .map(|ssid| format!("Connected: {ssid}"))
                .unwrap_or_else(|| "Disconnected".to_string()),
            _ => "Disconnected".to_string(),
        }
    }

    fn connect(&self, ssid: &str, password: &str) -> Result<(), CommandError> {
        run_checked(
            "nmcli",
            ["dev", "wifi", "connect", ssid, "password", password],
            self.timeout,
        )
        .map(|_| ())
    }
}

pub fn parse_ssids(raw: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for ssid in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !seen.iter().any(|s| s == ssid) {
            seen.push(ssid.to_string());
        }
    }
    seen
}

pub fn parse_active_ssid(raw: &str) -> Option<String> {
    raw.lines()
        .filter_map(|line| line.strip_prefix("yes:"))
        .map(str::trim)
        .find(|ssid| !ssid.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PasswordEntry {
    ssid: String,
    password: String,
    cursor: usize,
}

impl PasswordEntry {
    fn new(ssid: String) -> Self {
        Self {
            ssid,
            password: String::new(),
            cursor: 0,
        }
    }

    fn current(&self) -> char {
        PASSWORD_CHARS.as_bytes()[self.cursor] as char
    }

    fn step(&mut self, forward: bool) {
        let len = PASSWORD_CHARS.len();
        self.cursor = if forward {
            (self.cursor + 1) % len
        } else {
            (self.cursor + len - 1) % len
        };
    }
}

struct Notice {
    text: String,
    until: Instant,
}

pub struct WifiMode {
    backend: Arc<dyn WifiBackend>,
    refresh: Duration,
    scan: ScanTask<String>,
    status: Option<Sampler<String>>,
    connect: Worker<Result<(), String>>,
    list: PagedList,
    entry: Option<PasswordEntry>,
    notice: Option<Notice>,
}

impl WifiMode {
    pub fn new(backend: Arc<dyn WifiBackend>, refresh: Duration) -> Self {
        let scanner = Arc::clone(&backend);
        Self {
            scan: ScanTask::new("wifi-scan", move || scanner.scan()),
            backend,
            refresh,
            status: None,
            connect: Worker::new("wifi-connect"),
            list: PagedList::new(MENU_WINDOW),
            entry: None,
            notice: None,
        }
    }

    pub fn networks(&self) -> Vec<String> {
        self.scan.result()
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_running()
    }

    pub fn is_connecting(&self) -> bool {
        self.connect.is_running()
    }

    pub fn entering_password(&self) -> bool {
        self.entry.is_some()
    }

    pub fn password(&self) -> Option<&str> {
        self.entry.as_ref().map(|e| e.password.as_str())
    }

    pub fn title(&self) -> String {
        if self.connect.is_running() {
            return "Connecting...".to_string();
        }
        if self.scan.is_running() {
            return "Scanning...".to_string();
        }
        if let Some(notice) = self.notice.as_ref().filter(|n| Instant::now() < n.until) {
            return notice.text.clone();
        }
        self.status
            .as_ref()
            .map(Sampler::snapshot)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Disconnected".to_string())
    }

    fn start_connect(&mut self, entry: PasswordEntry) {
        let backend = Arc::clone(&self.backend);
        let PasswordEntry { ssid, password, .. } = entry;
        tracing::info!(target: T_NET, ssid = %ssid, "Connecting");
        let started = self.connect.start(move || {
            backend
                .connect(&ssid, &password)
                .map_err(|err| err.to_string())
        });
        if !started {
            tracing::warn!(target: T_NET, "Connect already in progress");
        }
    }

    fn collect_connect_result(&mut self) {
        let Some(result) = self.connect.take() else {
            return;
        };
        let text = match result {
            Ok(()) => {
                tracing::info!(target: T_NET, "WiFi connect succeeded");
                "Connected!".to_string()
            }
            Err(err) => {
                tracing::error!(target: T_NET, "WiFi connect failed: {}", err);
                "Connect failed".to_string()
            }
        };
        self.notice = Some(Notice {
            text,
            until: Instant::now() + self.refresh,
        });
    }

    fn handle_list_input(&mut self, key: Option<Key>) {
        let networks = self.scan.result();
        let len = networks.len();
        self.list.clamp(len);
        match key {
            Some(Key::Up) => self.list.move_up(len),
            Some(Key::Down) => self.list.move_down(len),
            Some(Key::Right) => {
                if self.scan.start() {
                    self.list.reset();
                }
            }
            Some(Key::Primary | Key::Start) => {
                if let Some(ssid) = networks.get(self.list.selection()) {
                    self.entry = Some(PasswordEntry::new(ssid.clone()));
                }
            }
            _ => {}
        }
    }

    fn draw_password(&self, canvas: &mut Canvas, entry: &PasswordEntry) {
        canvas.text(&format!("Pass for {}:", ellipsize(&entry.ssid, 15)), 0, 0);
        canvas.outline_rect(0, 12, canvas.width() as i32 - 1, 24);
        canvas.text(&"*".repeat(entry.password.chars().count()), 2, 14);

        let start = entry.cursor.saturating_sub(WHEEL_WIDTH / 2);
        for (i, ch) in PASSWORD_CHARS.chars().enumerate().skip(start).take(WHEEL_WIDTH) {
            let x = ((i - start) * 8) as i32;
            if i == entry.cursor {
                canvas.text_inverted(&ch.to_string(), x + 1, 28);
            } else {
                canvas.text(&ch.to_string(), x + 1, 28);
            }
        }
        canvas.text("A/D:Select B:Add", 0, 42);
        canvas.text("START:Go A_R:Back", 0, 52);
    }
}

impl Mode for WifiMode {
    fn name(&self) -> &str {
        "WIFI"
    }

    fn activate(&mut self) {
        self.entry = None;
        self.list.reset();
        let backend = Arc::clone(&self.backend);
        self.status = Some(Sampler::spawn("wifi-status", self.refresh, move || {
            backend.status()
        }));
        self.scan.start();
    }

    fn deactivate(&mut self) {
        self.entry = None;
        self.status = None;
    }

    fn handle_input(&mut self, key: Option<Key>) {
        let Some(mut entry) = self.entry.take() else {
            self.handle_list_input(key);
            return;
        };
        match key {
            Some(Key::Right) => entry.step(true),
            Some(Key::Left) => entry.step(false),
            Some(Key::Primary) => entry.password.push(entry.current()),
            Some(Key::Secondary) => {
                entry.password.pop();
            }
            Some(Key::Start) => {
                self.start_connect(entry);
                return;
            }
            _ => {}
        }
        self.entry = Some(entry);
    }

    fn tick(&mut self) {
        self.collect_connect_result();
    }

    fn draw(&mut self, canvas: &mut Canvas, _active_mode: &str) {
        if let Some(entry) = self.entry.as_ref() {
            self.draw_password(canvas, entry);
            return;
        }
        let networks = self.scan.result();
        self.list.clamp(networks.len());
        draw_menu(canvas, &self.title(), &networks, &self.list);
        canvas.text("W/S:Scroll B:Select D:Scan", 0, 54);
    }
}
