use std::time::Duration;

use chrono::Local;

use crate::display::Canvas;
use crate::input::Key;
use crate::shell::Mode;
use crate::stats::{percent, StatsCollector, SystemStats};
use crate::task::Sampler;
use crate::ui::draw_header;

const SAMPLE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPage {
    Clock,
    System,
}

impl StatsPage {
    const ALL: [StatsPage; 2] = [StatsPage::Clock, StatsPage::System];

    fn title(self) -> &'static str {
        match self {
            StatsPage::Clock => "CLOCK",
            StatsPage::System => "SYSTEM",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

pub struct StatsMode {
    page: StatsPage,
    command_timeout: Duration,
    sampler: Option<Sampler<SystemStats>>,
}

impl StatsMode {
    pub fn new(command_timeout: Duration) -> Self {
        Self {
            page: StatsPage::Clock,
            command_timeout,
            sampler: None,
        }
    }

    pub fn page(&self) -> StatsPage {
        self.page
    }

    fn snapshot(&self) -> SystemStats {
        self.sampler.as_ref().map(Sampler::snapshot).unwrap_or_default()
    }

    fn draw_clock(&self, canvas: &mut Canvas, stats: &SystemStats, active_mode: &str) {
        let now = Local::now();
        canvas.text_large(&now.format("%H:%M:%S").to_string(), 24, 14);
        canvas.text(
            &format!("CPU:{} T:{}", fmt_percent(stats.cpu_percent), fmt_temp(stats.temp_c)),
            2,
            38,
        );
        canvas.text(&format!("Mode: {active_mode} (UP=next)"), 2, 52);
    }

    fn draw_system(&self, canvas: &mut Canvas, stats: &SystemStats) {
        let ip = stats.ip.as_deref().unwrap_or("Not found");
        canvas.text(&format!("IP: {ip}"), 2, 12);
        canvas.text(&format!("CPU Load: {}", fmt_percent(stats.load_percent)), 2, 24);
        let mem = match stats.memory_mb {
            Some((used, total)) => format!(
                "Mem: {used}/{total}MB {:.0}%",
                percent(used as f64, total as f64)
            ),
            None => "Mem: N/A".to_string(),
        };
        canvas.text(&mem, 2, 36);
        let disk = match stats.disk_gb {
            Some((used, total)) => {
                format!("Disk: {used:.1}/{total:.1}GB {:.0}%", percent(used, total))
            }
            None => "Disk: N/A".to_string(),
        };
        canvas.text(&disk, 2, 48);
    }
}

fn fmt_percent(value: Option<f32>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.0}%"))
}

fn fmt_temp(value: Option<f32>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}C"))
}

impl Mode for StatsMode {
    fn name(&self) -> &str {
        "STATS"
    }

    fn activate(&mut self) {
        self.page = StatsPage::Clock;
        let mut collector = StatsCollector::new(self.command_timeout);
        self.sampler = Some(Sampler::spawn("stats-sampler", SAMPLE_PERIOD, move || {
            collector.sample()
        }));
    }

    fn deactivate(&mut self) {
        self.sampler = None;
    }

    fn handle_input(&mut self, key: Option<Key>) {
        if key == Some(Key::Up) {
            self.page = self.page.next();
        }
    }

    fn draw(&mut self, canvas: &mut Canvas, active_mode: &str) {
        draw_header(canvas, self.page.title());
        let stats = self.snapshot();
        match self.page {
            StatsPage::Clock => self.draw_clock(canvas, &stats, active_mode),
            StatsPage::System => self.draw_system(canvas, &stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_cycles_pages_and_activate_resets() {
        let mut mode = StatsMode::new(Duration::from_secs(1));
        assert_eq!(mode.page(), StatsPage::Clock);
        mode.handle_input(Some(Key::Up));
        assert_eq!(mode.page(), StatsPage::System);
        mode.handle_input(Some(Key::Down));
        assert_eq!(mode.page(), StatsPage::System);
        mode.handle_input(Some(Key::Up));
        assert_eq!(mode.page(), StatsPage::Clock);

        mode.handle_input(Some(Key::Up));
        mode.activate();
        assert_eq!(mode.page(), StatsPage::Clock);
        mode.deactivate();
    }

    #[test]
    fn draws_without_samples() {
        let mut mode = StatsMode::new(Duration::from_secs(1));
        for _ in 0..2 {
            let mut canvas = Canvas::new(128, 64);
            mode.draw(&mut canvas, "STATS");
            assert!(canvas.lit_pixels() > 0);
            mode.handle_input(Some(Key::Up));
        }
    }

    #[test]
    fn missing_values_render_as_na() {
        assert_eq!(fmt_percent(None), "N/A");
        assert_eq!(fmt_temp(Some(48.31)), "48.3C");
        assert_eq!(fmt_percent(Some(12.6)), "13%");
    }
}
