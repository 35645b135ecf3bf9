//! Wires the configured hardware to the mode shell.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::ShellConfig;
use crate::display::{FrameSink, Screen};
use crate::input::{ButtonMatrix, GpioBank, KeySource};
use crate::modes;
use crate::shell::Shell;

pub struct App {
    shell: Shell,
    keys: Box<dyn KeySource>,
    screen: Screen<Box<dyn FrameSink>>,
    tick: Duration,
}

impl App {
    pub fn new(config: &ShellConfig) -> Result<Self> {
        let bank = GpioBank::open(&config.pins).context("opening button matrix")?;
        let keys: Box<dyn KeySource> = Box::new(ButtonMatrix::new(
            bank,
            config.pins.layout.clone(),
            config.timing.debounce(),
        ));
        let sink = open_display(config)?;
        Self::with_parts(config, keys, sink)
    }

    /// Builds the app around an existing key source and frame sink.
    pub fn with_parts(
        config: &ShellConfig,
        keys: Box<dyn KeySource>,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self> {
        let shell = Shell::new(modes::build(config))?;
        tracing::info!(modes = ?shell.names(), "Shell ready");
        Ok(Self {
            shell,
            keys,
            screen: Screen::new(sink, config.display.width, config.display.height),
            tick: config.timing.tick(),
        })
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Ticks until `stop` is raised, then releases the current mode.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        self.shell
            .run(&mut self.keys, &mut self.screen, self.tick, stop);
        tracing::info!("Shell stopped");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn open_display(config: &ShellConfig) -> Result<Box<dyn FrameSink>> {
    use crate::display::Sh1106;
    use linux_embedded_hal::I2cdev;

    let panel = &config.display;
    let i2c = I2cdev::new(&panel.i2c_bus)
        .with_context(|| format!("opening I2C bus {}", panel.i2c_bus))?;
    let mut oled = Sh1106::new(i2c, panel.address, panel.column_offset);
    oled.init(panel.height)
        .with_context(|| format!("initialising SH1106 at {:#04x}", panel.address))?;
    tracing::info!(bus = %panel.i2c_bus, "OLED ready");
    Ok(Box::new(oled))
}

#[cfg(not(target_os = "linux"))]
fn open_display(_: &ShellConfig) -> Result<Box<dyn FrameSink>> {
    tracing::warn!("No OLED driver on this platform, rendering headless");
    Ok(Box::new(crate::display::HeadlessSink::new()))
}
