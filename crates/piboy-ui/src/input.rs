use std::time::{Duration, Instant};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Logical key symbols produced by the button matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Primary,
    Secondary,
    Start,
    ModeSwitch,
}

impl Key {
    pub const ALL: [Key; 8] = [
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Primary,
        Key::Secondary,
        Key::Start,
        Key::ModeSwitch,
    ];
}

/// Polled once per tick. Yields at most one key, or `None` when idle.
pub trait KeySource {
    fn poll(&mut self) -> Result<Option<Key>>;
}

impl<K: KeySource + ?Sized> KeySource for Box<K> {
    fn poll(&mut self) -> Result<Option<Key>> {
        (**self).poll()
    }
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_press: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_press: None,
        }
    }

    pub fn ready(&self, now: Instant) -> bool {
        match self.last_press {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn accept(&mut self, now: Instant) {
        self.last_press = Some(now);
    }
}

/// Row outputs and column inputs of a switch matrix. Columns read high
/// when open; a closed switch pulls its column to the level of its row.
pub trait PinBank {
    fn drive_row(&mut self, row: usize, high: bool) -> Result<()>;
    fn col_is_high(&mut self, col: usize) -> Result<bool>;
}

pub struct ButtonMatrix<P> {
    pins: P,
    layout: Vec<Vec<Key>>,
    debounce: Debouncer,
}

impl<P: PinBank> ButtonMatrix<P> {
    pub fn new(pins: P, layout: Vec<Vec<Key>>, debounce: Duration) -> Self {
        Self {
            pins,
            layout,
            debounce: Debouncer::new(debounce),
        }
    }

    /// Drives each row low in turn and returns the first closed switch.
    /// Every row is back high when this returns.
    pub fn scan(&mut self) -> Result<Option<Key>> {
        for (row, keys) in self.layout.iter().enumerate() {
            self.pins.drive_row(row, false)?;
            let hit = first_low_col(&mut self.pins, keys.len());
            self.pins.drive_row(row, true)?;
            if let Some(col) = hit? {
                return Ok(Some(keys[col]));
            }
        }
        Ok(None)
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }
}

fn first_low_col<P: PinBank>(pins: &mut P, cols: usize) -> Result<Option<usize>> {
    for col in 0..cols {
        if !pins.col_is_high(col)? {
            return Ok(Some(col));
        }
    }
    Ok(None)
}

impl<P: PinBank> KeySource for ButtonMatrix<P> {
    fn poll(&mut self) -> Result<Option<Key>> {
        let now = Instant::now();
        if !self.debounce.ready(now) {
            return Ok(None);
        }
        let key = self.scan()?;
        if let Some(key) = key {
            self.debounce.accept(now);
            tracing::trace!(target: "input", ?key, "key press");
        }
        Ok(key)
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use anyhow::Context;
    use linux_embedded_hal::gpio_cdev::{Chip, LineHandle, LineRequestFlags};

    use crate::config::PinConfig;

    const CONSUMER: &str = "piboy-ui";

    /// Matrix lines on a gpiochip character device. Column pull-ups come
    /// from the board config (`gpio=5,6=pu`), not from the line request.
    pub struct GpioBank {
        rows: Vec<LineHandle>,
        cols: Vec<LineHandle>,
    }

    impl GpioBank {
        pub fn open(pins: &PinConfig) -> Result<Self> {
            let mut chip =
                Chip::new(&pins.chip).with_context(|| format!("opening {}", pins.chip))?;
            let rows = pins
                .rows
                .iter()
                .map(|&pin| request(&mut chip, pin, LineRequestFlags::OUTPUT, 1))
                .collect::<Result<Vec<_>>>()?;
            let cols = pins
                .cols
                .iter()
                .map(|&pin| request(&mut chip, pin, LineRequestFlags::INPUT, 0))
                .collect::<Result<Vec<_>>>()?;
            Ok(Self { rows, cols })
        }
    }

    fn request(chip: &mut Chip, pin: u32, flags: LineRequestFlags, default: u8) -> Result<LineHandle> {
        let line = chip
            .get_line(pin)
            .with_context(|| format!("requesting GPIO line {}", pin))?;
        line.request(flags, default, CONSUMER)
            .with_context(|| format!("configuring GPIO line {}", pin))
    }

    impl PinBank for GpioBank {
        fn drive_row(&mut self, row: usize, high: bool) -> Result<()> {
            let handle = self
                .rows
                .get(row)
                .with_context(|| format!("row {row} not configured"))?;
            handle
                .set_value(u8::from(high))
                .with_context(|| format!("driving row {row}"))
        }

        fn col_is_high(&mut self, col: usize) -> Result<bool> {
            let handle = self
                .cols
                .get(col)
                .with_context(|| format!("column {col} not configured"))?;
            Ok(handle
                .get_value()
                .with_context(|| format!("reading column {col}"))?
                != 0)
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::*;

    use crate::config::PinConfig;

    /// Off-target stand-in: every switch stays open.
    pub struct GpioBank;

    impl GpioBank {
        pub fn open(_: &PinConfig) -> Result<Self> {
            Ok(Self)
        }
    }

    impl PinBank for GpioBank {
        fn drive_row(&mut self, _: usize, _: bool) -> Result<()> {
            Ok(())
        }

        fn col_is_high(&mut self, _: usize) -> Result<bool> {
            Ok(true)
        }
    }
}

pub use platform::GpioBank;
