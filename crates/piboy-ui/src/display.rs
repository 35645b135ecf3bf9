use std::convert::Infallible;
use std::ops::{Deref, DerefMut};

use anyhow::{anyhow, Result};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_9X15},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use embedded_hal::i2c::I2c;

/// 1-bit frame buffer in SH1106 page order: byte `page * width + x`
/// holds rows `page * 8 .. page * 8 + 8` of column `x`, LSB on top.
#[derive(Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    buf: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let pages = height.div_ceil(8);
        Self {
            width,
            height,
            buf: vec![0; (width * pages) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pages(&self) -> usize {
        self.height.div_ceil(8) as usize
    }

    pub fn page(&self, page: usize) -> &[u8] {
        let w = self.width as usize;
        &self.buf[page * w..(page + 1) * w]
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    pub fn pixel(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some((idx, bit)) => self.buf[idx] & bit != 0,
            None => false,
        }
    }

    pub fn lit_pixels(&self) -> usize {
        self.buf.iter().map(|b| b.count_ones() as usize).sum()
    }

    fn index(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let idx = (y as usize / 8) * self.width as usize + x as usize;
        Some((idx, 1 << (y % 8)))
    }

    fn set(&mut self, x: i32, y: i32, on: bool) {
        if let Some((idx, bit)) = self.index(x, y) {
            if on {
                self.buf[idx] |= bit;
            } else {
                self.buf[idx] &= !bit;
            }
        }
    }

    /// 6x10 text with its top-left corner at `(x, y)`; `\n` starts a new line.
    pub fn text(&mut self, text: &str, x: i32, y: i32) {
        self.text_with(&FONT_6X10, text, x, y);
    }

    pub fn text_medium(&mut self, text: &str, x: i32, y: i32) {
        self.text_with(&FONT_9X15, text, x, y);
    }

    pub fn text_large(&mut self, text: &str, x: i32, y: i32) {
        self.text_with(&FONT_10X20, text, x, y);
    }

    /// Dark 6x10 text on a lit box one pixel wider than the glyphs.
    pub fn text_inverted(&mut self, text: &str, x: i32, y: i32) {
        let glyph = FONT_6X10.character_size;
        let cols = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
        let rows = text.lines().count().max(1) as i32;
        self.fill_rect(
            x - 1,
            y,
            x + cols * glyph.width as i32,
            y + rows * glyph.height as i32 - 1,
        );
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::Off);
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(self);
    }

    fn text_with(&mut self, font: &MonoFont<'_>, text: &str, x: i32, y: i32) {
        let style = MonoTextStyle::new(font, BinaryColor::On);
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(self);
    }

    /// Filled rectangle, both corners inclusive.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let _ = Rectangle::with_corners(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(self);
    }

    pub fn outline_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let _ = Rectangle::with_corners(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(self);
    }

    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let _ = Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(self);
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, color.is_on());
        }
        Ok(())
    }
}

/// Where finished frames go.
pub trait FrameSink {
    fn flush(&mut self, canvas: &Canvas) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn flush(&mut self, canvas: &Canvas) -> Result<()> {
        (**self).flush(canvas)
    }
}

pub struct Screen<S> {
    sink: S,
    canvas: Canvas,
}

impl<S: FrameSink> Screen<S> {
    pub fn new(sink: S, width: u32, height: u32) -> Self {
        Self {
            sink,
            canvas: Canvas::new(width, height),
        }
    }

    /// Starts a frame on a blank canvas. The frame is committed to the
    /// sink when the guard drops, unwinding included.
    pub fn frame(&mut self) -> Frame<'_, S> {
        self.canvas.clear();
        Frame { screen: self }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
}

pub struct Frame<'a, S: FrameSink> {
    screen: &'a mut Screen<S>,
}

impl<S: FrameSink> Deref for Frame<'_, S> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        &self.screen.canvas
    }
}

impl<S: FrameSink> DerefMut for Frame<'_, S> {
    fn deref_mut(&mut self) -> &mut Canvas {
        &mut self.screen.canvas
    }
}

impl<S: FrameSink> Drop for Frame<'_, S> {
    fn drop(&mut self) {
        let Screen { sink, canvas } = &mut *self.screen;
        if let Err(err) = sink.flush(canvas) {
            tracing::warn!("Frame flush failed: {:#}", err);
        }
    }
}

/// Keeps frames in memory. Used when no panel is attached.
#[derive(Default)]
pub struct HeadlessSink {
    flushes: usize,
    last: Option<Canvas>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn last_frame(&self) -> Option<&Canvas> {
        self.last.as_ref()
    }
}

impl FrameSink for HeadlessSink {
    fn flush(&mut self, canvas: &Canvas) -> Result<()> {
        self.flushes += 1;
        self.last = Some(canvas.clone());
        Ok(())
    }
}

mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_MULTIPLEX: u8 = 0xA8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_START_LINE: u8 = 0x40;
    pub const CHARGE_PUMP: u8 = 0x8D;
    pub const SEGMENT_REMAP: u8 = 0xA1;
    pub const COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DESELECT: u8 = 0xDB;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const PAGE_ADDR: u8 = 0xB0;
    pub const LOW_COLUMN: u8 = 0x00;
    pub const HIGH_COLUMN: u8 = 0x10;
}

const CONTROL_CMD: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

/// SH1106 128x64 OLED controller on I2C.
pub struct Sh1106<I2C> {
    i2c: I2C,
    address: u8,
    column_offset: u8,
}

impl<I2C: I2c> Sh1106<I2C> {
    pub fn new(i2c: I2C, address: u8, column_offset: u8) -> Self {
        Self {
            i2c,
            address,
            column_offset,
        }
    }

    pub fn init(&mut self, height: u32) -> Result<()> {
        let mux = (height.clamp(16, 64) - 1) as u8;
        let sequence = [
            cmd::DISPLAY_OFF,
            cmd::SET_CLOCK_DIV,
            0x80,
            cmd::SET_MULTIPLEX,
            mux,
            cmd::SET_DISPLAY_OFFSET,
            0x00,
            cmd::SET_START_LINE,
            cmd::CHARGE_PUMP,
            0x14,
            cmd::SEGMENT_REMAP,
            cmd::COM_SCAN_DEC,
            cmd::SET_COM_PINS,
            0x12,
            cmd::SET_CONTRAST,
            0xCF,
            cmd::SET_PRECHARGE,
            0xF1,
            cmd::SET_VCOM_DESELECT,
            0x40,
            cmd::NORMAL_DISPLAY,
            cmd::DISPLAY_ON,
        ];
        for byte in sequence {
            self.command(byte)?;
        }
        Ok(())
    }

    fn command(&mut self, byte: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[CONTROL_CMD, byte])
            .map_err(|err| anyhow!("SH1106 command {byte:#04x} failed: {err:?}"))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> FrameSink for Sh1106<I2C> {
    fn flush(&mut self, canvas: &Canvas) -> Result<()> {
        let mut data = Vec::with_capacity(canvas.width() as usize + 1);
        for page in 0..canvas.pages() {
            self.command(cmd::PAGE_ADDR | page as u8)?;
            self.command(cmd::LOW_COLUMN | (self.column_offset & 0x0F))?;
            self.command(cmd::HIGH_COLUMN | (self.column_offset >> 4))?;

            data.clear();
            data.push(CONTROL_DATA);
            data.extend_from_slice(canvas.page(page));
            self.i2c
                .write(self.address, &data)
                .map_err(|err| anyhow!("SH1106 page {page} write failed: {err:?}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl ErrorType for RecordingBus {
        type Error = Infallible;
    }

    impl I2c for RecordingBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn pixels_land_in_page_order() {
        let mut canvas = Canvas::new(128, 64);
        canvas.fill_rect(3, 9, 3, 9);
        assert!(canvas.pixel(3, 9));
        assert_eq!(canvas.page(1)[3], 0b0000_0010);
        assert_eq!(canvas.lit_pixels(), 1);
    }

    #[test]
    fn out_of_bounds_drawing_is_clipped() {
        let mut canvas = Canvas::new(128, 64);
        canvas.line(-10, -10, 200, 200);
        assert!(canvas.pixel(0, 0));
        assert!(!canvas.pixel(128, 128));
    }

    #[test]
    fn outline_corners_are_inclusive() {
        let mut canvas = Canvas::new(128, 64);
        canvas.outline_rect(0, 0, 9, 4);
        assert!(canvas.pixel(9, 4));
        assert!(!canvas.pixel(5, 2));
    }

    #[test]
    fn text_draws_something() {
        let mut canvas = Canvas::new(128, 64);
        canvas.text("Hi", 0, 0);
        assert!(canvas.lit_pixels() > 0);
    }

    #[test]
    fn inverted_text_clears_glyph_pixels_inside_a_bar() {
        let mut canvas = Canvas::new(128, 64);
        canvas.text_inverted("H", 2, 20);
        assert!(canvas.pixel(1, 20));
        assert!(canvas.pixel(8, 29));
        assert!(!canvas.pixel(9, 20));
        assert!(!canvas.pixel(1, 30));
        assert!(canvas.lit_pixels() < 8 * 10);
    }

    #[test]
    fn frame_flushes_once_on_drop() {
        let mut screen = Screen::new(HeadlessSink::new(), 128, 64);
        {
            let mut frame = screen.frame();
            frame.fill_rect(0, 0, 1, 1);
        }
        assert_eq!(screen.sink().flushes(), 1);
        assert!(screen.sink().last_frame().unwrap().pixel(1, 1));

        drop(screen.frame());
        assert_eq!(screen.sink().flushes(), 2);
        assert_eq!(screen.sink().last_frame().unwrap().lit_pixels(), 0);
    }

    #[test]
    fn frame_flushes_when_drawing_panics() {
        let mut screen = Screen::new(HeadlessSink::new(), 128, 64);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut frame = screen.frame();
            frame.text("boom", 0, 0);
            panic!("draw failed");
        }));
        assert!(result.is_err());
        assert_eq!(screen.sink().flushes(), 1);
    }

    #[test]
    fn sh1106_flush_writes_every_page_at_the_column_offset() {
        let mut oled = Sh1106::new(RecordingBus::default(), 0x3C, 2);
        let canvas = Canvas::new(128, 64);
        oled.flush(&canvas).unwrap();

        let bus = oled.release();
        let data: Vec<_> = bus.writes.iter().filter(|(_, b)| b[0] == CONTROL_DATA).collect();
        assert_eq!(data.len(), 8);
        assert!(data.iter().all(|(addr, b)| *addr == 0x3C && b.len() == 129));
        assert_eq!(bus.writes[0].1, vec![CONTROL_CMD, 0xB0]);
        assert_eq!(bus.writes[1].1, vec![CONTROL_CMD, 0x02]);
        assert_eq!(bus.writes[2].1, vec![CONTROL_CMD, 0x10]);
    }

    #[test]
    fn sh1106_init_ends_with_display_on() {
        let mut oled = Sh1106::new(RecordingBus::default(), 0x3C, 2);
        oled.init(64).unwrap();
        let bus = oled.release();
        assert_eq!(bus.writes.first().unwrap().1, vec![CONTROL_CMD, cmd::DISPLAY_OFF]);
        assert_eq!(bus.writes.last().unwrap().1, vec![CONTROL_CMD, cmd::DISPLAY_ON]);
    }
}
