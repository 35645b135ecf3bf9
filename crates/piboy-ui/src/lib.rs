#![deny(unsafe_op_in_unsafe_fn)]
//! Mode-switching UI shell for a handheld with a button matrix and an
//! SH1106 OLED.

pub mod app;
pub mod cartridge;
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod keyboard;
pub mod listing;
pub mod modes;
pub mod process;
pub mod shell;
pub mod signals;
pub mod stats;
pub mod task;
pub mod ui;

pub use app::App;
pub use shell::{Mode, Shell};
