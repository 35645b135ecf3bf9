//! Non-blocking reader for an external USB keyboard on `/dev/input/eventN`.
//!
//! Events are the kernel's `struct input_event`: a `timeval` followed by
//! `u16 type`, `u16 code` and `i32 value`, in native byte order.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::mem;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

const EV_KEY: u16 = 0x01;
const PRESS: i32 = 1;
const RELEASE: i32 = 0;

const TIMEVAL_SIZE: usize = mem::size_of::<libc::timeval>();
pub const EVENT_SIZE: usize = TIMEVAL_SIZE + 8;

pub mod code {
    pub const BACKSPACE: u16 = 14;
    pub const ENTER: u16 = 28;
    pub const LEFT_SHIFT: u16 = 42;
    pub const RIGHT_SHIFT: u16 = 54;
    pub const SPACE: u16 = 57;
    pub const CAPS_LOCK: u16 = 58;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn key(code: u16, value: i32) -> Self {
        Self {
            kind: EV_KEY,
            code,
            value,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < EVENT_SIZE {
            return None;
        }
        let rest = &bytes[TIMEVAL_SIZE..EVENT_SIZE];
        Some(Self {
            kind: u16::from_ne_bytes([rest[0], rest[1]]),
            code: u16::from_ne_bytes([rest[2], rest[3]]),
            value: i32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]),
        })
    }

    /// Kernel layout with a zeroed timestamp.
    pub fn to_bytes(&self) -> [u8; EVENT_SIZE] {
        let mut out = [0u8; EVENT_SIZE];
        out[TIMEVAL_SIZE..TIMEVAL_SIZE + 2].copy_from_slice(&self.kind.to_ne_bytes());
        out[TIMEVAL_SIZE + 2..TIMEVAL_SIZE + 4].copy_from_slice(&self.code.to_ne_bytes());
        out[TIMEVAL_SIZE + 4..EVENT_SIZE].copy_from_slice(&self.value.to_ne_bytes());
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedKey {
    Char(char),
    Backspace,
    Enter,
}

/// US layout: (code, plain, shifted).
const US_LAYOUT: &[(u16, char, char)] = &[
    (2, '1', '!'),
    (3, '2', '@'),
    (4, '3', '#'),
    (5, '4', '$'),
    (6, '5', '%'),
    (7, '6', '^'),
    (8, '7', '&'),
    (9, '8', '*'),
    (10, '9', '('),
    (11, '0', ')'),
    (12, '-', '_'),
    (13, '=', '+'),
    (16, 'q', 'Q'),
    (17, 'w', 'W'),
    (18, 'e', 'E'),
    (19, 'r', 'R'),
    (20, 't', 'T'),
    (21, 'y', 'Y'),
    (22, 'u', 'U'),
    (23, 'i', 'I'),
    (24, 'o', 'O'),
    (25, 'p', 'P'),
    (26, '[', '{'),
    (27, ']', '}'),
    (30, 'a', 'A'),
    (31, 's', 'S'),
    (32, 'd', 'D'),
    (33, 'f', 'F'),
    (34, 'g', 'G'),
    (35, 'h', 'H'),
    (36, 'j', 'J'),
    (37, 'k', 'K'),
    (38, 'l', 'L'),
    (39, ';', ':'),
    (40, '\'', '"'),
    (41, '`', '~'),
    (43, '\\', '|'),
    (44, 'z', 'Z'),
    (45, 'x', 'X'),
    (46, 'c', 'C'),
    (47, 'v', 'V'),
    (48, 'b', 'B'),
    (49, 'n', 'N'),
    (50, 'm', 'M'),
    (51, ',', '<'),
    (52, '.', '>'),
    (53, '/', '?'),
    (code::SPACE, ' ', ' '),
];

/// Tracks modifier state across events and turns key presses into text.
#[derive(Debug, Default)]
pub struct KeyTranslator {
    left_shift: bool,
    right_shift: bool,
    caps_lock: bool,
}

impl KeyTranslator {
    pub fn feed(&mut self, event: InputEvent) -> Option<TypedKey> {
        if event.kind != EV_KEY {
            return None;
        }
        match (event.code, event.value) {
            (code::LEFT_SHIFT, v) => {
                self.left_shift = v != RELEASE;
                None
            }
            (code::RIGHT_SHIFT, v) => {
                self.right_shift = v != RELEASE;
                None
            }
            (code::CAPS_LOCK, PRESS) => {
                self.caps_lock = !self.caps_lock;
                None
            }
            (_, PRESS) => self.translate(event.code),
            _ => None,
        }
    }

    fn translate(&self, key: u16) -> Option<TypedKey> {
        match key {
            code::BACKSPACE => return Some(TypedKey::Backspace),
            code::ENTER => return Some(TypedKey::Enter),
            _ => {}
        }
        let &(_, plain, shifted) = US_LAYOUT.iter().find(|(c, _, _)| *c == key)?;
        let shift = self.left_shift || self.right_shift;
        let upper = if plain.is_ascii_alphabetic() {
            shift ^ self.caps_lock
        } else {
            shift
        };
        Some(TypedKey::Char(if upper { shifted } else { plain }))
    }
}

/// An open keyboard device.
pub struct Keyboard {
    file: File,
    name: String,
    pending: Vec<u8>,
    translator: KeyTranslator,
}

impl Keyboard {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(Self {
            file,
            name: device_name(path).unwrap_or_else(|| path.display().to_string()),
            pending: Vec::new(),
            translator: KeyTranslator::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads everything queued right now. Never blocks.
    pub fn drain(&mut self) -> io::Result<Vec<TypedKey>> {
        let mut buf = [0u8; EVENT_SIZE * 16];
        loop {
            match self.file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        let whole = self.pending.len() / EVENT_SIZE * EVENT_SIZE;
        let keys = self.pending[..whole]
            .chunks_exact(EVENT_SIZE)
            .filter_map(InputEvent::from_bytes)
            .filter_map(|event| self.translator.feed(event))
            .collect();
        self.pending.drain(..whole);
        Ok(keys)
    }
}

/// `/dev/input/event2` -> contents of `/sys/class/input/event2/device/name`.
fn device_name(path: &Path) -> Option<String> {
    let node = path.file_name()?;
    let sys: PathBuf = Path::new("/sys/class/input").join(node).join("device/name");
    std::fs::read_to_string(sys)
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn press(code: u16) -> InputEvent {
        InputEvent::key(code, PRESS)
    }

    fn typed(events: &[InputEvent]) -> String {
        let mut tr = KeyTranslator::default();
        events
            .iter()
            .filter_map(|e| tr.feed(*e))
            .filter_map(|k| match k {
                TypedKey::Char(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn event_bytes_decode() {
        let event = InputEvent::key(30, PRESS);
        assert_eq!(InputEvent::from_bytes(&event.to_bytes()), Some(event));
        assert_eq!(InputEvent::from_bytes(&[0u8; 4]), None);
    }

    #[test]
    fn shift_is_held_and_caps_is_toggled() {
        let held = [
            InputEvent::key(code::LEFT_SHIFT, PRESS),
            press(30),
            press(2),
            InputEvent::key(code::LEFT_SHIFT, RELEASE),
            press(30),
        ];
        assert_eq!(typed(&held), "A!a");

        let caps = [
            press(code::CAPS_LOCK),
            press(30),
            press(2),
            InputEvent::key(code::RIGHT_SHIFT, PRESS),
            press(30),
        ];
        assert_eq!(typed(&caps), "A1a");
    }

    #[test]
    fn releases_and_other_event_types_are_ignored() {
        let mut tr = KeyTranslator::default();
        assert_eq!(tr.feed(InputEvent::key(30, RELEASE)), None);
        assert_eq!(tr.feed(InputEvent { kind: 4, code: 4, value: 30 }), None);
        assert_eq!(tr.feed(press(code::ENTER)), Some(TypedKey::Enter));
        assert_eq!(tr.feed(press(code::BACKSPACE)), Some(TypedKey::Backspace));
        assert_eq!(tr.feed(press(29)), None);
    }

    #[test]
    fn drain_reads_queued_events_and_keeps_partial_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for code in [35u16, 23] {
            file.write_all(&press(code).to_bytes()).unwrap();
        }
        file.write_all(&press(28).to_bytes()[..3]).unwrap();
        file.flush().unwrap();

        let mut keyboard = Keyboard::open(file.path()).unwrap();
        let keys = keyboard.drain().unwrap();
        assert_eq!(keys, vec![TypedKey::Char('h'), TypedKey::Char('i')]);
        assert_eq!(keyboard.pending.len(), 3);
        assert!(keyboard.drain().unwrap().is_empty());
    }

    #[test]
    fn missing_device_is_not_found() {
        let err = Keyboard::open(Path::new("/nonexistent/event9")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
