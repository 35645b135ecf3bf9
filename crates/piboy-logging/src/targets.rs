//! Tracing targets that get their own log file.
//!
//! Events emitted with one of these targets are routed to `<target>.log`
//! and kept out of the component log.

pub const T_GAME: &str = "game";
pub const T_MEDIA: &str = "media";
pub const T_NET: &str = "net";

pub const SUBSYSTEMS: [&str; 3] = [T_GAME, T_MEDIA, T_NET];
