use std::ffi::OsStr;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use piboy_logging::targets::T_MEDIA;

use crate::config::MediaConfig;
use crate::display::Canvas;
use crate::input::Key;
use crate::listing::list_files;
use crate::process::ManagedProcess;
use crate::shell::Mode;
use crate::ui::{draw_header, draw_menu, ellipsize, PagedList, MENU_WINDOW};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Menu,
    Player,
}

struct Playback {
    index: usize,
    process: ManagedProcess,
}

pub struct MusicMode {
    dir: PathBuf,
    media: MediaConfig,
    grace: Duration,
    tracks: Vec<String>,
    list: PagedList,
    view: View,
    playing: Option<Playback>,
    status: Option<String>,
}

impl MusicMode {
    pub fn new(dir: impl Into<PathBuf>, media: MediaConfig, grace: Duration) -> Self {
        Self {
            dir: dir.into(),
            media,
            grace,
            tracks: Vec::new(),
            list: PagedList::new(MENU_WINDOW),
            view: View::Menu,
            playing: None,
            status: None,
        }
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.playing
            .as_ref()
            .and_then(|p| self.tracks.get(p.index))
            .map(String::as_str)
    }

    pub fn is_paused(&self) -> bool {
        self.playing
            .as_ref()
            .map_or(false, |p| p.process.is_paused())
    }

    fn play(&mut self, index: usize) {
        self.stop_in_background();
        let Some(track) = self.tracks.get(index) else {
            return;
        };
        let path = self.dir.join(track);
        let args = self
            .media
            .player_args
            .iter()
            .map(OsStr::new)
            .chain(std::iter::once(path.as_os_str()));

        match ManagedProcess::spawn(&self.media.player, args) {
            Ok(process) => {
                tracing::info!(target: T_MEDIA, track = %track, pid = process.pid(), "Playing");
                self.list.select(index, self.tracks.len());
                self.playing = Some(Playback { index, process });
                self.status = None;
            }
            Err(err) => {
                tracing::error!(target: T_MEDIA, "{}", err);
                self.status = Some("Player failed".to_string());
            }
        }
    }

    fn skip(&mut self, forward: bool) {
        let len = self.tracks.len();
        let Some(current) = self.playing.as_ref().map(|p| p.index) else {
            return;
        };
        if len == 0 {
            return;
        }
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.play(next);
    }

    fn toggle_pause(&mut self) {
        let Some(playback) = self.playing.as_mut() else {
            return;
        };
        let result = if playback.process.is_paused() {
            playback.process.resume()
        } else {
            playback.process.pause()
        };
        if let Err(err) = result {
            tracing::warn!(target: T_MEDIA, "{:#}", err);
        }
    }

    /// Stops playback without holding up the tick for the grace period.
    fn stop_in_background(&mut self) {
        if let Some(mut playback) = self.playing.take() {
            let grace = self.grace;
            let spawned = thread::Builder::new()
                .name("music-stop".into())
                .spawn(move || playback.process.terminate(grace));
            if let Err(err) = spawned {
                tracing::warn!(target: T_MEDIA, "Stopping player inline: {}", err);
            }
        }
    }

    fn stop_now(&mut self) {
        if let Some(mut playback) = self.playing.take() {
            playback.process.terminate(self.grace);
            tracing::info!(target: T_MEDIA, "Playback stopped");
        }
    }

    fn draw_player(&self, canvas: &mut Canvas) {
        let Some(playback) = self.playing.as_ref() else {
            draw_header(canvas, "MUSIC");
            canvas.text(self.status.as_deref().unwrap_or("Nothing is playing"), 5, 20);
            return;
        };

        draw_header(canvas, "NOW PLAYING");
        let track = self.tracks.get(playback.index).map_or("", String::as_str);
        canvas.text(&ellipsize(track, 20), 5, 20);
        let paused = playback.process.is_paused();
        if paused {
            canvas.text("(Paused)", 5, 30);
        }
        canvas.text(if paused { "W:Resume A/D:Track" } else { "W:Pause A/D:Track" }, 5, 44);
        canvas.text("S:Stop", 5, 54);
    }
}

impl Mode for MusicMode {
    fn name(&self) -> &str {
        "MUSIC"
    }

    fn activate(&mut self) {
        self.tracks = list_files(&self.dir, &self.media.extensions);
        self.list.reset();
        self.view = View::Menu;
        self.status = None;
        tracing::debug!(target: T_MEDIA, count = self.tracks.len(), "Listed tracks");
    }

    fn deactivate(&mut self) {
        self.stop_now();
    }

    fn handle_input(&mut self, key: Option<Key>) {
        if key == Some(Key::Secondary) {
            self.view = match self.view {
                View::Menu => View::Player,
                View::Player => View::Menu,
            };
            return;
        }

        match self.view {
            View::Menu => {
                let len = self.tracks.len();
                match key {
                    Some(Key::Up) => self.list.move_up(len),
                    Some(Key::Down) => self.list.move_down(len),
                    Some(Key::Primary | Key::Start) if len > 0 => {
                        self.play(self.list.selection());
                        self.view = View::Player;
                    }
                    _ => {}
                }
            }
            View::Player if self.playing.is_some() => match key {
                Some(Key::Up) => self.toggle_pause(),
                Some(Key::Left) => self.skip(false),
                Some(Key::Right) => self.skip(true),
                Some(Key::Down | Key::Primary) => {
                    self.stop_in_background();
                    self.view = View::Menu;
                }
                _ => {}
            },
            View::Player => {
                if matches!(key, Some(Key::Down | Key::Primary)) {
                    self.view = View::Menu;
                }
            }
        }
    }

    /// Moves on to the next track once the player exits by itself.
    fn tick(&mut self) {
        let finished = match self.playing.as_mut() {
            Some(playback) => !playback.process.is_paused() && playback.process.has_exited(),
            None => false,
        };
        if finished {
            self.skip(true);
        }
    }

    fn draw(&mut self, canvas: &mut Canvas, _active_mode: &str) {
        match self.view {
            View::Menu => draw_menu(canvas, "MUSIC", &self.tracks, &self.list),
            View::Player => self.draw_player(canvas),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    fn media(script: &str) -> MediaConfig {
        MediaConfig {
            player: "sh".to_string(),
            player_args: vec!["-c".to_string(), script.to_string(), "player".to_string()],
            extensions: vec!["mp3".to_string()],
        }
    }

    fn library(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[test]
    fn lists_only_matching_tracks() {
        let dir = library(&["b.mp3", "a.MP3", "notes.txt"]);
        let mut mode = MusicMode::new(dir.path(), media("sleep 5"), Duration::from_millis(100));
        mode.activate();
        assert_eq!(mode.tracks(), ["a.MP3", "b.mp3"]);
    }

    #[test]
    fn empty_library_draws_placeholder() {
        let dir = library(&[]);
        let mut mode = MusicMode::new(dir.path(), media("sleep 5"), Duration::from_millis(100));
        mode.activate();
        mode.handle_input(Some(Key::Primary));
        assert!(mode.now_playing().is_none());
        let mut canvas = Canvas::new(128, 64);
        mode.draw(&mut canvas, "MUSIC");
        assert!(canvas.lit_pixels() > 0);
    }

    #[test]
    fn play_pause_skip_and_stop() {
        let dir = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut mode = MusicMode::new(dir.path(), media("sleep 5"), Duration::from_millis(100));
        mode.activate();
        mode.handle_input(Some(Key::Down));
        mode.handle_input(Some(Key::Primary));
        assert_eq!(mode.now_playing(), Some("b.mp3"));

        mode.handle_input(Some(Key::Up));
        assert!(mode.is_paused());
        mode.handle_input(Some(Key::Up));
        assert!(!mode.is_paused());

        mode.handle_input(Some(Key::Right));
        assert_eq!(mode.now_playing(), Some("c.mp3"));
        mode.handle_input(Some(Key::Right));
        assert_eq!(mode.now_playing(), Some("a.mp3"));
        mode.handle_input(Some(Key::Left));
        assert_eq!(mode.now_playing(), Some("c.mp3"));

        mode.handle_input(Some(Key::Down));
        assert!(mode.now_playing().is_none());
        mode.deactivate();
    }

    #[test]
    fn advances_when_track_ends() {
        let dir = library(&["a.mp3", "b.mp3"]);
        let mut mode = MusicMode::new(dir.path(), media("exit 0"), Duration::from_millis(100));
        mode.activate();
        mode.handle_input(Some(Key::Primary));
        assert_eq!(mode.now_playing(), Some("a.mp3"));

        for _ in 0..200 {
            mode.tick();
            if mode.now_playing() == Some("b.mp3") {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_ne!(mode.now_playing(), Some("a.mp3"));
        mode.deactivate();
        assert!(mode.now_playing().is_none());
    }

    #[test]
    fn missing_player_reports_status() {
        let dir = library(&["a.mp3"]);
        let config = MediaConfig {
            player: "/nonexistent/player".to_string(),
            player_args: Vec::new(),
            extensions: vec!["mp3".to_string()],
        };
        let mut mode = MusicMode::new(dir.path(), config, Duration::from_millis(100));
        mode.activate();
        mode.handle_input(Some(Key::Start));
        assert!(mode.now_playing().is_none());
        assert_eq!(mode.status.as_deref(), Some("Player failed"));
    }
}
