mod common;

use std::fs;
use std::path::Path;
use std::rc::Rc;

use common::{CartProbe, CrashOnDrawCart, PanickingCart, RecordingMode, ScoreCart};
use piboy_ui::cartridge::{CartridgeRegistry, DeviceInfo};
use piboy_ui::display::Canvas;
use piboy_ui::input::Key;
use piboy_ui::modes::GameMode;
use piboy_ui::{Mode, Shell};

fn roms(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

fn registry(probe: &Rc<CartProbe>) -> CartridgeRegistry {
    let mut registry = CartridgeRegistry::new();
    let probe = Rc::clone(probe);
    registry.register("score", move || Box::new(ScoreCart::new(Rc::clone(&probe))));
    registry.register("boom", || Box::new(PanickingCart));
    registry.register("crash", || Box::new(CrashOnDrawCart));
    registry
}

fn game_mode(dir: &Path, probe: &Rc<CartProbe>) -> GameMode {
    GameMode::new(dir, "cart", registry(probe), DeviceInfo::default())
}

fn frame(mode: &mut GameMode) -> Canvas {
    let mut canvas = Canvas::new(128, 64);
    mode.draw(&mut canvas, "GAME");
    canvas
}

#[test]
fn only_matching_visible_files_are_listed() {
    let dir = roms(&[("score.cart", ""), (".hidden.cart", ""), ("notes.txt", ""), ("boom.cart", "")]);
    let probe = Rc::new(CartProbe::default());
    let mut mode = game_mode(dir.path(), &probe);
    mode.activate();
    assert_eq!(mode.files(), ["boom.cart", "score.cart"]);
    assert_eq!(mode.labels(), ["boom", "score"]);
}

#[test]
fn mixed_case_file_still_launches() {
    let dir = roms(&[("Score.cart", "")]);
    let probe = Rc::new(CartProbe::default());
    let mut mode = game_mode(dir.path(), &probe);
    mode.activate();
    assert_eq!(mode.labels(), ["Score"]);

    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), Some("score"));
    assert_eq!(mode.faults(), 0);
}

#[test]
fn each_load_is_a_fresh_instance() {
    let dir = roms(&[("score.cart", "")]);
    let probe = Rc::new(CartProbe::default());
    let mut mode = game_mode(dir.path(), &probe);
    mode.activate();

    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), Some("score"));
    assert!(mode.is_busy());
    assert_eq!(probe.inits.get(), 1);

    for _ in 0..3 {
        mode.handle_input(Some(Key::Primary));
        frame(&mut mode);
    }
    assert_eq!(probe.last_score.get(), 3);

    mode.handle_input(Some(Key::ModeSwitch));
    assert_eq!(mode.running(), None);
    assert_eq!(probe.drops.get(), 1);

    mode.handle_input(Some(Key::Start));
    assert_eq!(probe.inits.get(), 2);
    mode.handle_input(Some(Key::Primary));
    assert_eq!(probe.last_score.get(), 1);
    mode.deactivate();
    assert_eq!(probe.drops.get(), 2);
}

#[test]
fn missing_entry_point_leaves_the_list_unchanged() {
    let dir = roms(&[
        ("alpha.cart", r#"{"game":"score","exports":["init","handle_input"]}"#),
        ("score.cart", ""),
    ]);
    let probe = Rc::new(CartProbe::default());
    let mut mode = game_mode(dir.path(), &probe);
    mode.activate();

    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), None);
    assert!(!mode.is_busy());
    assert_eq!(mode.selection(), 0);
    assert_eq!(mode.faults(), 1);
    assert!(mode.last_error().unwrap().contains("draw"));
    assert_eq!(probe.inits.get(), 0);
    assert!(frame(&mut mode).lit_pixels() > 0);

    mode.handle_input(Some(Key::Down));
    assert_eq!(mode.last_error(), None);
    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), Some("score"));
}

#[test]
fn panics_become_faults() {
    let dir = roms(&[("boom.cart", ""), ("crash.cart", ""), ("ghost.cart", "")]);
    let probe = Rc::new(CartProbe::default());
    let mut mode = game_mode(dir.path(), &probe);
    mode.activate();

    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), None);
    assert_eq!(mode.faults(), 1);

    mode.handle_input(Some(Key::Down));
    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), Some("crash"));
    frame(&mut mode);
    assert_eq!(mode.running(), None);
    assert_eq!(mode.faults(), 2);

    mode.handle_input(Some(Key::Down));
    mode.handle_input(Some(Key::Primary));
    assert_eq!(mode.running(), None);
    assert_eq!(mode.faults(), 3);
}

#[test]
fn running_cartridge_holds_the_shell() {
    let dir = roms(&[("score.cart", "")]);
    let probe = Rc::new(CartProbe::default());
    let (other, other_log) = RecordingMode::new("OTHER");
    let modes: Vec<Box<dyn Mode>> = vec![Box::new(game_mode(dir.path(), &probe)), Box::new(other)];
    let mut shell = Shell::new(modes).unwrap();

    shell.dispatch(Some(Key::Primary));
    assert!(!shell.dispatch(Some(Key::ModeSwitch)));
    assert_eq!(shell.active_name(), "GAME");
    assert_eq!(probe.drops.get(), 1);

    assert!(shell.dispatch(Some(Key::ModeSwitch)));
    assert_eq!(shell.active_name(), "OTHER");
    assert_eq!(other_log.activations.get(), 1);
}
