use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Cartridge, DeviceInfo};
use crate::display::Canvas;
use crate::input::Key;

const STEP_Y: i32 = 8;
const STEP_X: f32 = 8.0;
const PLAYER_SIZE: i32 = 6;
const HOME_POINTS: u32 = 100;
const WIN_BONUS: u32 = 1000;
const HOMES_TO_WIN: usize = 5;
const LIVES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum LaneKind {
    Road,
    Safe,
    River,
}

/// Lanes from the start row upwards. The row above the last lane is home.
const LANES: [(LaneKind, f32); 7] = [
    (LaneKind::Road, 1.0),
    (LaneKind::Road, -1.5),
    (LaneKind::Road, 2.0),
    (LaneKind::Safe, 0.0),
    (LaneKind::River, -1.0),
    (LaneKind::River, 1.5),
    (LaneKind::River, -2.0),
];
const HOME_ROW: usize = LANES.len();

#[derive(Debug, Clone, Copy)]
struct Mover {
    x: f32,
    width: f32,
}

pub struct Frogger {
    rng: StdRng,
    width: i32,
    bottom: i32,
    lanes: Vec<Vec<Mover>>,
    player_x: f32,
    row: usize,
    homes: Vec<i32>,
    lives: u32,
    score: u32,
    game_over: bool,
}

impl Frogger {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            width: 128,
            bottom: 56,
            lanes: Vec::new(),
            player_x: 64.0,
            row: 0,
            homes: Vec::new(),
            lives: LIVES,
            score: 0,
            game_over: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    fn restart(&mut self) {
        self.lives = LIVES;
        self.score = 0;
        self.game_over = false;
        self.homes.clear();
        self.fill_lanes();
        self.reset_player();
    }

    fn fill_lanes(&mut self) {
        let width = self.width;
        let rng = &mut self.rng;
        self.lanes = LANES
            .iter()
            .map(|&(kind, _)| {
                if kind == LaneKind::Safe {
                    return Vec::new();
                }
                (0..rng.gen_range(2..=4))
                    .map(|_| Mover {
                        x: rng.gen_range(0..=width) as f32,
                        width: rng.gen_range(20..=40) as f32,
                    })
                    .collect()
            })
            .collect();
    }

    fn reset_player(&mut self) {
        self.player_x = (self.width / 2) as f32;
        self.row = 0;
    }

    fn row_y(&self, row: usize) -> i32 {
        self.bottom - row as i32 * STEP_Y
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.game_over = true;
        } else {
            self.reset_player();
        }
    }

    fn update(&mut self) {
        let width = self.width as f32;
        for (movers, &(_, speed)) in self.lanes.iter_mut().zip(LANES.iter()) {
            for mover in movers {
                mover.x += speed;
                if mover.x > width {
                    mover.x = -mover.width;
                } else if mover.x < -mover.width {
                    mover.x = width;
                }
            }
        }

        if self.row == HOME_ROW {
            self.score += HOME_POINTS;
            self.homes.push(self.player_x as i32);
            self.reset_player();
            if self.homes.len() >= HOMES_TO_WIN {
                self.score += WIN_BONUS;
                self.homes.clear();
                self.fill_lanes();
            }
            return;
        }

        let (kind, speed) = LANES[self.row];
        let px = self.player_x;
        let under = self.lanes[self.row]
            .iter()
            .any(|m| m.x < px && px < m.x + m.width);
        match kind {
            LaneKind::Road if under => self.lose_life(),
            LaneKind::River if !under => self.lose_life(),
            LaneKind::River => {
                self.player_x += speed;
                if self.player_x < 0.0 || self.player_x > width - PLAYER_SIZE as f32 {
                    self.lose_life();
                }
            }
            _ => {}
        }
    }
}

impl Default for Frogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge for Frogger {
    fn init(&mut self, device: &DeviceInfo) {
        self.width = device.width as i32;
        self.bottom = (HOME_ROW as i32 * STEP_Y).min(device.height as i32 - STEP_Y);
        self.restart();
    }

    fn handle_input(&mut self, key: Option<Key>) -> bool {
        if self.game_over {
            match key {
                Some(Key::Start) => self.restart(),
                Some(Key::ModeSwitch) => return false,
                _ => {}
            }
            return true;
        }

        match key {
            Some(Key::Up) => self.row = (self.row + 1).min(HOME_ROW),
            Some(Key::Down) => self.row = self.row.saturating_sub(1),
            Some(Key::Left) => self.player_x -= STEP_X,
            Some(Key::Right) => self.player_x += STEP_X,
            Some(Key::ModeSwitch) => return false,
            _ => {}
        }
        self.player_x = self
            .player_x
            .clamp(0.0, (self.width - PLAYER_SIZE) as f32);
        true
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if !self.game_over {
            self.update();
        }

        if self.game_over {
            canvas.text("GAME OVER", 20, 20);
            canvas.text(&format!("Score: {}", self.score), 20, 35);
            return;
        }

        for (row, movers) in self.lanes.iter().enumerate() {
            let y = self.row_y(row);
            for mover in movers {
                let x = mover.x as i32;
                canvas.outline_rect(x, y, x + mover.width as i32, y + PLAYER_SIZE);
            }
        }

        let px = self.player_x as i32;
        let py = self.row_y(self.row);
        canvas.fill_rect(px, py, px + PLAYER_SIZE, py + PLAYER_SIZE);
        for &home in &self.homes {
            canvas.fill_rect(home, 0, home + PLAYER_SIZE, PLAYER_SIZE);
        }

        canvas.text(&format!("S:{}", self.score), 2, 0);
        canvas.text(&format!("L:{}", self.lives), self.width - 24, 0);
    }
}
