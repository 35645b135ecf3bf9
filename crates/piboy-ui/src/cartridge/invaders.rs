use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Cartridge, DeviceInfo};
use crate::display::Canvas;
use crate::input::Key;

const PLAYER_SPEED: i32 = 4;
const PLAYER_WIDTH: i32 = 8;
const BULLET_SPEED: i32 = 5;
const MAX_BULLETS: usize = 3;
const ALIEN_ROWS: i32 = 3;
const ALIEN_COLS: i32 = 8;
const ALIEN_WIDTH: i32 = 6;
const ALIEN_MOVE_TICKS: u32 = 15;
const ALIEN_DROP: i32 = 4;
const ALIEN_SHOOT_CHANCE: f64 = 0.01;
const ALIEN_POINTS: u32 = 10;
const HIT_RADIUS: i32 = 5;
const LIVES: u32 = 3;

pub struct Invaders {
    rng: StdRng,
    width: i32,
    height: i32,
    player_x: i32,
    aliens: Vec<(i32, i32)>,
    shots: Vec<(i32, i32)>,
    bombs: Vec<(i32, i32)>,
    march: i32,
    move_timer: u32,
    lives: u32,
    score: u32,
    game_over: bool,
}

impl Invaders {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            width: 128,
            height: 64,
            player_x: 64,
            aliens: Vec::new(),
            shots: Vec::new(),
            bombs: Vec::new(),
            march: 1,
            move_timer: 0,
            lives: LIVES,
            score: 0,
            game_over: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    fn restart(&mut self) {
        self.player_x = self.width / 2;
        self.shots.clear();
        self.bombs.clear();
        self.march = 1;
        self.move_timer = 0;
        self.lives = LIVES;
        self.score = 0;
        self.game_over = false;
        self.fill_wave();
    }

    fn fill_wave(&mut self) {
        self.aliens = (0..ALIEN_ROWS)
            .flat_map(|row| (0..ALIEN_COLS).map(move |col| (col * 12 + 10, row * 10 + 5)))
            .collect();
    }

    fn fire(&mut self) {
        if self.shots.len() < MAX_BULLETS {
            self.shots.push((self.player_x, self.height - 10));
        }
    }

    fn march_aliens(&mut self) {
        self.move_timer += 1;
        if self.move_timer <= ALIEN_MOVE_TICKS {
            return;
        }
        self.move_timer = 0;

        let mut edge = false;
        for alien in &mut self.aliens {
            alien.0 += self.march;
            edge |= alien.0 < 0 || alien.0 > self.width - PLAYER_WIDTH;
        }
        if edge {
            self.march = -self.march;
            for alien in &mut self.aliens {
                alien.1 += ALIEN_DROP;
            }
        }
    }

    fn update(&mut self) {
        let height = self.height;
        self.shots.iter_mut().for_each(|s| s.1 -= BULLET_SPEED);
        self.shots.retain(|s| s.1 >= 0);
        self.bombs.iter_mut().for_each(|b| b.1 += BULLET_SPEED);
        self.bombs.retain(|b| b.1 <= height);

        self.march_aliens();

        if self.rng.gen_bool(ALIEN_SHOOT_CHANCE) {
            if let Some(&(x, y)) = self.aliens.choose(&mut self.rng) {
                self.bombs.push((x + 3, y + 5));
            }
        }

        let mut i = 0;
        while i < self.shots.len() {
            let (sx, sy) = self.shots[i];
            let hit = self
                .aliens
                .iter()
                .position(|&(ax, ay)| (sx - ax).abs() < HIT_RADIUS && (sy - ay).abs() < HIT_RADIUS);
            match hit {
                Some(alien) => {
                    self.aliens.swap_remove(alien);
                    self.shots.swap_remove(i);
                    self.score += ALIEN_POINTS;
                }
                None => i += 1,
            }
        }

        let player_x = self.player_x;
        if let Some(bomb) = self
            .bombs
            .iter()
            .position(|&(bx, by)| (bx - player_x).abs() < HIT_RADIUS && by > height - 10)
        {
            self.bombs.swap_remove(bomb);
            self.lives = self.lives.saturating_sub(1);
        }

        let landed = self.aliens.iter().any(|&(_, y)| y >= height - 12);
        if self.lives == 0 || landed {
            self.game_over = true;
        }

        if self.aliens.is_empty() {
            self.fill_wave();
        }
    }
}

impl Default for Invaders {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge for Invaders {
    fn init(&mut self, device: &DeviceInfo) {
        self.width = device.width as i32;
        self.height = device.height as i32;
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
            Some(Key::Left) => self.player_x -= PLAYER_SPEED,
            Some(Key::Right) => self.player_x += PLAYER_SPEED,
            Some(Key::Primary | Key::Start) => self.fire(),
            Some(Key::ModeSwitch) => return false,
            _ => {}
        }
        self.player_x = self.player_x.clamp(0, self.width - PLAYER_WIDTH);
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

        canvas.fill_rect(
            self.player_x,
            self.height - 8,
            self.player_x + PLAYER_WIDTH,
            self.height - 1,
        );
        for &(x, y) in &self.aliens {
            canvas.fill_rect(x, y, x + ALIEN_WIDTH, y + 4);
        }
        for &(x, y) in self.shots.iter().chain(self.bombs.iter()) {
            canvas.fill_rect(x, y, x + 1, y + 3);
        }

        canvas.text(&format!("Score: {}", self.score), 2, 0);
        canvas.text(&format!("L: {}", self.lives), self.width - 24, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Invaders {
        let mut game = Invaders::with_rng(StdRng::seed_from_u64(5));
        game.init(&DeviceInfo::default());
        game
    }

    #[test]
    fn at_most_three_shots_in_flight() {
        let mut game = started();
        for _ in 0..5 {
            game.handle_input(Some(Key::Primary));
        }
        assert_eq!(game.shots.len(), MAX_BULLETS);
    }

    #[test]
    fn shot_kills_alien() {
        let mut game = started();
        let (ax, ay) = game.aliens[0];
        game.shots.push((ax, ay + BULLET_SPEED));
        game.update();
        assert_eq!(game.aliens.len(), (ALIEN_ROWS * ALIEN_COLS - 1) as usize);
        assert_eq!(game.score(), ALIEN_POINTS);
    }

    #[test]
    fn wave_marches_and_drops_at_the_edge() {
        let mut game = started();
        game.aliens = vec![(game.width - PLAYER_WIDTH, 5)];
        for _ in 0..=ALIEN_MOVE_TICKS {
            game.march_aliens();
        }
        assert_eq!(game.aliens[0].1, 5 + ALIEN_DROP);
        assert_eq!(game.march, -1);
    }

    #[test]
    fn bombs_cost_lives_until_game_over() {
        let mut game = started();
        for _ in 0..LIVES {
            let x = game.player_x;
            game.bombs.push((x, game.height - 12));
            game.update();
        }
        assert!(game.game_over);
        assert!(!game.handle_input(Some(Key::ModeSwitch)));
    }
}
