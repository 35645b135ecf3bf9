use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Cartridge, DeviceInfo};
use crate::display::Canvas;
use crate::input::Key;

const GRID: i32 = 4;
/// Ticks between moves; at 50ms per tick the snake steps five times a second.
const STEP_TICKS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    Up,
    Down,
    Left,
    Right,
}

impl Heading {
    fn opposite(self) -> Heading {
        match self {
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
        }
    }

    fn delta(self) -> (i32, i32) {
        match self {
            Heading::Up => (0, -GRID),
            Heading::Down => (0, GRID),
            Heading::Left => (-GRID, 0),
            Heading::Right => (GRID, 0),
        }
    }
}

pub struct Snake {
    rng: StdRng,
    width: i32,
    height: i32,
    body: VecDeque<(i32, i32)>,
    heading: Heading,
    food: (i32, i32),
    score: u32,
    ticks: u32,
    game_over: bool,
}

impl Snake {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            width: 128,
            height: 64,
            body: VecDeque::new(),
            heading: Heading::Right,
            food: (0, 0),
            score: 0,
            ticks: 0,
            game_over: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    fn reset(&mut self) {
        let x = (self.width / (2 * GRID)) * GRID;
        let y = (self.height / (2 * GRID)) * GRID;
        self.body = VecDeque::from([(x, y), (x - GRID, y), (x - 2 * GRID, y)]);
        self.heading = Heading::Right;
        self.score = 0;
        self.ticks = 0;
        self.game_over = false;
        self.food = self.place_food();
    }

    fn place_food(&mut self) -> (i32, i32) {
        let cols = (self.width / GRID).max(1);
        let rows = (self.height / GRID).max(1);
        if self.body.len() as i32 >= cols * rows {
            return (-GRID, -GRID);
        }
        loop {
            let cell = (
                self.rng.gen_range(0..cols) * GRID,
                self.rng.gen_range(0..rows) * GRID,
            );
            if !self.body.contains(&cell) {
                return cell;
            }
        }
    }

    fn turn(&mut self, heading: Heading) {
        if heading != self.heading.opposite() {
            self.heading = heading;
        }
    }

    fn step(&mut self) {
        let Some(&(hx, hy)) = self.body.front() else {
            return;
        };
        let (dx, dy) = self.heading.delta();
        let head = (hx + dx, hy + dy);

        let outside = head.0 < 0 || head.0 >= self.width || head.1 < 0 || head.1 >= self.height;
        if outside || self.body.contains(&head) {
            self.game_over = true;
            return;
        }

        self.body.push_front(head);
        if head == self.food {
            self.score += 1;
            self.food = self.place_food();
        } else {
            self.body.pop_back();
        }
    }
}

impl Default for Snake {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge for Snake {
    fn init(&mut self, device: &DeviceInfo) {
        self.width = device.width as i32;
        self.height = device.height as i32;
        self.reset();
    }

    fn handle_input(&mut self, key: Option<Key>) -> bool {
        if self.game_over {
            match key {
                Some(Key::Start | Key::Primary) => self.reset(),
                Some(Key::ModeSwitch) => return false,
                _ => {}
            }
            return true;
        }

        match key {
            Some(Key::Up) => self.turn(Heading::Up),
            Some(Key::Down) => self.turn(Heading::Down),
            Some(Key::Left) => self.turn(Heading::Left),
            Some(Key::Right) => self.turn(Heading::Right),
            Some(Key::ModeSwitch) => return false,
            _ => {}
        }
        true
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if !self.game_over {
            self.ticks += 1;
            if self.ticks >= STEP_TICKS {
                self.ticks = 0;
                self.step();
            }
        }

        if self.game_over {
            canvas.text("Game Over", 10, 10);
            canvas.text(&format!("Score: {}", self.score), 10, 25);
            canvas.text("START=retry", 10, 40);
            canvas.text("SELECT=exit", 10, 50);
            return;
        }

        let (fx, fy) = self.food;
        canvas.fill_rect(fx, fy, fx + GRID - 1, fy + GRID - 1);
        for &(x, y) in &self.body {
            canvas.fill_rect(x, y, x + GRID - 1, y + GRID - 1);
        }
        canvas.text(&format!("Score: {}", self.score), 2, 2);
    }
}
