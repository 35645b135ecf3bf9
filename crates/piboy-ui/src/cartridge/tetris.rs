use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Cartridge, DeviceInfo};
use crate::display::Canvas;
use crate::input::Key;

const FIELD_WIDTH: usize = 10;
const FIELD_HEIGHT: usize = 16;
const BLOCK: i32 = 4;

const SHAPES: [&[&[u8]]; 7] = [
    &[&[1, 1, 1, 1]],
    &[&[1, 1], &[1, 1]],
    &[&[0, 1, 0], &[1, 1, 1]],
    &[&[0, 0, 1], &[1, 1, 1]],
    &[&[1, 0, 0], &[1, 1, 1]],
    &[&[0, 1, 1], &[1, 1, 0]],
    &[&[1, 1, 0], &[0, 1, 1]],
];

type Shape = Vec<Vec<bool>>;
type Field = [[bool; FIELD_WIDTH]; FIELD_HEIGHT];

fn shape(index: usize) -> Shape {
    SHAPES[index]
        .iter()
        .map(|row| row.iter().map(|&cell| cell == 1).collect())
        .collect()
}

/// Clockwise quarter turn.
fn rotate(piece: &Shape) -> Shape {
    let rows = piece.len();
    let cols = piece.first().map_or(0, Vec::len);
    (0..cols)
        .map(|c| (0..rows).rev().map(|r| piece[r][c]).collect())
        .collect()
}

pub struct Tetris {
    rng: StdRng,
    width: i32,
    field: Field,
    piece: Shape,
    pos: (i32, i32),
    fall_timer: u32,
    score: u32,
    lines: u32,
    level: u32,
    game_over: bool,
}

impl Tetris {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            width: 128,
            field: [[false; FIELD_WIDTH]; FIELD_HEIGHT],
            piece: shape(0),
            pos: (0, 0),
            fall_timer: 0,
            score: 0,
            lines: 0,
            level: 1,
            game_over: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    fn restart(&mut self) {
        self.field = [[false; FIELD_WIDTH]; FIELD_HEIGHT];
        self.score = 0;
        self.lines = 0;
        self.level = 1;
        self.fall_timer = 0;
        self.game_over = false;
        self.spawn();
    }

    fn spawn(&mut self) {
        self.piece = shape(self.rng.gen_range(0..SHAPES.len()));
        let piece_width = self.piece[0].len() as i32;
        self.pos = (FIELD_WIDTH as i32 / 2 - piece_width / 2, 0);
        if self.collides(&self.piece, self.pos) {
            self.game_over = true;
        }
    }

    fn cells(piece: &Shape, pos: (i32, i32)) -> impl Iterator<Item = (i32, i32)> + '_ {
        piece.iter().enumerate().flat_map(move |(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &cell)| cell)
                .map(move |(c, _)| (pos.0 + c as i32, pos.1 + r as i32))
        })
    }

    fn collides(&self, piece: &Shape, pos: (i32, i32)) -> bool {
        Self::cells(piece, pos).any(|(x, y)| {
            x < 0
                || y < 0
                || x >= FIELD_WIDTH as i32
                || y >= FIELD_HEIGHT as i32
                || self.field[y as usize][x as usize]
        })
    }

    fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let next = (self.pos.0 + dx, self.pos.1 + dy);
        if self.collides(&self.piece, next) {
            return false;
        }
        self.pos = next;
        true
    }

    fn lock(&mut self) {
        for (x, y) in Self::cells(&self.piece, self.pos) {
            self.field[y as usize][x as usize] = true;
        }
        self.clear_lines();
        self.spawn();
    }

    fn clear_lines(&mut self) {
        let kept: Vec<[bool; FIELD_WIDTH]> = self
            .field
            .iter()
            .filter(|row| !row.iter().all(|&cell| cell))
            .copied()
            .collect();
        let cleared = FIELD_HEIGHT - kept.len();
        if cleared == 0 {
            return;
        }

        let mut field = [[false; FIELD_WIDTH]; FIELD_HEIGHT];
        field[cleared..].copy_from_slice(&kept);
        self.field = field;
        self.lines += cleared as u32;
        self.score += (cleared * cleared) as u32 * 100;
        self.level = 1 + self.lines / 10;
    }

    fn fall_ticks(&self) -> u32 {
        20u32.saturating_sub(self.level).max(1)
    }

    fn update(&mut self) {
        self.fall_timer += 1;
        if self.fall_timer > self.fall_ticks() {
            self.fall_timer = 0;
            if !self.try_move(0, 1) {
                self.lock();
            }
        }
    }
}

impl Default for Tetris {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge for Tetris {
    fn init(&mut self, device: &DeviceInfo) {
        self.width = device.width as i32;
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
            Some(Key::Left) => {
                self.try_move(-1, 0);
            }
            Some(Key::Right) => {
                self.try_move(1, 0);
            }
            Some(Key::Down) => {
                self.try_move(0, 1);
            }
            Some(Key::Primary | Key::Start) => {
                let rotated = rotate(&self.piece);
                if !self.collides(&rotated, self.pos) {
                    self.piece = rotated;
                }
            }
            Some(Key::ModeSwitch) => return false,
            _ => {}
        }
        true
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if !self.game_over {
            self.update();
        }

        if self.game_over {
            canvas.text("GAME OVER", 30, 20);
            canvas.text(&format!("Score: {}", self.score), 30, 35);
            return;
        }

        let left = (self.width - FIELD_WIDTH as i32 * BLOCK) / 2;
        let block = |canvas: &mut Canvas, x: i32, y: i32| {
            let px = left + x * BLOCK;
            let py = y * BLOCK;
            canvas.fill_rect(px, py, px + BLOCK - 1, py + BLOCK - 1);
        };

        canvas.line(left - 1, 0, left - 1, FIELD_HEIGHT as i32 * BLOCK);
        canvas.line(
            left + FIELD_WIDTH as i32 * BLOCK,
            0,
            left + FIELD_WIDTH as i32 * BLOCK,
            FIELD_HEIGHT as i32 * BLOCK,
        );
        for (y, row) in self.field.iter().enumerate() {
            for (x, _) in row.iter().enumerate().filter(|&(_, &cell)| cell) {
                block(canvas, x as i32, y as i32);
            }
        }
        for (x, y) in Self::cells(&self.piece, self.pos) {
            block(canvas, x, y);
        }

        canvas.text(&format!("S:{}", self.score), 2, 0);
        canvas.text(&format!("L:{}", self.lines), 2, 10);
        canvas.text(&format!("LVL:{}", self.level), 2, 20);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Tetris {
        let mut game = Tetris::with_rng(StdRng::seed_from_u64(3));
        game.init(&DeviceInfo::default());
        game
    }

    #[test]
    fn rotation_turns_clockwise() {
        let t = shape(2);
        let turned = rotate(&t);
        assert_eq!(turned, vec![vec![true, false], vec![true, true], vec![true, false]]);
        assert_eq!(rotate(&rotate(&rotate(&rotate(&t)))), t);
    }

    #[test]
    fn walls_stop_sideways_moves() {
        let mut game = started();
        for _ in 0..20 {
            game.handle_input(Some(Key::Left));
        }
        assert_eq!(game.pos.0, 0);
    }

    #[test]
    fn clearing_two_lines_scores_four_hundred() {
        let mut game = started();
        for y in [FIELD_HEIGHT - 1, FIELD_HEIGHT - 2] {
            game.field[y] = [true; FIELD_WIDTH];
        }
        game.field[FIELD_HEIGHT - 3][0] = true;
        game.clear_lines();

        assert_eq!(game.score(), 400);
        assert_eq!(game.lines, 2);
        assert!(game.field[FIELD_HEIGHT - 1][0]);
        assert!(!game.field[FIELD_HEIGHT - 1][1]);
    }

    #[test]
    fn pieces_fall_and_lock() {
        let mut game = started();
        let mut canvas = Canvas::new(128, 64);
        for _ in 0..(FIELD_HEIGHT as u32 + 2) * 21 {
            game.draw(&mut canvas);
        }
        assert!(game.field.iter().flatten().any(|&cell| cell));
    }

    #[test]
    fn blocked_spawn_is_game_over() {
        let mut game = started();
        game.field[0] = [true; FIELD_WIDTH];
        game.field[0][9] = false;
        game.spawn();
        assert!(game.game_over);
        assert!(!game.handle_input(Some(Key::ModeSwitch)));
    }
}
