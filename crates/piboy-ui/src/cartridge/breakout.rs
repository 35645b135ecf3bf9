use super::{Cartridge, DeviceInfo};
use crate::display::Canvas;
use crate::input::Key;

const PADDLE_WIDTH: i32 = 24;
const PADDLE_HEIGHT: i32 = 4;
const PADDLE_STEP: i32 = 5;
const BALL_SIZE: i32 = 3;
const BRICK_WIDTH: i32 = 16;
const BRICK_HEIGHT: i32 = 6;
const BRICK_ROWS: i32 = 4;
const BRICK_COLS: i32 = 8;
const BRICK_TOP: i32 = 10;
const BRICK_POINTS: u32 = 10;
const LIVES: u32 = 3;

pub struct Breakout {
    width: i32,
    height: i32,
    paddle_x: i32,
    ball: (f32, f32),
    velocity: (f32, f32),
    bricks: Vec<(i32, i32)>,
    lives: u32,
    score: u32,
    launched: bool,
    game_over: bool,
}

impl Breakout {
    pub fn new() -> Self {
        Self {
            width: 128,
            height: 64,
            paddle_x: 0,
            ball: (0.0, 0.0),
            velocity: (2.0, -2.0),
            bricks: Vec::new(),
            lives: LIVES,
            score: 0,
            launched: false,
            game_over: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    fn restart(&mut self) {
        self.lives = LIVES;
        self.score = 0;
        self.game_over = false;
        self.fill_bricks();
        self.serve();
    }

    fn fill_bricks(&mut self) {
        self.bricks = (0..BRICK_ROWS)
            .flat_map(|row| {
                (0..BRICK_COLS).map(move |col| (col * BRICK_WIDTH, row * BRICK_HEIGHT + BRICK_TOP))
            })
            .collect();
    }

    fn serve(&mut self) {
        self.paddle_x = (self.width - PADDLE_WIDTH) / 2;
        self.ball = (
            (self.paddle_x + PADDLE_WIDTH / 2) as f32,
            (self.height - PADDLE_HEIGHT - BALL_SIZE - 1) as f32,
        );
        self.velocity = (2.0, -2.0);
        self.launched = false;
    }

    fn update(&mut self) {
        if !self.launched {
            self.ball.0 = (self.paddle_x + PADDLE_WIDTH / 2) as f32;
            return;
        }

        self.ball.0 += self.velocity.0;
        self.ball.1 += self.velocity.1;
        let (bx, by) = self.ball;

        if bx < 0.0 || bx > (self.width - BALL_SIZE) as f32 {
            self.velocity.0 = -self.velocity.0;
        }
        if by < 0.0 {
            self.velocity.1 = -self.velocity.1;
        }

        if by > (self.height - BALL_SIZE) as f32 {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.game_over = true;
            } else {
                self.serve();
            }
            return;
        }

        let paddle_left = self.paddle_x as f32;
        if paddle_left < bx
            && bx < paddle_left + PADDLE_WIDTH as f32
            && by > (self.height - PADDLE_HEIGHT - BALL_SIZE) as f32
            && self.velocity.1 > 0.0
        {
            self.velocity.1 = -self.velocity.1;
            let center = paddle_left + PADDLE_WIDTH as f32 / 2.0;
            self.velocity.0 += (bx - center) * 0.1;
        }

        let hit = self.bricks.iter().position(|&(x, y)| {
            (x as f32) < bx
                && bx < (x + BRICK_WIDTH) as f32
                && (y as f32) < by
                && by < (y + BRICK_HEIGHT) as f32
        });
        if let Some(index) = hit {
            self.bricks.swap_remove(index);
            self.score += BRICK_POINTS;
            self.velocity.1 = -self.velocity.1;
        }

        if self.bricks.is_empty() {
            self.fill_bricks();
            self.serve();
        }
    }
}

impl Default for Breakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge for Breakout {
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
            Some(Key::Left) => self.paddle_x -= PADDLE_STEP,
            Some(Key::Right) => self.paddle_x += PADDLE_STEP,
            Some(Key::Start | Key::Primary) => self.launched = true,
            Some(Key::ModeSwitch) => return false,
            _ => {}
        }
        self.paddle_x = self.paddle_x.clamp(0, self.width - PADDLE_WIDTH);
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
            self.paddle_x,
            self.height - PADDLE_HEIGHT,
            self.paddle_x + PADDLE_WIDTH,
            self.height - 1,
        );
        let (bx, by) = (self.ball.0 as i32, self.ball.1 as i32);
        canvas.fill_rect(bx, by, bx + BALL_SIZE, by + BALL_SIZE);
        for &(x, y) in &self.bricks {
            canvas.fill_rect(x + 1, y + 1, x + BRICK_WIDTH - 2, y + BRICK_HEIGHT - 2);
        }

        canvas.text(&format!("Score: {}", self.score), 2, 0);
        canvas.text(&format!("L: {}", self.lives), self.width - 24, 0);
        if !self.launched {
            canvas.text("Press START", 20, 40);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Breakout {
        let mut game = Breakout::new();
        game.init(&DeviceInfo::default());
        game
    }

    #[test]
    fn starts_with_full_wall() {
        let game = started();
        assert_eq!(game.bricks.len(), (BRICK_ROWS * BRICK_COLS) as usize);
        assert_eq!(game.lives(), 3);
        assert!(!game.launched);
    }

    #[test]
    fn ball_rides_the_paddle_until_launch() {
        let mut game = started();
        game.handle_input(Some(Key::Left));
        game.update();
        assert_eq!(game.ball.0, (game.paddle_x + PADDLE_WIDTH / 2) as f32);
        game.handle_input(Some(Key::Start));
        assert!(game.launched);
    }

    #[test]
    fn brick_hit_scores() {
        let mut game = started();
        game.launched = true;
        game.ball = (20.0, 20.0);
        game.velocity = (0.0, -1.0);
        game.update();
        assert_eq!(game.score(), BRICK_POINTS);
        assert!(game.velocity.1 > 0.0);
    }

    #[test]
    fn losing_every_ball_ends_the_game() {
        let mut game = started();
        for _ in 0..LIVES {
            game.launched = true;
            game.ball = (2.0, 62.0);
            game.velocity = (0.0, 2.0);
            game.update();
        }
        assert!(game.game_over);
        assert!(game.handle_input(Some(Key::Start)));
        assert_eq!(game.lives(), 3);
        assert!(!game.handle_input(Some(Key::ModeSwitch)));
    }
}
