use super::{Cartridge, DeviceInfo};
use crate::display::Canvas;
use crate::input::Key;

const PADDLE_HEIGHT: i32 = 16;
const PADDLE_WIDTH: i32 = 4;
const BALL_SIZE: i32 = 4;
const PLAYER_SPEED: i32 = 4;
const AI_SPEED: i32 = 3;
const AI_DEAD_ZONE: f32 = 5.0;
const MAX_BALL_SPEED: f32 = 5.0;
const SPEEDUP: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Serve {
    TowardsAi,
    TowardsPlayer,
}

pub struct Pong {
    width: i32,
    height: i32,
    ball: (f32, f32),
    velocity: (f32, f32),
    player_y: i32,
    ai_y: i32,
    player_score: u32,
    ai_score: u32,
}

impl Pong {
    pub fn new() -> Self {
        Self {
            width: 128,
            height: 64,
            ball: (64.0, 32.0),
            velocity: (3.0, 1.0),
            player_y: 24,
            ai_y: 24,
            player_score: 0,
            ai_score: 0,
        }
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.player_score, self.ai_score)
    }

    fn serve(&mut self, towards: Serve) {
        self.ball = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        self.velocity = match towards {
            Serve::TowardsAi => (3.0, 1.0),
            Serve::TowardsPlayer => (-3.0, 1.0),
        };
    }

    fn clamp_paddle(&self, y: i32) -> i32 {
        y.clamp(0, (self.height - PADDLE_HEIGHT).max(0))
    }

    fn bounce(&mut self) {
        self.velocity.0 = -self.velocity.0;
        if self.velocity.0.abs() < MAX_BALL_SPEED {
            self.velocity.0 *= SPEEDUP;
        }
    }

    fn update(&mut self) {
        self.ball.0 += self.velocity.0;
        self.ball.1 += self.velocity.1;

        if self.ball.1 < 0.0 || self.ball.1 > (self.height - BALL_SIZE) as f32 {
            self.velocity.1 = -self.velocity.1;
        }

        let (bx, by) = self.ball;
        let within = |paddle_y: i32| (paddle_y as f32) < by && by < (paddle_y + PADDLE_HEIGHT) as f32;
        if self.velocity.0 < 0.0 && bx <= PADDLE_WIDTH as f32 && within(self.player_y) {
            self.bounce();
        }
        if self.velocity.0 > 0.0
            && bx >= (self.width - PADDLE_WIDTH - BALL_SIZE) as f32
            && within(self.ai_y)
        {
            self.bounce();
        }

        if self.ball.0 < 0.0 {
            self.ai_score += 1;
            self.serve(Serve::TowardsPlayer);
        } else if self.ball.0 > self.width as f32 {
            self.player_score += 1;
            self.serve(Serve::TowardsAi);
        }

        let ai_center = (self.ai_y + PADDLE_HEIGHT / 2) as f32;
        if ai_center < self.ball.1 - AI_DEAD_ZONE {
            self.ai_y += AI_SPEED;
        } else if ai_center > self.ball.1 + AI_DEAD_ZONE {
            self.ai_y -= AI_SPEED;
        }
        self.ai_y = self.clamp_paddle(self.ai_y);
    }
}

impl Default for Pong {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge for Pong {
    fn init(&mut self, device: &DeviceInfo) {
        self.width = device.width as i32;
        self.height = device.height as i32;
        self.player_y = (self.height - PADDLE_HEIGHT) / 2;
        self.ai_y = self.player_y;
        self.player_score = 0;
        self.ai_score = 0;
        self.serve(Serve::TowardsAi);
    }

    fn handle_input(&mut self, key: Option<Key>) -> bool {
        match key {
            Some(Key::Up) => self.player_y -= PLAYER_SPEED,
            Some(Key::Down) => self.player_y += PLAYER_SPEED,
            Some(Key::ModeSwitch) => return false,
            _ => {}
        }
        self.player_y = self.clamp_paddle(self.player_y);
        true
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        self.update();

        let mid = self.width / 2;
        for y in (0..self.height).step_by(4) {
            canvas.line(mid, y, mid, y + 2);
        }
        canvas.fill_rect(0, self.player_y, PADDLE_WIDTH - 1, self.player_y + PADDLE_HEIGHT);
        canvas.fill_rect(
            self.width - PADDLE_WIDTH,
            self.ai_y,
            self.width - 1,
            self.ai_y + PADDLE_HEIGHT,
        );

        let (bx, by) = (self.ball.0 as i32, self.ball.1 as i32);
        canvas.fill_rect(bx, by, bx + BALL_SIZE - 1, by + BALL_SIZE - 1);

        canvas.text(&self.player_score.to_string(), mid - 20, 2);
        canvas.text(&self.ai_score.to_string(), mid + 14, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Pong {
        let mut pong = Pong::new();
        pong.init(&DeviceInfo::default());
        pong
    }

    #[test]
    fn paddle_stays_on_screen() {
        let mut pong = started();
        for _ in 0..40 {
            pong.handle_input(Some(Key::Up));
        }
        assert_eq!(pong.player_y, 0);
        for _ in 0..40 {
            pong.handle_input(Some(Key::Down));
        }
        assert_eq!(pong.player_y, 64 - PADDLE_HEIGHT);
    }

    #[test]
    fn missed_ball_scores_for_the_other_side() {
        let mut pong = started();
        pong.ball = (1.0, 2.0);
        pong.velocity = (-3.0, 0.0);
        pong.player_y = 40;
        pong.update();
        assert_eq!(pong.scores(), (0, 1));
        assert!(pong.velocity.0 < 0.0);
    }

    #[test]
    fn ball_level_with_paddle_top_edge_misses() {
        let mut pong = started();
        pong.ball = (5.0, 24.0);
        pong.velocity = (-3.0, 0.0);
        pong.player_y = 24;
        pong.update();
        assert_eq!(pong.velocity.0, -3.0);
    }

    #[test]
    fn paddle_hit_reverses_and_speeds_up() {
        let mut pong = started();
        pong.ball = (5.0, 30.0);
        pong.velocity = (-3.0, 0.0);
        pong.player_y = 24;
        pong.update();
        assert!(pong.velocity.0 > 3.0);
    }

    #[test]
    fn speed_is_capped() {
        let mut pong = started();
        pong.velocity = (-5.5, 0.0);
        pong.bounce();
        assert_eq!(pong.velocity.0, 5.5);
    }
}
