use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::engine::{Game, Outcome};
use crate::geom::{Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(480.0, 640.0);
const PADDLE_WIDTH: f32 = 80.0;
const PADDLE_HEIGHT: f32 = 12.0;
const BALL_RADIUS: f32 = 8.0;
const BALL_SPEED: f32 = 4.0;
const SPEED_UP: f32 = 1.05;
const PLAYER_SPEED: f32 = 5.0;
const AI_SPEED: f32 = 3.2;
const AI_REAIM_CHANCE: f64 = 0.12;
const AI_ACCURACY: f64 = 0.7;
const WIN_SCORE: u32 = 11;
const WIN_BY: u32 = 2;
const RALLY_MESSAGE_TIME: Duration = Duration::from_millis(850);

const RALLY_MESSAGES: [&str; 3] = [
    "Transaction Approved!",
    "Processing...",
    "Payment Declined!",
];

const MERCHANT_GREEN: Rgb = Rgb::new(193, 255, 0);

pub struct Pong
{
    rng: StdRng,
    player: Rect,
    ai: Rect,
    ai_aim: f32,
    ball: Vec2,
    vel: Vec2,
    speed: f32,
    player_points: u32,
    ai_points: u32,
    rally: Option<(&'static str, Duration)>,
    over: bool,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Pong::new(seed))
}

/// True once one side has at least eleven points and a two point lead.
pub fn match_decided(a: u32, b: u32) -> bool
{
    a.max(b) >= WIN_SCORE && a.abs_diff(b) >= WIN_BY
}

impl Pong
{
    fn new(seed: u64) -> Self
    {
        let x = (WORLD.width - PADDLE_WIDTH) / 2.0;
        let mut game = Self {
            rng: StdRng::seed_from_u64(seed),
            player: Rect::new(x, WORLD.height - 24.0, PADDLE_WIDTH, PADDLE_HEIGHT),
            ai: Rect::new(x, 12.0, PADDLE_WIDTH, PADDLE_HEIGHT),
            ai_aim: WORLD.width / 2.0,
            ball: Vec2::default(),
            vel: Vec2::default(),
            speed: BALL_SPEED,
            player_points: 0,
            ai_points: 0,
            rally: None,
            over: false,
        };
        game.launch();
        game
    }

    fn launch(&mut self)
    {
        self.ball = Vec2::new(WORLD.width / 2.0, WORLD.height / 2.0);
        let angle = self.rng.gen_range(-30.0f32..30.0).to_radians();
        let dir = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.speed = BALL_SPEED;
        self.vel = Vec2::new(angle.sin() * self.speed, dir * angle.cos() * self.speed);
    }

    /// Sends the ball back off a paddle, angled by where it struck.
    fn deflect(&mut self, paddle: Rect, upward: bool)
    {
        self.speed *= SPEED_UP;
        let hit = (self.ball.x - paddle.center().x) / (paddle.w / 2.0);
        self.vel.x = hit * self.speed * 0.8;
        let vy = (self.speed * self.speed - self.vel.x * self.vel.x).max(0.0).sqrt();
        if upward {
            self.vel.y = -vy;
            self.ball.y = paddle.y - BALL_RADIUS;
        } else {
            self.vel.y = vy;
            self.ball.y = paddle.bottom() + BALL_RADIUS;
        }
    }

    fn spans(&self, paddle: &Rect) -> bool
    {
        self.ball.y + BALL_RADIUS >= paddle.y
            && self.ball.y - BALL_RADIUS <= paddle.bottom()
            && self.ball.x >= paddle.x
            && self.ball.x <= paddle.right()
    }

    fn step_ball(&mut self)
    {
        self.ball += self.vel;
        if self.ball.x - BALL_RADIUS < 0.0 || self.ball.x + BALL_RADIUS > WORLD.width {
            self.vel.x = -self.vel.x;
            self.ball.x = self.ball.x.clamp(BALL_RADIUS, WORLD.width - BALL_RADIUS);
        }
        if self.vel.y > 0.0 && self.spans(&self.player) {
            self.deflect(self.player, true);
        }
        if self.vel.y < 0.0 && self.spans(&self.ai) {
            self.deflect(self.ai, false);
        }

        if self.ball.y > WORLD.height {
            self.ai_points += 1;
            self.point_scored();
        } else if self.ball.y < 0.0 {
            self.player_points += 1;
            self.point_scored();
        }
    }

    fn point_scored(&mut self)
    {
        let message = RALLY_MESSAGES.choose(&mut self.rng).copied().unwrap_or(RALLY_MESSAGES[1]);
        self.rally = Some((message, RALLY_MESSAGE_TIME));
        if match_decided(self.player_points, self.ai_points) {
            self.over = true;
        } else {
            self.launch();
        }
    }

    fn step_ai(&mut self)
    {
        if self.vel.y < 0.0 && self.rng.gen_bool(AI_REAIM_CHANCE) {
            let accurate = self.rng.gen_bool(AI_ACCURACY);
            let error = self.rng.gen_range(-60.0..60.0);
            self.ai_aim = if accurate { self.ball.x } else { self.ball.x + error };
        }
        let diff = self.ai_aim - self.ai.center().x;
        let step = diff.signum() * diff.abs().min(AI_SPEED);
        self.ai.x = (self.ai.x + step).clamp(0.0, WORLD.width - self.ai.w);
    }
}

impl Game for Pong
{
    fn input(&mut self, _key: Key) {}

    fn update(&mut self, dt: Duration, held: &HeldKeys)
    {
        if self.over {
            return;
        }
        if let Some((_, left)) = &mut self.rally {
            *left = left.saturating_sub(dt);
            if left.is_zero() {
                self.rally = None;
            }
        }
        self.step_ball();
        if self.over {
            return;
        }
        self.step_ai();
        let axis = held.axis(Key::Left, Key::Right) + held.axis(Key::Char('a'), Key::Char('d'));
        self.player.x =
            (self.player.x + axis.clamp(-1.0, 1.0) * PLAYER_SPEED).clamp(0.0, WORLD.width - self.player.w);
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let mid = WORLD.height / 2.0;
        let mut x = 0.0;
        while x < WORLD.width {
            canvas.fill_world(WORLD, Rect::new(x, mid - 1.0, 10.0, 2.0), '-', Some(Rgb::new(60, 60, 60)));
            x += 20.0;
        }
        canvas.text_world(WORLD, Vec2::new(WORLD.width / 2.0, 34.0), "PROCESSOR", Some(Rgb::GREY));
        canvas.text_world(
            WORLD,
            Vec2::new(WORLD.width / 2.0, WORLD.height - 44.0),
            "MERCHANT",
            Some(MERCHANT_GREEN),
        );
        canvas.text_world(
            WORLD,
            Vec2::new(WORLD.width / 2.0, WORLD.height * 0.25),
            &self.ai_points.to_string(),
            Some(Rgb::WHITE),
        );
        canvas.text_world(
            WORLD,
            Vec2::new(WORLD.width / 2.0, WORLD.height * 0.75),
            &self.player_points.to_string(),
            Some(Rgb::WHITE),
        );
        canvas.fill_world(WORLD, self.ai, '=', Some(Rgb::GREY));
        canvas.fill_world(WORLD, self.player, '=', Some(MERCHANT_GREEN));
        let ball = Rect::centered(self.ball, BALL_RADIUS * 2.0, BALL_RADIUS * 2.0);
        canvas.fill_world(WORLD, ball, '$', Some(Rgb::WHITE));
        if let Some((message, _)) = self.rally {
            canvas.text_world(WORLD, Vec2::new(WORLD.width / 2.0, mid - 30.0), message, Some(Rgb::YELLOW));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Merchant: {}", self.player_points),
            format!("Processor: {}", self.ai_points),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "Left/Right or A/D move paddle"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over {
            return None;
        }
        let won = self.player_points > self.ai_points;
        Some(
            Outcome::new(Some(self.player_points as i64), won)
                .line(if won { "Merchant Wins!" } else { "Processor Wins!" })
                .line(format!("{} - {}", self.player_points, self.ai_points))
                .stat("processor", self.ai_points as i64),
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::testing::{hold_for, run_ticks};

    #[test]
    fn win_needs_eleven_and_two_clear()
    {
        assert!(!match_decided(10, 8));
        assert!(!match_decided(11, 10));
        assert!(match_decided(11, 9));
        assert!(match_decided(12, 14));
    }

    #[test]
    fn launch_from_center_within_30_degrees()
    {
        let mut game = Pong::new(7);
        for _ in 0..40 {
            game.launch();
            assert_eq!(game.ball, Vec2::new(240.0, 320.0));
            let limit = game.speed * 30f32.to_radians().sin() + 1e-4;
            assert!(game.vel.x.abs() <= limit);
            assert!((game.vel.length() - BALL_SPEED).abs() < 1e-3);
        }
    }

    #[test]
    fn player_paddle_returns_and_speeds_up()
    {
        let mut game = Pong::new(1);
        let center = game.player.center();
        game.ball = Vec2::new(center.x, game.player.y - 10.0);
        game.vel = Vec2::new(0.0, 4.0);
        game.step_ball();
        assert!(game.vel.y < 0.0);
        assert!((game.speed - 4.2).abs() < 1e-4);
        assert_eq!(game.ball.y, game.player.y - BALL_RADIUS);
    }

    #[test]
    fn missed_ball_scores_for_the_other_side()
    {
        let mut game = Pong::new(2);
        game.ball = Vec2::new(5.0 + BALL_RADIUS, 639.0);
        game.vel = Vec2::new(0.0, 4.0);
        game.step_ball();
        assert_eq!(game.ai_points, 1);
        assert!(game.rally.is_some());
        assert_eq!(game.ball, Vec2::new(240.0, 320.0));

        game.ball = Vec2::new(5.0 + BALL_RADIUS, 2.0);
        game.vel = Vec2::new(0.0, -4.0);
        game.step_ball();
        assert_eq!(game.player_points, 1);
    }

    #[test]
    fn rally_message_clears()
    {
        let mut game = Pong::new(3);
        game.rally = Some(("Processing...", RALLY_MESSAGE_TIME));
        game.ball = Vec2::new(240.0, 320.0);
        game.vel = Vec2::new(0.0, 0.0);
        run_ticks(&mut game, 51);
        assert!(game.rally.is_none());
    }

    #[test]
    fn match_point_ends_with_player_score()
    {
        let mut game = Pong::new(4);
        game.player_points = 10;
        game.ai_points = 3;
        game.ball = Vec2::new(5.0 + BALL_RADIUS, 2.0);
        game.vel = Vec2::new(0.0, -4.0);
        game.step_ball();
        let outcome = game.outcome().unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.score, Some(11));
    }

    #[test]
    fn held_keys_move_the_player()
    {
        let mut game = Pong::new(5);
        let start = game.player.x;
        hold_for(&mut game, Key::Left, 4);
        assert_eq!(game.player.x, start - 20.0);
        hold_for(&mut game, Key::Left, 100);
        assert_eq!(game.player.x, 0.0);
    }
}
