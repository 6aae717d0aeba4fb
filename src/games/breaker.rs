use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::analytics::GameEvent;
use crate::engine::{Game, Outcome};
use crate::geom::{Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(480.0, 640.0);
const PADDLE_WIDTH: f32 = 90.0;
const PADDLE_HEIGHT: f32 = 12.0;
const PADDLE_SPEED: f32 = 6.0;
const BALL_RADIUS: f32 = 7.0;
const BALL_SPEED: f32 = 4.5;
const LIVES: u32 = 3;
const MAX_LEVELS: u32 = 3;
const BLOCK_ROWS: u32 = 4;
const BLOCK_COLS: u32 = 8;
const BLOCK_HEIGHT: f32 = 22.0;
const BLOCK_PADDING: f32 = 4.0;
const BLOCK_TOP: f32 = 60.0;
const POWERUP_CHANCE: f64 = 0.2;
const POWERUP_FALL: f32 = 2.0;
const SHIELD_TIME: Duration = Duration::from_secs(10);
const TWOFA_TIME: Duration = Duration::from_secs(15);
const LIMITER_TIME: Duration = Duration::from_secs(8);
const LIMITER_FACTOR: f32 = 0.6;

struct BlockKind
{
    hp: u32,
    score: i64,
    color: Rgb,
}

const BLOCK_KINDS: [BlockKind; 4] = [
    // critical fraud
    BlockKind { hp: 3, score: 50, color: Rgb::new(255, 68, 68) },
    // suspicious
    BlockKind { hp: 2, score: 30, color: Rgb::new(255, 140, 0) },
    // anomaly
    BlockKind { hp: 1, score: 20, color: Rgb::new(255, 215, 0) },
    // low risk
    BlockKind { hp: 1, score: 10, color: Rgb::new(68, 255, 136) },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PowerKind
{
    Shield,
    TwoFa,
    RateLimiter,
}

impl PowerKind
{
    fn name(self) -> &'static str
    {
        match self {
            PowerKind::Shield => "pci_shield",
            PowerKind::TwoFa => "2fa_ball",
            PowerKind::RateLimiter => "rate_limiter",
        }
    }

    fn glyph(self) -> char
    {
        match self {
            PowerKind::Shield => 'P',
            PowerKind::TwoFa => '2',
            PowerKind::RateLimiter => 'R',
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Ball
{
    pos: Vec2,
    vel: Vec2,
    speed: f32,
}

struct Block
{
    rect: Rect,
    hp: u32,
    max_hp: u32,
    score: i64,
    color: Rgb,
}

struct Falling
{
    pos: Vec2,
    kind: PowerKind,
}

pub struct Breaker
{
    rng: StdRng,
    paddle: Rect,
    balls: Vec<Ball>,
    blocks: Vec<Block>,
    drops: Vec<Falling>,
    shield_left: Option<Duration>,
    twofa_left: Option<Duration>,
    limiter_left: Option<Duration>,
    score: i64,
    lives: u32,
    level: u32,
    result: Option<bool>,
    events: Vec<GameEvent>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Breaker::new(seed))
}

fn level_speed(level: u32) -> f32
{
    BALL_SPEED + (level - 1) as f32 * 0.5
}

/// Rows of blocks for a level. Rows past the four named kinds repeat the
/// critical kind, and every level adds one hit point.
fn layout(level: u32) -> Vec<Block>
{
    let rows = BLOCK_ROWS + (level - 1);
    let width = (WORLD.width - BLOCK_PADDING * (BLOCK_COLS + 1) as f32) / BLOCK_COLS as f32;
    let mut blocks = Vec::new();
    for row in 0..rows {
        let kind = BLOCK_KINDS.get(row as usize).unwrap_or(&BLOCK_KINDS[0]);
        for col in 0..BLOCK_COLS {
            let hp = kind.hp + (level - 1);
            blocks.push(Block {
                rect: Rect::new(
                    BLOCK_PADDING + col as f32 * (width + BLOCK_PADDING),
                    BLOCK_TOP + row as f32 * (BLOCK_HEIGHT + BLOCK_PADDING),
                    width,
                    BLOCK_HEIGHT,
                ),
                hp,
                max_hp: hp,
                score: kind.score,
                color: kind.color,
            });
        }
    }
    blocks
}

impl Breaker
{
    fn new(seed: u64) -> Self
    {
        let mut game = Self {
            rng: StdRng::seed_from_u64(seed),
            paddle: Rect::new(
                (WORLD.width - PADDLE_WIDTH) / 2.0,
                WORLD.height - 24.0,
                PADDLE_WIDTH,
                PADDLE_HEIGHT,
            ),
            balls: Vec::new(),
            blocks: layout(1),
            drops: Vec::new(),
            shield_left: None,
            twofa_left: None,
            limiter_left: None,
            score: 0,
            lives: LIVES,
            level: 1,
            result: None,
            events: Vec::new(),
        };
        let ball = game.launch_ball();
        game.balls.push(ball);
        game
    }

    fn launch_ball(&mut self) -> Ball
    {
        let speed = level_speed(self.level);
        let angle = self.rng.gen_range(-35.0f32..35.0).to_radians();
        let center = self.paddle.center();
        Ball {
            pos: Vec2::new(center.x, self.paddle.y - BALL_RADIUS - 2.0),
            vel: Vec2::new(angle.sin() * speed, -(angle.cos() * speed).abs()),
            speed,
        }
    }

    fn clamp_paddle(&mut self)
    {
        self.paddle.x = self.paddle.x.clamp(0.0, WORLD.width - self.paddle.w);
    }

    fn clear_power_ups(&mut self)
    {
        self.drops.clear();
        self.shield_left = None;
        self.twofa_left = None;
        self.limiter_left = None;
        self.paddle.w = PADDLE_WIDTH;
        self.clamp_paddle();
    }

    fn apply(&mut self, kind: PowerKind)
    {
        match kind {
            PowerKind::Shield => {
                self.paddle.w = PADDLE_WIDTH * 1.6;
                self.clamp_paddle();
                self.shield_left = Some(SHIELD_TIME);
            }
            PowerKind::TwoFa => {
                if let [first] = self.balls[..] {
                    self.balls.push(Ball {
                        vel: Vec2::new(-first.vel.x, first.vel.y),
                        ..first
                    });
                }
                self.twofa_left = Some(TWOFA_TIME);
            }
            PowerKind::RateLimiter => {
                if self.limiter_left.is_none() {
                    for ball in &mut self.balls {
                        ball.speed *= LIMITER_FACTOR;
                        ball.vel = ball.vel * LIMITER_FACTOR;
                    }
                }
                self.limiter_left = Some(LIMITER_TIME);
            }
        }
        self.events.push(GameEvent::PowerUp {
            game: "breaker",
            power_up: kind.name(),
        });
    }

    fn tick_power_ups(&mut self, dt: Duration)
    {
        if expire(&mut self.shield_left, dt) {
            self.paddle.w = PADDLE_WIDTH;
            self.clamp_paddle();
        }
        if expire(&mut self.twofa_left, dt) && self.balls.len() > 1 {
            self.balls.pop();
        }
        if expire(&mut self.limiter_left, dt) {
            for ball in &mut self.balls {
                ball.speed /= LIMITER_FACTOR;
                ball.vel = ball.vel * (1.0 / LIMITER_FACTOR);
            }
        }
    }

    /// Moves one ball a step. Returns false once it has fallen out.
    fn step_ball(&mut self, idx: usize) -> bool
    {
        let paddle = self.paddle;
        let ball = &mut self.balls[idx];
        ball.pos += ball.vel;

        if ball.pos.x - BALL_RADIUS < 0.0 || ball.pos.x + BALL_RADIUS > WORLD.width {
            ball.vel.x = -ball.vel.x;
            ball.pos.x = ball.pos.x.clamp(BALL_RADIUS, WORLD.width - BALL_RADIUS);
        }
        if ball.pos.y - BALL_RADIUS < 0.0 {
            ball.vel.y = -ball.vel.y;
            ball.pos.y = BALL_RADIUS;
        }

        if ball.vel.y > 0.0
            && ball.pos.y + BALL_RADIUS >= paddle.y
            && ball.pos.y - BALL_RADIUS <= paddle.bottom()
            && ball.pos.x >= paddle.x
            && ball.pos.x <= paddle.right()
        {
            let hit = (ball.pos.x - paddle.center().x) / (paddle.w / 2.0);
            ball.vel.x = hit * ball.speed * 0.8;
            ball.vel.y = -(ball.speed * ball.speed - ball.vel.x * ball.vel.x).max(0.1).sqrt();
            ball.pos.y = paddle.y - BALL_RADIUS;
        }

        let reach = Rect::centered(ball.pos, BALL_RADIUS * 2.0, BALL_RADIUS * 2.0);
        let hit = self.blocks.iter().position(|b| b.rect.intersects(&reach));
        let alive = ball.pos.y <= WORLD.height + BALL_RADIUS;
        if let Some(block_idx) = hit {
            ball.vel.y = -ball.vel.y;
            self.damage(block_idx);
        }
        alive
    }

    fn damage(&mut self, idx: usize)
    {
        let block = &mut self.blocks[idx];
        block.hp -= 1;
        if block.hp > 0 {
            return;
        }
        let block = self.blocks.remove(idx);
        self.score += block.score;
        if self.rng.gen_bool(POWERUP_CHANCE) {
            let kinds = [PowerKind::Shield, PowerKind::TwoFa, PowerKind::RateLimiter];
            if let Some(&kind) = kinds.choose(&mut self.rng) {
                self.drops.push(Falling {
                    pos: Vec2::new(block.rect.center().x, block.rect.bottom()),
                    kind,
                });
            }
        }
    }

    fn step_drops(&mut self)
    {
        let paddle = self.paddle;
        let mut caught = Vec::new();
        self.drops.retain_mut(|drop| {
            drop.pos.y += POWERUP_FALL;
            let on_paddle = drop.pos.y + 8.0 >= paddle.y
                && drop.pos.x >= paddle.x
                && drop.pos.x <= paddle.right()
                && drop.pos.y - 8.0 <= paddle.bottom();
            if on_paddle {
                caught.push(drop.kind);
                return false;
            }
            drop.pos.y < WORLD.height + 20.0
        });
        for kind in caught {
            self.apply(kind);
        }
    }

    fn check_level(&mut self)
    {
        if !self.blocks.is_empty() {
            return;
        }
        self.events.push(GameEvent::WaveComplete {
            game: "breaker",
            wave: self.level,
        });
        if self.level >= MAX_LEVELS {
            self.result = Some(true);
            return;
        }
        self.level += 1;
        self.clear_power_ups();
        self.blocks = layout(self.level);
        self.balls = vec![self.launch_ball()];
    }
}

/// Counts a timer down. True on the step it runs out.
fn expire(timer: &mut Option<Duration>, dt: Duration) -> bool
{
    match timer {
        Some(left) if *left <= dt => {
            *timer = None;
            true
        }
        Some(left) => {
            *left -= dt;
            false
        }
        None => false,
    }
}

impl Game for Breaker
{
    fn input(&mut self, _key: Key) {}

    fn update(&mut self, dt: Duration, held: &HeldKeys)
    {
        if self.result.is_some() {
            return;
        }
        self.tick_power_ups(dt);

        let axis = held.axis(Key::Left, Key::Right) + held.axis(Key::Char('a'), Key::Char('d'));
        self.paddle.x += axis.clamp(-1.0, 1.0) * PADDLE_SPEED;
        self.clamp_paddle();

        let mut idx = 0;
        while idx < self.balls.len() {
            if self.step_ball(idx) {
                idx += 1;
            } else {
                self.balls.remove(idx);
            }
        }
        if self.balls.is_empty() {
            self.lives -= 1;
            if self.lives == 0 {
                self.result = Some(false);
                return;
            }
            self.clear_power_ups();
            let ball = self.launch_ball();
            self.balls.push(ball);
        }

        self.step_drops();
        self.check_level();
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        for block in &self.blocks {
            let ch = match block.hp * 3 / block.max_hp.max(1) {
                0 | 1 => '░',
                2 => '▒',
                _ => '█',
            };
            canvas.fill_world(WORLD, block.rect, ch, Some(block.color));
        }
        canvas.fill_world(WORLD, self.paddle, '=', Some(Rgb::new(193, 255, 0)));
        for ball in &self.balls {
            let rect = Rect::centered(ball.pos, BALL_RADIUS * 2.0, BALL_RADIUS * 2.0);
            canvas.fill_world(WORLD, rect, 'o', Some(Rgb::WHITE));
        }
        for drop in &self.drops {
            let rect = Rect::centered(drop.pos, 30.0, 16.0);
            canvas.fill_world(WORLD, rect, drop.kind.glyph(), Some(Rgb::BLUE));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let mut hud = vec![
            format!("Score: {}", self.score),
            format!("Lives: {}", self.lives),
            format!("Level {}/{}", self.level, MAX_LEVELS),
        ];
        for (timer, label) in [
            (self.shield_left, "PCI Shield"),
            (self.twofa_left, "2FA Ball"),
            (self.limiter_left, "Rate Limiter"),
        ] {
            if let Some(left) = timer {
                hud.push(format!("{label} {:.0}s", left.as_secs_f32().ceil()));
            }
        }
        hud
    }

    fn controls(&self) -> &'static str
    {
        "Left/Right move paddle"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        let won = self.result?;
        let (title, message) = if won {
            ("Firewall Breached", "All fraud layers destroyed across all levels.")
        } else {
            ("Firewall Locked Down", "A payment packet escaped below the paddle.")
        };
        Some(
            Outcome::new(Some(self.score), won)
                .line(title)
                .line(message)
                .stat("level", self.level as i64),
        )
    }

    fn take_events(&mut self) -> Vec<GameEvent>
    {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::testing::run_ticks;

    fn parked_ball(pos: Vec2, vel: Vec2) -> Ball
    {
        Ball {
            pos,
            vel,
            speed: vel.length(),
        }
    }

    #[test]
    fn levels_add_rows_and_hit_points()
    {
        let first = layout(1);
        assert_eq!(first.len(), 32);
        assert_eq!(first[0].rect.y, BLOCK_TOP);
        assert_eq!(first[0].hp, 3);
        assert_eq!(first[31].hp, 1);
        assert_eq!(first[0].rect.w, (480.0 - 4.0 * 9.0) / 8.0);

        let third = layout(3);
        assert_eq!(third.len(), 48);
        // extra rows are critical
        assert_eq!(third[47].score, 50);
        assert_eq!(third[47].hp, 5);
    }

    #[test]
    fn launch_stays_within_35_degrees()
    {
        let mut game = Breaker::new(4);
        for _ in 0..50 {
            let ball = game.launch_ball();
            assert!(ball.vel.y < 0.0);
            assert!(ball.vel.x.abs() <= ball.speed * 35f32.to_radians().sin() + 1e-4);
        }
    }

    #[test]
    fn paddle_hit_redirects_by_position()
    {
        let mut game = Breaker::new(1);
        game.blocks.clear();
        let right_edge = game.paddle.right() - 1.0;
        game.balls = vec![parked_ball(Vec2::new(right_edge, game.paddle.y - 8.0), Vec2::new(0.0, 4.5))];
        game.step_ball(0);
        let ball = game.balls[0];
        assert!(ball.vel.y < 0.0);
        assert!(ball.vel.x > 3.0);
        assert!((ball.vel.length() - 4.5).abs() < 0.01);
    }

    #[test]
    fn block_hit_flips_and_scores_on_kill()
    {
        let mut game = Breaker::new(2);
        let target = game.blocks.len() - 1;
        let rect = game.blocks[target].rect;
        game.balls = vec![parked_ball(Vec2::new(rect.center().x, rect.bottom() + 10.0), Vec2::new(0.0, -4.5))];
        game.step_ball(0);
        assert!(game.balls[0].vel.y > 0.0);
        assert_eq!(game.blocks.len(), 31);
        assert_eq!(game.score, 10);
    }

    #[test]
    fn losing_every_ball_costs_a_life()
    {
        let mut game = Breaker::new(3);
        game.balls = vec![parked_ball(Vec2::new(10.0, 660.0), Vec2::new(0.0, 4.0))];
        game.update(crate::engine::TICK, &HeldKeys::default());
        assert_eq!(game.lives, 2);
        assert_eq!(game.balls.len(), 1);

        game.lives = 1;
        game.balls = vec![parked_ball(Vec2::new(10.0, 660.0), Vec2::new(0.0, 4.0))];
        run_ticks(&mut game, 1);
        let outcome = game.outcome().unwrap();
        assert!(!outcome.won);
    }

    #[test]
    fn clearing_the_last_level_wins()
    {
        let mut game = Breaker::new(5);
        game.blocks.clear();
        run_ticks(&mut game, 1);
        assert_eq!(game.level, 2);
        assert_eq!(game.blocks.len(), 40);

        game.level = MAX_LEVELS;
        game.blocks.clear();
        run_ticks(&mut game, 1);
        assert!(game.outcome().unwrap().won);
        let waves = game
            .take_events()
            .into_iter()
            .filter(|e| e.name() == "wave_complete")
            .count();
        assert_eq!(waves, 2);
    }

    #[test]
    fn power_ups_apply_and_expire()
    {
        let mut game = Breaker::new(6);
        game.apply(PowerKind::Shield);
        assert_eq!(game.paddle.w, PADDLE_WIDTH * 1.6);
        game.apply(PowerKind::TwoFa);
        assert_eq!(game.balls.len(), 2);
        assert_eq!(game.balls[1].vel.x, -game.balls[0].vel.x);
        let speed = game.balls[0].speed;
        game.apply(PowerKind::RateLimiter);
        game.apply(PowerKind::RateLimiter);
        assert!((game.balls[0].speed - speed * 0.6).abs() < 1e-4);

        game.tick_power_ups(Duration::from_secs(9));
        assert!((game.balls[0].speed - speed).abs() < 1e-4);
        game.tick_power_ups(Duration::from_secs(2));
        assert_eq!(game.paddle.w, PADDLE_WIDTH);
        game.tick_power_ups(Duration::from_secs(5));
        assert_eq!(game.balls.len(), 1);
    }
}
