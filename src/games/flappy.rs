use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::engine::{Game, Outcome};
use crate::geom::{Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(800.0, 600.0);
const GROUND: f32 = 80.0;
const BIRD_X: f32 = 120.0;
const BIRD_RADIUS: f32 = 24.0;
const COLLISION_BUFFER: f32 = 4.0;
const GRAVITY: f32 = 0.12;
const FLAP: f32 = -4.5;
const TERMINAL_VELOCITY: f32 = 8.0;

const INITIAL_SPEED: f32 = 3.0;
const INITIAL_GAP: f32 = 260.0;
const RAMP_EVERY: u32 = 5;
const SPEED_STEP: f32 = 0.25;
const MAX_SPEED: f32 = 6.5;
const GAP_STEP: f32 = 5.0;
const MIN_GAP: f32 = 130.0;

const PIPE_WIDTH: f32 = 75.0;
const SPAWN_DISTANCE: f32 = 350.0;
const PIPE_MARGIN: f32 = 50.0;
const SAFE_JUMP: f32 = 220.0;
const QUIP_TIME: Duration = Duration::from_millis(1500);

const LIME: Rgb = Rgb::new(193, 255, 0);

const NORMAL_QUIPS: [&str; 4] = ["GROWTH HACKING", "UP & TO THE RIGHT", "SCALING", "TERM SHEET"];
const CLOSE_CALL_QUIPS: [&str; 4] = ["BURN RATE HIGH", "BRIDGE ROUND", "RUNWAY LOW", "DUE DILIGENCE"];
const EASY_QUIPS: [&str; 3] = ["CASH FLOW +", "ZEN MODE", "PASSIVE INCOME"];
const CHARGEBACK_QUIPS: [&str; 2] = ["DISPUTE WON!", "FRAUD BLOCKED"];
const HOSTILE_QUIPS: [&str; 2] = ["HOSTILE DODGED", "POISON PILL"];
const LEVEL_UP_QUIPS: [&str; 6] = [
    "SERIES A RAISED!",
    "TECHCRUNCH FEATURE!",
    "ACQUIRED COMPETITOR",
    "IPO ROADSHOW",
    "UNICORN STATUS!",
    "HIRING SPREE!",
];

const DEATH_REASONS: [(&str, &str); 10] = [
    ("PAYMENT DECLINED", "Payment gateway timeout."),
    ("TRANSACTION FAILED", "Forgot to integrate Dodo Payments?"),
    ("HIGH CHURN", "Failed to find product-market fit."),
    ("FRAUD DETECTED", "High dispute rate detected."),
    ("API ERROR", "AWS bill couldn't be paid."),
    ("COMPLIANCE BREACH", "Compliance violation shut you down."),
    ("RUNWAY OUT", "VCs stopped replying to emails."),
    ("COMPETITION CRUSHED", "Zuck copied your entire feature set."),
    ("HACKED", "Your server was hacked."),
    ("STOLEN TRADE SECRETS", "Your trade secrets were stolen."),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PipeMode
{
    Normal,
    Drop,
    Chomp,
    Ghost,
    WiggleV,
    WiggleH,
}

/// Special pipes only show up once the score is past five.
fn pipe_mode(score: u32, roll: f64) -> PipeMode
{
    if score <= 5 {
        return PipeMode::Normal;
    }
    match roll {
        r if r > 0.92 => PipeMode::Drop,
        r if r > 0.85 => PipeMode::Chomp,
        r if r > 0.78 => PipeMode::Ghost,
        r if r > 0.65 => PipeMode::WiggleV,
        r if r > 0.55 => PipeMode::WiggleH,
        _ => PipeMode::Normal,
    }
}

#[derive(Clone, Debug)]
struct Pipe
{
    x: f32,
    top: f32,
    bottom: f32,
    mode: PipeMode,
    passed: bool,
    offset: Vec2,
    drop_y: f32,
    drop_speed: f32,
    chomp_y: f32,
}

impl Pipe
{
    fn left(&self) -> f32
    {
        self.x + self.offset.x
    }

    /// Lower edge of the top pipe.
    fn top_edge(&self) -> f32
    {
        let drop = if self.mode == PipeMode::Drop { self.drop_y } else { 0.0 };
        self.top + self.offset.y + self.chomp_y + drop
    }

    /// Upper edge of the bottom pipe.
    fn bottom_edge(&self) -> f32
    {
        WORLD.height - GROUND - self.bottom + self.offset.y - self.chomp_y
    }
}

struct Quip
{
    text: &'static str,
    color: Rgb,
    left: Duration,
}

pub struct Flappy
{
    rng: StdRng,
    bird_y: f32,
    velocity: f32,
    frames: u64,
    score: u32,
    speed: f32,
    gap: f32,
    pipes: Vec<Pipe>,
    last_top: f32,
    since_spawn: f32,
    quip: Option<Quip>,
    death: Option<(&'static str, &'static str)>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Flappy::new(seed))
}

impl Flappy
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bird_y: WORLD.height / 2.0,
            velocity: 0.0,
            frames: 0,
            score: 0,
            speed: INITIAL_SPEED,
            gap: INITIAL_GAP,
            pipes: Vec::new(),
            last_top: WORLD.height / 2.0 - 100.0,
            since_spawn: SPAWN_DISTANCE,
            quip: None,
            death: None,
        }
    }

    fn say(&mut self, pool: &[&'static str], color: Rgb)
    {
        if let Some(&text) = pool.choose(&mut self.rng) {
            self.quip = Some(Quip {
                text,
                color,
                left: QUIP_TIME,
            });
        }
    }

    fn die(&mut self)
    {
        if self.death.is_none() {
            let reason = DEATH_REASONS.choose(&mut self.rng).copied().unwrap_or(DEATH_REASONS[0]);
            log::debug!("flappy round over at ${}k MRR: {}", self.score, reason.0);
            self.death = Some(reason);
        }
    }

    fn spawn_pipe(&mut self)
    {
        let max_top = WORLD.height - GROUND - self.gap - PIPE_MARGIN;
        let top = if self.pipes.is_empty() {
            (WORLD.height / 2.0 - self.gap / 2.0).floor().clamp(PIPE_MARGIN, max_top)
        } else {
            let lo = PIPE_MARGIN.max(self.last_top - SAFE_JUMP);
            let hi = max_top.min(self.last_top + SAFE_JUMP);
            if lo < hi {
                self.rng.gen_range(lo..=hi).floor()
            } else {
                lo
            }
        };
        self.last_top = top;
        let mode = pipe_mode(self.score, self.rng.r#gen());
        self.pipes.push(Pipe {
            x: WORLD.width,
            top,
            bottom: WORLD.height - GROUND - top - self.gap,
            mode,
            passed: false,
            offset: Vec2::default(),
            drop_y: 0.0,
            drop_speed: 0.0,
            chomp_y: 0.0,
        });
    }

    fn animate(&mut self, idx: usize)
    {
        let frames = self.frames as f32;
        let pipe = &mut self.pipes[idx];
        match pipe.mode {
            PipeMode::WiggleV => pipe.offset.y = (frames * 0.08).sin() * 35.0,
            PipeMode::WiggleH => pipe.offset.x = (frames * 0.12).sin() * 20.0,
            PipeMode::Chomp => {
                let closing = pipe.x - BIRD_X < 200.0 && pipe.x + PIPE_WIDTH > BIRD_X;
                if closing && pipe.chomp_y < 35.0 {
                    pipe.chomp_y += 2.0;
                } else if !closing && pipe.chomp_y > 0.0 {
                    pipe.chomp_y -= 1.0;
                }
            }
            PipeMode::Drop => {
                let ahead = pipe.x - BIRD_X;
                let triggered = ahead < 180.0 && ahead > -50.0 && pipe.drop_speed == 0.0;
                if triggered {
                    pipe.drop_speed = 2.0;
                }
                if pipe.drop_speed > 0.0 {
                    pipe.drop_speed *= 1.05;
                    pipe.drop_y += pipe.drop_speed;
                }
                if triggered {
                    self.quip = Some(Quip {
                        text: "CHARGEBACK!",
                        color: Rgb::RED,
                        left: QUIP_TIME,
                    });
                }
            }
            PipeMode::Normal | PipeMode::Ghost => {}
        }
    }

    fn step_pipes(&mut self)
    {
        self.since_spawn += self.speed;
        if self.since_spawn >= SPAWN_DISTANCE {
            self.since_spawn = 0.0;
            self.spawn_pipe();
        }

        let reach = BIRD_RADIUS - COLLISION_BUFFER;
        for idx in 0..self.pipes.len() {
            self.animate(idx);
            let pipe = &mut self.pipes[idx];
            pipe.x -= self.speed;

            let (left, top_edge, bottom_edge) = (pipe.left(), pipe.top_edge(), pipe.bottom_edge());
            let overlaps_x = BIRD_X + reach > left && BIRD_X - reach < left + PIPE_WIDTH;
            if overlaps_x && (self.bird_y - reach < top_edge || self.bird_y + reach > bottom_edge) {
                self.die();
            }

            let pipe = &mut self.pipes[idx];
            if !pipe.passed && left + PIPE_WIDTH < BIRD_X {
                pipe.passed = true;
                let mode = pipe.mode;
                self.passed_pipe(mode, top_edge, bottom_edge);
            }
        }
        self.pipes.retain(|p| p.x + PIPE_WIDTH >= -100.0);
    }

    fn passed_pipe(&mut self, mode: PipeMode, top_edge: f32, bottom_edge: f32)
    {
        self.score += 1;
        let level_up = self.score % RAMP_EVERY == 0;
        if level_up {
            if self.speed < MAX_SPEED {
                self.speed += SPEED_STEP;
            }
            if self.gap > MIN_GAP {
                self.gap -= GAP_STEP;
            }
            self.say(&LEVEL_UP_QUIPS, Rgb::WHITE);
        }

        let to_top = ((self.bird_y - BIRD_RADIUS) - top_edge).abs();
        let to_bottom = ((self.bird_y + BIRD_RADIUS) - bottom_edge).abs();
        match mode {
            PipeMode::Drop => self.say(&CHARGEBACK_QUIPS, LIME),
            PipeMode::Chomp => self.say(&HOSTILE_QUIPS, LIME),
            _ if to_top < 30.0 || to_bottom < 30.0 => self.say(&CLOSE_CALL_QUIPS, Rgb::new(255, 51, 51)),
            _ if !level_up => {
                if to_top > 60.0 && to_bottom > 60.0 && self.rng.gen_bool(0.3) {
                    self.say(&EASY_QUIPS, LIME);
                } else if self.rng.gen_bool(0.3) {
                    self.say(&NORMAL_QUIPS, LIME);
                }
            }
            _ => {}
        }
    }

    fn step_bird(&mut self)
    {
        self.velocity += GRAVITY;
        self.bird_y += self.velocity;
        self.velocity = self.velocity.min(TERMINAL_VELOCITY);

        let floor = WORLD.height - GROUND;
        if self.bird_y + BIRD_RADIUS >= floor {
            self.bird_y = floor - BIRD_RADIUS;
            self.die();
        }
        if self.bird_y - BIRD_RADIUS <= 0.0 {
            self.velocity = 0.0;
            self.bird_y = BIRD_RADIUS;
        }
    }
}

impl Game for Flappy
{
    fn input(&mut self, key: Key)
    {
        if self.death.is_some() {
            return;
        }
        if matches!(key, Key::Space | Key::Up | Key::Char('w')) {
            self.velocity = FLAP;
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.death.is_some() {
            return;
        }
        if let Some(quip) = &mut self.quip {
            quip.left = quip.left.saturating_sub(dt);
            if quip.left.is_zero() {
                self.quip = None;
            }
        }
        self.step_pipes();
        if self.death.is_some() {
            return;
        }
        self.step_bird();
        self.frames += 1;
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        for pipe in &self.pipes {
            let (ch, color) = match pipe.mode {
                PipeMode::Drop => ('█', Rgb::new(231, 76, 60)),
                PipeMode::Chomp => ('█', Rgb::new(142, 68, 173)),
                // ghosts blink but still collide
                PipeMode::Ghost if self.frames % 20 < 10 => ('░', Rgb::new(189, 195, 199)),
                PipeMode::Ghost => ('▒', Rgb::new(149, 165, 166)),
                _ => ('█', Rgb::new(46, 204, 113)),
            };
            let top_edge = pipe.top_edge().max(0.0);
            let bottom_edge = pipe.bottom_edge();
            canvas.fill_world(WORLD, Rect::new(pipe.left(), 0.0, PIPE_WIDTH, top_edge), ch, Some(color));
            canvas.fill_world(
                WORLD,
                Rect::new(pipe.left(), bottom_edge, PIPE_WIDTH, WORLD.height - GROUND - bottom_edge),
                ch,
                Some(color),
            );
        }
        canvas.fill_world(WORLD, Rect::new(0.0, WORLD.height - GROUND, WORLD.width, GROUND), '▀', Some(LIME));

        let bird = Rect::centered(Vec2::new(BIRD_X, self.bird_y), BIRD_RADIUS * 2.0, BIRD_RADIUS * 2.0);
        let face = if self.death.is_some() { 'x' } else { 'D' };
        canvas.fill_world(WORLD, bird, face, Some(Rgb::YELLOW));

        if let Some(quip) = &self.quip {
            canvas.text_world(WORLD, Vec2::new(BIRD_X + 160.0, self.bird_y - 60.0), quip.text, Some(quip.color));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("${}k MRR", self.score),
            format!("Speed: {:.2}", self.speed),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "Space/Up flap"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        let (title, message) = self.death?;
        Some(
            Outcome::new(Some(self.score as i64), false)
                .line(title)
                .line(message)
                .line(format!("Final MRR: ${}k", self.score)),
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::testing::run_ticks;

    fn clear_pipe(x: f32) -> Pipe
    {
        Pipe {
            x,
            top: 100.0,
            bottom: 100.0,
            mode: PipeMode::Normal,
            passed: false,
            offset: Vec2::default(),
            drop_y: 0.0,
            drop_speed: 0.0,
            chomp_y: 0.0,
        }
    }

    #[test]
    fn first_pipe_is_centered_on_the_bird()
    {
        let mut game = Flappy::new(1);
        run_ticks(&mut game, 1);
        assert_eq!(game.pipes.len(), 1);
        assert_eq!(game.pipes[0].top, 170.0);
        assert_eq!(game.pipes[0].x, 797.0);
        assert_eq!(game.pipes[0].bottom, 600.0 - 80.0 - 170.0 - 260.0);
    }

    #[test]
    fn later_pipes_stay_within_jump_range()
    {
        let mut game = Flappy::new(2);
        for _ in 0..200 {
            let before = game.last_top;
            game.spawn_pipe();
            let top = game.pipes.last().unwrap().top;
            assert!(top >= PIPE_MARGIN && top <= 600.0 - 80.0 - 260.0 - 50.0);
            if game.pipes.len() > 1 {
                assert!((top - before).abs() <= SAFE_JUMP + 1.0);
            }
        }
    }

    #[test]
    fn falling_hits_the_ground()
    {
        let mut game = Flappy::new(3);
        run_ticks(&mut game, 120);
        assert!(game.velocity <= TERMINAL_VELOCITY);
        let outcome = game.outcome().unwrap();
        assert_eq!(outcome.score, Some(0));
        assert_eq!(game.bird_y, 600.0 - 80.0 - BIRD_RADIUS);
    }

    #[test]
    fn ceiling_clamps()
    {
        let mut game = Flappy::new(4);
        for _ in 0..100 {
            game.input(Key::Space);
            run_ticks(&mut game, 1);
        }
        assert!(game.bird_y >= BIRD_RADIUS);
        assert!(game.death.is_none());
    }

    #[test]
    fn passing_scores_and_ramps_every_fifth()
    {
        let mut game = Flappy::new(5);
        game.since_spawn = -1000.0;
        game.score = 4;
        game.bird_y = 300.0;
        game.pipes.push(clear_pipe(BIRD_X - PIPE_WIDTH - 1.0));
        game.step_pipes();
        assert_eq!(game.score, 5);
        assert_eq!(game.speed, 3.25);
        assert_eq!(game.gap, 255.0);
        assert!(game.quip.is_some());
        game.step_pipes();
        assert_eq!(game.score, 5);
    }

    #[test]
    fn touching_a_pipe_ends_the_round()
    {
        let mut game = Flappy::new(6);
        game.since_spawn = -1000.0;
        game.bird_y = 110.0;
        game.pipes.push(clear_pipe(BIRD_X));
        game.step_pipes();
        assert!(game.outcome().is_some());
    }

    #[test]
    fn specials_need_a_score_past_five()
    {
        assert_eq!(pipe_mode(5, 0.99), PipeMode::Normal);
        assert_eq!(pipe_mode(6, 0.99), PipeMode::Drop);
        assert_eq!(pipe_mode(6, 0.9), PipeMode::Chomp);
        assert_eq!(pipe_mode(6, 0.8), PipeMode::Ghost);
        assert_eq!(pipe_mode(6, 0.7), PipeMode::WiggleV);
        assert_eq!(pipe_mode(6, 0.6), PipeMode::WiggleH);
        assert_eq!(pipe_mode(6, 0.1), PipeMode::Normal);
    }

    #[test]
    fn drop_pipe_falls_once_near()
    {
        let mut game = Flappy::new(7);
        game.since_spawn = -1000.0;
        let mut pipe = clear_pipe(BIRD_X + 150.0);
        pipe.mode = PipeMode::Drop;
        game.pipes.push(pipe);
        game.step_pipes();
        assert!(game.pipes[0].drop_y > 0.0);
        assert_eq!(game.quip.as_ref().map(|q| q.text), Some("CHARGEBACK!"));
    }
}
