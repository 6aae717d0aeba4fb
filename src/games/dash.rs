use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{Game, Outcome};
use crate::geom::Rect;
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(800.0, 300.0);
const GROUND: f32 = 20.0;
const SPEED_START: f32 = 5.0;
const SPEED_MAX: f32 = 15.0;
const SPEED_STEP: f32 = 0.001;
const GRAVITY: f32 = 0.6;
const JUMP: f32 = -12.0;
const DODO_X: f32 = 50.0;
const DODO_SIZE: f32 = 40.0;
const DUCK_HEIGHT: f32 = 20.0;
const HIT_PADDING: f32 = 5.0;
const MIN_SPAWN_FRAMES: f32 = 45.0;

struct Dodo
{
    y: f32,
    height: f32,
    dy: f32,
    grounded: bool,
    ducking: bool,
}

impl Dodo
{
    fn rect(&self) -> Rect
    {
        Rect::new(DODO_X, self.y, DODO_SIZE, self.height)
    }
}

pub struct Dash
{
    rng: StdRng,
    dodo: Dodo,
    obstacles: Vec<Rect>,
    speed: f32,
    spawn_timer: f32,
    frames: u64,
    crashed: bool,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Dash::new(seed))
}

/// Padded box overlap used for obstacle hits.
fn collides(dodo: &Rect, obstacle: &Rect) -> bool
{
    dodo.x + HIT_PADDING < obstacle.right()
        && dodo.right() - HIT_PADDING > obstacle.x
        && dodo.y + HIT_PADDING < obstacle.bottom()
        && dodo.bottom() - HIT_PADDING > obstacle.y
}

impl Dash
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            dodo: Dodo {
                y: WORLD.height - GROUND - 50.0,
                height: DODO_SIZE,
                dy: 0.0,
                grounded: false,
                ducking: false,
            },
            obstacles: Vec::new(),
            speed: SPEED_START,
            spawn_timer: 0.0,
            frames: 0,
            crashed: false,
        }
    }

    fn score(&self) -> u64
    {
        self.frames / 10
    }

    fn step_dodo(&mut self, held: &HeldKeys)
    {
        let dodo = &mut self.dodo;
        let jump = held.is_held(Key::Space) || held.is_held(Key::Up);
        if jump && dodo.grounded && !dodo.ducking {
            dodo.dy = JUMP;
            dodo.grounded = false;
        }

        let duck = held.is_held(Key::Down);
        if duck && !dodo.ducking {
            dodo.height = DUCK_HEIGHT;
            dodo.y += DODO_SIZE - DUCK_HEIGHT;
            dodo.ducking = true;
        } else if !duck && dodo.ducking {
            dodo.height = DODO_SIZE;
            dodo.y -= DODO_SIZE - DUCK_HEIGHT;
            dodo.ducking = false;
        }

        dodo.y += dodo.dy;
        let floor = WORLD.height - GROUND;
        if dodo.y + dodo.height < floor {
            dodo.dy += GRAVITY;
            dodo.grounded = false;
        } else {
            dodo.dy = 0.0;
            dodo.grounded = true;
            dodo.y = floor - dodo.height;
        }
    }

    fn spawn(&mut self)
    {
        let width = self.rng.gen_range(20.0..50.0);
        let height = self.rng.gen_range(30.0..60.0);
        self.obstacles
            .push(Rect::new(WORLD.width, WORLD.height - GROUND - height, width, height));
        self.spawn_timer = MIN_SPAWN_FRAMES + self.rng.gen_range(20.0..70.0);
    }

    fn step_obstacles(&mut self)
    {
        self.spawn_timer -= 1.0;
        if self.spawn_timer <= 0.0 {
            self.spawn();
        }
        let dodo = self.dodo.rect();
        for obstacle in &mut self.obstacles {
            obstacle.x -= self.speed;
            if collides(&dodo, obstacle) {
                self.crashed = true;
            }
        }
        self.obstacles.retain(|o| o.right() >= 0.0);
    }
}

impl Game for Dash
{
    fn input(&mut self, _key: Key) {}

    fn update(&mut self, _dt: Duration, held: &HeldKeys)
    {
        if self.crashed {
            return;
        }
        self.step_dodo(held);
        self.step_obstacles();
        if self.crashed {
            log::debug!("dodo dash crashed at speed {:.2}", self.speed);
            return;
        }
        self.frames += 1;
        if self.speed < SPEED_MAX {
            self.speed += SPEED_STEP;
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let ground = Rect::new(0.0, WORLD.height - GROUND, WORLD.width, GROUND);
        canvas.fill_world(WORLD, ground, '▔', Some(Rgb::new(136, 136, 136)));
        for obstacle in &self.obstacles {
            canvas.fill_world(WORLD, *obstacle, '#', Some(Rgb::new(255, 71, 87)));
        }
        let face = if self.crashed { 'x' } else { 'D' };
        canvas.fill_world(WORLD, self.dodo.rect(), face, Some(Rgb::new(193, 255, 0)));
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Score: {:05}", self.score()),
            format!("Speed: {:.1}", self.speed),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "Space/Up jump  Down duck"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.crashed {
            return None;
        }
        Some(
            Outcome::new(Some(self.score() as i64), false)
                .line("GAME OVER")
                .line(format!("Distance: {:05}", self.score())),
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::testing::{hold_for, run_ticks};

    fn grounded(seed: u64) -> Dash
    {
        let mut game = Dash::new(seed);
        // keep obstacles away while settling
        game.spawn_timer = 1_000.0;
        run_ticks(&mut game, 30);
        game
    }

    #[test]
    fn lands_on_the_ground()
    {
        let game = grounded(1);
        assert!(game.dodo.grounded);
        assert_eq!(game.dodo.y, 300.0 - 20.0 - 40.0);
    }

    #[test]
    fn jump_needs_ground_and_no_duck()
    {
        let mut game = grounded(2);
        hold_for(&mut game, Key::Space, 1);
        assert_eq!(game.dodo.dy, JUMP + GRAVITY);
        assert!(game.dodo.y < 240.0);

        let mut game = grounded(3);
        let mut held = HeldKeys::new(1, true);
        held.press(Key::Down);
        game.update(crate::engine::TICK, &held);
        assert!(game.dodo.ducking);
        assert_eq!(game.dodo.height, DUCK_HEIGHT);
        assert_eq!(game.dodo.y, 260.0);
        held.press(Key::Space);
        game.update(crate::engine::TICK, &held);
        assert_eq!(game.dodo.dy, 0.0);
        assert_eq!(game.dodo.y, 260.0);
    }

    #[test]
    fn spawn_gaps_stay_jumpable()
    {
        let mut game = Dash::new(4);
        for _ in 0..100 {
            game.spawn();
            assert!(game.spawn_timer >= 65.0 && game.spawn_timer < 115.0);
            let last = game.obstacles.last().unwrap();
            assert!(last.w >= 20.0 && last.w < 50.0);
            assert_eq!(last.bottom(), 280.0);
        }
    }

    #[test]
    fn padded_collision()
    {
        let dodo = Rect::new(50.0, 240.0, 40.0, 40.0);
        assert!(!collides(&dodo, &Rect::new(86.0, 240.0, 20.0, 40.0)));
        assert!(collides(&dodo, &Rect::new(84.0, 240.0, 20.0, 40.0)));
    }

    #[test]
    fn obstacle_ends_the_run()
    {
        let mut game = grounded(5);
        game.obstacles.push(Rect::new(80.0, 230.0, 30.0, 50.0));
        run_ticks(&mut game, 1);
        let outcome = game.outcome().unwrap();
        assert_eq!(outcome.score, Some(3));
        assert!(!outcome.won);
    }

    #[test]
    fn speed_ramps_to_cap()
    {
        let mut game = grounded(6);
        let before = game.speed;
        run_ticks(&mut game, 1);
        assert!(game.speed > before);
        game.speed = SPEED_MAX;
        game.obstacles.clear();
        game.spawn_timer = 1_000.0;
        run_ticks(&mut game, 1);
        assert_eq!(game.speed, SPEED_MAX);
    }
}
