use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::analytics::GameEvent;
use crate::engine::{Game, Outcome};
use crate::geom::Rect;
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const GRID: i32 = 20;
const START_MOVE_MS: f32 = 150.0;
const MIN_MOVE_MS: f32 = 70.0;
const FOOD_SPEEDUP_MS: f32 = 2.0;
const FOOD_POINTS: i64 = 100;
const SHIELD_TIME: Duration = Duration::from_secs(5);
const START_FRAUD: usize = 3;
const FRAUD_MIN_DISTANCE: i32 = 5;
const FRAUD_ATTEMPTS: usize = 50;
const SHIELD_CHANCE: f64 = 0.1;

const TIPS: [&str; 10] = [
    "Enable 3D Secure 2.0 to shift liability away from your business.",
    "Use velocity checks to block fraudsters testing multiple cards rapidly.",
    "Regularly update your PCI-DSS compliance to avoid heavy fines.",
    "Implement AVS (Address Verification) to match billing addresses.",
    "Tokenize sensitive data! Never store raw credit card numbers.",
    "Monitor chargeback ratios. Exceeding 1% can get your account frozen.",
    "Use a multi-acquirer strategy to ensure transaction uptime.",
    "Geo-fencing can prevent fraud from high-risk regions.",
    "Machine learning models can detect fraud patterns human rules miss.",
    "Always refund suspicious transactions before they become chargebacks.",
];

type Pos = (i32, i32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ending
{
    Crashed(&'static str),
    BoardFull,
}

pub struct Snake
{
    rng: StdRng,
    body: VecDeque<Pos>,
    dir: Pos,
    next_dir: Pos,
    move_ms: f32,
    since_move: Duration,
    score: i64,
    food: Option<Pos>,
    frauds: Vec<Pos>,
    pickup: Option<Pos>,
    shield_left: Duration,
    ending: Option<Ending>,
    tip: &'static str,
    events: Vec<GameEvent>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Snake::new(seed))
}

impl Snake
{
    fn new(seed: u64) -> Self
    {
        let mut rng = StdRng::seed_from_u64(seed);
        let tip = TIPS.choose(&mut rng).copied().unwrap_or(TIPS[0]);
        let mut game = Self {
            rng,
            body: VecDeque::from(vec![(10, 10), (9, 10), (8, 10)]),
            dir: (1, 0),
            next_dir: (1, 0),
            move_ms: START_MOVE_MS,
            since_move: Duration::ZERO,
            score: 0,
            food: None,
            frauds: Vec::new(),
            pickup: None,
            shield_left: Duration::ZERO,
            ending: None,
            tip,
            events: Vec::new(),
        };
        game.food = game.free_cell();
        game.spawn_fraud(START_FRAUD);
        game
    }

    fn occupied(&self, pos: Pos) -> bool
    {
        self.body.contains(&pos)
            || self.frauds.contains(&pos)
            || self.food == Some(pos)
            || self.pickup == Some(pos)
    }

    /// Uniform pick among the cells nothing occupies.
    fn free_cell(&mut self) -> Option<Pos>
    {
        let free: Vec<Pos> = (0..GRID)
            .flat_map(|y| (0..GRID).map(move |x| (x, y)))
            .filter(|&pos| !self.occupied(pos))
            .collect();
        free.choose(&mut self.rng).copied()
    }

    fn spawn_fraud(&mut self, count: usize)
    {
        for _ in 0..count {
            for _ in 0..FRAUD_ATTEMPTS {
                let pos = (self.rng.gen_range(0..GRID), self.rng.gen_range(0..GRID));
                let head = self.body[0];
                let dist = (pos.0 - head.0).abs() + (pos.1 - head.1).abs();
                if dist > FRAUD_MIN_DISTANCE && !self.occupied(pos) {
                    self.frauds.push(pos);
                    break;
                }
            }
        }
    }

    fn maybe_spawn_pickup(&mut self)
    {
        if self.pickup.is_some() || self.shielded() {
            return;
        }
        if self.rng.gen_bool(SHIELD_CHANCE) {
            self.pickup = self.free_cell();
        }
    }

    fn shielded(&self) -> bool
    {
        !self.shield_left.is_zero()
    }

    fn turn(&mut self, dir: Pos)
    {
        // no reversing onto the current heading
        if dir.0 == -self.dir.0 && dir.1 == -self.dir.1 {
            return;
        }
        self.next_dir = dir;
    }

    fn step(&mut self)
    {
        self.dir = self.next_dir;
        let (hx, hy) = self.body[0];
        let head = (hx + self.dir.0, hy + self.dir.1);

        if head.0 < 0 || head.0 >= GRID || head.1 < 0 || head.1 >= GRID {
            self.ending = Some(Ending::Crashed("Network Timeout: Boundary Error"));
            return;
        }
        let tail = self.body.len() - 1;
        if self.body.iter().take(tail).any(|&seg| seg == head) {
            self.ending = Some(Ending::Crashed("Internal Loop: Self-Reference Error"));
            return;
        }
        if let Some(idx) = self.frauds.iter().position(|&f| f == head) {
            if self.shielded() {
                self.frauds.swap_remove(idx);
            } else {
                self.ending = Some(Ending::Crashed("Security Breach: Fraud Detected"));
                return;
            }
        }

        self.body.push_front(head);

        if self.food == Some(head) {
            self.score += FOOD_POINTS;
            self.move_ms = (self.move_ms - FOOD_SPEEDUP_MS).max(MIN_MOVE_MS);
            self.food = None;
            self.food = self.free_cell();
            if self.food.is_none() {
                self.ending = Some(Ending::BoardFull);
                return;
            }
            if self.score % 500 == 0 {
                self.spawn_fraud(1);
            }
            if self.score % 300 == 0 {
                self.maybe_spawn_pickup();
            }
        } else {
            if self.pickup == Some(head) {
                self.pickup = None;
                self.shield_left = SHIELD_TIME;
                self.events.push(GameEvent::PowerUp {
                    game: "snake",
                    power_up: "shield",
                });
            }
            self.body.pop_back();
        }
    }
}

impl Game for Snake
{
    fn input(&mut self, key: Key)
    {
        match key {
            Key::Up | Key::Char('w') => self.turn((0, -1)),
            Key::Down | Key::Char('s') => self.turn((0, 1)),
            Key::Left | Key::Char('a') => self.turn((-1, 0)),
            Key::Right | Key::Char('d') => self.turn((1, 0)),
            _ => {}
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.ending.is_some() {
            return;
        }
        self.shield_left = self.shield_left.saturating_sub(dt);
        self.since_move += dt;
        if self.since_move.as_secs_f32() * 1000.0 > self.move_ms {
            self.since_move = Duration::ZERO;
            self.step();
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let world = World::new(GRID as f32, GRID as f32);
        let cell = |(x, y): Pos| Rect::new(x as f32, y as f32, 1.0, 1.0);

        canvas.fill_world(world, Rect::new(0.0, 0.0, GRID as f32, GRID as f32), '.', Some(Rgb::new(40, 50, 70)));
        for &fraud in &self.frauds {
            canvas.fill_world(world, cell(fraud), '!', Some(Rgb::RED));
        }
        if let Some(food) = self.food {
            canvas.fill_world(world, cell(food), '$', Some(Rgb::GREEN));
        }
        if let Some(pickup) = self.pickup {
            canvas.fill_world(world, cell(pickup), 'S', Some(Rgb::YELLOW));
        }
        for (idx, &seg) in self.body.iter().enumerate().rev() {
            let (ch, color) = match idx {
                0 if self.shielded() => ('@', Rgb::YELLOW),
                0 => ('@', Rgb::CYAN),
                _ if idx % 2 == 0 => ('1', Rgb::new(8, 145, 178)),
                _ => ('0', Rgb::new(8, 145, 178)),
            };
            canvas.fill_world(world, cell(seg), ch, Some(color));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let mut hud = vec![format!("Revenue: ${}.00", self.score), format!("Length: {}", self.body.len())];
        if self.shielded() {
            hud.push(format!("SHIELD {:.1}s", self.shield_left.as_secs_f32()));
        }
        hud
    }

    fn controls(&self) -> &'static str
    {
        "arrows/WASD steer"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        let ending = self.ending?;
        let reason = match ending {
            Ending::Crashed(reason) => reason,
            Ending::BoardFull => "Every cell processed: network saturated with revenue!",
        };
        Some(
            Outcome::new(Some(self.score), ending == Ending::BoardFull)
                .line(reason)
                .line(format!("Final revenue: ${}.00", self.score))
                .line(format!("Security tip: \"{}\"", self.tip))
                .stat("length", self.body.len() as i64),
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

    fn cleared(seed: u64) -> Snake
    {
        let mut game = Snake::new(seed);
        game.frauds.clear();
        game.food = Some((0, 0));
        game
    }

    #[test]
    fn starts_with_three_distant_frauds()
    {
        for seed in 0..20 {
            let game = Snake::new(seed);
            assert_eq!(game.frauds.len(), START_FRAUD);
            for &(x, y) in &game.frauds {
                assert!((x - 10).abs() + (y - 10).abs() > FRAUD_MIN_DISTANCE);
                assert_ne!(Some((x, y)), game.food);
            }
        }
    }

    #[test]
    fn moves_every_150ms()
    {
        let mut game = cleared(1);
        run_ticks(&mut game, 8);
        assert_eq!(game.body[0], (10, 10));
        run_ticks(&mut game, 1);
        assert_eq!(game.body[0], (11, 10));
    }

    #[test]
    fn reverse_turn_is_ignored()
    {
        let mut game = cleared(2);
        game.input(Key::Left);
        game.step();
        assert_eq!(game.body[0], (11, 10));
        game.input(Key::Up);
        game.input(Key::Left);
        game.step();
        assert_eq!(game.body[0], (11, 9));
    }

    #[test]
    fn eating_grows_scores_and_speeds_up()
    {
        let mut game = cleared(3);
        game.food = Some((11, 10));
        game.step();
        assert_eq!(game.score, 100);
        assert_eq!(game.body.len(), 4);
        assert_eq!(game.move_ms, 148.0);
        assert!(game.food.is_some());
        assert_ne!(game.food, Some((11, 10)));
    }

    #[test]
    fn wall_ends_round()
    {
        let mut game = cleared(4);
        game.body = VecDeque::from(vec![(19, 5), (18, 5), (17, 5)]);
        game.step();
        let outcome = game.outcome().unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.lines[0], "Network Timeout: Boundary Error");
    }

    #[test]
    fn chasing_the_tail_is_allowed()
    {
        let mut game = cleared(5);
        game.body = VecDeque::from(vec![(5, 5), (5, 6), (6, 6), (6, 5)]);
        game.dir = (0, -1);
        game.next_dir = (1, 0);
        game.step();
        assert!(game.ending.is_none());
        assert_eq!(game.body[0], (6, 5));
    }

    #[test]
    fn shield_destroys_fraud()
    {
        let mut game = cleared(6);
        game.frauds = vec![(11, 10)];
        game.pickup = None;
        game.shield_left = SHIELD_TIME;
        game.step();
        assert!(game.ending.is_none());
        assert!(game.frauds.is_empty());

        game.frauds = vec![(13, 10)];
        game.shield_left = Duration::ZERO;
        game.step();
        game.step();
        assert_eq!(game.ending, Some(Ending::Crashed("Security Breach: Fraud Detected")));
    }

    #[test]
    fn pickup_grants_shield_and_reports_it()
    {
        let mut game = cleared(7);
        game.pickup = Some((11, 10));
        game.step();
        assert!(game.shielded());
        assert_eq!(game.body.len(), 3);
        let events = game.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "power_up_used");
    }

    #[test]
    fn every_500_points_adds_a_fraud()
    {
        let mut game = cleared(9);
        game.frauds = vec![(0, 19), (1, 19), (2, 19), (3, 19)];
        game.score = 200;
        game.food = Some((11, 10));
        game.step();
        assert_eq!(game.score, 300);
        assert_eq!(game.frauds.len(), 4);

        game.score = 400;
        game.food = Some((12, 10));
        game.step();
        assert_eq!(game.score, 500);
        assert_eq!(game.frauds.len(), 5);
        let (fx, fy) = game.frauds[4];
        assert!((fx - 12).abs() + (fy - 10).abs() > FRAUD_MIN_DISTANCE);
    }

    #[test]
    fn pickup_needs_an_empty_slot_and_no_shield()
    {
        let mut game = cleared(10);
        game.pickup = Some((3, 3));
        for _ in 0..200 {
            game.maybe_spawn_pickup();
        }
        assert_eq!(game.pickup, Some((3, 3)));

        game.pickup = None;
        game.shield_left = SHIELD_TIME;
        game.score = 200;
        game.food = Some((11, 10));
        game.step();
        assert_eq!(game.score, 300);
        for _ in 0..200 {
            game.maybe_spawn_pickup();
        }
        assert_eq!(game.pickup, None);

        game.shield_left = Duration::ZERO;
        for _ in 0..200 {
            game.maybe_spawn_pickup();
        }
        let pickup = game.pickup.unwrap();
        assert!(!game.body.contains(&pickup));
        assert_ne!(game.food, Some(pickup));
    }

    #[test]
    fn full_board_is_a_win()
    {
        let mut game = cleared(8);
        let mut body: Vec<Pos> = Vec::new();
        for y in 0..GRID {
            let row: Vec<i32> = if y % 2 == 0 { (0..GRID).collect() } else { (0..GRID).rev().collect() };
            for x in row {
                body.push((x, y));
            }
        }
        // leave one cell free in front of the head for the last meal
        let last = body.pop().unwrap();
        body.reverse();
        game.body = body.into_iter().collect();
        game.food = Some(last);
        let head = game.body[0];
        game.dir = (last.0 - head.0, last.1 - head.1);
        game.next_dir = game.dir;
        game.step();
        let outcome = game.outcome().unwrap();
        assert!(outcome.won);
    }
}
