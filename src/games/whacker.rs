use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::{Game, Outcome};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb};

const GRID: usize = 3;
const SLOTS: usize = GRID * GRID;
const LIVES: i32 = 5;
const MAX_ACTIVE: usize = 3;
const SCORE_HIT: i64 = 10;
const SCORE_MISS: i64 = -20;
const DIFFICULTY_STEP: u32 = 10;
const HIT_FLASH: Duration = Duration::from_millis(140);
const MISS_FLASH: Duration = Duration::from_millis(180);

const FRAUD_KINDS: [&str; 4] = ["Stolen Card", "Fake ID", "Chargeback", "Bot Attack"];

#[derive(Clone, Copy, Debug)]
struct Fraud
{
    kind: &'static str,
    left: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flash
{
    Hit,
    Miss,
}

pub struct Whacker
{
    rng: StdRng,
    slots: [Option<Fraud>; SLOTS],
    flashes: [Option<(Flash, Duration)>; SLOTS],
    score: i64,
    lives: i32,
    streak: u32,
    blocked: u32,
    until_spawn: Duration,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Whacker::new(seed))
}

/// Score multiplier for a run of consecutive blocks.
pub fn combo_multiplier(streak: u32) -> i64
{
    match streak {
        s if s >= 10 => 5,
        s if s >= 5 => 3,
        s if s >= 3 => 2,
        _ => 1,
    }
}

fn popup_duration(blocked: u32) -> Duration
{
    let levels = (blocked / DIFFICULTY_STEP) as u64;
    Duration::from_millis(1500u64.saturating_sub(levels * 100).max(500))
}

fn spawn_interval(blocked: u32) -> Duration
{
    let levels = (blocked / DIFFICULTY_STEP) as u64;
    Duration::from_millis(1200u64.saturating_sub(levels * 80).max(400))
}

impl Whacker
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            slots: [None; SLOTS],
            flashes: [None; SLOTS],
            score: 0,
            lives: LIVES,
            streak: 0,
            blocked: 0,
            // the first fraud pops up straight away
            until_spawn: Duration::ZERO,
        }
    }

    fn active(&self) -> usize
    {
        self.slots.iter().flatten().count()
    }

    fn spawn(&mut self)
    {
        if self.active() >= MAX_ACTIVE {
            return;
        }
        let free: Vec<usize> = (0..SLOTS).filter(|&i| self.slots[i].is_none()).collect();
        let Some(&slot) = free.choose(&mut self.rng) else {
            return;
        };
        let kind = FRAUD_KINDS.choose(&mut self.rng).copied().unwrap_or(FRAUD_KINDS[0]);
        self.slots[slot] = Some(Fraud {
            kind,
            left: popup_duration(self.blocked),
        });
    }

    fn whack(&mut self, slot: usize)
    {
        if self.slots[slot].take().is_none() {
            self.streak = 0;
            return;
        }
        self.streak += 1;
        self.blocked += 1;
        self.score += SCORE_HIT * combo_multiplier(self.streak);
        self.flashes[slot] = Some((Flash::Hit, HIT_FLASH));
    }

    fn miss(&mut self, slot: usize)
    {
        self.slots[slot] = None;
        self.score += SCORE_MISS;
        self.lives -= 1;
        self.streak = 0;
        self.flashes[slot] = Some((Flash::Miss, MISS_FLASH));
    }

    fn over(&self) -> bool
    {
        self.lives <= 0
    }
}

impl Game for Whacker
{
    fn input(&mut self, key: Key)
    {
        if self.over() {
            return;
        }
        if let Key::Char(ch @ '1'..='9') = key {
            self.whack(ch as usize - '1' as usize);
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.over() {
            return;
        }
        for flash in &mut self.flashes {
            if let Some((_, left)) = flash {
                *left = left.saturating_sub(dt);
                if left.is_zero() {
                    *flash = None;
                }
            }
        }

        for slot in 0..SLOTS {
            let Some(fraud) = &mut self.slots[slot] else {
                continue;
            };
            fraud.left = fraud.left.saturating_sub(dt);
            if fraud.left.is_zero() {
                self.miss(slot);
                if self.over() {
                    self.slots = [None; SLOTS];
                    return;
                }
            }
        }

        self.until_spawn = self.until_spawn.saturating_sub(dt);
        if self.until_spawn.is_zero() {
            self.spawn();
            self.until_spawn = spawn_interval(self.blocked);
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let cell_w = 16;
        let cell_h = 3;
        let left = (canvas.width() as i32 - cell_w * GRID as i32) / 2;
        let top = ((canvas.height() as i32 - cell_h * GRID as i32) / 2).max(0);
        for slot in 0..SLOTS {
            let x = left + (slot % GRID) as i32 * cell_w;
            let y = top + (slot / GRID) as i32 * cell_h;
            let frame = match self.flashes[slot] {
                Some((Flash::Hit, _)) => Rgb::GREEN,
                Some((Flash::Miss, _)) => Rgb::RED,
                None => Rgb::GREY,
            };
            canvas.text(x, y, &format!("[{}]", slot + 1), Some(frame));
            if let Some(fraud) = &self.slots[slot] {
                canvas.text(x + 1, y + 1, fraud.kind, Some(Rgb::ORANGE));
            } else {
                canvas.text(x + 1, y + 1, "  ....", Some(Rgb::new(50, 50, 50)));
            }
        }
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Score: {}", self.score),
            format!("Lives: {}", self.lives.max(0)),
            format!("Combo: x{}", combo_multiplier(self.streak)),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "1-9 whack the matching terminal"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over() {
            return None;
        }
        Some(
            Outcome::new(Some(self.score), false)
                .line("Too many frauds got through.")
                .line(format!("Blocked {} fraud attempts.", self.blocked))
                .stat("blocked", self.blocked as i64),
        )
    }
}
