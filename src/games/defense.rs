use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analytics::GameEvent;
use crate::engine::{Game, Outcome};
use crate::geom::{distance, Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(800.0, 600.0);
const CORE: Vec2 = Vec2::new(400.0, 300.0);
const CORE_RADIUS: f32 = 40.0;
const MAX_HEALTH: i32 = 100;
const CORE_DAMAGE: i32 = 10;
const HIT_SLACK: f32 = 20.0;
const RETICLE_SPEED: f32 = 8.0;
const WAVE_FRAMES: u64 = 600;
const FIREWALL_RANGE: f32 = 300.0;
const PROJECTILE_SPEED: f32 = 10.0;
const MAX_UPGRADE: u32 = 5;
const HEAL_COST: u32 = 300;
const HEAL_AMOUNT: i32 = 20;

const LIME: Rgb = Rgb::new(204, 255, 0);
const BOT_RED: Rgb = Rgb::new(255, 51, 51);

#[derive(Clone, Copy, Debug)]
struct Upgrade
{
    level: u32,
    cost: u32,
}

impl Upgrade
{
    const fn new(cost: u32) -> Self
    {
        Self { level: 0, cost }
    }

    fn label(&self) -> String
    {
        if self.level >= MAX_UPGRADE {
            "MAX".to_string()
        } else {
            format!("{} pts", self.cost)
        }
    }
}

struct Bot
{
    id: u64,
    tag: u32,
    pos: Vec2,
    radius: f32,
    speed: f32,
}

struct Projectile
{
    pos: Vec2,
    target: u64,
}

pub struct Defense
{
    rng: StdRng,
    reticle: Vec2,
    bots: Vec<Bot>,
    projectiles: Vec<Projectile>,
    next_id: u64,
    score: i64,
    credits: u32,
    health: i32,
    wave: u32,
    spawn_rate: u64,
    frames: u64,
    firewall: Upgrade,
    limiter: Upgrade,
    events: Vec<GameEvent>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Defense::new(seed))
}

/// Bot speed for a wave, slowed by the rate limiter level.
pub fn bot_speed(wave: u32, limiter: u32) -> f32
{
    let base = 1.0 + wave as f32 * 0.2;
    (base * (1.0 - limiter as f32 * 0.15)).max(0.5)
}

impl Defense
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            reticle: CORE,
            bots: Vec::new(),
            projectiles: Vec::new(),
            next_id: 0,
            score: 0,
            credits: 0,
            health: MAX_HEALTH,
            wave: 1,
            spawn_rate: 60,
            frames: 0,
            firewall: Upgrade::new(500),
            limiter: Upgrade::new(800),
            events: Vec::new(),
        }
    }

    fn over(&self) -> bool
    {
        self.health <= 0
    }

    fn spawn(&mut self)
    {
        let pos = if self.rng.gen_bool(0.5) {
            let x = if self.rng.gen_bool(0.5) { -20.0 } else { WORLD.width + 20.0 };
            Vec2::new(x, self.rng.gen_range(0.0..WORLD.height))
        } else {
            let y = if self.rng.gen_bool(0.5) { -20.0 } else { WORLD.height + 20.0 };
            Vec2::new(self.rng.gen_range(0.0..WORLD.width), y)
        };
        self.next_id += 1;
        self.bots.push(Bot {
            id: self.next_id,
            tag: self.rng.gen_range(0..9999),
            pos,
            radius: self.rng.gen_range(10.0..15.0),
            speed: bot_speed(self.wave, self.limiter.level),
        });
    }

    fn kill(&mut self, idx: usize)
    {
        self.bots.remove(idx);
        self.score += 1;
        self.credits += 10;
    }

    /// Fires at the reticle, taking down every bot near it.
    fn fire(&mut self)
    {
        let mut i = self.bots.len();
        while i > 0 {
            i -= 1;
            let bot = &self.bots[i];
            if distance(bot.pos, self.reticle) < bot.radius + HIT_SLACK {
                self.kill(i);
            }
        }
    }

    fn buy(&mut self, key: char)
    {
        let bought = match key {
            '1' => purchase(&mut self.firewall, &mut self.credits),
            '2' => purchase(&mut self.limiter, &mut self.credits),
            '3' if self.credits >= HEAL_COST && self.health < MAX_HEALTH => {
                self.credits -= HEAL_COST;
                self.health = (self.health + HEAL_AMOUNT).min(MAX_HEALTH);
                true
            }
            _ => false,
        };
        if bought {
            let power_up = match key {
                '1' => "firewall",
                '2' => "rate_limiter",
                _ => "heal",
            };
            self.events.push(GameEvent::PowerUp {
                game: "defense",
                power_up,
            });
        }
    }

    fn step_bots(&mut self)
    {
        let mut i = self.bots.len();
        while i > 0 {
            i -= 1;
            let bot = &mut self.bots[i];
            let heading = (CORE - bot.pos).normalized();
            bot.pos += heading * bot.speed;
            if distance(bot.pos, CORE) < CORE_RADIUS {
                self.bots.remove(i);
                self.health -= CORE_DAMAGE;
                if self.over() {
                    return;
                }
            }
        }
    }

    fn step_firewall(&mut self)
    {
        let level = self.firewall.level;
        if level > 0 && self.frames % (60 - level as u64 * 10) == 0 {
            let closest = self
                .bots
                .iter()
                .map(|b| (b.id, distance(b.pos, CORE)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((target, dist)) = closest {
                if dist < FIREWALL_RANGE {
                    self.projectiles.push(Projectile { pos: CORE, target });
                }
            }
        }

        let mut i = self.projectiles.len();
        while i > 0 {
            i -= 1;
            let target = self.projectiles[i].target;
            let Some(idx) = self.bots.iter().position(|b| b.id == target) else {
                self.projectiles.remove(i);
                continue;
            };
            let aim = self.bots[idx].pos;
            let shot = &mut self.projectiles[i];
            shot.pos += (aim - shot.pos).normalized() * PROJECTILE_SPEED;
            if distance(aim, shot.pos) < 20.0 {
                self.projectiles.remove(i);
                self.kill(idx);
            }
        }
    }
}

fn purchase(upgrade: &mut Upgrade, credits: &mut u32) -> bool
{
    if *credits < upgrade.cost || upgrade.level >= MAX_UPGRADE {
        return false;
    }
    *credits -= upgrade.cost;
    upgrade.level += 1;
    upgrade.cost = upgrade.cost * 3 / 2;
    true
}

impl Game for Defense
{
    fn input(&mut self, key: Key)
    {
        if self.over() {
            return;
        }
        match key {
            Key::Space | Key::Enter => self.fire(),
            Key::Char(ch @ '1'..='3') => self.buy(ch),
            _ => {}
        }
    }

    fn update(&mut self, _dt: Duration, held: &HeldKeys)
    {
        if self.over() {
            return;
        }
        let aim = Vec2::new(held.axis(Key::Left, Key::Right), held.axis(Key::Up, Key::Down));
        self.reticle += aim * RETICLE_SPEED;
        self.reticle.x = self.reticle.x.clamp(0.0, WORLD.width);
        self.reticle.y = self.reticle.y.clamp(0.0, WORLD.height);

        self.frames += 1;
        if self.frames % WAVE_FRAMES == 0 {
            self.events.push(GameEvent::WaveComplete {
                game: "defense",
                wave: self.wave,
            });
            self.wave += 1;
            self.spawn_rate = 60u64.saturating_sub(self.wave as u64 * 2).max(10);
        }
        if self.frames % self.spawn_rate == 0 {
            self.spawn();
        }
        self.step_bots();
        if self.over() {
            log::debug!("gateway fell on wave {}", self.wave);
            return;
        }
        self.step_firewall();
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        if self.firewall.level > 0 {
            for step in 0..24 {
                let angle = step as f32 / 24.0 * std::f32::consts::TAU;
                let point = CORE + Vec2::from_angle_up(angle, 150.0);
                canvas.fill_world(WORLD, Rect::centered(point, 4.0, 4.0), '.', Some(LIME));
            }
        }
        let core_color = if self.health > 30 { LIME } else { Rgb::RED };
        canvas.fill_world(WORLD, Rect::centered(CORE, CORE_RADIUS * 2.0, CORE_RADIUS * 2.0), '█', Some(core_color));
        canvas.text_world(WORLD, CORE, "DODO", Some(Rgb::new(10, 10, 10)));

        for bot in &self.bots {
            let body = Rect::centered(bot.pos, bot.radius * 2.0, bot.radius * 2.0);
            canvas.fill_world(WORLD, body, 'o', Some(BOT_RED));
            let label = bot.pos + Vec2::new(0.0, -bot.radius - 12.0);
            canvas.text_world(WORLD, label, &format!("bot_{}", bot.tag), Some(Rgb::GREY));
        }
        for shot in &self.projectiles {
            canvas.fill_world(WORLD, Rect::centered(shot.pos, 6.0, 6.0), '*', Some(LIME));
        }
        canvas.text_world(WORLD, self.reticle, "+", Some(Rgb::WHITE));
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Credits: {}", self.credits),
            format!("Health: {}%", self.health.max(0)),
            format!("Wave: {}", self.wave),
            format!("[1] Firewall {}", self.firewall.label()),
            format!("[2] Limiter {}", self.limiter.label()),
            format!("[3] Heal {HEAL_COST} pts"),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "arrows aim  Space fire  1-3 shop"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over() {
            return None;
        }
        Some(
            Outcome::new(Some(self.score), false)
                .line("Gateway overloaded!")
                .line(format!("Blocked {} bot requests before the crash.", self.score))
                .stat("wave", self.wave as i64),
        )
    }

    fn take_events(&mut self) -> Vec<GameEvent>
    {
        std::mem::take(&mut self.events)
    }
}
