use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::analytics::GameEvent;
use crate::engine::{Game, Outcome};
use crate::geom::{distance, Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(1000.0, 600.0);
const PLAYER_X: f32 = 100.0;
const PLAYER_WIDTH: f32 = 50.0;
const PLAYER_HEIGHT: f32 = 30.0;
const PLAYER_SPEED: f32 = 8.0;
const FRICTION: f32 = 0.9;
const BULLET_SPEED: f32 = 15.0;
const MAX_INTEGRITY: i32 = 100;
const HIT_DAMAGE: i32 = 20;
const SHIELD_COST: f32 = 50.0;
const SHIELD_RECHARGE: f32 = 0.2;
const SHIELD_FRAMES: u32 = 180;
// scores are kept in cents so passive income stays exact
const PASSIVE_INCOME: i64 = 1050;
const SHIELD_KILL_BONUS: i64 = 50_00;
const TOAST_TIME: Duration = Duration::from_secs(2);

const PURPLE: Rgb = Rgb::new(176, 38, 255);
const NEON_GREEN: Rgb = Rgb::new(57, 255, 20);
const NEON_YELLOW: Rgb = Rgb::new(255, 240, 31);
const NEON_RED: Rgb = Rgb::new(255, 42, 42);

const PHRASES: [&str; 7] = [
    "Fraudster vaporized.",
    "Clean flow. Happy merchants.",
    "Uptime stable. Carry on!",
    "Chargeback denied!",
    "Liquidated damages.",
    "KYC Compliant!",
    "Payment Authorized.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind
{
    /// Chargeback: fast and slightly diagonal.
    Comet,
    /// Fraud: slow, sturdy, follows the player.
    Phantom,
    /// Bug: drifts on a sine wave.
    Drone,
}

struct Enemy
{
    kind: Kind,
    pos: Vec2,
    vel: Vec2,
    size: f32,
    hp: u32,
    value: i64,
}

impl Enemy
{
    fn new(kind: Kind, y: f32, comet_vel: Vec2) -> Self
    {
        let (vel, size, hp, dollars) = match kind {
            Kind::Comet => (comet_vel, 40.0, 1, 100),
            Kind::Phantom => (Vec2::new(-4.0, 0.0), 30.0, 3, 300),
            Kind::Drone => (Vec2::new(-3.0, 0.0), 25.0, 1, 50),
        };
        Self {
            kind,
            pos: Vec2::new(WORLD.width + 50.0, y),
            vel,
            size,
            hp,
            value: dollars * 100,
        }
    }

    fn rect(&self) -> Rect
    {
        Rect::new(self.pos.x, self.pos.y, self.size, self.size)
    }

    fn name(&self) -> &'static str
    {
        match self.kind {
            Kind::Comet => "Chargeback",
            Kind::Phantom => "Fraud",
            Kind::Drone => "Bug",
        }
    }
}

pub struct Hero
{
    rng: StdRng,
    player_y: f32,
    dy: f32,
    shield: f32,
    shield_frames: u32,
    integrity: i32,
    bullets: Vec<Vec2>,
    enemies: Vec<Enemy>,
    cents: i64,
    frames: u64,
    toast: Option<(&'static str, Duration)>,
    events: Vec<GameEvent>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Hero::new(seed))
}

/// Frames between enemy spawns for a score in dollars.
pub fn spawn_every(dollars: f64) -> u64
{
    let difficulty = 1.0 + dollars / 5000.0;
    (100.0 - difficulty * 5.0).max(20.0).floor() as u64
}

fn risk(enemies: usize) -> (&'static str, Rgb)
{
    match enemies {
        n if n > 10 => ("HIGH", NEON_RED),
        n if n > 5 => ("MEDIUM", NEON_YELLOW),
        _ => ("LOW", NEON_GREEN),
    }
}

fn dollars(cents: i64) -> String
{
    format!("${}.{:02}", cents / 100, cents % 100)
}

impl Hero
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            player_y: WORLD.height / 2.0,
            dy: 0.0,
            shield: 100.0,
            shield_frames: 0,
            integrity: MAX_INTEGRITY,
            bullets: Vec::new(),
            enemies: Vec::new(),
            cents: 0,
            frames: 0,
            toast: None,
            events: Vec::new(),
        }
    }

    fn player(&self) -> Rect
    {
        Rect::new(PLAYER_X, self.player_y, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    fn shielded(&self) -> bool
    {
        self.shield_frames > 0
    }

    fn over(&self) -> bool
    {
        self.integrity <= 0
    }

    fn toast(&mut self, text: &'static str)
    {
        self.toast = Some((text, TOAST_TIME));
    }

    fn activate_shield(&mut self)
    {
        if self.shield < SHIELD_COST || self.shielded() {
            return;
        }
        self.shield -= SHIELD_COST;
        self.shield_frames = SHIELD_FRAMES;
        self.toast("KYC Shield Activated!");
        self.events.push(GameEvent::PowerUp {
            game: "hero",
            power_up: "kyc_shield",
        });
    }

    fn step_player(&mut self, held: &HeldKeys)
    {
        if held.is_held(Key::Up) {
            self.dy = -PLAYER_SPEED;
        } else if held.is_held(Key::Down) {
            self.dy = PLAYER_SPEED;
        } else {
            self.dy *= FRICTION;
        }
        self.player_y = (self.player_y + self.dy).clamp(0.0, WORLD.height - PLAYER_HEIGHT);

        if self.shielded() {
            self.shield_frames -= 1;
        } else if self.shield < 100.0 {
            self.shield += SHIELD_RECHARGE;
        }
    }

    fn spawn(&mut self)
    {
        let every = spawn_every(self.cents as f64 / 100.0);
        if self.frames % every != 0 {
            return;
        }
        let roll: f64 = self.rng.r#gen();
        let kind = if roll > 0.9 {
            Kind::Phantom
        } else if roll > 0.7 {
            Kind::Comet
        } else {
            Kind::Drone
        };
        let y = self.rng.gen_range(0.0..WORLD.height - 50.0);
        let comet = Vec2::new(-6.0 - self.rng.gen_range(0.0..4.0), self.rng.gen_range(-1.0..1.0));
        self.enemies.push(Enemy::new(kind, y, comet));
    }

    fn step_enemies(&mut self)
    {
        let player_y = self.player_y;
        let sway = (self.frames as f32 * 0.05).sin() * 2.0;
        for enemy in &mut self.enemies {
            enemy.pos += enemy.vel;
            match enemy.kind {
                Kind::Phantom if player_y > enemy.pos.y => enemy.pos.y += 1.0,
                Kind::Phantom => enemy.pos.y -= 1.0,
                Kind::Drone => enemy.pos.y += sway,
                Kind::Comet => {}
            }
        }
        self.enemies.retain(|e| e.pos.x >= -100.0);
    }

    fn resolve_hits(&mut self)
    {
        let mut killed = 0;
        self.bullets.retain(|&bullet| {
            let target = self
                .enemies
                .iter_mut()
                .find(|e| e.hp > 0 && distance(bullet, e.pos) < e.size);
            match target {
                Some(enemy) => {
                    enemy.hp -= 1;
                    if enemy.hp == 0 {
                        killed += enemy.value;
                    }
                    false
                }
                None => true,
            }
        });
        let destroyed = self.enemies.iter().filter(|e| e.hp == 0).count();
        self.enemies.retain(|e| e.hp > 0);
        self.cents += killed;
        for _ in 0..destroyed {
            if self.rng.gen_bool(0.2) {
                if let Some(&phrase) = PHRASES.choose(&mut self.rng) {
                    self.toast(phrase);
                }
            }
        }

        let player = self.player();
        let mut i = 0;
        while i < self.enemies.len() {
            if !player.intersects(&self.enemies[i].rect()) {
                i += 1;
                continue;
            }
            let enemy = self.enemies.remove(i);
            if self.shielded() {
                self.cents += SHIELD_KILL_BONUS;
                self.toast("Blocked by KYC!");
            } else {
                self.integrity -= HIT_DAMAGE;
                log::debug!("merchant hero hit by {}", enemy.name());
                if self.over() {
                    return;
                }
            }
        }
    }
}

impl Game for Hero
{
    fn input(&mut self, key: Key)
    {
        if self.over() {
            return;
        }
        match key {
            Key::Space => self
                .bullets
                .push(Vec2::new(PLAYER_X + 40.0, self.player_y + 15.0)),
            Key::Char('x') | Key::Tab => self.activate_shield(),
            _ => {}
        }
    }

    fn update(&mut self, dt: Duration, held: &HeldKeys)
    {
        if self.over() {
            return;
        }
        if let Some((_, left)) = &mut self.toast {
            *left = left.saturating_sub(dt);
            if left.is_zero() {
                self.toast = None;
            }
        }
        self.frames += 1;
        if self.frames % 10 == 0 {
            self.cents += PASSIVE_INCOME;
        }
        self.step_player(held);
        for bullet in &mut self.bullets {
            bullet.x += BULLET_SPEED;
        }
        self.bullets.retain(|b| b.x <= WORLD.width);
        self.spawn();
        self.step_enemies();
        self.resolve_hits();
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        for enemy in &self.enemies {
            let (ch, color) = match enemy.kind {
                Kind::Comet => ('@', NEON_RED),
                Kind::Phantom => ('M', PURPLE),
                Kind::Drone => ('v', NEON_YELLOW),
            };
            canvas.fill_world(WORLD, enemy.rect(), ch, Some(color));
        }
        for bullet in &self.bullets {
            canvas.fill_world(WORLD, Rect::centered(*bullet, 8.0, 8.0), '-', Some(NEON_YELLOW));
        }
        let player = self.player();
        if self.shielded() {
            let bubble = Rect::centered(player.center(), 100.0, 100.0);
            canvas.fill_world(WORLD, bubble, '·', Some(PURPLE));
        }
        canvas.fill_world(WORLD, player, '>', Some(NEON_GREEN));
        if let Some((text, _)) = self.toast {
            canvas.text_world(WORLD, Vec2::new(WORLD.width / 2.0, 40.0), text, Some(Rgb::WHITE));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let (level, _) = risk(self.enemies.len());
        vec![
            dollars(self.cents),
            format!("Integrity: {}%", self.integrity.max(0)),
            format!("Shield: {:.0}%", self.shield.min(100.0)),
            format!("Risk: {level}"),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "Up/Down move  Space fire  x shield"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over() {
            return None;
        }
        Some(
            Outcome::new(Some(self.cents / 100), false)
                .line("System integrity lost.")
                .line(format!("Volume processed: {}", dollars(self.cents)))
                .stat("cents", self.cents),
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
    use crate::engine::testing::{hold_for, run_ticks};

    fn enemy_at(kind: Kind, pos: Vec2) -> Enemy
    {
        let mut enemy = Enemy::new(kind, pos.y, Vec2::new(-6.0, 0.0));
        enemy.pos = pos;
        enemy
    }

    #[test]
    fn spawn_rate_tightens_with_score()
    {
        assert_eq!(spawn_every(0.0), 95);
        assert_eq!(spawn_every(50_000.0), 45);
        assert_eq!(spawn_every(1_000_000.0), 20);
    }

    #[test]
    fn passive_income_every_ten_frames()
    {
        let mut game = Hero::new(1);
        run_ticks(&mut game, 20);
        assert!(game.cents >= 2100);
        assert_eq!(dollars(2100), "$21.00");
        assert_eq!(dollars(1050), "$10.50");
    }

    #[test]
    fn phantom_takes_three_bullets()
    {
        let mut game = Hero::new(2);
        game.enemies.push(enemy_at(Kind::Phantom, Vec2::new(600.0, 100.0)));
        for _ in 0..2 {
            game.bullets.push(Vec2::new(605.0, 105.0));
            game.resolve_hits();
        }
        assert_eq!(game.enemies.len(), 1);
        assert_eq!(game.enemies[0].hp, 1);
        game.bullets.push(Vec2::new(605.0, 105.0));
        game.resolve_hits();
        assert!(game.enemies.is_empty());
        assert!(game.bullets.is_empty());
        assert_eq!(game.cents, 300_00);
    }

    #[test]
    fn collisions_cost_integrity_unless_shielded()
    {
        let mut game = Hero::new(3);
        let on_player = Vec2::new(PLAYER_X + 10.0, game.player_y);
        game.enemies.push(enemy_at(Kind::Drone, on_player));
        game.resolve_hits();
        assert_eq!(game.integrity, 80);
        assert!(game.enemies.is_empty());

        game.activate_shield();
        assert_eq!(game.shield, 50.0);
        game.enemies.push(enemy_at(Kind::Comet, on_player));
        game.resolve_hits();
        assert_eq!(game.integrity, 80);
        assert_eq!(game.cents, SHIELD_KILL_BONUS);
        assert_eq!(game.take_events().len(), 1);
    }

    #[test]
    fn shield_needs_fifty_and_recharges_when_idle()
    {
        let mut game = Hero::new(4);
        game.activate_shield();
        game.activate_shield();
        assert_eq!(game.shield, 50.0);
        game.shield_frames = 1;
        run_ticks(&mut game, 1);
        assert!(!game.shielded());
        run_ticks(&mut game, 10);
        assert!(game.shield > 51.9);
    }

    #[test]
    fn fifth_hit_ends_the_run()
    {
        let mut game = Hero::new(5);
        game.integrity = 20;
        game.enemies.push(enemy_at(Kind::Drone, Vec2::new(PLAYER_X, game.player_y)));
        game.resolve_hits();
        assert!(game.outcome().is_some());
    }

    #[test]
    fn held_up_moves_and_friction_slows()
    {
        let mut game = Hero::new(6);
        hold_for(&mut game, Key::Up, 5);
        assert_eq!(game.player_y, 300.0 - 40.0);
        run_ticks(&mut game, 1);
        assert!((game.dy + 7.2).abs() < 1e-4);
    }

    #[test]
    fn risk_levels()
    {
        assert_eq!(risk(5).0, "LOW");
        assert_eq!(risk(6).0, "MEDIUM");
        assert_eq!(risk(11).0, "HIGH");
    }
}
