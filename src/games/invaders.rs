use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::analytics::GameEvent;
use crate::engine::{Game, Outcome};
use crate::geom::{Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(800.0, 600.0);
const PLAYER_WIDTH: f32 = 60.0;
const PLAYER_HEIGHT: f32 = 40.0;
const PLAYER_Y: f32 = 600.0 - 80.0;
const PLAYER_SPEED: f32 = 6.0;
const SHOT_COOLDOWN: u32 = 12;
const KYC_COOLDOWN: u32 = 30;
const KYC_COST: f32 = 25.0;
const SHIELD_COST: f32 = 30.0;
const SHIELD_FRAMES: u32 = 180;
const MAX_ENERGY: f32 = 100.0;
const SHIELD_REGEN: f32 = 0.05;
const KYC_REGEN: f32 = 0.1;
const START_LIVES: u32 = 3;
const MAX_LIVES: u32 = 5;
const INVULNERABLE_FRAMES: u32 = 120;
const COMBO_FRAMES: u32 = 120;
const COMBO_STEP: f64 = 0.1;
const COMBO_DECAY: f64 = 0.01;
const MAX_COMBO: f64 = 5.0;
const MARCH_DROP: f32 = 15.0;
const DROP_CHANCE: f64 = 0.1;
const BANNER_FRAMES: u32 = 180;

const NEON_PURPLE: Rgb = Rgb::new(168, 85, 247);
const LIME: Rgb = Rgb::new(132, 204, 22);

const SLOGANS: [&str; 10] = [
    "Encrypted with 256-bit AES!",
    "PCI DSS Level 1 Compliant!",
    "99.99% Uptime Guaranteed!",
    "Real-time Fraud Detection!",
    "Instant Payment Processing!",
    "200+ Countries Supported!",
    "2FA Enabled Successfully!",
    "KYC Verification Complete!",
    "Premium Security Active!",
    "Zero-tolerance Fraud Policy!",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind
{
    Chargeback,
    Fraudster,
    Bug,
    Boss,
}

struct Profile
{
    width: f32,
    height: f32,
    hp: u32,
    points: i64,
    fire_chance: f64,
    glyph: char,
    color: Rgb,
}

impl Kind
{
    fn profile(self) -> Profile
    {
        match self {
            Kind::Chargeback => Profile {
                width: 40.0,
                height: 35.0,
                hp: 1,
                points: 100,
                fire_chance: 0.002,
                glyph: '$',
                color: Rgb::new(239, 68, 68),
            },
            Kind::Fraudster => Profile {
                width: 45.0,
                height: 40.0,
                hp: 2,
                points: 250,
                fire_chance: 0.004,
                glyph: 'F',
                color: Rgb::new(249, 115, 22),
            },
            Kind::Bug => Profile {
                width: 35.0,
                height: 30.0,
                hp: 1,
                points: 150,
                fire_chance: 0.003,
                glyph: 'B',
                color: Rgb::new(234, 179, 8),
            },
            Kind::Boss => Profile {
                width: 100.0,
                height: 80.0,
                hp: 50,
                points: 5000,
                fire_chance: 0.02,
                glyph: '#',
                color: Rgb::new(124, 58, 237),
            },
        }
    }
}

struct Invader
{
    kind: Kind,
    rect: Rect,
    hp: u32,
}

impl Invader
{
    fn new(kind: Kind, x: f32, y: f32) -> Self
    {
        let profile = kind.profile();
        Self {
            kind,
            rect: Rect::new(x, y, profile.width, profile.height),
            hp: profile.hp,
        }
    }
}

struct Shot
{
    rect: Rect,
    vel: Vec2,
}

impl Shot
{
    fn step(&mut self)
    {
        self.rect.x += self.vel.x;
        self.rect.y += self.vel.y;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Boost
{
    /// +50 shield energy.
    Ssl,
    /// Resets the shot cooldown.
    Encryption,
    /// +1 combo.
    Compliance,
    /// +1 life.
    ExtraGateway,
}

const BOOSTS: [Boost; 4] = [Boost::Ssl, Boost::Encryption, Boost::Compliance, Boost::ExtraGateway];

impl Boost
{
    fn name(self) -> &'static str
    {
        match self {
            Boost::Ssl => "ssl_certificate",
            Boost::Encryption => "encryption_key",
            Boost::Compliance => "compliance_boost",
            Boost::ExtraGateway => "extra_gateway",
        }
    }

    fn label(self) -> &'static str
    {
        match self {
            Boost::Ssl => "SSL Certificate Acquired!",
            Boost::Encryption => "Encryption Key Acquired!",
            Boost::Compliance => "Compliance Boost Acquired!",
            Boost::ExtraGateway => "Extra Gateway Acquired!",
        }
    }

    fn color(self) -> Rgb
    {
        match self {
            Boost::Ssl => Rgb::GREEN,
            Boost::Encryption => Rgb::BLUE,
            Boost::Compliance => Rgb::YELLOW,
            Boost::ExtraGateway => Rgb::RED,
        }
    }
}

struct Falling
{
    rect: Rect,
    boost: Boost,
}

#[derive(Default)]
struct Tally
{
    chargebacks: i64,
    fraudsters: i64,
    bugs: i64,
    bosses: i64,
}

struct Achievement
{
    name: &'static str,
    check: fn(&Invaders) -> bool,
}

const ACHIEVEMENTS: [Achievement; 6] = [
    Achievement {
        name: "First Blood",
        check: |g| g.tally.chargebacks + g.tally.fraudsters + g.tally.bugs > 0,
    },
    Achievement {
        name: "Fraud Hunter",
        check: |g| g.tally.fraudsters >= 10,
    },
    Achievement {
        name: "Boss Slayer",
        check: |g| g.tally.bosses >= 1,
    },
    Achievement {
        name: "Combo Master",
        check: |g| g.combo >= MAX_COMBO,
    },
    Achievement {
        name: "Gateway Defender",
        check: |g| g.wave >= 10,
    },
    Achievement {
        name: "High Roller",
        check: |g| g.score >= 10_000,
    },
];

pub struct Invaders
{
    rng: StdRng,
    player_x: f32,
    shot_cooldown: u32,
    kyc_cooldown: u32,
    invulnerable: u32,
    shield_energy: f32,
    kyc_energy: f32,
    shield_frames: u32,
    lives: u32,
    score: i64,
    combo: f64,
    combo_timer: u32,
    wave: u32,
    march_dir: f32,
    march_speed: f32,
    invaders: Vec<Invader>,
    shots: Vec<Shot>,
    enemy_shots: Vec<Shot>,
    drops: Vec<Falling>,
    tally: Tally,
    unlocked: Vec<&'static str>,
    banner: Option<(String, u32)>,
    breached: bool,
    events: Vec<GameEvent>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Invaders::new(seed))
}

/// Grid size for a regular wave as (rows, cols).
fn grid_for(wave: u32) -> (u32, u32)
{
    ((3 + wave / 3).min(6), (6 + wave / 2).min(10))
}

fn march_speed(wave: u32) -> f32
{
    1.0 + wave as f32 * 0.1
}

impl Invaders
{
    fn new(seed: u64) -> Self
    {
        let mut game = Self {
            rng: StdRng::seed_from_u64(seed),
            player_x: WORLD.width / 2.0 - PLAYER_WIDTH / 2.0,
            shot_cooldown: 0,
            kyc_cooldown: 0,
            invulnerable: 0,
            shield_energy: MAX_ENERGY,
            kyc_energy: MAX_ENERGY,
            shield_frames: 0,
            lives: START_LIVES,
            score: 0,
            combo: 1.0,
            combo_timer: 0,
            wave: 1,
            march_dir: 1.0,
            march_speed: march_speed(1),
            invaders: Vec::new(),
            shots: Vec::new(),
            enemy_shots: Vec::new(),
            drops: Vec::new(),
            tally: Tally::default(),
            unlocked: Vec::new(),
            banner: None,
            breached: false,
            events: Vec::new(),
        };
        game.spawn_wave();
        game
    }

    fn player(&self) -> Rect
    {
        Rect::new(self.player_x, PLAYER_Y, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    fn over(&self) -> bool
    {
        self.lives == 0 || self.breached
    }

    fn announce(&mut self, text: impl Into<String>)
    {
        self.banner = Some((text.into(), BANNER_FRAMES));
    }

    fn spawn_wave(&mut self)
    {
        self.invaders.clear();
        if self.wave % 5 == 0 {
            self.announce("MEGA BREACH DETECTED!");
            self.invaders
                .push(Invader::new(Kind::Boss, WORLD.width / 2.0 - 50.0, 50.0));
            let minions = (self.wave / 5).min(4);
            for i in 0..minions {
                self.invaders
                    .push(Invader::new(Kind::Fraudster, 100.0 + i as f32 * 150.0, 150.0));
            }
            return;
        }

        let (rows, cols) = grid_for(self.wave);
        for row in 0..rows {
            for col in 0..cols {
                let kind = match row {
                    0 => Kind::Fraudster,
                    1 if self.rng.gen_bool(0.5) => Kind::Bug,
                    _ => Kind::Chargeback,
                };
                let x = 80.0 + col as f32 * 65.0;
                let y = 50.0 + row as f32 * 50.0;
                self.invaders.push(Invader::new(kind, x, y));
            }
        }
        if let Some(slogan) = SLOGANS.choose(&mut self.rng) {
            self.announce(*slogan);
        }
    }

    fn shoot(&mut self)
    {
        if self.shot_cooldown > 0 {
            return;
        }
        self.shot_cooldown = SHOT_COOLDOWN;
        let x = self.player_x + PLAYER_WIDTH / 2.0 - 3.0;
        self.shots.push(Shot {
            rect: Rect::new(x, PLAYER_Y, 6.0, 20.0),
            vel: Vec2::new(0.0, -12.0),
        });
    }

    /// Five-beam spread from -30° to 30°.
    fn kyc_burst(&mut self)
    {
        if self.kyc_cooldown > 0 || self.kyc_energy < KYC_COST {
            return;
        }
        self.kyc_cooldown = KYC_COOLDOWN;
        self.kyc_energy -= KYC_COST;
        let x = self.player_x + PLAYER_WIDTH / 2.0 - 3.0;
        for step in -2..=2 {
            let rad = (step as f32 * 15.0).to_radians();
            self.shots.push(Shot {
                rect: Rect::new(x, PLAYER_Y, 8.0, 15.0),
                vel: Vec2::new(rad.sin() * 8.0, rad.cos() * -10.0),
            });
        }
    }

    fn raise_shield(&mut self)
    {
        if self.shield_energy < SHIELD_COST || self.shield_frames > 0 {
            return;
        }
        self.shield_energy -= SHIELD_COST;
        self.shield_frames = SHIELD_FRAMES;
    }

    fn step_player(&mut self, held: &HeldKeys)
    {
        self.player_x += held.axis(Key::Left, Key::Right) * PLAYER_SPEED;
        self.player_x = self.player_x.clamp(0.0, WORLD.width - PLAYER_WIDTH);
        self.shot_cooldown = self.shot_cooldown.saturating_sub(1);
        self.kyc_cooldown = self.kyc_cooldown.saturating_sub(1);
        self.invulnerable = self.invulnerable.saturating_sub(1);
        if held.is_held(Key::Space) {
            self.shoot();
        }

        self.shield_frames = self.shield_frames.saturating_sub(1);
        self.shield_energy = (self.shield_energy + SHIELD_REGEN).min(MAX_ENERGY);
        self.kyc_energy = (self.kyc_energy + KYC_REGEN).min(MAX_ENERGY);

        if self.combo_timer > 0 {
            self.combo_timer -= 1;
        } else {
            self.combo = (self.combo - COMBO_DECAY).max(1.0);
        }
    }

    fn step_invaders(&mut self)
    {
        let mut reverse = false;
        for idx in 0..self.invaders.len() {
            let invader = &mut self.invaders[idx];
            invader.rect.x += self.march_dir * self.march_speed;
            if invader.rect.x <= 0.0 || invader.rect.right() >= WORLD.width {
                reverse = true;
            }
            let kind = invader.kind;
            let rect = invader.rect;
            if self.rng.gen_bool(kind.profile().fire_chance) {
                self.return_fire(kind, rect);
            }
        }
        if reverse {
            self.march_dir = -self.march_dir;
            for invader in &mut self.invaders {
                invader.rect.y += MARCH_DROP;
            }
        }
    }

    fn return_fire(&mut self, kind: Kind, from: Rect)
    {
        let x = from.x + from.w / 2.0 - 4.0;
        if kind == Kind::Boss {
            for i in -2..=2 {
                let offset = i as f32;
                self.enemy_shots.push(Shot {
                    rect: Rect::new(x + offset * 20.0, from.bottom(), 8.0, 8.0),
                    vel: Vec2::new(offset * 0.5, 4.0),
                });
            }
        } else {
            self.enemy_shots.push(Shot {
                rect: Rect::new(x, from.bottom(), 8.0, 8.0),
                vel: Vec2::new(0.0, 5.0),
            });
        }
    }

    fn step_projectiles(&mut self)
    {
        for shot in self.shots.iter_mut().chain(self.enemy_shots.iter_mut()) {
            shot.step();
        }
        self.shots.retain(|s| {
            s.rect.y > -50.0
                && s.rect.y < WORLD.height + 50.0
                && s.rect.x > -50.0
                && s.rect.x < WORLD.width + 50.0
        });
        self.enemy_shots.retain(|s| s.rect.y < WORLD.height + 50.0);
        for drop in &mut self.drops {
            drop.rect.y += 2.0;
        }
        self.drops.retain(|d| d.rect.y < WORLD.height + 50.0);
    }

    fn destroy(&mut self, idx: usize)
    {
        let invader = self.invaders.remove(idx);
        let profile = invader.kind.profile();
        self.score += (profile.points as f64 * self.combo).floor() as i64;
        self.combo_timer = COMBO_FRAMES;
        self.combo = (self.combo + COMBO_STEP).min(MAX_COMBO);
        match invader.kind {
            Kind::Chargeback => self.tally.chargebacks += 1,
            Kind::Fraudster => self.tally.fraudsters += 1,
            Kind::Bug => self.tally.bugs += 1,
            Kind::Boss => self.tally.bosses += 1,
        }
        if invader.kind == Kind::Boss || self.rng.gen_bool(DROP_CHANCE) {
            if let Some(&boost) = BOOSTS.choose(&mut self.rng) {
                self.drops.push(Falling {
                    rect: Rect::new(invader.rect.x, invader.rect.y, 30.0, 30.0),
                    boost,
                });
            }
        }
    }

    fn player_hit(&mut self)
    {
        self.lives = self.lives.saturating_sub(1);
        self.invulnerable = INVULNERABLE_FRAMES;
        self.combo = 1.0;
    }

    fn apply(&mut self, boost: Boost)
    {
        match boost {
            Boost::Ssl => self.shield_energy = (self.shield_energy + 50.0).min(MAX_ENERGY),
            Boost::Encryption => self.shot_cooldown = 0,
            Boost::Compliance => self.combo = (self.combo + 1.0).min(MAX_COMBO),
            Boost::ExtraGateway => self.lives = (self.lives + 1).min(MAX_LIVES),
        }
        self.announce(boost.label());
        self.events.push(GameEvent::PowerUp {
            game: "invaders",
            power_up: boost.name(),
        });
    }

    fn resolve_hits(&mut self)
    {
        let mut i = self.shots.len();
        while i > 0 {
            i -= 1;
            let shot = self.shots[i].rect;
            let Some(j) = self.invaders.iter().rposition(|inv| inv.rect.intersects(&shot)) else {
                continue;
            };
            self.shots.remove(i);
            let invader = &mut self.invaders[j];
            invader.hp = invader.hp.saturating_sub(1);
            if invader.hp == 0 {
                self.destroy(j);
            }
        }

        let player = self.player();
        if self.invulnerable == 0 {
            let mut i = self.enemy_shots.len();
            while i > 0 {
                i -= 1;
                if self.enemy_shots[i].rect.intersects(&player) {
                    self.enemy_shots.remove(i);
                    if self.shield_frames == 0 {
                        self.player_hit();
                    }
                }
            }
        }

        if self.invaders.iter().any(|inv| inv.rect.bottom() >= PLAYER_Y) {
            self.breached = true;
        }

        let mut i = self.drops.len();
        while i > 0 {
            i -= 1;
            if self.drops[i].rect.intersects(&player) {
                let drop = self.drops.remove(i);
                self.apply(drop.boost);
            }
        }
    }

    fn check_achievements(&mut self)
    {
        for achievement in &ACHIEVEMENTS {
            if !self.unlocked.contains(&achievement.name) && (achievement.check)(self) {
                self.unlocked.push(achievement.name);
                self.banner = Some((format!("Achievement: {}", achievement.name), BANNER_FRAMES));
            }
        }
    }
}

impl Game for Invaders
{
    fn input(&mut self, key: Key)
    {
        if self.over() {
            return;
        }
        match key {
            Key::Char('z') => self.kyc_burst(),
            Key::Char('x') => self.raise_shield(),
            _ => {}
        }
    }

    fn update(&mut self, _dt: Duration, held: &HeldKeys)
    {
        if self.over() {
            return;
        }
        self.step_player(held);
        if let Some((_, frames)) = &mut self.banner {
            *frames = frames.saturating_sub(1);
            if *frames == 0 {
                self.banner = None;
            }
        }
        self.step_projectiles();
        self.step_invaders();
        self.resolve_hits();

        if self.invaders.is_empty() {
            self.events.push(GameEvent::WaveComplete {
                game: "invaders",
                wave: self.wave,
            });
            self.wave += 1;
            self.march_speed = march_speed(self.wave);
            log::debug!("invaders wave {} incoming", self.wave);
            self.spawn_wave();
        }
        self.check_achievements();
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        for invader in &self.invaders {
            let profile = invader.kind.profile();
            canvas.fill_world(WORLD, invader.rect, profile.glyph, Some(profile.color));
            if invader.kind == Kind::Boss {
                let bar = Vec2::new(invader.rect.center().x, invader.rect.y - 10.0);
                canvas.text_world(WORLD, bar, &format!("{}/{}", invader.hp, profile.hp), Some(Rgb::WHITE));
            }
        }
        for shot in &self.shots {
            canvas.fill_world(WORLD, shot.rect, '|', Some(LIME));
        }
        for shot in &self.enemy_shots {
            canvas.fill_world(WORLD, shot.rect, 'o', Some(Rgb::RED));
        }
        for drop in &self.drops {
            canvas.fill_world(WORLD, drop.rect, '+', Some(drop.boost.color()));
        }

        let blink = self.invulnerable > 0 && (self.invulnerable / 5) % 2 == 0;
        if !blink {
            let color = if self.shield_frames > 0 { Rgb::GREEN } else { NEON_PURPLE };
            canvas.fill_world(WORLD, self.player(), 'A', Some(color));
        }
        if let Some((text, _)) = &self.banner {
            canvas.text_world(WORLD, Vec2::new(WORLD.width / 2.0, WORLD.height / 2.0), text, Some(Rgb::YELLOW));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Score: {}", self.score),
            format!("Wave: {}", self.wave),
            format!("Combo: x{:.1}", self.combo),
            format!("Lives: {}", self.lives),
            format!("Shield: {:.0}%", self.shield_energy),
            format!("KYC: {:.0}%", self.kyc_energy),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "arrows move  Space fire  z KYC spread  x shield"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over() {
            return None;
        }
        let headline = if self.breached {
            "The invaders breached the gateway!"
        } else {
            "All gateways are down!"
        };
        let mut outcome = Outcome::new(Some(self.score), false)
            .line(headline)
            .line(format!("Reached wave {}.", self.wave))
            .stat("wave", self.wave as i64)
            .stat("chargebacks", self.tally.chargebacks)
            .stat("fraudsters", self.tally.fraudsters)
            .stat("bugs", self.tally.bugs)
            .stat("bosses", self.tally.bosses);
        if !self.unlocked.is_empty() {
            outcome = outcome.line(format!("Achievements: {}", self.unlocked.join(", ")));
        }
        Some(outcome)
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

    fn quiet(seed: u64) -> Invaders
    {
        let mut game = Invaders::new(seed);
        game.invaders.clear();
        game
    }

    fn lone(game: &mut Invaders, kind: Kind, x: f32, y: f32)
    {
        game.invaders.push(Invader::new(kind, x, y));
    }

    fn shot_at(game: &mut Invaders, x: f32, y: f32)
    {
        game.shots.push(Shot {
            rect: Rect::new(x, y, 6.0, 20.0),
            vel: Vec2::default(),
        });
    }

    #[test]
    fn regular_waves_grow_to_a_cap()
    {
        assert_eq!(grid_for(1), (3, 6));
        assert_eq!(grid_for(4), (4, 8));
        assert_eq!(grid_for(30), (6, 10));

        let game = Invaders::new(1);
        assert_eq!(game.invaders.len(), 18);
        assert!(game.invaders[..6].iter().all(|i| i.kind == Kind::Fraudster));
        assert!(game.invaders[12..].iter().all(|i| i.kind == Kind::Chargeback));
    }

    #[test]
    fn every_fifth_wave_is_a_boss()
    {
        let mut game = quiet(2);
        game.wave = 5;
        game.spawn_wave();
        assert_eq!(game.invaders.len(), 2);
        assert_eq!(game.invaders[0].kind, Kind::Boss);
        assert_eq!(game.invaders[0].hp, 50);

        game.wave = 25;
        game.spawn_wave();
        assert_eq!(game.invaders.len(), 5);
    }

    #[test]
    fn kills_score_with_combo()
    {
        let mut game = quiet(3);
        lone(&mut game, Kind::Chargeback, 100.0, 100.0);
        lone(&mut game, Kind::Fraudster, 300.0, 100.0);
        shot_at(&mut game, 110.0, 110.0);
        game.resolve_hits();
        assert_eq!(game.score, 100);
        assert_eq!(game.combo_timer, COMBO_FRAMES);
        assert!((game.combo - 1.1).abs() < 1e-9);

        shot_at(&mut game, 310.0, 110.0);
        game.resolve_hits();
        assert_eq!(game.invaders[0].hp, 1);
        shot_at(&mut game, 310.0, 110.0);
        game.resolve_hits();
        assert!(game.invaders.is_empty());
        assert_eq!(game.score, 100 + 275);
        assert_eq!(game.tally.fraudsters, 1);
    }

    #[test]
    fn combo_decays_once_the_timer_runs_out()
    {
        let mut game = quiet(4);
        lone(&mut game, Kind::Chargeback, 370.0, 100.0);
        game.combo = 2.0;
        game.combo_timer = 1;
        run_ticks(&mut game, 1);
        assert_eq!(game.combo, 2.0);
        run_ticks(&mut game, 1);
        assert!((game.combo - 1.99).abs() < 1e-9);
    }

    #[test]
    fn kyc_spread_costs_energy_and_cools_down()
    {
        let mut game = quiet(5);
        game.input(Key::Char('z'));
        assert_eq!(game.shots.len(), 5);
        assert_eq!(game.kyc_energy, 75.0);
        game.input(Key::Char('z'));
        assert_eq!(game.shots.len(), 5);
        assert!(game.shots[0].vel.x < 0.0 && game.shots[4].vel.x > 0.0);
    }

    #[test]
    fn held_space_fires_on_cooldown()
    {
        let mut game = quiet(6);
        lone(&mut game, Kind::Chargeback, 370.0, 50.0);
        hold_for(&mut game, Key::Space, 13);
        assert_eq!(game.shots.len(), 2);
    }

    #[test]
    fn shield_absorbs_enemy_fire()
    {
        let mut game = quiet(7);
        game.input(Key::Char('x'));
        assert_eq!(game.shield_energy, 70.0);
        assert_eq!(game.shield_frames, SHIELD_FRAMES);
        let player = game.player();
        game.enemy_shots.push(Shot {
            rect: Rect::new(player.x + 10.0, player.y + 10.0, 8.0, 8.0),
            vel: Vec2::default(),
        });
        game.resolve_hits();
        assert!(game.enemy_shots.is_empty());
        assert_eq!(game.lives, START_LIVES);
    }

    #[test]
    fn hits_cost_a_life_and_reset_combo()
    {
        let mut game = quiet(8);
        game.combo = 3.0;
        let player = game.player();
        game.enemy_shots.push(Shot {
            rect: Rect::new(player.x + 10.0, player.y + 10.0, 8.0, 8.0),
            vel: Vec2::default(),
        });
        game.resolve_hits();
        assert_eq!(game.lives, 2);
        assert_eq!(game.invulnerable, INVULNERABLE_FRAMES);
        assert_eq!(game.combo, 1.0);

        game.player_hit();
        game.player_hit();
        assert!(game.outcome().is_some());
    }

    #[test]
    fn reaching_the_player_row_ends_the_game()
    {
        let mut game = quiet(9);
        lone(&mut game, Kind::Chargeback, 370.0, PLAYER_Y - 30.0);
        run_ticks(&mut game, 1);
        let outcome = game.outcome().unwrap();
        assert!(!outcome.won);
        assert!(outcome.lines[0].contains("breached"));
    }

    #[test]
    fn clearing_a_wave_starts_the_next()
    {
        let mut game = quiet(10);
        run_ticks(&mut game, 1);
        assert_eq!(game.wave, 2);
        assert_eq!(game.invaders.len(), 21);
        assert_eq!(game.march_speed, march_speed(2));
        let events = game.take_events();
        assert!(events.contains(&GameEvent::WaveComplete { game: "invaders", wave: 1 }));
    }

    #[test]
    fn boosts_apply_with_caps()
    {
        let mut game = quiet(11);
        game.lives = MAX_LIVES;
        game.apply(Boost::ExtraGateway);
        assert_eq!(game.lives, MAX_LIVES);
        game.shield_energy = 80.0;
        game.apply(Boost::Ssl);
        assert_eq!(game.shield_energy, MAX_ENERGY);
        game.combo = 4.5;
        game.apply(Boost::Compliance);
        assert_eq!(game.combo, MAX_COMBO);
        assert_eq!(game.take_events().len(), 3);
    }

    #[test]
    fn achievements_unlock_once()
    {
        let mut game = quiet(12);
        game.tally.bugs = 1;
        game.check_achievements();
        game.check_achievements();
        assert_eq!(game.unlocked, vec!["First Blood"]);
        game.score = 10_000;
        game.check_achievements();
        assert_eq!(game.unlocked, vec!["First Blood", "High Roller"]);
    }
}
