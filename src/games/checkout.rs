use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analytics::GameEvent;
use crate::engine::{Game, Outcome};
use crate::geom::{Rect, Vec2};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb, World};

const WORLD: World = World::new(800.0, 600.0);
const DESK_HEIGHT: f32 = 150.0;
const ROUND_TIME: Duration = Duration::from_secs(60);
const MISMATCH_PENALTY: Duration = Duration::from_secs(3);
const TIMEOUT_PENALTY: Duration = Duration::from_secs(5);
const SETTLEMENT_TIME: Duration = Duration::from_secs(5);
const BASE_SPEED: f32 = 3.0;
const SPAWN_RATE: u32 = 100;
const MIN_SPAWN_RATE: u32 = 30;
const CUSTOMER_SIZE: f32 = 50.0;
const BASE_VALUE: f64 = 15.0;
const FLOATER_TIME: Duration = Duration::from_millis(800);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method
{
    Card,
    Crypto,
    Qr,
}

impl Method
{
    const ALL: [Method; 3] = [Method::Card, Method::Crypto, Method::Qr];

    fn label(self) -> &'static str
    {
        match self {
            Method::Card => "CARD",
            Method::Crypto => "CRYPTO",
            Method::Qr => "QR",
        }
    }

    fn color(self) -> Rgb
    {
        match self {
            Method::Card => Rgb::new(37, 99, 235),
            Method::Crypto => Rgb::new(249, 115, 22),
            Method::Qr => Rgb::new(147, 51, 234),
        }
    }
}

struct Customer
{
    method: Method,
    pos: Vec2,
    speed: f32,
    wobble: f32,
}

struct Floater
{
    text: String,
    pos: Vec2,
    color: Rgb,
    left: Duration,
}

pub struct Checkout
{
    rng: StdRng,
    customers: Vec<Customer>,
    floaters: Vec<Floater>,
    score: i64,
    served: u32,
    streak: u32,
    max_streak: u32,
    time_left: Duration,
    spawn_timer: u32,
    spawn_rate: u32,
    base_speed: f32,
    settlement: Option<Duration>,
    over: bool,
    events: Vec<GameEvent>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Checkout::new(seed))
}

/// Points for a served customer given the streak before serving.
pub fn serve_points(streak: u32) -> i64
{
    (BASE_VALUE * (1.0 + streak as f64 * 0.1)).round() as i64
}

impl Checkout
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            customers: Vec::new(),
            floaters: Vec::new(),
            score: 0,
            served: 0,
            streak: 0,
            max_streak: 0,
            time_left: ROUND_TIME,
            spawn_timer: 0,
            spawn_rate: SPAWN_RATE,
            base_speed: BASE_SPEED,
            settlement: None,
            over: false,
            events: Vec::new(),
        }
    }

    fn spawn(&mut self)
    {
        let method = Method::ALL[self.rng.gen_range(0..Method::ALL.len())];
        self.customers.push(Customer {
            method,
            pos: Vec2::new(self.rng.gen_range(50.0..WORLD.width - 50.0), -60.0),
            speed: self.base_speed + self.rng.gen_range(0.0..0.5),
            wobble: self.rng.gen_range(0.0..std::f32::consts::TAU),
        });
    }

    /// Index of the customer closest to the desk.
    fn front(&self) -> Option<usize>
    {
        self.customers
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.pos.y.total_cmp(&b.1.pos.y))
            .map(|(i, _)| i)
    }

    fn float(&mut self, text: impl Into<String>, pos: Vec2, color: Rgb)
    {
        self.floaters.push(Floater {
            text: text.into(),
            pos,
            color,
            left: FLOATER_TIME,
        });
    }

    fn serve(&mut self, method: Method)
    {
        if self.over {
            return;
        }
        let Some(idx) = self.front() else {
            return;
        };
        if self.customers[idx].method != method {
            self.streak = 0;
            self.time_left = self.time_left.saturating_sub(MISMATCH_PENALTY);
            let pos = self.customers[idx].pos;
            self.float("CHARGEBACK!", pos, Rgb::RED);
            return;
        }

        let customer = self.customers.remove(idx);
        let points = serve_points(self.streak);
        self.score += points;
        self.served += 1;
        self.streak += 1;
        self.max_streak = self.max_streak.max(self.streak);
        self.float(format!("+${points}"), customer.pos, Rgb::GREEN);

        if self.streak % 10 == 0 {
            self.settlement = Some(SETTLEMENT_TIME);
            self.float("INSTANT SETTLEMENT!", Vec2::new(WORLD.width / 2.0, WORLD.height / 2.0), Rgb::YELLOW);
            self.events.push(GameEvent::PowerUp {
                game: "checkout",
                power_up: "instant_settlement",
            });
        }
        if self.served % 5 == 0 {
            self.base_speed += 0.2;
            self.spawn_rate = self.spawn_rate.saturating_sub(5).max(MIN_SPAWN_RATE);
        }
    }

    fn tick_clocks(&mut self, dt: Duration)
    {
        self.time_left = self.time_left.saturating_sub(dt);
        if let Some(left) = self.settlement {
            self.settlement = left.checked_sub(dt).filter(|l| !l.is_zero());
        }
        for floater in &mut self.floaters {
            floater.left = floater.left.saturating_sub(dt);
            floater.pos.y -= 2.0;
        }
        self.floaters.retain(|f| !f.left.is_zero());
    }

    fn step_customers(&mut self)
    {
        let desk = WORLD.height - DESK_HEIGHT + 20.0;
        let mut timed_out = Vec::new();
        self.customers.retain_mut(|c| {
            c.pos.y += c.speed;
            c.wobble += 0.1;
            c.pos.x += c.wobble.sin() * 0.5;
            if c.pos.y > desk {
                timed_out.push(c.pos);
                return false;
            }
            true
        });
        for pos in timed_out {
            self.streak = 0;
            self.time_left = self.time_left.saturating_sub(TIMEOUT_PENALTY);
            self.float("TIMEOUT!", pos, Rgb::RED);
        }
    }
}

impl Game for Checkout
{
    fn input(&mut self, key: Key)
    {
        match key {
            Key::Char('a') => self.serve(Method::Card),
            Key::Char('s') => self.serve(Method::Crypto),
            Key::Char('d') => self.serve(Method::Qr),
            _ => {}
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.over {
            return;
        }
        self.tick_clocks(dt);

        self.spawn_timer += 1;
        if self.spawn_timer > self.spawn_rate {
            self.spawn();
            self.spawn_timer = 0;
        }
        if self.settlement.is_some() && self.spawn_timer % 10 == 0 {
            if let Some(idx) = self.front() {
                let method = self.customers[idx].method;
                self.serve(method);
            }
        }
        self.step_customers();

        if self.time_left.is_zero() {
            self.over = true;
            log::debug!("checkout closed with {} served", self.served);
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let desk = Rect::new(0.0, WORLD.height - DESK_HEIGHT, WORLD.width, DESK_HEIGHT);
        canvas.fill_world(WORLD, desk, '▒', Some(Rgb::new(51, 65, 85)));
        canvas.text_world(
            WORLD,
            Vec2::new(WORLD.width / 2.0, WORLD.height - DESK_HEIGHT / 2.0),
            "[a] CARD   [s] CRYPTO   [d] QR",
            Some(Rgb::WHITE),
        );
        let front = self.front();
        for (i, customer) in self.customers.iter().enumerate() {
            let body = Rect::centered(customer.pos, CUSTOMER_SIZE, CUSTOMER_SIZE);
            let ch = if Some(i) == front { '@' } else { 'o' };
            canvas.fill_world(WORLD, body, ch, Some(customer.method.color()));
            let bubble = customer.pos + Vec2::new(0.0, -CUSTOMER_SIZE);
            canvas.text_world(WORLD, bubble, customer.method.label(), Some(Rgb::WHITE));
        }
        for floater in &self.floaters {
            canvas.text_world(WORLD, floater.pos, &floater.text, Some(floater.color));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let mut hud = vec![
            format!("${}.00", self.score),
            format!("Time: {}s", self.time_left.as_secs_f32().ceil() as u64),
            format!("Streak: x{}", self.streak),
        ];
        if self.settlement.is_some() {
            hud.push("INSTANT SETTLEMENT".to_string());
        }
        hud
    }

    fn controls(&self) -> &'static str
    {
        "a card  s crypto  d QR"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over {
            return None;
        }
        Some(
            Outcome::new(Some(self.score), false)
                .line("Store closed!")
                .line(format!("Customers served: {}", self.served))
                .line(format!("Best streak: {}", self.max_streak))
                .stat("customers_processed", self.served as i64)
                .stat("max_streak", self.max_streak as i64),
        )
    }

    fn take_events(&mut self) -> Vec<GameEvent>
    {
        std::mem::take(&mut self.events)
    }
}
