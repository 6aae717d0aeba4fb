use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::{Game, Outcome};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb};

const SIDE: usize = 4;
const PAIRS: usize = 8;
const MISMATCH_DELAY: Duration = Duration::from_millis(800);
const BASE_SCORE: i64 = 1000;
const CARD_WIDTH: i32 = 9;

/// Short tag and full name of each payment method.
const TOKENS: [(&str, &str); PAIRS] = [
    ("VISA", "Visa"),
    ("MC", "Mastercard"),
    ("AMEX", "Amex"),
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("PPAL", "PayPal"),
    ("APAY", "Apple Pay"),
    ("GPAY", "Google Pay"),
];

#[derive(Clone, Copy, Debug)]
struct Card
{
    token: usize,
    face_up: bool,
    matched: bool,
}

pub struct Tokens
{
    cards: Vec<Card>,
    cursor: usize,
    first: Option<usize>,
    // both mismatched cards stay face up until the delay runs out
    hiding: Option<(usize, usize, Duration)>,
    flips: u32,
    matched: usize,
    elapsed: Duration,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Tokens::new(seed))
}

/// Points left after time and flip penalties, never below zero.
pub fn token_score(elapsed_secs: u64, flips: u32) -> i64
{
    (BASE_SCORE - elapsed_secs as i64 * 2 - flips as i64 * 5).max(0)
}

impl Tokens
{
    fn new(seed: u64) -> Self
    {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut deck: Vec<usize> = (0..PAIRS).chain(0..PAIRS).collect();
        deck.shuffle(&mut rng);
        Self {
            cards: deck
                .into_iter()
                .map(|token| Card {
                    token,
                    face_up: false,
                    matched: false,
                })
                .collect(),
            cursor: 0,
            first: None,
            hiding: None,
            flips: 0,
            matched: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn flip(&mut self, idx: usize)
    {
        if self.hiding.is_some() || self.finished() {
            return;
        }
        let card = &mut self.cards[idx];
        if card.matched || card.face_up {
            return;
        }
        card.face_up = true;
        self.flips += 1;

        let Some(first) = self.first.take() else {
            self.first = Some(idx);
            return;
        };
        if self.cards[first].token == self.cards[idx].token {
            self.cards[first].matched = true;
            self.cards[idx].matched = true;
            self.matched += 1;
        } else {
            self.hiding = Some((first, idx, MISMATCH_DELAY));
        }
    }

    fn finished(&self) -> bool
    {
        self.matched == PAIRS
    }

    fn score(&self) -> i64
    {
        token_score(self.elapsed.as_secs(), self.flips)
    }
}

impl Game for Tokens
{
    fn input(&mut self, key: Key)
    {
        let (row, col) = (self.cursor / SIDE, self.cursor % SIDE);
        match key {
            Key::Up => self.cursor = row.saturating_sub(1) * SIDE + col,
            Key::Down => self.cursor = (row + 1).min(SIDE - 1) * SIDE + col,
            Key::Left => self.cursor = row * SIDE + col.saturating_sub(1),
            Key::Right => self.cursor = row * SIDE + (col + 1).min(SIDE - 1),
            Key::Space | Key::Enter => self.flip(self.cursor),
            _ => {}
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.finished() {
            return;
        }
        self.elapsed += dt;
        if let Some((a, b, left)) = self.hiding {
            if left <= dt {
                self.cards[a].face_up = false;
                self.cards[b].face_up = false;
                self.hiding = None;
            } else {
                self.hiding = Some((a, b, left - dt));
            }
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let left = (canvas.width() as i32 - CARD_WIDTH * SIDE as i32) / 2;
        let top = ((canvas.height() as i32 - SIDE as i32 * 2) / 2).max(0);
        for (i, card) in self.cards.iter().enumerate() {
            let x = left + (i % SIDE) as i32 * CARD_WIDTH;
            let y = top + (i / SIDE) as i32 * 2;
            let (label, fg, bg) = if card.matched {
                (TOKENS[card.token].0, Rgb::new(10, 10, 10), Rgb::new(193, 255, 0))
            } else if card.face_up {
                (TOKENS[card.token].0, Rgb::WHITE, Rgb::PURPLE)
            } else {
                ("Dodo", Rgb::GREY, Rgb::new(40, 40, 50))
            };
            for dx in 1..CARD_WIDTH - 1 {
                canvas.put_bg(x + dx, y, bg);
            }
            let pad = (CARD_WIDTH - label.len() as i32) / 2;
            canvas.text(x + pad, y, label, Some(fg));
            if i == self.cursor {
                canvas.put(x, y, '[', Some(Rgb::WHITE));
                canvas.put(x + CARD_WIDTH - 1, y, ']', Some(Rgb::WHITE));
            }
        }
        if let Some(card) = self.cards.get(self.cursor).filter(|c| c.face_up) {
            let name = TOKENS[card.token].1;
            let x = (canvas.width() as i32 - name.len() as i32) / 2;
            canvas.text(x, top + SIDE as i32 * 2, name, Some(Rgb::GREY));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let secs = self.elapsed.as_secs();
        vec![
            format!("Time: {:02}:{:02}", secs / 60, secs % 60),
            format!("Flips: {}", self.flips),
            format!("Score: {}", self.score()),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "arrows move  Space flip"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.finished() {
            return None;
        }
        let secs = self.elapsed.as_secs();
        Some(
            Outcome::new(Some(self.score()), true)
                .line(format!(
                    "All tokens matched in {:02}:{:02} with {} flips.",
                    secs / 60,
                    secs % 60,
                    self.flips
                ))
                .stat("flips", self.flips as i64)
                .stat("seconds", secs as i64),
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::testing::run_ticks;

    fn pair_of(game: &Tokens, idx: usize) -> usize
    {
        (0..game.cards.len())
            .find(|&j| j != idx && game.cards[j].token == game.cards[idx].token)
            .unwrap()
    }

    fn stranger_of(game: &Tokens, idx: usize) -> usize
    {
        (0..game.cards.len())
            .find(|&j| game.cards[j].token != game.cards[idx].token)
            .unwrap()
    }

    #[test]
    fn deck_holds_each_token_twice()
    {
        let game = Tokens::new(3);
        assert_eq!(game.cards.len(), SIDE * SIDE);
        for token in 0..PAIRS {
            assert_eq!(game.cards.iter().filter(|c| c.token == token).count(), 2);
        }
    }

    #[test]
    fn score_formula_floors_at_zero()
    {
        assert_eq!(token_score(0, 0), 1000);
        assert_eq!(token_score(30, 20), 840);
        assert_eq!(token_score(600, 0), 0);
    }

    #[test]
    fn matching_pair_stays_up()
    {
        let mut game = Tokens::new(1);
        let other = pair_of(&game, 0);
        game.flip(0);
        game.flip(0);
        assert_eq!(game.flips, 1);
        game.flip(other);
        assert!(game.cards[0].matched && game.cards[other].matched);
        assert_eq!(game.matched, 1);
    }

    #[test]
    fn mismatch_hides_after_delay_and_blocks_flips()
    {
        let mut game = Tokens::new(2);
        let other = stranger_of(&game, 0);
        game.flip(0);
        game.flip(other);
        let third = (0..16).find(|&j| j != 0 && j != other).unwrap();
        game.flip(third);
        assert!(!game.cards[third].face_up);
        assert_eq!(game.flips, 2);

        run_ticks(&mut game, 47);
        assert!(game.cards[0].face_up);
        run_ticks(&mut game, 1);
        assert!(!game.cards[0].face_up && !game.cards[other].face_up);
    }

    #[test]
    fn all_pairs_win_with_score()
    {
        let mut game = Tokens::new(4);
        run_ticks(&mut game, 60 * 10 + 1);
        for idx in 0..16 {
            if !game.cards[idx].matched {
                let other = pair_of(&game, idx);
                game.flip(idx);
                game.flip(other);
            }
        }
        let outcome = game.outcome().unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.score, Some(1000 - 20 - 16 * 5));
    }

    #[test]
    fn cursor_stays_on_grid()
    {
        let mut game = Tokens::new(5);
        game.input(Key::Up);
        game.input(Key::Left);
        assert_eq!(game.cursor, 0);
        for _ in 0..5 {
            game.input(Key::Down);
            game.input(Key::Right);
        }
        assert_eq!(game.cursor, 15);
    }
}
