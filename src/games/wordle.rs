use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::{Game, Outcome};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb};
use crate::words::WORDLE_WORDS;

const WORD_LEN: usize = 5;
const MAX_ATTEMPTS: usize = 6;
const KB_ROWS: [&str; 3] = ["QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM"];

const CORRECT_BG: Rgb = Rgb::new(0, 150, 70);
const PRESENT_BG: Rgb = Rgb::new(180, 130, 0);
const ABSENT_BG: Rgb = Rgb::new(90, 20, 20);
const PENDING_BG: Rgb = Rgb::new(40, 40, 40);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LetterState
{
    Correct,
    Present,
    Absent,
}

impl LetterState
{
    fn priority(self) -> u8
    {
        match self {
            LetterState::Correct => 3,
            LetterState::Present => 2,
            LetterState::Absent => 1,
        }
    }

    fn background(self) -> Rgb
    {
        match self {
            LetterState::Correct => CORRECT_BG,
            LetterState::Present => PRESENT_BG,
            LetterState::Absent => ABSENT_BG,
        }
    }

    fn emoji(self) -> char
    {
        match self {
            LetterState::Correct => '🟩',
            LetterState::Present => '🟨',
            LetterState::Absent => '⬛',
        }
    }
}

struct Attempt
{
    guess: String,
    states: Vec<LetterState>,
}

pub struct Wordle
{
    secret: String,
    attempts: Vec<Attempt>,
    current: String,
    letters: HashMap<char, LetterState>,
    message: Option<String>,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    let mut rng = StdRng::seed_from_u64(seed);
    let secret = WORDLE_WORDS.choose(&mut rng).copied().unwrap_or("TOKEN");
    Box::new(Wordle::with_secret(secret))
}

impl Wordle
{
    fn with_secret(secret: &str) -> Self
    {
        Self {
            secret: secret.to_ascii_uppercase(),
            attempts: Vec::new(),
            current: String::new(),
            letters: HashMap::new(),
            message: None,
        }
    }

    fn solved(&self) -> bool
    {
        self.attempts.last().is_some_and(|a| a.guess == self.secret)
    }

    fn is_over(&self) -> bool
    {
        self.solved() || self.attempts.len() >= MAX_ATTEMPTS
    }

    fn submit(&mut self)
    {
        if self.current.len() < WORD_LEN {
            self.message = Some("Not enough letters".to_string());
            return;
        }
        let guess = std::mem::take(&mut self.current);
        let states = evaluate_guess(&self.secret, &guess);
        for (ch, state) in guess.chars().zip(states.iter()) {
            let entry = self.letters.entry(ch).or_insert(*state);
            if state.priority() > entry.priority() {
                *entry = *state;
            }
        }
        self.attempts.push(Attempt { guess, states });
    }

    fn share_text(&self) -> Vec<String>
    {
        let mut lines = vec![format!(
            "API Wordle Dodo {}/{}",
            self.attempts.len(),
            MAX_ATTEMPTS
        )];
        for attempt in &self.attempts {
            lines.push(attempt.states.iter().map(|s| s.emoji()).collect());
        }
        lines
    }
}

/// Colors each guess letter. Exact matches claim their target letters
/// first; the remaining letters are handed out left to right.
pub fn evaluate_guess(secret: &str, guess: &str) -> Vec<LetterState>
{
    let secret_chars: Vec<char> = secret.chars().collect();
    let guess_chars: Vec<char> = guess.chars().collect();
    let mut states = vec![LetterState::Absent; guess_chars.len()];
    let mut remaining: HashMap<char, usize> = HashMap::new();

    for (i, &ch) in secret_chars.iter().enumerate() {
        if guess_chars.get(i) == Some(&ch) {
            states[i] = LetterState::Correct;
        } else {
            *remaining.entry(ch).or_insert(0) += 1;
        }
    }

    for (i, ch) in guess_chars.iter().enumerate() {
        if states[i] == LetterState::Correct {
            continue;
        }
        if let Some(count) = remaining.get_mut(ch) {
            if *count > 0 {
                states[i] = LetterState::Present;
                *count -= 1;
            }
        }
    }

    states
}

impl Game for Wordle
{
    fn input(&mut self, key: Key)
    {
        if self.is_over() {
            return;
        }
        match key {
            Key::Enter => self.submit(),
            Key::Backspace => {
                self.current.pop();
                self.message = None;
            }
            Key::Char(ch) if ch.is_ascii_alphabetic() => {
                if self.current.len() < WORD_LEN {
                    self.current.push(ch.to_ascii_uppercase());
                }
                self.message = None;
            }
            _ => {}
        }
    }

    fn update(&mut self, _dt: Duration, _held: &HeldKeys) {}

    fn draw(&self, canvas: &mut Canvas)
    {
        let board_width = (WORD_LEN * 4) as i32;
        let left = (canvas.width() as i32 - board_width) / 2;

        for row in 0..MAX_ATTEMPTS {
            let y = row as i32;
            let (letters, states): (Vec<char>, Vec<Option<LetterState>>) = match self.attempts.get(row) {
                Some(attempt) => (
                    attempt.guess.chars().collect(),
                    attempt.states.iter().copied().map(Some).collect(),
                ),
                None if row == self.attempts.len() => {
                    (self.current.chars().collect(), vec![None; self.current.len()])
                }
                None => (Vec::new(), Vec::new()),
            };
            for col in 0..WORD_LEN {
                let x = left + (col * 4) as i32;
                let ch = letters.get(col).copied().unwrap_or('.');
                let bg = match states.get(col).copied().flatten() {
                    Some(state) => state.background(),
                    None => PENDING_BG,
                };
                for dx in 0..3 {
                    canvas.put_bg(x + dx, y, bg);
                }
                canvas.put(x + 1, y, ch, Some(Rgb::WHITE));
            }
        }

        let kb_top = MAX_ATTEMPTS as i32 + 1;
        for (row, keys) in KB_ROWS.iter().enumerate() {
            let width = keys.len() as i32 * 2;
            let x0 = (canvas.width() as i32 - width) / 2;
            for (i, ch) in keys.chars().enumerate() {
                let x = x0 + i as i32 * 2;
                let y = kb_top + row as i32;
                canvas.put(x, y, ch, Some(Rgb::WHITE));
                if let Some(state) = self.letters.get(&ch) {
                    canvas.put_bg(x, y, state.background());
                }
            }
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let mut hud = vec![format!(
            "Attempt {}/{}",
            (self.attempts.len() + 1).min(MAX_ATTEMPTS),
            MAX_ATTEMPTS
        )];
        if let Some(message) = &self.message {
            hud.push(message.clone());
        }
        hud
    }

    fn controls(&self) -> &'static str
    {
        "type letters  Enter submit  Backspace delete"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.is_over() {
            return None;
        }
        let tries = self.attempts.len();
        let outcome = if self.solved() {
            let noun = if tries == 1 { "try" } else { "tries" };
            Outcome::new(Some((MAX_ATTEMPTS + 1 - tries) as i64), true)
                .line("Payment API solved!")
                .line(format!("You cracked it in {tries} {noun}."))
        } else {
            Outcome::new(Some(0), false)
                .line("Request failed!")
                .line(format!("The term was {}.", self.secret))
        };
        let mut outcome = outcome.stat("guesses", tries as i64).line("");
        outcome.lines.extend(self.share_text());
        Some(outcome)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn type_word(game: &mut Wordle, word: &str)
    {
        for ch in word.chars() {
            game.input(Key::Char(ch.to_ascii_lowercase()));
        }
        game.input(Key::Enter);
    }

    #[test]
    fn exact_matches_claim_letters_first()
    {
        use LetterState::*;
        assert_eq!(evaluate_guess("TOKEN", "TOKEN"), vec![Correct; 5]);
        // both target E's are taken by exact matches
        assert_eq!(
            evaluate_guess("HEDGE", "EEEEE"),
            vec![Absent, Correct, Absent, Absent, Correct]
        );
        assert_eq!(
            evaluate_guess("ASSET", "SASSY"),
            vec![Present, Present, Correct, Absent, Absent]
        );
    }

    #[test]
    fn short_guess_is_rejected()
    {
        let mut game = Wordle::with_secret("MONEY");
        type_word(&mut game, "MON");
        assert_eq!(game.attempts.len(), 0);
        assert_eq!(game.message.as_deref(), Some("Not enough letters"));
        assert_eq!(game.current, "MON");
    }

    #[test]
    fn letters_stop_at_five_and_backspace_deletes()
    {
        let mut game = Wordle::with_secret("MONEY");
        for ch in "abcdefg".chars() {
            game.input(Key::Char(ch));
        }
        assert_eq!(game.current, "ABCDE");
        game.input(Key::Backspace);
        assert_eq!(game.current, "ABCD");
    }

    #[test]
    fn keyboard_state_only_upgrades()
    {
        let mut game = Wordle::with_secret("TOKEN");
        type_word(&mut game, "OTTER");
        assert_eq!(game.letters[&'T'], LetterState::Present);
        type_word(&mut game, "TOKEN");
        assert_eq!(game.letters[&'T'], LetterState::Correct);
        assert_eq!(game.letters[&'R'], LetterState::Absent);
    }

    #[test]
    fn win_scores_remaining_guesses()
    {
        let mut game = Wordle::with_secret("FRAUD");
        type_word(&mut game, "DEBIT");
        type_word(&mut game, "FRAUD");
        let outcome = game.outcome().unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.score, Some(5));
        assert!(outcome.lines.iter().any(|l| l == "API Wordle Dodo 2/6"));
        assert!(outcome.lines.iter().any(|l| l == "🟩🟩🟩🟩🟩"));
        game.input(Key::Char('a'));
        assert!(game.current.is_empty());
    }

    #[test]
    fn six_misses_lose()
    {
        let mut game = Wordle::with_secret("FRAUD");
        for _ in 0..MAX_ATTEMPTS {
            assert!(game.outcome().is_none());
            type_word(&mut game, "TOKEN");
        }
        let outcome = game.outcome().unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.score, Some(0));
        assert!(outcome.lines.iter().any(|l| l.contains("FRAUD")));
    }

    #[test]
    fn fresh_round_is_in_progress()
    {
        let game = build(11);
        let outcome = game.outcome();
        assert!(outcome.is_none());
        let again = build(11);
        assert_eq!(game.hud(), again.hud());
    }
}
