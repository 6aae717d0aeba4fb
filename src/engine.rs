use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::analytics::{EventSink, GameEvent};
use crate::error::ArcadeResult;
use crate::games::GameDescriptor;
use crate::input::{translate, Command, HeldKeys, Key};
use crate::scores::{Recorded, ScoreBook};
use crate::screen::{field_size, present, Canvas, TerminalGuard};

/// One fixed update step.
pub const TICK: Duration = Duration::from_micros(16_667);
const MAX_CATCH_UP: u32 = 5;
const HEADER_LINES: usize = 3;
const FOOTER_LINES: usize = 2;

/// Turns wall-clock time into whole fixed steps.
#[derive(Default)]
pub struct Clock
{
    pending: Duration,
}

impl Clock
{
    /// Number of steps to run for `elapsed` real time. After a long stall at
    /// most a handful of steps run and the rest of the backlog is dropped.
    pub fn advance(&mut self, elapsed: Duration) -> u32
    {
        self.pending += elapsed;
        let mut steps = 0;
        while self.pending >= TICK {
            self.pending -= TICK;
            steps += 1;
            if steps == MAX_CATCH_UP {
                self.pending = Duration::ZERO;
                break;
            }
        }
        steps
    }
}

/// Result of a finished round.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome
{
    /// `None` when the round does not compete for a best score.
    pub score: Option<i64>,
    pub won: bool,
    /// Extra summary lines.
    pub lines: Vec<String>,
    /// Numbers reported alongside the score in analytics.
    pub stats: Vec<(&'static str, i64)>,
}

impl Outcome
{
    pub fn new(score: Option<i64>, won: bool) -> Self
    {
        Self {
            score,
            won,
            lines: Vec::new(),
            stats: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self
    {
        self.lines.push(line.into());
        self
    }

    pub fn stat(mut self, name: &'static str, value: i64) -> Self
    {
        self.stats.push((name, value));
        self
    }
}

/// A single round of one game. Every `update` call advances exactly one
/// fixed step of `dt`.
pub trait Game
{
    fn input(&mut self, key: Key);

    fn update(&mut self, dt: Duration, held: &HeldKeys);

    fn draw(&self, canvas: &mut Canvas);

    /// Status lines shown above the playfield.
    fn hud(&self) -> Vec<String>;

    /// Short key help for the footer.
    fn controls(&self) -> &'static str;

    fn outcome(&self) -> Option<Outcome>;

    /// Milestones raised since the last call.
    fn take_events(&mut self) -> Vec<GameEvent>
    {
        Vec::new()
    }
}

enum RoundEnd
{
    Quit,
    Restart,
    Finished(Outcome),
}

enum Choice
{
    Again,
    Leave,
}

/// Runs rounds of a game on the terminal and keeps the score book current.
pub struct Session<'a>
{
    pub frame: Duration,
    pub hold_ticks: u32,
    pub seed: Option<u64>,
    pub scores: &'a mut ScoreBook,
    pub sink: &'a mut dyn EventSink,
}

impl<'a> Session<'a>
{
    pub fn play(&mut self, descriptor: &GameDescriptor) -> ArcadeResult<()>
    {
        let mut term = TerminalGuard::enter()?;
        loop {
            let seed = self.seed.unwrap_or_else(rand::random::<u64>);
            log::info!("round started: game={} seed={seed}", descriptor.name);
            let mut game = (descriptor.build)(seed);
            self.sink.emit(GameEvent::GameStart {
                game: descriptor.name,
            });

            match self.run_round(&mut term, descriptor, game.as_mut())? {
                RoundEnd::Quit => {
                    log::info!("round abandoned: game={}", descriptor.name);
                    return Ok(());
                }
                RoundEnd::Restart => {
                    log::info!("round restarted: game={}", descriptor.name);
                }
                RoundEnd::Finished(outcome) => {
                    let recorded = self.finish_round(descriptor, &outcome);
                    let lines = summary_lines(descriptor, &outcome, recorded);
                    present(term.stdout(), &lines)?;
                    match wait_for_choice()? {
                        Choice::Again => continue,
                        Choice::Leave => return Ok(()),
                    }
                }
            }
        }
    }

    fn run_round(
        &mut self,
        term: &mut TerminalGuard,
        descriptor: &GameDescriptor,
        game: &mut dyn Game,
    ) -> ArcadeResult<RoundEnd>
    {
        let mut held = HeldKeys::new(self.hold_ticks, term.reports_releases());
        let mut clock = Clock::default();
        let mut paused = false;
        let mut last = Instant::now();
        let mut last_frame: Option<Instant> = None;

        loop {
            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                match translate(&key, descriptor.text_input) {
                    Some(Command::Quit) => return Ok(RoundEnd::Quit),
                    Some(Command::Restart) => return Ok(RoundEnd::Restart),
                    Some(Command::Pause) => {
                        paused = !paused;
                        held.clear();
                    }
                    Some(Command::Key(key)) if !paused => {
                        held.press(key);
                        game.input(key);
                    }
                    Some(Command::Release(key)) => held.release(key),
                    _ => {}
                }
            }

            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;
            if !paused {
                for _ in 0..clock.advance(elapsed) {
                    game.update(TICK, &held);
                    held.tick();
                    if game.outcome().is_some() {
                        break;
                    }
                }
            }

            for event in game.take_events() {
                self.sink.emit(event);
            }
            if let Some(outcome) = game.outcome() {
                return Ok(RoundEnd::Finished(outcome));
            }

            if last_frame.map_or(true, |at| at.elapsed() >= self.frame) {
                let best = self.scores.get(descriptor.name).and_then(|r| r.best);
                let (width, height) = field_size(HEADER_LINES, FOOTER_LINES);
                let mut canvas = Canvas::new(width, height);
                game.draw(&mut canvas);
                let lines = compose_frame(descriptor, &*game, &canvas, best, paused);
                present(term.stdout(), &lines)?;
                last_frame = Some(now);
            }

            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Records a finished round and reports it. A failed save is logged and
    /// the session goes on.
    fn finish_round(&mut self, descriptor: &GameDescriptor, outcome: &Outcome) -> Recorded
    {
        let recorded = self.scores.record(descriptor.name, descriptor.ranking, outcome);
        if let Err(err) = self.scores.save() {
            log::warn!("could not save scores: {err}");
        }
        log::info!(
            "round finished: game={} score={:?} won={}",
            descriptor.name,
            outcome.score,
            outcome.won
        );

        self.sink.emit(GameEvent::GameOver {
            game: descriptor.name,
            score: outcome.score,
            extra: outcome.stats.clone(),
        });
        if let (true, Some(score)) = (recorded.new_best, outcome.score) {
            self.sink.emit(GameEvent::NewHighScore {
                game: descriptor.name,
                score,
            });
        }
        recorded
    }
}

fn compose_frame(
    descriptor: &GameDescriptor,
    game: &dyn Game,
    canvas: &Canvas,
    best: Option<i64>,
    paused: bool,
) -> Vec<String>
{
    let mut lines = Vec::new();
    let mut title = format!("dodo-arcade - {}", descriptor.title);
    if let Some(best) = best {
        title.push_str(&format!("  (best {best})"));
    }
    if paused {
        title.push_str("  [PAUSED]");
    }
    lines.push(title);
    lines.push(game.hud().join("  "));
    lines.push(String::new());

    let border = format!("+{}+", "-".repeat(canvas.width()));
    lines.push(border.clone());
    for row in canvas.lines() {
        lines.push(format!("|{row}|"));
    }
    lines.push(border);

    let session_keys = if descriptor.text_input {
        "Ctrl-P pause  Ctrl-R restart  Esc quit"
    } else {
        "p pause  r restart  Esc quit"
    };
    lines.push(format!("{}  |  {}", game.controls(), session_keys));
    lines
}

fn summary_lines(descriptor: &GameDescriptor, outcome: &Outcome, recorded: Recorded) -> Vec<String>
{
    let mut lines = Vec::new();
    lines.push(format!("dodo-arcade - {}", descriptor.title));
    lines.push(String::new());
    lines.push(if outcome.won { "You win!" } else { "Game over" }.to_string());
    match outcome.score {
        Some(score) if recorded.new_best => lines.push(format!("Score: {score}  NEW BEST!")),
        Some(score) => {
            let best = recorded.previous_best.map_or_else(String::new, |b| format!("  (best {b})"));
            lines.push(format!("Score: {score}{best}"));
        }
        None => lines.push("No score this round.".to_string()),
    }
    lines.push(String::new());
    lines.extend(outcome.lines.iter().cloned());
    lines.push(String::new());
    lines.push("SPACE or r to play again. Esc to leave.".to_string());
    lines
}

fn wait_for_choice() -> ArcadeResult<Choice>
{
    while event::poll(Duration::ZERO)? {
        let _ = event::read()?;
    }

    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(Choice::Leave)
                }
                KeyCode::Char(' ') | KeyCode::Char('r') | KeyCode::Enter => return Ok(Choice::Again),
                KeyCode::Esc | KeyCode::Char('q') => return Ok(Choice::Leave),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
pub mod testing
{
    use super::*;

    /// Runs `ticks` fixed steps with nothing held.
    pub fn run_ticks(game: &mut dyn Game, ticks: u32)
    {
        let held = HeldKeys::default();
        for _ in 0..ticks {
            game.update(TICK, &held);
        }
    }

    /// Runs `ticks` fixed steps with `key` held.
    pub fn hold_for(game: &mut dyn Game, key: Key, ticks: u32)
    {
        let mut held = HeldKeys::new(1, true);
        held.press(key);
        for _ in 0..ticks {
            game.update(TICK, &held);
        }
    }
}
