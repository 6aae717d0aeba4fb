use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::{Game, Outcome};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb};

const ROWS: usize = 9;
const COLS: usize = 9;
const MINES: usize = 10;

#[derive(Clone, Copy, Default)]
struct Tile
{
    mine: bool,
    revealed: bool,
    flagged: bool,
    adjacent: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State
{
    Ready,
    Playing,
    Lost,
    Won,
}

pub struct Sweeper
{
    rng: StdRng,
    grid: [[Tile; COLS]; ROWS],
    cursor: (usize, usize),
    flag_mode: bool,
    state: State,
    revealed: usize,
    elapsed: Duration,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Sweeper::new(seed))
}

fn neighbours(row: usize, col: usize) -> impl Iterator<Item = (usize, usize)>
{
    (-1i32..=1)
        .flat_map(|dr| (-1i32..=1).map(move |dc| (dr, dc)))
        .filter(|&(dr, dc)| dr != 0 || dc != 0)
        .filter_map(move |(dr, dc)| {
            let r = row as i32 + dr;
            let c = col as i32 + dc;
            let inside = r >= 0 && r < ROWS as i32 && c >= 0 && c < COLS as i32;
            inside.then_some((r as usize, c as usize))
        })
}

impl Sweeper
{
    fn new(seed: u64) -> Self
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            grid: [[Tile::default(); COLS]; ROWS],
            cursor: (ROWS / 2, COLS / 2),
            flag_mode: false,
            state: State::Ready,
            revealed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Lays the mines anywhere except `safe`, then counts neighbours.
    fn place_mines(&mut self, safe: (usize, usize))
    {
        let candidates: Vec<(usize, usize)> = (0..ROWS)
            .flat_map(|r| (0..COLS).map(move |c| (r, c)))
            .filter(|&cell| cell != safe)
            .collect();
        for &(r, c) in candidates.choose_multiple(&mut self.rng, MINES) {
            self.grid[r][c].mine = true;
        }
        self.count_adjacent();
    }

    fn count_adjacent(&mut self)
    {
        for r in 0..ROWS {
            for c in 0..COLS {
                let count = neighbours(r, c).filter(|&(nr, nc)| self.grid[nr][nc].mine).count();
                self.grid[r][c].adjacent = count as u8;
            }
        }
    }

    fn toggle_flag(&mut self, (row, col): (usize, usize))
    {
        let tile = &mut self.grid[row][col];
        if !tile.revealed {
            tile.flagged = !tile.flagged;
        }
    }

    fn reveal(&mut self, (row, col): (usize, usize))
    {
        let tile = self.grid[row][col];
        if tile.revealed || tile.flagged {
            return;
        }
        if self.state == State::Ready {
            self.place_mines((row, col));
            self.state = State::Playing;
        }
        if self.grid[row][col].mine {
            self.state = State::Lost;
            for tile in self.grid.iter_mut().flatten() {
                if tile.mine {
                    tile.revealed = true;
                }
            }
            return;
        }

        let mut queue = VecDeque::from([(row, col)]);
        while let Some((r, c)) = queue.pop_front() {
            let tile = &mut self.grid[r][c];
            if tile.revealed || tile.flagged || tile.mine {
                continue;
            }
            tile.revealed = true;
            self.revealed += 1;
            if tile.adjacent == 0 {
                queue.extend(neighbours(r, c).filter(|&(nr, nc)| !self.grid[nr][nc].revealed));
            }
        }

        if self.revealed == ROWS * COLS - MINES {
            self.state = State::Won;
        }
    }

    fn finished(&self) -> bool
    {
        matches!(self.state, State::Won | State::Lost)
    }
}

impl Game for Sweeper
{
    fn input(&mut self, key: Key)
    {
        if self.finished() {
            return;
        }
        let (row, col) = self.cursor;
        match key {
            Key::Up => self.cursor.0 = row.saturating_sub(1),
            Key::Down => self.cursor.0 = (row + 1).min(ROWS - 1),
            Key::Left => self.cursor.1 = col.saturating_sub(1),
            Key::Right => self.cursor.1 = (col + 1).min(COLS - 1),
            Key::Tab => self.flag_mode = !self.flag_mode,
            Key::Char('f') => self.toggle_flag(self.cursor),
            Key::Space | Key::Enter => {
                if self.flag_mode {
                    self.toggle_flag(self.cursor);
                } else {
                    self.reveal(self.cursor);
                }
            }
            _ => {}
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.state == State::Playing {
            self.elapsed += dt;
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let left = (canvas.width() as i32 - (COLS as i32 * 3)) / 2;
        let top = ((canvas.height() as i32 - ROWS as i32) / 2).max(0);
        for (r, row) in self.grid.iter().enumerate() {
            for (c, tile) in row.iter().enumerate() {
                let x = left + c as i32 * 3;
                let y = top + r as i32;
                let (ch, color) = if tile.revealed && tile.mine {
                    ('*', Rgb::RED)
                } else if tile.revealed && tile.adjacent > 0 {
                    (char::from(b'0' + tile.adjacent), number_color(tile.adjacent))
                } else if tile.revealed {
                    (' ', Rgb::GREY)
                } else if tile.flagged {
                    ('F', Rgb::ORANGE)
                } else {
                    ('#', Rgb::new(90, 100, 130))
                };
                canvas.put(x + 1, y, ch, Some(color));
                if (r, c) == self.cursor {
                    canvas.put(x, y, '[', Some(Rgb::WHITE));
                    canvas.put(x + 2, y, ']', Some(Rgb::WHITE));
                }
            }
        }
    }

    fn hud(&self) -> Vec<String>
    {
        let flags = self.grid.iter().flatten().filter(|t| t.flagged).count();
        vec![
            format!("Time: {}s", self.elapsed.as_secs()),
            format!("Flags: {flags}/{MINES}"),
            format!("Flag mode: {}", if self.flag_mode { "ON" } else { "OFF" }),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "arrows move  Space reveal  f flag  Tab flag mode"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        match self.state {
            State::Won => {
                let secs = self.elapsed.as_secs() as i64;
                Some(
                    Outcome::new(Some(secs), true)
                        .line(format!("All fraud contained in {secs}s.")),
                )
            }
            State::Lost => Some(
                Outcome::new(None, false)
                    .line("Fraud slipped through! A chargeback hit the books.")
                    .stat("revealed", self.revealed as i64),
            ),
            _ => None,
        }
    }
}

fn number_color(n: u8) -> Rgb
{
    match n {
        1 => Rgb::BLUE,
        2 => Rgb::GREEN,
        3 => Rgb::RED,
        4 => Rgb::PURPLE,
        _ => Rgb::ORANGE,
    }
}
