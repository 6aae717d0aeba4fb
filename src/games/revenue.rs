use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::{Game, Outcome};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb};

const SIZE: usize = 4;
const WIN_VALUE: u64 = 1 << 30;
const TILE_WIDTH: i32 = 7;

type Board = [[u64; SIZE]; SIZE];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dir
{
    Left,
    Right,
    Up,
    Down,
}

pub struct Revenue
{
    rng: StdRng,
    board: Board,
    score: i64,
    reached_win: bool,
    win_prompt: bool,
    cashed_out: bool,
    stuck: bool,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Revenue::new(seed))
}

/// Dollar label for a tile.
pub fn tile_label(value: u64) -> String
{
    if value >= WIN_VALUE {
        "$1B".to_string()
    } else if value >= 1_000_000 {
        format!("${}M", value / 1_000_000)
    } else if value >= 1_000 {
        format!("${}K", value / 1_000)
    } else {
        format!("${value}")
    }
}

/// Slides one line toward index 0. Each tile merges at most once and pairs
/// are taken from the leading edge. Returns the new line and the points won.
fn slide_line(line: [u64; SIZE]) -> ([u64; SIZE], u64)
{
    let tiles: Vec<u64> = line.iter().copied().filter(|&v| v != 0).collect();
    let mut out = [0u64; SIZE];
    let mut gained = 0;
    let mut write = 0;
    let mut i = 0;
    while i < tiles.len() {
        if i + 1 < tiles.len() && tiles[i] == tiles[i + 1] {
            let merged = tiles[i] * 2;
            out[write] = merged;
            gained += merged;
            i += 2;
        } else {
            out[write] = tiles[i];
            i += 1;
        }
        write += 1;
    }
    (out, gained)
}

/// Board coordinates of line `n`, ordered from the edge tiles move toward.
fn line_cells(dir: Dir, n: usize) -> [(usize, usize); SIZE]
{
    let mut cells = [(0, 0); SIZE];
    for (i, cell) in cells.iter_mut().enumerate() {
        *cell = match dir {
            Dir::Left => (n, i),
            Dir::Right => (n, SIZE - 1 - i),
            Dir::Up => (i, n),
            Dir::Down => (SIZE - 1 - i, n),
        };
    }
    cells
}

impl Revenue
{
    fn new(seed: u64) -> Self
    {
        let mut game = Self {
            rng: StdRng::seed_from_u64(seed),
            board: [[0; SIZE]; SIZE],
            score: 0,
            reached_win: false,
            win_prompt: false,
            cashed_out: false,
            stuck: false,
        };
        game.add_tile();
        game.add_tile();
        game
    }

    fn add_tile(&mut self)
    {
        let empty: Vec<(usize, usize)> = (0..SIZE)
            .flat_map(|r| (0..SIZE).map(move |c| (r, c)))
            .filter(|&(r, c)| self.board[r][c] == 0)
            .collect();
        if let Some(&(r, c)) = empty.choose(&mut self.rng) {
            self.board[r][c] = 1;
        }
    }

    fn shift(&mut self, dir: Dir) -> bool
    {
        let mut next = self.board;
        let mut gained = 0;
        for n in 0..SIZE {
            let cells = line_cells(dir, n);
            let mut line = [0; SIZE];
            for (i, &(r, c)) in cells.iter().enumerate() {
                line[i] = self.board[r][c];
            }
            let (slid, points) = slide_line(line);
            gained += points;
            for (i, &(r, c)) in cells.iter().enumerate() {
                next[r][c] = slid[i];
            }
        }
        if next == self.board {
            return false;
        }
        self.board = next;
        self.score += gained as i64;
        true
    }

    fn play_move(&mut self, dir: Dir)
    {
        if self.win_prompt || self.stuck || self.cashed_out {
            return;
        }
        if !self.shift(dir) {
            return;
        }
        self.add_tile();
        if !self.reached_win && self.max_tile() >= WIN_VALUE {
            self.reached_win = true;
            self.win_prompt = true;
        }
        if !self.win_prompt && !can_move(&self.board) {
            self.stuck = true;
        }
    }

    fn max_tile(&self) -> u64
    {
        self.board.iter().flatten().copied().max().unwrap_or(0)
    }
}

fn can_move(board: &Board) -> bool
{
    for r in 0..SIZE {
        for c in 0..SIZE {
            let value = board[r][c];
            if value == 0 {
                return true;
            }
            if r + 1 < SIZE && board[r + 1][c] == value {
                return true;
            }
            if c + 1 < SIZE && board[r][c + 1] == value {
                return true;
            }
        }
    }
    false
}

fn tile_color(value: u64) -> Rgb
{
    match value {
        v if v >= WIN_VALUE => Rgb::PINK,
        v if v >= 131_072 => Rgb::ORANGE,
        v if v >= 4_096 => Rgb::PURPLE,
        v if v >= 256 => Rgb::YELLOW,
        v if v >= 16 => Rgb::GREEN,
        _ => Rgb::new(70, 70, 90),
    }
}

impl Game for Revenue
{
    fn input(&mut self, key: Key)
    {
        if self.win_prompt {
            match key {
                Key::Enter => {
                    self.win_prompt = false;
                    if !can_move(&self.board) {
                        self.stuck = true;
                    }
                }
                Key::Char('n') => self.cashed_out = true,
                _ => {}
            }
            return;
        }
        match key {
            Key::Left | Key::Char('a') => self.play_move(Dir::Left),
            Key::Right | Key::Char('d') => self.play_move(Dir::Right),
            Key::Up | Key::Char('w') => self.play_move(Dir::Up),
            Key::Down | Key::Char('s') => self.play_move(Dir::Down),
            _ => {}
        }
    }

    fn update(&mut self, _dt: Duration, _held: &HeldKeys) {}

    fn draw(&self, canvas: &mut Canvas)
    {
        let width = TILE_WIDTH * SIZE as i32;
        let left = (canvas.width() as i32 - width) / 2;
        let top = ((canvas.height() as i32 - (SIZE as i32 * 2)) / 2).max(0);
        for (r, row) in self.board.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                let x = left + c as i32 * TILE_WIDTH;
                let y = top + r as i32 * 2;
                if value == 0 {
                    canvas.text(x, y, "   .   ", Some(Rgb::GREY));
                    continue;
                }
                let label = tile_label(value);
                let pad = (TILE_WIDTH - 1 - label.len() as i32) / 2;
                for dx in 0..TILE_WIDTH - 1 {
                    canvas.put_bg(x + dx, y, tile_color(value));
                }
                canvas.text(x + pad, y, &label, Some(Rgb::WHITE));
            }
        }
        if self.win_prompt {
            let msg = "UNICORN! Enter: keep playing  n: cash out";
            let x = (canvas.width() as i32 - msg.len() as i32) / 2;
            canvas.text(x, top + SIZE as i32 * 2 + 1, msg, Some(Rgb::YELLOW));
        }
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Revenue: {}", self.score),
            format!("Top tile: {}", tile_label(self.max_tile())),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "arrows/WASD slide"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.stuck && !self.cashed_out {
            return None;
        }
        let mut outcome = Outcome::new(Some(self.score), self.reached_win)
            .line(format!("Top tile: {}", tile_label(self.max_tile())))
            .stat("max_tile", self.max_tile() as i64);
        if self.cashed_out {
            outcome = outcome.line("Cashed out as a unicorn.");
        } else {
            outcome = outcome.line("No moves left: the market is saturated.");
        }
        Some(outcome)
    }
}
