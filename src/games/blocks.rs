use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{Game, Outcome};
use crate::input::{HeldKeys, Key};
use crate::screen::{Canvas, Rgb};

const COLS: usize = 10;
const ROWS: usize = 20;
const INITIAL_INTERVAL_MS: u64 = 800;
const MIN_INTERVAL_MS: u64 = 100;
const INTERVAL_STEP_MS: u64 = 70;
const LINES_PER_LEVEL: u32 = 10;
const FLASH: Duration = Duration::from_millis(140);
const LINE_POINTS: [i64; 5] = [0, 100, 300, 500, 800];

type Row = [Option<Rgb>; COLS];
type Shape = Vec<Vec<bool>>;

struct Tetromino
{
    rows: &'static [&'static str],
    color: Rgb,
    label: &'static str,
}

const TETROMINOES: [Tetromino; 7] = [
    Tetromino { rows: &["####"], color: Rgb::new(0, 240, 240), label: "Wire Transfer" },
    Tetromino { rows: &["##", "##"], color: Rgb::new(240, 240, 0), label: "Subscription" },
    Tetromino { rows: &[".#.", "###"], color: Rgb::new(160, 0, 240), label: "Card Payment" },
    Tetromino { rows: &[".##", "##."], color: Rgb::new(193, 255, 0), label: "Crypto" },
    Tetromino { rows: &["##.", ".##"], color: Rgb::new(240, 0, 0), label: "Refund" },
    Tetromino { rows: &["#..", "###"], color: Rgb::new(60, 60, 240), label: "Invoice" },
    Tetromino { rows: &["..#", "###"], color: Rgb::new(240, 160, 0), label: "ACH" },
];

#[derive(Clone)]
struct Piece
{
    shape: Shape,
    color: Rgb,
    label: &'static str,
    x: i32,
    y: i32,
}

impl Piece
{
    fn of(kind: &Tetromino) -> Self
    {
        Self {
            shape: kind.rows.iter().map(|row| row.chars().map(|c| c == '#').collect()).collect(),
            color: kind.color,
            label: kind.label,
            x: 0,
            y: 0,
        }
    }

    fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_
    {
        cells(&self.shape, self.x, self.y)
    }
}

fn cells(shape: &Shape, x: i32, y: i32) -> impl Iterator<Item = (i32, i32)> + '_
{
    shape.iter().enumerate().flat_map(move |(r, row)| {
        row.iter()
            .enumerate()
            .filter(|&(_, &filled)| filled)
            .map(move |(c, _)| (x + c as i32, y + r as i32))
    })
}

/// Quarter turn clockwise.
fn rotate(shape: &Shape) -> Shape
{
    let rows = shape.len();
    let cols = shape.first().map_or(0, Vec::len);
    let mut rotated = vec![vec![false; rows]; cols];
    for (r, row) in shape.iter().enumerate() {
        for (c, &filled) in row.iter().enumerate() {
            rotated[c][rows - 1 - r] = filled;
        }
    }
    rotated
}

fn drop_interval(level: u32) -> Duration
{
    let cut = (level as u64 - 1) * INTERVAL_STEP_MS;
    Duration::from_millis(INITIAL_INTERVAL_MS.saturating_sub(cut).max(MIN_INTERVAL_MS))
}

pub struct Blocks
{
    rng: StdRng,
    board: Vec<Row>,
    current: Option<Piece>,
    next: Piece,
    score: i64,
    level: u32,
    lines: u32,
    since_drop: Duration,
    clearing: Vec<usize>,
    flash_left: Duration,
    over: bool,
}

pub fn build(seed: u64) -> Box<dyn Game>
{
    Box::new(Blocks::new(seed))
}

impl Blocks
{
    fn new(seed: u64) -> Self
    {
        let mut rng = StdRng::seed_from_u64(seed);
        let next = Piece::of(&TETROMINOES[rng.gen_range(0..TETROMINOES.len())]);
        let mut game = Self {
            rng,
            board: vec![[None; COLS]; ROWS],
            current: None,
            next,
            score: 0,
            level: 1,
            lines: 0,
            since_drop: Duration::ZERO,
            clearing: Vec::new(),
            flash_left: Duration::ZERO,
            over: false,
        };
        game.spawn();
        game
    }

    fn fits(&self, shape: &Shape, x: i32, y: i32) -> bool
    {
        cells(shape, x, y).all(|(cx, cy)| {
            cx >= 0
                && cy >= 0
                && (cx as usize) < COLS
                && (cy as usize) < ROWS
                && self.board[cy as usize][cx as usize].is_none()
        })
    }

    fn spawn(&mut self)
    {
        let fresh = Piece::of(&TETROMINOES[self.rng.gen_range(0..TETROMINOES.len())]);
        let mut piece = std::mem::replace(&mut self.next, fresh);
        piece.x = (COLS / 2) as i32 - (piece.shape[0].len() / 2) as i32;
        piece.y = 0;
        if !self.fits(&piece.shape, piece.x, piece.y) {
            log::debug!("ledger blocks topped out at {} lines", self.lines);
            self.current = None;
            self.over = true;
            return;
        }
        self.current = Some(piece);
    }

    fn shift(&mut self, dx: i32, dy: i32) -> bool
    {
        let Some(piece) = &self.current else {
            return false;
        };
        if !self.clearing.is_empty() || !self.fits(&piece.shape, piece.x + dx, piece.y + dy) {
            return false;
        }
        if let Some(piece) = &mut self.current {
            piece.x += dx;
            piece.y += dy;
        }
        true
    }

    fn rotate_current(&mut self)
    {
        let Some(piece) = &self.current else {
            return;
        };
        let rotated = rotate(&piece.shape);
        if self.clearing.is_empty() && self.fits(&rotated, piece.x, piece.y) {
            if let Some(piece) = &mut self.current {
                piece.shape = rotated;
            }
        }
    }

    fn soft_drop(&mut self)
    {
        if !self.shift(0, 1) {
            self.lock();
        }
    }

    fn hard_drop(&mut self)
    {
        if self.current.is_none() || !self.clearing.is_empty() {
            return;
        }
        while self.shift(0, 1) {}
        self.lock();
    }

    fn lock(&mut self)
    {
        if !self.clearing.is_empty() {
            return;
        }
        let Some(piece) = self.current.take() else {
            return;
        };
        for (x, y) in piece.cells() {
            self.board[y as usize][x as usize] = Some(piece.color);
        }
        if !self.mark_full_rows() {
            self.spawn();
        }
    }

    fn mark_full_rows(&mut self) -> bool
    {
        let full: Vec<usize> = (0..ROWS)
            .rev()
            .filter(|&r| self.board[r].iter().all(Option::is_some))
            .collect();
        if full.is_empty() {
            return false;
        }
        let points = LINE_POINTS.get(full.len()).copied().unwrap_or(800);
        self.score += points * self.level as i64;
        self.lines += full.len() as u32;
        self.level = self.lines / LINES_PER_LEVEL + 1;
        self.clearing = full;
        self.flash_left = FLASH;
        true
    }

    fn settle(&mut self)
    {
        // rows are listed bottom up, so removing in order keeps indices valid
        for &row in &self.clearing {
            self.board.remove(row);
        }
        while self.board.len() < ROWS {
            self.board.insert(0, [None; COLS]);
        }
        self.clearing.clear();
    }
}

impl Game for Blocks
{
    fn input(&mut self, key: Key)
    {
        if self.over {
            return;
        }
        match key {
            Key::Left => {
                self.shift(-1, 0);
            }
            Key::Right => {
                self.shift(1, 0);
            }
            Key::Down => self.soft_drop(),
            Key::Up => self.rotate_current(),
            Key::Space => self.hard_drop(),
            _ => {}
        }
    }

    fn update(&mut self, dt: Duration, _held: &HeldKeys)
    {
        if self.over {
            return;
        }
        if !self.clearing.is_empty() {
            self.flash_left = self.flash_left.saturating_sub(dt);
            if self.flash_left.is_zero() {
                self.settle();
                self.spawn();
                self.since_drop = Duration::ZERO;
            }
            return;
        }
        self.since_drop += dt;
        if self.since_drop >= drop_interval(self.level) {
            self.soft_drop();
            self.since_drop = Duration::ZERO;
        }
    }

    fn draw(&self, canvas: &mut Canvas)
    {
        let width = COLS as i32 * 2;
        let left = (canvas.width() as i32 - width) / 2;
        let top = ((canvas.height() as i32 - ROWS as i32) / 2).max(0);
        for (r, row) in self.board.iter().enumerate() {
            let flashing = self.clearing.contains(&r);
            for (c, cell) in row.iter().enumerate() {
                let x = left + c as i32 * 2;
                let y = top + r as i32;
                match cell {
                    _ if flashing => canvas.text(x, y, "██", Some(Rgb::new(193, 255, 0))),
                    Some(color) => canvas.text(x, y, "▓▓", Some(*color)),
                    None => canvas.text(x, y, " .", Some(Rgb::new(40, 40, 40))),
                }
            }
        }
        if let Some(piece) = &self.current {
            for (cx, cy) in piece.cells() {
                canvas.text(left + cx * 2, top + cy, "██", Some(piece.color));
            }
        }

        let side = left + width + 3;
        canvas.text(side, top, "Next:", Some(Rgb::GREY));
        for (cx, cy) in cells(&self.next.shape, 0, 0) {
            canvas.text(side + cx * 2, top + 2 + cy, "██", Some(self.next.color));
        }
        canvas.text(side, top + 5, self.next.label, Some(self.next.color));
    }

    fn hud(&self) -> Vec<String>
    {
        vec![
            format!("Score: {}", self.score),
            format!("Level: {}", self.level),
            format!("Lines: {}", self.lines),
        ]
    }

    fn controls(&self) -> &'static str
    {
        "Left/Right move  Up rotate  Down soft drop  Space hard drop"
    }

    fn outcome(&self) -> Option<Outcome>
    {
        if !self.over {
            return None;
        }
        Some(
            Outcome::new(Some(self.score), false)
                .line("The ledger overflowed.")
                .stat("lines", self.lines as i64)
                .stat("level", self.level as i64),
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::testing::run_ticks;

    fn fill_row(game: &mut Blocks, row: usize, gap: Option<usize>)
    {
        for c in 0..COLS {
            if Some(c) != gap {
                game.board[row][c] = Some(Rgb::GREY);
            }
        }
    }

    fn place(game: &mut Blocks, kind: usize)
    {
        let mut piece = Piece::of(&TETROMINOES[kind]);
        piece.x = (COLS / 2) as i32 - (piece.shape[0].len() / 2) as i32;
        game.current = Some(piece);
    }

    #[test]
    fn rotation_is_clockwise()
    {
        let t = Piece::of(&TETROMINOES[2]).shape;
        let turned = rotate(&t);
        assert_eq!(turned, vec![vec![true, false], vec![true, true], vec![true, false]]);
        assert_eq!(rotate(&rotate(&rotate(&turned))), t);
    }

    #[test]
    fn pieces_spawn_centered()
    {
        let mut game = Blocks::new(1);
        place(&mut game, 0);
        assert_eq!(game.current.as_ref().unwrap().x, 3);
        place(&mut game, 1);
        assert_eq!(game.current.as_ref().unwrap().x, 4);
    }

    #[test]
    fn walls_and_stack_block_movement()
    {
        let mut game = Blocks::new(2);
        place(&mut game, 1);
        for _ in 0..10 {
            game.input(Key::Left);
        }
        assert_eq!(game.current.as_ref().unwrap().x, 0);
        game.input(Key::Space);
        assert_eq!(game.board[19][0], Some(TETROMINOES[1].color));
        assert_eq!(game.board[18][1], Some(TETROMINOES[1].color));
    }

    #[test]
    fn gravity_follows_level_interval()
    {
        assert_eq!(drop_interval(1), Duration::from_millis(800));
        assert_eq!(drop_interval(5), Duration::from_millis(520));
        assert_eq!(drop_interval(20), Duration::from_millis(100));

        let mut game = Blocks::new(3);
        place(&mut game, 1);
        run_ticks(&mut game, 47);
        assert_eq!(game.current.as_ref().unwrap().y, 0);
        run_ticks(&mut game, 1);
        assert_eq!(game.current.as_ref().unwrap().y, 1);
    }

    #[test]
    fn clears_flash_then_collapse()
    {
        let mut game = Blocks::new(4);
        fill_row(&mut game, 19, Some(4));
        fill_row(&mut game, 18, Some(4));
        game.board[17][0] = Some(Rgb::RED);
        game.current = Some(Piece {
            shape: rotate(&Piece::of(&TETROMINOES[0]).shape),
            color: Rgb::BLUE,
            label: "Wire Transfer",
            x: 4,
            y: 0,
        });
        game.input(Key::Space);
        assert_eq!(game.clearing, vec![19, 18]);
        assert_eq!(game.score, 300);
        assert!(game.current.is_none());

        // frozen while flashing
        game.input(Key::Left);
        run_ticks(&mut game, 8);
        assert_eq!(game.clearing.len(), 2);
        run_ticks(&mut game, 1);
        assert!(game.clearing.is_empty());
        assert!(game.current.is_some());
        assert_eq!(game.board[19][0], Some(Rgb::RED));
        assert_eq!(game.board[19][4], Some(Rgb::BLUE));
        assert_eq!(game.board[19][1], None);
    }

    #[test]
    fn score_scales_with_level()
    {
        let mut game = Blocks::new(5);
        game.lines = 19;
        game.level = 2;
        fill_row(&mut game, 19, None);
        assert!(game.mark_full_rows());
        assert_eq!(game.score, 200);
        assert_eq!(game.level, 3);
    }

    #[test]
    fn blocked_spawn_ends_the_game()
    {
        let mut game = Blocks::new(6);
        for row in 0..ROWS {
            fill_row(&mut game, row, Some(row % COLS));
        }
        game.current = None;
        game.spawn();
        let outcome = game.outcome().unwrap();
        assert!(!outcome.won);
        game.input(Key::Space);
        assert!(game.current.is_none());
    }
}
