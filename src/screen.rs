use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::geom::{Rect, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb
{
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb
{
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GREY: Rgb = Rgb::new(120, 120, 120);
    pub const RED: Rgb = Rgb::new(230, 60, 60);
    pub const GREEN: Rgb = Rgb::new(0, 200, 90);
    pub const YELLOW: Rgb = Rgb::new(240, 200, 40);
    pub const ORANGE: Rgb = Rgb::new(255, 140, 0);
    pub const BLUE: Rgb = Rgb::new(80, 140, 255);
    pub const CYAN: Rgb = Rgb::new(60, 210, 230);
    pub const PURPLE: Rgb = Rgb::new(170, 90, 230);
    pub const PINK: Rgb = Rgb::new(240, 100, 180);

    pub const fn new(r: u8, g: u8, b: u8) -> Self
    {
        Self { r, g, b }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell
{
    pub ch: char,
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
}

impl Cell
{
    pub const BLANK: Cell = Cell {
        ch: ' ',
        fg: None,
        bg: None,
    };
}

/// Size of a playfield in world pixels. Free-moving games keep their
/// physics in these units and let the canvas scale them down to cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct World
{
    pub width: f32,
    pub height: f32,
}

impl World
{
    pub const fn new(width: f32, height: f32) -> Self
    {
        Self { width, height }
    }
}

/// Character grid a game draws into once per rendered frame.
pub struct Canvas
{
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas
{
    pub fn new(width: usize, height: usize) -> Self
    {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; width * height],
        }
    }

    pub fn width(&self) -> usize
    {
        self.width
    }

    pub fn height(&self) -> usize
    {
        self.height
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> Option<&Cell>
    {
        if x < self.width && y < self.height {
            self.cells.get(y * self.width + x)
        } else {
            None
        }
    }

    fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell>
    {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get_mut(y * self.width + x)
    }

    /// Writes one character. Out-of-bounds writes are dropped.
    pub fn put(&mut self, x: i32, y: i32, ch: char, fg: Option<Rgb>)
    {
        if let Some(cell) = self.cell_mut(x, y) {
            cell.ch = ch;
            cell.fg = fg;
        }
    }

    pub fn put_bg(&mut self, x: i32, y: i32, bg: Rgb)
    {
        if let Some(cell) = self.cell_mut(x, y) {
            cell.bg = Some(bg);
        }
    }

    pub fn text(&mut self, x: i32, y: i32, text: &str, fg: Option<Rgb>)
    {
        for (offset, ch) in text.chars().enumerate() {
            self.put(x + offset as i32, y, ch, fg);
        }
    }

    /// Fills a block of cells.
    pub fn fill(&mut self, x: i32, y: i32, w: i32, h: i32, ch: char, fg: Option<Rgb>)
    {
        for row in y..y + h {
            for col in x..x + w {
                self.put(col, row, ch, fg);
            }
        }
    }

    /// Cell holding the world point.
    pub fn to_cell(&self, world: World, point: Vec2) -> (i32, i32)
    {
        let sx = self.width as f32 / world.width;
        let sy = self.height as f32 / world.height;
        ((point.x * sx).floor() as i32, (point.y * sy).floor() as i32)
    }

    /// Fills the cells a world rectangle covers. A non-empty rectangle always
    /// covers at least one cell, however small it scales.
    pub fn fill_world(&mut self, world: World, rect: Rect, ch: char, fg: Option<Rgb>)
    {
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return;
        }
        let sx = self.width as f32 / world.width;
        let sy = self.height as f32 / world.height;
        let x0 = (rect.x * sx).floor() as i32;
        let y0 = (rect.y * sy).floor() as i32;
        let x1 = ((rect.right() * sx).ceil() as i32).max(x0 + 1);
        let y1 = ((rect.bottom() * sy).ceil() as i32).max(y0 + 1);
        self.fill(x0, y0, x1 - x0, y1 - y0, ch, fg);
    }

    /// Writes text centered on a world point.
    pub fn text_world(&mut self, world: World, center: Vec2, text: &str, fg: Option<Rgb>)
    {
        let (x, y) = self.to_cell(world, center);
        let half = text.chars().count() as i32 / 2;
        self.text(x - half, y, text, fg);
    }

    pub fn lines(&self) -> Vec<String>
    {
        self.cells.chunks(self.width).map(render_row).collect()
    }
}

/// Renders a row with 24-bit color escapes, switching colors only when they
/// change between neighbouring cells.
pub fn render_row(row: &[Cell]) -> String
{
    let mut line = String::with_capacity(row.len() + 16);
    let mut active: (Option<Rgb>, Option<Rgb>) = (None, None);
    for cell in row {
        let wanted = (cell.fg, cell.bg);
        if wanted != active {
            line.push_str("\x1b[0m");
            if let Some(color) = cell.fg {
                line.push_str(&ansi_fg(color));
            }
            if let Some(color) = cell.bg {
                line.push_str(&ansi_bg(color));
            }
            active = wanted;
        }
        line.push(cell.ch);
    }
    if active != (None, None) {
        line.push_str("\x1b[0m");
    }
    line
}

fn ansi_fg(color: Rgb) -> String
{
    format!("\x1b[38;2;{};{};{}m", color.r, color.g, color.b)
}

fn ansi_bg(color: Rgb) -> String
{
    format!("\x1b[48;2;{};{};{}m", color.r, color.g, color.b)
}

/// Playfield size in cells, leaving room for the header and footer lines.
pub fn field_size(header_lines: usize, footer_lines: usize) -> (usize, usize)
{
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let extra = header_lines + footer_lines + 2;
    let height = (rows as usize).saturating_sub(extra).clamp(8, 40);
    let width = (cols as usize).saturating_sub(2).clamp(20, 120);
    (width, height)
}

pub struct TerminalGuard
{
    stdout: Stdout,
    enhanced: bool,
}

impl TerminalGuard
{
    pub fn enter() -> io::Result<Self>
    {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        log::debug!("terminal entered, key release events: {enhanced}");
        Ok(Self { stdout, enhanced })
    }

    /// Whether the terminal reports key releases.
    pub fn reports_releases(&self) -> bool
    {
        self.enhanced
    }

    pub fn stdout(&mut self) -> &mut Stdout
    {
        &mut self.stdout
    }
}

impl Drop for TerminalGuard
{
    fn drop(&mut self)
    {
        if self.enhanced {
            let _ = execute!(self.stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

pub fn present(stdout: &mut Stdout, lines: &[String]) -> io::Result<()>
{
    let output = format!("{}\r\n", lines.join("\r\n"));
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    stdout.write_all(output.as_bytes())?;
    stdout.flush()
}
