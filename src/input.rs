use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key
{
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Backspace,
    Tab,
    /// Letters are always lower case.
    Char(char),
}

impl Key
{
    fn from_code(code: KeyCode) -> Option<Key>
    {
        let key = match code {
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Tab => Key::Tab,
            KeyCode::Char(' ') => Key::Space,
            KeyCode::Char(ch) => Key::Char(ch.to_ascii_lowercase()),
            _ => return None,
        };
        Some(key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command
{
    Quit,
    Pause,
    Restart,
    Key(Key),
    Release(Key),
}

/// Maps a terminal key event to a session command. Games that take typed
/// letters get `p` and `r` as plain keys; Ctrl-P and Ctrl-R still work.
pub fn translate(event: &KeyEvent, text_input: bool) -> Option<Command>
{
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    if event.kind == KeyEventKind::Release {
        return Key::from_code(event.code).map(Command::Release);
    }

    match event.code {
        KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => Some(Command::Quit),
        KeyCode::Char('p') | KeyCode::Char('P') if ctrl || !text_input => Some(Command::Pause),
        KeyCode::Char('r') | KeyCode::Char('R') if ctrl || !text_input => Some(Command::Restart),
        _ if ctrl => None,
        code => Key::from_code(code).map(Command::Key),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hold
{
    Ticks(u32),
    UntilRelease,
}

/// Keys currently considered pressed. Without release events a press holds
/// the key for a fixed number of ticks and auto-repeat keeps refreshing it.
pub struct HeldKeys
{
    hold_ticks: u32,
    releases: bool,
    keys: HashMap<Key, Hold>,
}

impl HeldKeys
{
    pub fn new(hold_ticks: u32, releases: bool) -> Self
    {
        Self {
            hold_ticks: hold_ticks.max(1),
            releases,
            keys: HashMap::new(),
        }
    }

    pub fn press(&mut self, key: Key)
    {
        let hold = if self.releases {
            Hold::UntilRelease
        } else {
            Hold::Ticks(self.hold_ticks)
        };
        self.keys.insert(key, hold);
    }

    pub fn release(&mut self, key: Key)
    {
        self.keys.remove(&key);
    }

    pub fn is_held(&self, key: Key) -> bool
    {
        self.keys.contains_key(&key)
    }

    /// Ages timed holds by one tick.
    pub fn tick(&mut self)
    {
        self.keys.retain(|_, hold| match hold {
            Hold::Ticks(left) => {
                *left = left.saturating_sub(1);
                *left > 0
            }
            Hold::UntilRelease => true,
        });
    }

    pub fn clear(&mut self)
    {
        self.keys.clear();
    }

    /// -1, 0 or 1 from a pair of opposing keys.
    pub fn axis(&self, negative: Key, positive: Key) -> f32
    {
        let mut value = 0.0;
        if self.is_held(negative) {
            value -= 1.0;
        }
        if self.is_held(positive) {
            value += 1.0;
        }
        value
    }
}

impl Default for HeldKeys
{
    fn default() -> Self
    {
        Self::new(10, false)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent
    {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn letters_are_lowercased()
    {
        let event = press(KeyCode::Char('Q'), KeyModifiers::SHIFT);
        assert_eq!(translate(&event, true), Some(Command::Key(Key::Char('q'))));
    }

    #[test]
    fn pause_and_restart_respect_text_input()
    {
        let p = press(KeyCode::Char('p'), KeyModifiers::NONE);
        assert_eq!(translate(&p, false), Some(Command::Pause));
        assert_eq!(translate(&p, true), Some(Command::Key(Key::Char('p'))));

        let ctrl_r = press(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(translate(&ctrl_r, true), Some(Command::Restart));
    }

    #[test]
    fn escape_and_ctrl_c_quit()
    {
        assert_eq!(translate(&press(KeyCode::Esc, KeyModifiers::NONE), true), Some(Command::Quit));
        let ctrl_c = press(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate(&ctrl_c, false), Some(Command::Quit));
    }

    #[test]
    fn release_events_are_reported()
    {
        let mut event = press(KeyCode::Left, KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(translate(&event, false), Some(Command::Release(Key::Left)));
    }

    #[test]
    fn timed_hold_expires()
    {
        let mut held = HeldKeys::new(2, false);
        held.press(Key::Left);
        assert!(held.is_held(Key::Left));
        held.tick();
        assert!(held.is_held(Key::Left));
        held.tick();
        assert!(!held.is_held(Key::Left));
    }

    #[test]
    fn release_mode_holds_until_released()
    {
        let mut held = HeldKeys::new(1, true);
        held.press(Key::Right);
        for _ in 0..100 {
            held.tick();
        }
        assert_eq!(held.axis(Key::Left, Key::Right), 1.0);
        held.release(Key::Right);
        assert_eq!(held.axis(Key::Left, Key::Right), 0.0);
    }
}
