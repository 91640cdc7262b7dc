//! # Keypad Input
//!
//! 4x4 matrix keypad handling: a queue-number entry buffer plus a small
//! operator menu.
//!
//! ## Key Map
//! ```text
//! ┌───┬───┬───┬───┐
//! │ 1 │ 2 │ 3 │ A │   0-9  append digit (max 3)
//! ├───┼───┼───┼───┤   #    confirm queue override / close menu
//! │ 4 │ 5 │ 6 │ B │   *    cancel input
//! ├───┼───┼───┼───┤   A    open menu
//! │ 7 │ 8 │ 9 │ C │
//! ├───┼───┼───┼───┤   Menu: 1 heartbeat      2 enable registration
//! │ * │ 0 │ # │ D │         3 disable reg.   4 sync device profile
//! └───┴───┴───┴───┘
//! ```
//!
//! Input left idle longer than the timeout is discarded.

use std::time::{Duration, Instant};

/// Digits accepted for a queue number.
pub const MAX_KEYPAD_DIGITS: usize = 3;

/// Menu entries reachable with `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSelection {
    SendHeartbeat,
    EnableRegistration,
    DisableRegistration,
    SyncProfile,
}

/// What a key press asks the controller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadAction {
    /// Key had no effect.
    Ignored,
    /// The entry buffer now reads this.
    BufferChanged(String),
    /// Queue override confirmed with `#`.
    Submit(u32),
    /// Input cleared with `*`.
    Cancelled,
    MenuOpened,
    MenuClosed,
    Menu(MenuSelection),
    /// Unknown key while the menu is open; menu stays open.
    InvalidSelection(char),
}

#[derive(Debug, Clone)]
pub struct KeypadInput {
    buffer: String,
    menu_open: bool,
    last_input: Option<Instant>,
    timeout: Duration,
}

impl KeypadInput {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffer: String::new(),
            menu_open: false,
            last_input: None,
            timeout,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    /// Whether there is input that the idle timeout could discard.
    pub fn is_active(&self) -> bool {
        self.menu_open || !self.buffer.is_empty()
    }

    /// Handles one key press.
    pub fn press(&mut self, key: char, now: Instant) -> KeypadAction {
        self.last_input = Some(now);

        if self.menu_open {
            return self.menu_key(key);
        }

        match key {
            'A' | 'a' => {
                self.menu_open = true;
                KeypadAction::MenuOpened
            }
            '#' => match self.buffer.parse::<u32>() {
                Ok(number) => {
                    self.clear();
                    KeypadAction::Submit(number)
                }
                Err(_) => KeypadAction::Ignored,
            },
            '*' => {
                self.clear();
                KeypadAction::Cancelled
            }
            d if d.is_ascii_digit() => {
                if self.buffer.len() >= MAX_KEYPAD_DIGITS {
                    return KeypadAction::Ignored;
                }
                self.buffer.push(d);
                KeypadAction::BufferChanged(self.buffer.clone())
            }
            _ => KeypadAction::Ignored,
        }
    }

    /// Discards idle input. Returns true when something was cleared.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_input else {
            return false;
        };
        if !self.is_active() || now.saturating_duration_since(last) <= self.timeout {
            return false;
        }
        self.clear();
        true
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.menu_open = false;
    }

    fn menu_key(&mut self, key: char) -> KeypadAction {
        let selection = match key {
            '1' => MenuSelection::SendHeartbeat,
            '2' => MenuSelection::EnableRegistration,
            '3' => MenuSelection::DisableRegistration,
            '4' => MenuSelection::SyncProfile,
            '#' => {
                self.menu_open = false;
                return KeypadAction::MenuClosed;
            }
            other => return KeypadAction::InvalidSelection(other),
        };
        self.menu_open = false;
        KeypadAction::Menu(selection)
    }
}
