//! Keyboard input: maps terminal key events to control press/release
//!
//! Key repeat itself is synthesized by the simulation from press/release,
//! so terminal auto-repeat events never reach the game as new presses.
//! Many terminals never send release events. There a held key is treated as
//! released once it has been quiet for [`KEY_TIMEOUT`], which must outlast
//! the terminal's initial auto-repeat delay. Releasing such a key therefore
//! stops it only after that timeout. Terminals that report releases switch
//! the timeout off.

use crate::game::Control;
use crate::settings::Settings;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Time after which we consider a key "released" if no repeat received
const KEY_TIMEOUT: Duration = Duration::from_millis(600);

/// A control going down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Press(Control),
    Release(Control),
}

/// Parse a key name from the settings file into a KeyCode
pub fn parse_key(s: &str) -> Option<KeyCode> {
    let lower = s.to_lowercase();
    let code = match lower.as_str() {
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "space" => KeyCode::Char(' '),
        "enter" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "esc" | "escape" => KeyCode::Esc,
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(code)
}

/// Key bindings configuration - supports multiple keys per control
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub move_left: Vec<KeyCode>,
    pub move_right: Vec<KeyCode>,
    pub soft_drop: Vec<KeyCode>,
    pub rotate: Vec<KeyCode>,
    pub quit: Vec<KeyCode>,
}

impl KeyBindings {
    /// Parse a list of key strings into KeyCodes, skipping unknown names
    fn parse_keys(keys: &[String]) -> Vec<KeyCode> {
        keys.iter().filter_map(|s| parse_key(s)).collect()
    }

    /// Create keybindings from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            move_left: Self::parse_keys(&settings.keys.move_left),
            move_right: Self::parse_keys(&settings.keys.move_right),
            soft_drop: Self::parse_keys(&settings.keys.soft_drop),
            rotate: Self::parse_keys(&settings.keys.rotate),
            quit: Self::parse_keys(&settings.keys.quit),
        }
    }

    /// Which control a key is bound to
    pub fn control_for(&self, code: KeyCode) -> Option<Control> {
        let code = normalize_key(code);
        if self.move_left.contains(&code) {
            Some(Control::Left)
        } else if self.move_right.contains(&code) {
            Some(Control::Right)
        } else if self.soft_drop.contains(&code) {
            Some(Control::Down)
        } else if self.rotate.contains(&code) {
            Some(Control::Rotate)
        } else if self.quit.contains(&code) {
            Some(Control::Quit)
        } else {
            None
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Tracks which holdable controls are down
pub struct InputHandler {
    bindings: KeyBindings,
    /// Last event time for held left/right/down keys
    held: Vec<(Control, Instant)>,
    /// Set once the terminal has sent a real release event
    releases_reported: bool,
}

impl InputHandler {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            held: Vec::new(),
            releases_reported: false,
        }
    }

    /// Create input handler from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(KeyBindings::from_settings(settings))
    }

    /// Translate a key event, returns None for unbound keys, for repeats
    /// of a key that is already held and for auto-repeats of rotate or quit
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<KeyInput> {
        // Handle Ctrl+C for quit
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(KeyInput::Press(Control::Quit));
        }

        let control = self.bindings.control_for(key.code)?;

        if key.kind == KeyEventKind::Release {
            self.releases_reported = true;
            self.held.retain(|(c, _)| *c != control);
            return Some(KeyInput::Release(control));
        }

        if !is_holdable(control) {
            if key.kind == KeyEventKind::Repeat {
                return None;
            }
            return Some(KeyInput::Press(control));
        }

        if let Some((_, last_seen)) = self.held.iter_mut().find(|(c, _)| *c == control) {
            *last_seen = now;
            return None;
        }
        self.held.push((control, now));
        Some(KeyInput::Press(control))
    }

    /// Release held keys that have gone quiet (call every frame)
    pub fn expire(&mut self, now: Instant) -> Vec<Control> {
        if self.releases_reported {
            return Vec::new();
        }
        let mut released = Vec::new();
        self.held.retain(|&(control, last_seen)| {
            if now.saturating_duration_since(last_seen) > KEY_TIMEOUT {
                released.push(control);
                false
            } else {
                true
            }
        });
        released
    }
}

fn is_holdable(control: Control) -> bool {
    matches!(control, Control::Left | Control::Right | Control::Down)
}

/// Normalize key codes for consistent handling
fn normalize_key(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn repeat(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Repeat)
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Release)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("Left"), Some(KeyCode::Left));
        assert_eq!(parse_key("ESCAPE"), Some(KeyCode::Esc));
        assert_eq!(parse_key("space"), Some(KeyCode::Char(' ')));
        assert_eq!(parse_key("X"), Some(KeyCode::Char('x')));
        assert_eq!(parse_key("Hyper"), None);
        assert_eq!(parse_key(""), None);
    }

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.control_for(KeyCode::Left), Some(Control::Left));
        assert_eq!(bindings.control_for(KeyCode::Down), Some(Control::Down));
        assert_eq!(bindings.control_for(KeyCode::Up), Some(Control::Rotate));
        assert_eq!(bindings.control_for(KeyCode::Char('X')), Some(Control::Rotate));
        assert_eq!(bindings.control_for(KeyCode::Esc), Some(Control::Quit));
        assert_eq!(bindings.control_for(KeyCode::Char('k')), None);
    }

    #[test]
    fn test_repeated_press_is_swallowed() {
        let mut input = InputHandler::new(KeyBindings::default());
        let t0 = Instant::now();
        assert_eq!(
            input.handle_key(press(KeyCode::Left), t0),
            Some(KeyInput::Press(Control::Left))
        );
        assert_eq!(input.handle_key(press(KeyCode::Left), t0 + ms(30)), None);
        // Rotation is not held, every press counts
        assert_eq!(
            input.handle_key(press(KeyCode::Up), t0),
            Some(KeyInput::Press(Control::Rotate))
        );
        assert_eq!(
            input.handle_key(press(KeyCode::Up), t0 + ms(30)),
            Some(KeyInput::Press(Control::Rotate))
        );
    }

    #[test]
    fn test_auto_repeat_events_are_swallowed() {
        let mut input = InputHandler::new(KeyBindings::default());
        let t0 = Instant::now();
        assert_eq!(
            input.handle_key(press(KeyCode::Up), t0),
            Some(KeyInput::Press(Control::Rotate))
        );
        assert_eq!(input.handle_key(repeat(KeyCode::Up), t0 + ms(30)), None);
        assert_eq!(input.handle_key(repeat(KeyCode::Esc), t0 + ms(30)), None);

        assert_eq!(
            input.handle_key(press(KeyCode::Left), t0),
            Some(KeyInput::Press(Control::Left))
        );
        assert_eq!(input.handle_key(repeat(KeyCode::Left), t0 + ms(30)), None);
        assert_eq!(
            input.handle_key(release(KeyCode::Left), t0 + ms(60)),
            Some(KeyInput::Release(Control::Left))
        );
    }

    #[test]
    fn test_quiet_key_times_out() {
        let mut input = InputHandler::new(KeyBindings::default());
        let t0 = Instant::now();
        input.handle_key(press(KeyCode::Right), t0);
        // The first auto-repeat arrives after a typical 500ms terminal delay
        let first_repeat = t0 + ms(500);
        assert!(input.expire(first_repeat).is_empty());
        assert_eq!(input.handle_key(press(KeyCode::Right), first_repeat), None);

        assert!(input.expire(first_repeat + KEY_TIMEOUT).is_empty());
        assert_eq!(
            input.expire(first_repeat + KEY_TIMEOUT + ms(1)),
            vec![Control::Right]
        );
        // Pressing again is a fresh press
        assert_eq!(
            input.handle_key(press(KeyCode::Right), first_repeat + KEY_TIMEOUT + ms(20)),
            Some(KeyInput::Press(Control::Right))
        );
    }

    #[test]
    fn test_real_release_disables_timeout() {
        let mut input = InputHandler::new(KeyBindings::default());
        let t0 = Instant::now();
        input.handle_key(press(KeyCode::Down), t0);
        assert_eq!(
            input.handle_key(release(KeyCode::Down), t0 + ms(10)),
            Some(KeyInput::Release(Control::Down))
        );
        input.handle_key(press(KeyCode::Down), t0 + ms(20));
        assert!(input.expire(t0 + ms(5000)).is_empty());
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut input = InputHandler::new(KeyBindings::default());
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(
            input.handle_key(key, Instant::now()),
            Some(KeyInput::Press(Control::Quit))
        );
    }

    #[test]
    fn test_unbound_key_ignored() {
        let mut input = InputHandler::new(KeyBindings::default());
        assert_eq!(input.handle_key(press(KeyCode::Char('k')), Instant::now()), None);
    }
}
