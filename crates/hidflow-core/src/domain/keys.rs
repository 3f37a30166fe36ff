//! Held-key tracking for keyboard reports.
//!
//! A keyboard report always describes the complete set of held keys. Rebuilding
//! it from this state after every change, instead of toggling single keys on
//! the host, means a lost release is corrected by the next report.

use crate::domain::report::{KeyboardReport, MAX_HELD_KEYS};
use crate::keymap::hid::HidKeyCode;

/// A translated key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: HidKeyCode,
    /// HID modifier byte derived from the wire modifier mask.
    pub modifiers: u8,
    pub pressed: bool,
    /// `true` for auto-repeat, which always arrives as a press.
    pub repeat: bool,
}

/// Keys and modifiers currently held on the host.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    /// Modifier keys held down as keys, as report modifier bits.
    held_modifiers: u8,
    /// Modifier bits from the wire mask of the latest event.
    wire_modifiers: u8,
    /// Ordinary keys in press order.
    keys: Vec<HidKeyCode>,
}

impl KeyState {
    pub fn new() -> Self {
        Self {
            held_modifiers: 0,
            wire_modifiers: 0,
            keys: Vec::with_capacity(MAX_HELD_KEYS),
        }
    }

    /// Applies a key event. Returns `true` if the report changed.
    pub fn apply(&mut self, event: &KeyEvent) -> bool {
        if event.pressed {
            self.press(event.key, event.modifiers)
        } else {
            self.release(event.key, event.modifiers)
        }
    }

    /// Marks `key` as held. Returns `true` if the report changed.
    ///
    /// A seventh ordinary key is not tracked; the boot report has six slots.
    pub fn press(&mut self, key: HidKeyCode, modifiers: u8) -> bool {
        let before = self.report();
        self.wire_modifiers = modifiers;

        match key.modifier_bit() {
            Some(bit) => self.held_modifiers |= bit,
            None => {
                if !self.keys.contains(&key) && self.keys.len() < MAX_HELD_KEYS {
                    self.keys.push(key);
                }
            }
        }
        self.report() != before
    }

    /// Marks `key` as released. Returns `true` if the report changed.
    ///
    /// The released key's own modifier bit is removed from the wire mask too,
    /// and the wire mask is dropped entirely once nothing is held.
    pub fn release(&mut self, key: HidKeyCode, modifiers: u8) -> bool {
        let before = self.report();
        self.wire_modifiers = modifiers;

        match key.modifier_bit() {
            Some(bit) => {
                self.held_modifiers &= !bit;
                self.wire_modifiers &= !bit;
            }
            None => self.keys.retain(|held| *held != key),
        }
        if self.keys.is_empty() && self.held_modifiers == 0 {
            self.wire_modifiers = 0;
        }
        self.report() != before
    }

    /// Releases everything. Returns `true` if anything was held.
    pub fn release_all(&mut self) -> bool {
        let had_any = !self.report().is_empty();
        self.held_modifiers = 0;
        self.wire_modifiers = 0;
        self.keys.clear();
        had_any
    }

    pub fn held_keys(&self) -> &[HidKeyCode] {
        &self.keys
    }

    /// Builds the report for the current state.
    pub fn report(&self) -> KeyboardReport {
        let mut report = KeyboardReport {
            modifiers: self.held_modifiers | self.wire_modifiers,
            ..KeyboardReport::EMPTY
        };
        for (slot, key) in report.keys.iter_mut().zip(&self.keys) {
            *slot = key.as_u8();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_adds_key_and_wire_modifiers() {
        // Arrange
        let mut state = KeyState::new();

        // Act
        let changed = state.press(HidKeyCode::KeyA, 0x02);

        // Assert
        assert!(changed);
        assert_eq!(
            state.report(),
            KeyboardReport { modifiers: 0x02, keys: [0x04, 0, 0, 0, 0, 0] }
        );
    }

    #[test]
    fn test_repeated_press_of_held_key_changes_nothing() {
        // Arrange
        let mut state = KeyState::new();
        state.press(HidKeyCode::KeyB, 0);

        // Act / Assert
        assert!(!state.press(HidKeyCode::KeyB, 0));
        assert_eq!(state.held_keys(), &[HidKeyCode::KeyB]);
    }

    #[test]
    fn test_same_held_set_applied_twice_gives_same_report() {
        // Arrange
        let mut state = KeyState::new();
        let held = [
            KeyEvent { key: HidKeyCode::ShiftLeft, modifiers: 0x02, pressed: true, repeat: false },
            KeyEvent { key: HidKeyCode::KeyH, modifiers: 0x02, pressed: true, repeat: false },
        ];
        let first: Vec<bool> = held.iter().map(|event| state.apply(event)).collect();
        let first_report = state.report();

        // Act
        let second: Vec<bool> = held.iter().map(|event| state.apply(event)).collect();

        // Assert
        assert_eq!(first, vec![true, true]);
        assert_eq!(second, vec![false, false]);
        assert_eq!(state.report(), first_report);
        assert_eq!(first_report, KeyboardReport { modifiers: 0x02, keys: [0x0B, 0, 0, 0, 0, 0] });
    }

    #[test]
    fn test_release_removes_only_that_key_and_keeps_order() {
        // Arrange
        let mut state = KeyState::new();
        state.press(HidKeyCode::KeyA, 0);
        state.press(HidKeyCode::KeyB, 0);
        state.press(HidKeyCode::KeyC, 0);

        // Act
        let changed = state.release(HidKeyCode::KeyB, 0);

        // Assert
        assert!(changed);
        assert_eq!(state.report().keys, [0x04, 0x06, 0, 0, 0, 0]);
    }

    #[test]
    fn test_modifier_keys_go_into_modifier_byte_not_key_slots() {
        // Arrange
        let mut state = KeyState::new();

        // Act
        state.press(HidKeyCode::ControlRight, 0);
        state.press(HidKeyCode::KeyC, 0);

        // Assert
        assert_eq!(
            state.report(),
            KeyboardReport { modifiers: 0x10, keys: [0x06, 0, 0, 0, 0, 0] }
        );
    }

    #[test]
    fn test_releasing_shift_key_clears_its_wire_bit() {
        // Arrange: shift arrives both as a key and in the mask
        let mut state = KeyState::new();
        state.press(HidKeyCode::ShiftLeft, 0x02);
        state.press(HidKeyCode::KeyA, 0x02);

        // Act
        state.release(HidKeyCode::ShiftLeft, 0x02);

        // Assert
        assert_eq!(state.report().modifiers, 0);
    }

    #[test]
    fn test_wire_modifiers_dropped_once_nothing_held() {
        // Arrange
        let mut state = KeyState::new();
        state.press(HidKeyCode::KeyA, 0x01);

        // Act
        state.release(HidKeyCode::KeyA, 0x01);

        // Assert
        assert!(state.report().is_empty());
    }

    #[test]
    fn test_seventh_key_is_not_tracked() {
        // Arrange
        let mut state = KeyState::new();
        let keys = [
            HidKeyCode::KeyA,
            HidKeyCode::KeyB,
            HidKeyCode::KeyC,
            HidKeyCode::KeyD,
            HidKeyCode::KeyE,
            HidKeyCode::KeyF,
        ];
        for key in keys {
            state.press(key, 0);
        }

        // Act
        let changed = state.press(HidKeyCode::KeyG, 0);

        // Assert
        assert!(!changed);
        assert_eq!(state.held_keys().len(), 6);
    }

    #[test]
    fn test_release_all_reports_whether_anything_was_held() {
        // Arrange
        let mut state = KeyState::new();
        state.press(HidKeyCode::Space, 0);

        // Act / Assert
        assert!(state.release_all());
        assert!(!state.release_all());
        assert!(state.report().is_empty());
    }

    #[test]
    fn test_apply_dispatches_on_pressed_flag() {
        // Arrange
        let mut state = KeyState::new();
        let down = KeyEvent { key: HidKeyCode::Enter, modifiers: 0, pressed: true, repeat: false };
        let up = KeyEvent { pressed: false, ..down };

        // Act / Assert
        assert!(state.apply(&down));
        assert!(state.apply(&up));
        assert!(state.report().is_empty());
    }
}
