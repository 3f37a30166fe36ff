//! Boot-protocol HID report layouts.
//!
//! ```text
//! keyboard: [modifiers:1][reserved:1][key:1 x 6]
//! mouse:    [buttons:1][dx:i8][dy:i8][wheel:i8]
//! ```

/// Size of an encoded keyboard report.
pub const KEYBOARD_REPORT_LEN: usize = 8;

/// Size of an encoded mouse report.
pub const MOUSE_REPORT_LEN: usize = 4;

/// Number of non-modifier keys a boot keyboard report can carry.
pub const MAX_HELD_KEYS: usize = 6;

/// Left button bit of [`MouseReport::buttons`].
pub const BUTTON_LEFT: u8 = 0x01;
/// Right button bit of [`MouseReport::buttons`].
pub const BUTTON_RIGHT: u8 = 0x02;
/// Middle button bit of [`MouseReport::buttons`].
pub const BUTTON_MIDDLE: u8 = 0x04;

/// Full keyboard state as seen by the host.
///
/// Unused key slots are zero. The report always describes the complete held
/// set, so sending the same report twice has no further effect on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; MAX_HELD_KEYS],
}

impl KeyboardReport {
    /// No keys and no modifiers held.
    pub const EMPTY: Self = Self {
        modifiers: 0,
        keys: [0; MAX_HELD_KEYS],
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_LEN] {
        let mut out = [0u8; KEYBOARD_REPORT_LEN];
        out[0] = self.modifiers;
        out[2..].copy_from_slice(&self.keys);
        out
    }
}

/// One relative pointer report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MouseReport {
    pub buttons: u8,
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
}

impl MouseReport {
    /// No buttons, no motion.
    pub const RELEASED: Self = Self {
        buttons: 0,
        dx: 0,
        dy: 0,
        wheel: 0,
    };

    pub fn to_bytes(&self) -> [u8; MOUSE_REPORT_LEN] {
        [self.buttons, self.dx as u8, self.dy as u8, self.wheel as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_report_layout_leaves_reserved_byte_zero() {
        // Arrange
        let report = KeyboardReport {
            modifiers: 0x02,
            keys: [0x04, 0x05, 0, 0, 0, 0],
        };

        // Act
        let bytes = report.to_bytes();

        // Assert
        assert_eq!(bytes, [0x02, 0x00, 0x04, 0x05, 0, 0, 0, 0]);
    }

    #[test]
    fn test_mouse_report_encodes_negative_deltas_as_twos_complement() {
        let report = MouseReport {
            buttons: BUTTON_LEFT | BUTTON_MIDDLE,
            dx: -1,
            dy: -127,
            wheel: 2,
        };
        assert_eq!(report.to_bytes(), [0x05, 0xFF, 0x81, 0x02]);
    }

    #[test]
    fn test_empty_report_is_all_zero() {
        assert!(KeyboardReport::EMPTY.is_empty());
        assert_eq!(KeyboardReport::EMPTY.to_bytes(), [0u8; 8]);
        assert_eq!(MouseReport::RELEASED.to_bytes(), [0u8; 4]);
    }
}
