//! Key code translation from the wire encodings to USB HID.
//!
//! The server sends one 16-bit key value per event. It is looked up in this
//! order:
//!
//! 1. 0x0000–0x007F: a set 1 scancode ([`scancode`]).
//! 2. 0x01xx or 0xE0xx: an extended scancode ([`scancode`]).
//! 3. anything else: an X11 KeySym ([`keysym`]).
//!
//! A value that none of the tables knows is untranslatable and must be dropped
//! by the caller.

pub mod hid;
pub mod keysym;
pub mod scancode;

pub use hid::HidKeyCode;

use scancode::{E0_PREFIX, EXTENDED_PREFIX};

// ── Wire modifier mask ────────────────────────────────────────────────────────

/// Shift bit of the wire modifier mask.
pub const WIRE_SHIFT: u16 = 0x0001;
/// Control bit of the wire modifier mask.
pub const WIRE_CONTROL: u16 = 0x0002;
/// Alt bit of the wire modifier mask.
pub const WIRE_ALT: u16 = 0x0004;
/// Meta (Windows / Command) bit of the wire modifier mask.
pub const WIRE_META: u16 = 0x0008;

/// Translates a key value from a `DKDN`/`DKUP`/`DKRP` frame.
///
/// Returns `None` if no table knows the value.
///
/// # Examples
///
/// ```rust
/// use hidflow_core::keymap::{translate_key, HidKeyCode};
///
/// assert_eq!(translate_key(0x001E), Some(HidKeyCode::KeyA));
/// assert_eq!(translate_key(0xE048), Some(HidKeyCode::ArrowUp));
/// assert_eq!(translate_key(0xFF0D), Some(HidKeyCode::Enter));
/// assert_eq!(translate_key(0x0000), None);
/// ```
pub fn translate_key(key: u16) -> Option<HidKeyCode> {
    if key < 0x80 {
        return scancode::scancode_to_hid(key as u8);
    }
    let prefix = key & 0xFF00;
    if prefix == EXTENDED_PREFIX || prefix == E0_PREFIX {
        if let Some(hid) = scancode::extended_to_hid(prefix, (key & 0x00FF) as u8) {
            return Some(hid);
        }
    }
    keysym::keysym_to_hid(key)
}

/// Translates the wire modifier mask into the HID report modifier byte.
///
/// Only the four base bits are honoured, and each maps to the left-hand
/// modifier. Right-hand modifiers arrive as ordinary extended keys.
pub fn translate_modifiers(mask: u16) -> u8 {
    let mut hid = 0u8;
    if mask & WIRE_SHIFT != 0 {
        hid |= 0x02;
    }
    if mask & WIRE_CONTROL != 0 {
        hid |= 0x01;
    }
    if mask & WIRE_ALT != 0 {
        hid |= 0x04;
    }
    if mask & WIRE_META != 0 {
        hid |= 0x08;
    }
    hid
}
