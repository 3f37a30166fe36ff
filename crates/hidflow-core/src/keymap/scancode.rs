//! PC/AT scancode set 1 to HID Usage ID translation.
//!
//! Barrier and Deskflow send the physical scancode of a key in the `button`
//! field of key events. Plain make codes occupy 0x00–0x7F. Extended keys (the
//! ones a real keyboard prefixes with `E0`) arrive with a marker in the high
//! byte, and two conventions are seen in the wild: `0x01xx` and `0xE0xx`.
//!
//! Reference: IBM PC/AT keyboard technical reference, scancode set 1.

use super::hid::HidKeyCode;

/// High byte marking an extended scancode, Barrier convention.
pub const EXTENDED_PREFIX: u16 = 0x0100;

/// High byte marking an extended scancode, raw `E0` convention.
pub const E0_PREFIX: u16 = 0xE000;

/// Translates a set 1 make code (0x00–0x7F) to a [`HidKeyCode`].
///
/// Returns `None` for unassigned codes and for anything above 0x7F.
pub fn scancode_to_hid(code: u8) -> Option<HidKeyCode> {
    let key = match code {
        0x01 => HidKeyCode::Escape,
        0x02 => HidKeyCode::Digit1,
        0x03 => HidKeyCode::Digit2,
        0x04 => HidKeyCode::Digit3,
        0x05 => HidKeyCode::Digit4,
        0x06 => HidKeyCode::Digit5,
        0x07 => HidKeyCode::Digit6,
        0x08 => HidKeyCode::Digit7,
        0x09 => HidKeyCode::Digit8,
        0x0A => HidKeyCode::Digit9,
        0x0B => HidKeyCode::Digit0,
        0x0C => HidKeyCode::Minus,
        0x0D => HidKeyCode::Equal,
        0x0E => HidKeyCode::Backspace,
        0x0F => HidKeyCode::Tab,
        0x10 => HidKeyCode::KeyQ,
        0x11 => HidKeyCode::KeyW,
        0x12 => HidKeyCode::KeyE,
        0x13 => HidKeyCode::KeyR,
        0x14 => HidKeyCode::KeyT,
        0x15 => HidKeyCode::KeyY,
        0x16 => HidKeyCode::KeyU,
        0x17 => HidKeyCode::KeyI,
        0x18 => HidKeyCode::KeyO,
        0x19 => HidKeyCode::KeyP,
        0x1A => HidKeyCode::BracketLeft,
        0x1B => HidKeyCode::BracketRight,
        0x1C => HidKeyCode::Enter,
        0x1D => HidKeyCode::ControlLeft,
        0x1E => HidKeyCode::KeyA,
        0x1F => HidKeyCode::KeyS,
        0x20 => HidKeyCode::KeyD,
        0x21 => HidKeyCode::KeyF,
        0x22 => HidKeyCode::KeyG,
        0x23 => HidKeyCode::KeyH,
        0x24 => HidKeyCode::KeyJ,
        0x25 => HidKeyCode::KeyK,
        0x26 => HidKeyCode::KeyL,
        0x27 => HidKeyCode::Semicolon,
        0x28 => HidKeyCode::Quote,
        0x29 => HidKeyCode::Backquote,
        0x2A => HidKeyCode::ShiftLeft,
        0x2B => HidKeyCode::Backslash,
        0x2C => HidKeyCode::KeyZ,
        0x2D => HidKeyCode::KeyX,
        0x2E => HidKeyCode::KeyC,
        0x2F => HidKeyCode::KeyV,
        0x30 => HidKeyCode::KeyB,
        0x31 => HidKeyCode::KeyN,
        0x32 => HidKeyCode::KeyM,
        0x33 => HidKeyCode::Comma,
        0x34 => HidKeyCode::Period,
        0x35 => HidKeyCode::Slash,
        0x36 => HidKeyCode::ShiftRight,
        0x37 => HidKeyCode::NumpadMultiply,
        0x38 => HidKeyCode::AltLeft,
        0x39 => HidKeyCode::Space,
        0x3A => HidKeyCode::CapsLock,
        0x3B => HidKeyCode::F1,
        0x3C => HidKeyCode::F2,
        0x3D => HidKeyCode::F3,
        0x3E => HidKeyCode::F4,
        0x3F => HidKeyCode::F5,
        0x40 => HidKeyCode::F6,
        0x41 => HidKeyCode::F7,
        0x42 => HidKeyCode::F8,
        0x43 => HidKeyCode::F9,
        0x44 => HidKeyCode::F10,
        0x45 => HidKeyCode::NumLock,
        0x46 => HidKeyCode::ScrollLock,
        0x47 => HidKeyCode::Numpad7,
        0x48 => HidKeyCode::Numpad8,
        0x49 => HidKeyCode::Numpad9,
        0x4A => HidKeyCode::NumpadSubtract,
        0x4B => HidKeyCode::Numpad4,
        0x4C => HidKeyCode::Numpad5,
        0x4D => HidKeyCode::Numpad6,
        0x4E => HidKeyCode::NumpadAdd,
        0x4F => HidKeyCode::Numpad1,
        0x50 => HidKeyCode::Numpad2,
        0x51 => HidKeyCode::Numpad3,
        0x52 => HidKeyCode::Numpad0,
        0x53 => HidKeyCode::NumpadDecimal,
        // 0x54-0x56: SysRq and the ISO extra key, not forwarded
        0x57 => HidKeyCode::F11,
        0x58 => HidKeyCode::F12,
        _ => return None,
    };
    Some(key)
}

/// Translates the low byte of an extended scancode.
///
/// `prefix` is either [`EXTENDED_PREFIX`] or [`E0_PREFIX`]. Keypad Enter and
/// keypad `/` are only recognized under the `0x01xx` convention.
pub fn extended_to_hid(prefix: u16, code: u8) -> Option<HidKeyCode> {
    let key = match code {
        0x47 => HidKeyCode::Home,
        0x4F => HidKeyCode::End,
        0x49 => HidKeyCode::PageUp,
        0x51 => HidKeyCode::PageDown,
        0x52 => HidKeyCode::Insert,
        0x53 => HidKeyCode::Delete,
        0x48 => HidKeyCode::ArrowUp,
        0x50 => HidKeyCode::ArrowDown,
        0x4B => HidKeyCode::ArrowLeft,
        0x4D => HidKeyCode::ArrowRight,
        0x1D => HidKeyCode::ControlRight,
        0x38 => HidKeyCode::AltRight,
        0x5B => HidKeyCode::MetaLeft,
        0x5C => HidKeyCode::MetaRight,
        0x5D => HidKeyCode::ContextMenu,
        0x37 => HidKeyCode::PrintScreen,
        0x1C if prefix == EXTENDED_PREFIX => HidKeyCode::NumpadEnter,
        0x35 if prefix == EXTENDED_PREFIX => HidKeyCode::NumpadDivide,
        _ => return None,
    };
    Some(key)
}
