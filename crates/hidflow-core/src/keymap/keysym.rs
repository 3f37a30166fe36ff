//! X11 KeySym to HID Usage ID translation.
//!
//! Synergy servers send an X11 KeySym in the key `id` field. Some of them put
//! it where a scancode is expected, so the function-key range (0xFFxx) and a
//! few named keys are accepted here as a fallback.
//!
//! X11 KeySym values are defined in X11/keysymdef.h.
//! Reference: https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/keysymdef.h

use super::hid::HidKeyCode;

/// Translates an X11 KeySym to a [`HidKeyCode`].
///
/// Returns `None` for KeySyms outside the supported set.
pub fn keysym_to_hid(keysym: u16) -> Option<HidKeyCode> {
    let key = match keysym {
        0xFF0D => HidKeyCode::Enter,     // XK_Return
        0xFF1B => HidKeyCode::Escape,    // XK_Escape
        0xFF08 => HidKeyCode::Backspace, // XK_BackSpace
        0xFF09 => HidKeyCode::Tab,       // XK_Tab
        0x0020 => HidKeyCode::Space,     // XK_space
        0xFF61 => HidKeyCode::PrintScreen, // XK_Print
        0xFF13 => HidKeyCode::Pause,       // XK_Pause
        0xFF67 => HidKeyCode::ContextMenu, // XK_Menu

        // Navigation
        0xFF50 => HidKeyCode::Home,     // XK_Home
        0xFF57 => HidKeyCode::End,      // XK_End
        0xFF55 => HidKeyCode::PageUp,   // XK_Page_Up
        0xFF56 => HidKeyCode::PageDown, // XK_Page_Down
        0xFF63 => HidKeyCode::Insert,   // XK_Insert
        0xFFFF => HidKeyCode::Delete,   // XK_Delete

        // Arrows
        0xFF51 => HidKeyCode::ArrowLeft,  // XK_Left
        0xFF52 => HidKeyCode::ArrowUp,    // XK_Up
        0xFF53 => HidKeyCode::ArrowRight, // XK_Right
        0xFF54 => HidKeyCode::ArrowDown,  // XK_Down

        // Modifiers
        0xFFE1 => HidKeyCode::ShiftLeft,    // XK_Shift_L
        0xFFE2 => HidKeyCode::ShiftRight,   // XK_Shift_R
        0xFFE3 => HidKeyCode::ControlLeft,  // XK_Control_L
        0xFFE4 => HidKeyCode::ControlRight, // XK_Control_R
        0xFFE9 => HidKeyCode::AltLeft,      // XK_Alt_L
        0xFFEA => HidKeyCode::AltRight,     // XK_Alt_R
        0xFFEB => HidKeyCode::MetaLeft,     // XK_Super_L
        0xFFEC => HidKeyCode::MetaRight,    // XK_Super_R

        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_keys() {
        assert_eq!(keysym_to_hid(0xFF0D), Some(HidKeyCode::Enter));
        assert_eq!(keysym_to_hid(0xFF1B), Some(HidKeyCode::Escape));
        assert_eq!(keysym_to_hid(0xFF08), Some(HidKeyCode::Backspace));
        assert_eq!(keysym_to_hid(0xFF09), Some(HidKeyCode::Tab));
        assert_eq!(keysym_to_hid(0x0020), Some(HidKeyCode::Space));
    }

    #[test]
    fn test_system_keys() {
        assert_eq!(keysym_to_hid(0xFF61), Some(HidKeyCode::PrintScreen));
        assert_eq!(keysym_to_hid(0xFF13), Some(HidKeyCode::Pause));
        assert_eq!(keysym_to_hid(0xFF67), Some(HidKeyCode::ContextMenu));
    }

    #[test]
    fn test_right_hand_modifiers_are_distinct_keys() {
        assert_eq!(keysym_to_hid(0xFFE2), Some(HidKeyCode::ShiftRight));
        assert_eq!(keysym_to_hid(0xFFE4), Some(HidKeyCode::ControlRight));
        assert_eq!(keysym_to_hid(0xFFEA), Some(HidKeyCode::AltRight));
        assert_eq!(keysym_to_hid(0xFFEC), Some(HidKeyCode::MetaRight));
    }

    #[test]
    fn test_unsupported_keysyms_have_no_key() {
        // XK_F1, XK_Num_Lock, XK_Meta_L, XK_a
        for keysym in [0xFFBE, 0xFF7F, 0xFFE7, 0x0061] {
            assert_eq!(keysym_to_hid(keysym), None, "0x{keysym:04X}");
        }
    }
}
