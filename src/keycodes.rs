//! Win32 Virtual-Key code to Linux keycode + PS/2 scan code table.
//!
//! The original implementation this crate tracks pulls this table from a
//! host-side header we don't have in the retrieved sources, so it is
//! authored here directly: every VK code a caller is likely to send,
//! mapped to the `evdev::KeyCode` it should become and the `MSC_SCAN` value
//! a real keyboard would report alongside it (standard PS/2 Set 1 make
//! codes; extended keys use their un-prefixed byte since we never need to
//! round-trip through a real PS/2 controller).

use evdev::KeyCode;

pub struct KeyMapping {
    pub vk: u16,
    pub linux_code: KeyCode,
    pub scan_code: u32,
}

macro_rules! vk_table {
    ($(($vk:expr, $code:ident, $scan:expr)),+ $(,)?) => {
        &[$(KeyMapping { vk: $vk, linux_code: KeyCode::$code, scan_code: $scan }),+]
    };
}

pub static KEY_MAPPINGS: &[KeyMapping] = vk_table![
    (0x08, KEY_BACKSPACE, 0x0E),
    (0x09, KEY_TAB, 0x0F),
    (0x0D, KEY_ENTER, 0x1C),
    (0x10, KEY_LEFTSHIFT, 0x2A),
    (0x11, KEY_LEFTCTRL, 0x1D),
    (0x12, KEY_LEFTALT, 0x38),
    (0x13, KEY_PAUSE, 0x45),
    (0x14, KEY_CAPSLOCK, 0x3A),
    (0x1B, KEY_ESC, 0x01),
    (0x20, KEY_SPACE, 0x39),
    (0x21, KEY_PAGEUP, 0x49),
    (0x22, KEY_PAGEDOWN, 0x51),
    (0x23, KEY_END, 0x4F),
    (0x24, KEY_HOME, 0x47),
    (0x25, KEY_LEFT, 0x4B),
    (0x26, KEY_UP, 0x48),
    (0x27, KEY_RIGHT, 0x4D),
    (0x28, KEY_DOWN, 0x50),
    (0x2C, KEY_SYSRQ, 0x54),
    (0x2D, KEY_INSERT, 0x52),
    (0x2E, KEY_DELETE, 0x53),
    (0x30, KEY_0, 0x0B),
    (0x31, KEY_1, 0x02),
    (0x32, KEY_2, 0x03),
    (0x33, KEY_3, 0x04),
    (0x34, KEY_4, 0x05),
    (0x35, KEY_5, 0x06),
    (0x36, KEY_6, 0x07),
    (0x37, KEY_7, 0x08),
    (0x38, KEY_8, 0x09),
    (0x39, KEY_9, 0x0A),
    (0x41, KEY_A, 0x1E),
    (0x42, KEY_B, 0x30),
    (0x43, KEY_C, 0x2E),
    (0x44, KEY_D, 0x20),
    (0x45, KEY_E, 0x12),
    (0x46, KEY_F, 0x21),
    (0x47, KEY_G, 0x22),
    (0x48, KEY_H, 0x23),
    (0x49, KEY_I, 0x17),
    (0x4A, KEY_J, 0x24),
    (0x4B, KEY_K, 0x25),
    (0x4C, KEY_L, 0x26),
    (0x4D, KEY_M, 0x32),
    (0x4E, KEY_N, 0x31),
    (0x4F, KEY_O, 0x18),
    (0x50, KEY_P, 0x19),
    (0x51, KEY_Q, 0x10),
    (0x52, KEY_R, 0x13),
    (0x53, KEY_S, 0x1F),
    (0x54, KEY_T, 0x14),
    (0x55, KEY_U, 0x16),
    (0x56, KEY_V, 0x2F),
    (0x57, KEY_W, 0x11),
    (0x58, KEY_X, 0x2D),
    (0x59, KEY_Y, 0x15),
    (0x5A, KEY_Z, 0x2C),
    (0x5B, KEY_LEFTMETA, 0x5B),
    (0x5C, KEY_RIGHTMETA, 0x5C),
    (0x5D, KEY_MENU, 0x5D),
    (0x60, KEY_KP0, 0x52),
    (0x61, KEY_KP1, 0x4F),
    (0x62, KEY_KP2, 0x50),
    (0x63, KEY_KP3, 0x51),
    (0x64, KEY_KP4, 0x4B),
    (0x65, KEY_KP5, 0x4C),
    (0x66, KEY_KP6, 0x4D),
    (0x67, KEY_KP7, 0x47),
    (0x68, KEY_KP8, 0x48),
    (0x69, KEY_KP9, 0x49),
    (0x6A, KEY_KPASTERISK, 0x37),
    (0x6B, KEY_KPPLUS, 0x4E),
    (0x6D, KEY_KPMINUS, 0x4A),
    (0x6E, KEY_KPDOT, 0x53),
    (0x6F, KEY_KPSLASH, 0x35),
    (0x70, KEY_F1, 0x3B),
    (0x71, KEY_F2, 0x3C),
    (0x72, KEY_F3, 0x3D),
    (0x73, KEY_F4, 0x3E),
    (0x74, KEY_F5, 0x3F),
    (0x75, KEY_F6, 0x40),
    (0x76, KEY_F7, 0x41),
    (0x77, KEY_F8, 0x42),
    (0x78, KEY_F9, 0x43),
    (0x79, KEY_F10, 0x44),
    (0x7A, KEY_F11, 0x57),
    (0x7B, KEY_F12, 0x58),
    (0x90, KEY_NUMLOCK, 0x45),
    (0x91, KEY_SCROLLLOCK, 0x46),
    (0xA0, KEY_LEFTSHIFT, 0x2A),
    (0xA1, KEY_RIGHTSHIFT, 0x36),
    (0xA2, KEY_LEFTCTRL, 0x1D),
    (0xA3, KEY_RIGHTCTRL, 0x1D),
    (0xA4, KEY_LEFTALT, 0x38),
    (0xA5, KEY_RIGHTALT, 0x38),
    (0xBA, KEY_SEMICOLON, 0x27),
    (0xBB, KEY_EQUAL, 0x0D),
    (0xBC, KEY_COMMA, 0x33),
    (0xBD, KEY_MINUS, 0x0C),
    (0xBE, KEY_DOT, 0x34),
    (0xBF, KEY_SLASH, 0x35),
    (0xC0, KEY_GRAVE, 0x29),
    (0xDB, KEY_LEFTBRACE, 0x1A),
    (0xDC, KEY_BACKSLASH, 0x2B),
    (0xDD, KEY_RIGHTBRACE, 0x1B),
    (0xDE, KEY_APOSTROPHE, 0x28),
];

/// Looks up the Linux keycode and scan code for a Win32 VK code.
pub fn lookup(vk: u16) -> Option<&'static KeyMapping> {
    KEY_MAPPINGS.iter().find(|m| m.vk == vk)
}

/// Every distinct Linux keycode this table advertises, used when building
/// the keyboard's uinput device (it must enable each code before it can
/// emit it).
pub fn all_linux_codes() -> impl Iterator<Item = KeyCode> {
    let mut seen = std::collections::HashSet::new();
    KEY_MAPPINGS.iter().filter_map(move |m| seen.insert(m.linux_code).then_some(m.linux_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_vk() {
        let m = lookup(0x41).unwrap();
        assert_eq!(m.linux_code, KeyCode::KEY_A);
        assert_eq!(m.scan_code, 0x1E);
    }

    #[test]
    fn unknown_vk_is_none() {
        assert!(lookup(0xFFFF).is_none());
    }

    #[test]
    fn no_duplicate_vk_entries() {
        let mut seen = std::collections::HashSet::new();
        for m in KEY_MAPPINGS {
            assert!(seen.insert(m.vk), "duplicate vk 0x{:X}", m.vk);
        }
    }
}
