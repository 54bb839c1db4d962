//! Shared plumbing for the two evdev-based gamepads: the abstract 14-button
//! controller, edge-detected button transitions, and the FF worker. The
//! wire-level differences (trigger encoding, vendor/product ids, button key
//! codes) live in [`xbox`] and [`switch`].

pub mod ff;
pub mod switch;
pub mod xbox;

use std::sync::{Arc, Mutex};

use evdev::uinput::VirtualDevice;
use evdev::{EventType, InputEvent, KeyCode};

use crate::error::Result;
use ff::{FfWorker, RumbleCallback};

/// The abstract controller's 14 buttons, shared by Xbox and Switch pads
/// (dpad excluded from the key-code table: it is reported on
/// `ABS_HAT0X`/`ABS_HAT0Y` instead, see [`dpad_axes`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamepadButton {
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    South,
    East,
    North,
    West,
    L1,
    R1,
    L3,
    R3,
    Select,
    Start,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 14] = [
        GamepadButton::DpadUp,
        GamepadButton::DpadDown,
        GamepadButton::DpadLeft,
        GamepadButton::DpadRight,
        GamepadButton::South,
        GamepadButton::East,
        GamepadButton::North,
        GamepadButton::West,
        GamepadButton::L1,
        GamepadButton::R1,
        GamepadButton::L3,
        GamepadButton::R3,
        GamepadButton::Select,
        GamepadButton::Start,
    ];

    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    fn is_dpad(self) -> bool {
        matches!(
            self,
            GamepadButton::DpadUp | GamepadButton::DpadDown | GamepadButton::DpadLeft | GamepadButton::DpadRight
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickSide {
    Left,
    Right,
}

/// Maps the ten non-dpad abstract buttons to the `KeyCode`s a specific
/// device kind advertises.
#[derive(Debug, Clone, Copy)]
pub struct ButtonKeyMap {
    pub south: KeyCode,
    pub east: KeyCode,
    pub north: KeyCode,
    pub west: KeyCode,
    pub l1: KeyCode,
    pub r1: KeyCode,
    pub l3: KeyCode,
    pub r3: KeyCode,
    pub select: KeyCode,
    pub start: KeyCode,
}

impl ButtonKeyMap {
    fn code_for(&self, button: GamepadButton) -> Option<KeyCode> {
        match button {
            GamepadButton::South => Some(self.south),
            GamepadButton::East => Some(self.east),
            GamepadButton::North => Some(self.north),
            GamepadButton::West => Some(self.west),
            GamepadButton::L1 => Some(self.l1),
            GamepadButton::R1 => Some(self.r1),
            GamepadButton::L3 => Some(self.l3),
            GamepadButton::R3 => Some(self.r3),
            GamepadButton::Select => Some(self.select),
            GamepadButton::Start => Some(self.start),
            _ => None,
        }
    }
}

/// Shared device body: the kernel fd (behind a mutex so the FF worker thread
/// can `fetch_events` while the owning handle emits button/stick frames) and
/// the FF worker itself.
pub(crate) struct EvdevGamepad {
    device: Arc<Mutex<VirtualDevice>>,
    previous_mask: u32,
    ff: Option<FfWorker>,
}

impl EvdevGamepad {
    pub(crate) fn new(device: VirtualDevice) -> Self {
        EvdevGamepad {
            device: Arc::new(Mutex::new(device)),
            previous_mask: 0,
            ff: None,
        }
    }

    pub(crate) fn start_ff_worker(&mut self, callback: Option<RumbleCallback>) {
        self.ff = Some(FfWorker::spawn(self.device.clone(), callback));
    }

    pub(crate) fn emit(&self, events: &[InputEvent]) -> Result<()> {
        self.device.lock().unwrap().emit(events)?;
        Ok(())
    }

    pub(crate) fn get_nodes(&self) -> Result<Vec<String>> {
        use std::os::fd::AsRawFd;
        let dev = self.device.lock().unwrap();
        crate::linux::sysfs::enumerate_dev_nodes(dev.as_raw_fd())
    }

    /// `set_pressed_buttons`: XORs `new_mask` against the stored mask, emits
    /// a key event for every changed non-dpad bit plus an `ABS_HAT0X/Y` pair
    /// if any dpad bit changed, then frames unconditionally.
    pub(crate) fn set_pressed_buttons(&mut self, new_mask: u32, map: &ButtonKeyMap) -> Result<()> {
        let changed = new_mask ^ self.previous_mask;
        let mut events = Vec::new();
        for button in GamepadButton::ALL {
            if changed & button.bit() == 0 || button.is_dpad() {
                continue;
            }
            if let Some(code) = map.code_for(button) {
                let value = if new_mask & button.bit() != 0 { 1 } else { 0 };
                events.push(InputEvent::new(EventType::KEY.0, code.0, value));
            }
        }
        if changed
            & (GamepadButton::DpadUp.bit()
                | GamepadButton::DpadDown.bit()
                | GamepadButton::DpadLeft.bit()
                | GamepadButton::DpadRight.bit())
            != 0
        {
            let (hat_x, hat_y) = dpad_axes(new_mask);
            events.push(InputEvent::new(
                EventType::ABSOLUTE.0,
                evdev::AbsoluteAxisCode::ABS_HAT0X.0,
                hat_x,
            ));
            events.push(InputEvent::new(
                EventType::ABSOLUTE.0,
                evdev::AbsoluteAxisCode::ABS_HAT0Y.0,
                hat_y,
            ));
        }
        self.previous_mask = new_mask;
        self.emit(&events)
    }
}

fn dpad_axes(mask: u32) -> (i32, i32) {
    let left = mask & GamepadButton::DpadLeft.bit() != 0;
    let right = mask & GamepadButton::DpadRight.bit() != 0;
    let up = mask & GamepadButton::DpadUp.bit() != 0;
    let down = mask & GamepadButton::DpadDown.bit() != 0;
    let x = match (left, right) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    };
    let y = match (up, down) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpad_octants() {
        assert_eq!(dpad_axes(GamepadButton::DpadUp.bit()), (0, -1));
        assert_eq!(
            dpad_axes(GamepadButton::DpadUp.bit() | GamepadButton::DpadRight.bit()),
            (1, -1)
        );
        assert_eq!(dpad_axes(0), (0, 0));
        assert_eq!(
            dpad_axes(GamepadButton::DpadLeft.bit() | GamepadButton::DpadRight.bit()),
            (0, 0)
        );
    }
}
