//! Xbox-One-style evdev gamepad: analogue triggers on `ABS_Z`/`ABS_RZ`,
//! face buttons in the kernel's native `A→SOUTH, B→EAST, X→NORTH, Y→WEST`
//! order.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, FFEffectCode, InputEvent, InputId, KeyCode,
    UinputAbsSetup,
};

use crate::error::Result;
use crate::linux::device::DeviceDefinition;
use crate::linux::gamepad::ff::RumbleCallback;
use crate::linux::gamepad::{ButtonKeyMap, EvdevGamepad, StickSide};

pub const VENDOR: u16 = 0x045E;
pub const PRODUCT: u16 = 0x02EA;
pub const VERSION: u16 = 0x0408;

const STICK_FUZZ: i32 = 16;
const STICK_FLAT: i32 = 128;

fn button_map() -> ButtonKeyMap {
    ButtonKeyMap {
        south: KeyCode::BTN_SOUTH,
        east: KeyCode::BTN_EAST,
        north: KeyCode::BTN_NORTH,
        west: KeyCode::BTN_WEST,
        l1: KeyCode::BTN_TL,
        r1: KeyCode::BTN_TR,
        l3: KeyCode::BTN_THUMBL,
        r3: KeyCode::BTN_THUMBR,
        select: KeyCode::BTN_SELECT,
        start: KeyCode::BTN_START,
    }
}

/// A virtual Xbox-One-compatible gamepad with FF rumble.
pub struct XboxOneJoypad {
    gamepad: EvdevGamepad,
    map: ButtonKeyMap,
}

impl XboxOneJoypad {
    pub fn create(def: DeviceDefinition, rumble_callback: Option<RumbleCallback>) -> Result<Self> {
        let device = build_device(&def)?;
        let mut gamepad = EvdevGamepad::new(device);
        gamepad.start_ff_worker(rumble_callback);
        Ok(XboxOneJoypad {
            gamepad,
            map: button_map(),
        })
    }

    pub fn set_pressed_buttons(&mut self, new_mask: u32) -> Result<()> {
        self.gamepad.set_pressed_buttons(new_mask, &self.map)
    }

    pub fn set_stick(&mut self, side: StickSide, x: i32, y: i32) -> Result<()> {
        let (x_code, y_code) = match side {
            StickSide::Left => (AbsoluteAxisCode::ABS_X, AbsoluteAxisCode::ABS_Y),
            StickSide::Right => (AbsoluteAxisCode::ABS_RX, AbsoluteAxisCode::ABS_RY),
        };
        self.gamepad.emit(&[
            InputEvent::new(EventType::ABSOLUTE.0, x_code.0, x),
            InputEvent::new(EventType::ABSOLUTE.0, y_code.0, -y),
        ])
    }

    /// Both triggers in `[0, 255]`, one frame.
    pub fn set_triggers(&mut self, left: u8, right: u8) -> Result<()> {
        self.gamepad.emit(&[
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Z.0, left as i32),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_RZ.0, right as i32),
        ])
    }

    pub fn get_nodes(&self) -> Result<Vec<String>> {
        self.gamepad.get_nodes()
    }
}

fn build_device(def: &DeviceDefinition) -> Result<VirtualDevice> {
    let mut keys = AttributeSet::<KeyCode>::new();
    for button in [
        KeyCode::BTN_SOUTH,
        KeyCode::BTN_EAST,
        KeyCode::BTN_NORTH,
        KeyCode::BTN_WEST,
        KeyCode::BTN_TL,
        KeyCode::BTN_TR,
        KeyCode::BTN_THUMBL,
        KeyCode::BTN_THUMBR,
        KeyCode::BTN_SELECT,
        KeyCode::BTN_START,
        KeyCode::BTN_MODE,
    ] {
        keys.insert(button);
    }

    let stick = AbsInfo::new(0, -32768, 32767, STICK_FUZZ, STICK_FLAT, 1);
    let trigger = AbsInfo::new(0, 0, 255, 0, 0, 1);
    let dpad = AbsInfo::new(0, -1, 1, 0, 0, 1);

    let mut ff = AttributeSet::<FFEffectCode>::new();
    ff.insert(FFEffectCode::FF_RUMBLE);
    ff.insert(FFEffectCode::FF_CONSTANT);
    ff.insert(FFEffectCode::FF_RAMP);
    ff.insert(FFEffectCode::FF_PERIODIC);
    ff.insert(FFEffectCode::FF_GAIN);

    let device = VirtualDeviceBuilder::new()?
        .name(if def.name.is_empty() {
            "Xbox One Controller"
        } else {
            &def.name
        })
        .input_id(InputId::new(
            BusType::BUS_USB,
            if def.vendor == 0 { VENDOR } else { def.vendor },
            if def.product == 0 { PRODUCT } else { def.product },
            if def.version == 0 { VERSION } else { def.version },
        ))
        .with_keys(&keys)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_X, stick))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Y, stick))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_RX, stick))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_RY, stick))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Z, trigger))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_RZ, trigger))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_HAT0X, dpad))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_HAT0Y, dpad))?
        .with_ff(&ff)?
        .with_ff_effects_max(16)
        .build()?;

    use nix::fcntl::{FcntlArg, OFlag, fcntl};
    use std::os::fd::AsRawFd;
    fcntl(device.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK))?;

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_map_has_no_dpad_entries() {
        let map = button_map();
        assert_ne!(map.south, map.east);
        assert_ne!(map.l1, map.r1);
    }
}
