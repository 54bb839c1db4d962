//! Nintendo-Switch-Pro-style evdev gamepad: digital triggers on
//! `BTN_TL2`/`BTN_TR2`, swapped face-button layout (`A→EAST, B→SOUTH,
//! X→NORTH, Y→WEST`), an extra capture button on `BTN_Z`, and wider stick
//! deadzones than the Xbox pad (Switch Pro controllers report noisier raw
//! stick values — see games-on-whales/wolf#56).

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, FFEffectCode, InputEvent, InputId, KeyCode,
    UinputAbsSetup,
};

use crate::error::Result;
use crate::linux::device::DeviceDefinition;
use crate::linux::gamepad::ff::RumbleCallback;
use crate::linux::gamepad::{ButtonKeyMap, EvdevGamepad, StickSide};

pub const VENDOR: u16 = 0x057E;
pub const PRODUCT: u16 = 0x2009;
pub const VERSION: u16 = 0x0111;

const STICK_FUZZ: i32 = 250;
const STICK_FLAT: i32 = 500;

fn button_map() -> ButtonKeyMap {
    ButtonKeyMap {
        south: KeyCode::BTN_EAST,
        east: KeyCode::BTN_SOUTH,
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

/// A virtual Switch-Pro-compatible gamepad with FF rumble.
pub struct SwitchJoypad {
    gamepad: EvdevGamepad,
    map: ButtonKeyMap,
}

impl SwitchJoypad {
    pub fn create(def: DeviceDefinition, rumble_callback: Option<RumbleCallback>) -> Result<Self> {
        let device = build_device(&def)?;
        let mut gamepad = EvdevGamepad::new(device);
        gamepad.start_ff_worker(rumble_callback);
        Ok(SwitchJoypad {
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

    /// Digital triggers: each nonzero value presses its `BTN_TL2`/`BTN_TR2`
    /// key. Matches the distilled original's behaviour of framing each
    /// trigger write separately rather than coalescing both into one frame.
    pub fn set_triggers(&mut self, left: u8, right: u8) -> Result<()> {
        self.gamepad.emit(&[InputEvent::new(
            EventType::KEY.0,
            KeyCode::BTN_TL2.0,
            if left != 0 { 1 } else { 0 },
        )])?;
        self.gamepad.emit(&[InputEvent::new(
            EventType::KEY.0,
            KeyCode::BTN_TR2.0,
            if right != 0 { 1 } else { 0 },
        )])
    }

    pub fn set_capture(&mut self, pressed: bool) -> Result<()> {
        self.gamepad
            .emit(&[InputEvent::new(EventType::KEY.0, KeyCode::BTN_Z.0, if pressed { 1 } else { 0 })])
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
        KeyCode::BTN_TL2,
        KeyCode::BTN_TR2,
        KeyCode::BTN_THUMBL,
        KeyCode::BTN_THUMBR,
        KeyCode::BTN_SELECT,
        KeyCode::BTN_START,
        KeyCode::BTN_MODE,
        KeyCode::BTN_Z,
    ] {
        keys.insert(button);
    }

    let stick = AbsInfo::new(0, -32768, 32767, STICK_FUZZ, STICK_FLAT, 1);
    let dpad = AbsInfo::new(0, -1, 1, 0, 0, 1);

    let mut ff = AttributeSet::<FFEffectCode>::new();
    ff.insert(FFEffectCode::FF_RUMBLE);
    ff.insert(FFEffectCode::FF_CONSTANT);
    ff.insert(FFEffectCode::FF_RAMP);
    ff.insert(FFEffectCode::FF_PERIODIC);
    ff.insert(FFEffectCode::FF_GAIN);

    let device = VirtualDeviceBuilder::new()?
        .name(if def.name.is_empty() {
            "Pro Controller"
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
    fn face_buttons_are_swapped_relative_to_xbox() {
        let map = button_map();
        assert_eq!(map.south, KeyCode::BTN_EAST);
        assert_eq!(map.east, KeyCode::BTN_SOUTH);
    }
}
