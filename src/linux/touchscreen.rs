//! Virtual multitouch touchscreen: same MT protocol B bookkeeping as the
//! trackpad, minus the click button and `INPUT_PROP_BUTTONPAD` (a
//! touchscreen has no physical click surface).

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, InputId, KeyCode, PropType, UinputAbsSetup};

use crate::error::Result;
use crate::linux::touch::{FingerId, TouchCore, NUM_FINGERS, PRESSURE_MAX, SURFACE_H, SURFACE_W};
use crate::linux::uinput::EvdevSink;

const VENDOR: u16 = 0x06CB;
const PRODUCT: u16 = 0xCE01;
const VERSION: u16 = 0x0100;

pub struct Touchscreen {
    core: TouchCore,
}

impl Touchscreen {
    pub fn create() -> Result<Self> {
        Ok(Touchscreen {
            core: TouchCore::new(EvdevSink::new(build_device()?)),
        })
    }

    pub fn place_finger(&mut self, finger: FingerId, x: f64, y: f64, pressure: f64, orientation: f64) -> Result<()> {
        self.core.place_finger(finger, x, y, pressure, orientation)
    }

    pub fn release_finger(&mut self, finger: FingerId) -> Result<()> {
        self.core.release_finger(finger)
    }

    pub fn get_nodes(&self) -> Result<Vec<String>> {
        self.core.get_nodes()
    }
}

fn build_device() -> Result<evdev::uinput::VirtualDevice> {
    let mut keys = AttributeSet::<KeyCode>::new();
    keys.insert(KeyCode::BTN_TOOL_FINGER);
    keys.insert(KeyCode::BTN_TOOL_DOUBLETAP);
    keys.insert(KeyCode::BTN_TOOL_TRIPLETAP);
    keys.insert(KeyCode::BTN_TOOL_QUADTAP);
    keys.insert(KeyCode::BTN_TOOL_QUINTTAP);
    keys.insert(KeyCode::BTN_TOUCH);

    let pos_x = AbsInfo::new(0, 0, SURFACE_W, 0, 0, 1);
    let pos_y = AbsInfo::new(0, 0, SURFACE_H, 0, 0, 1);
    let pressure = AbsInfo::new(0, 0, PRESSURE_MAX, 0, 0, 1);
    let orientation = AbsInfo::new(0, -90, 90, 0, 0, 1);
    let slot = AbsInfo::new(0, 0, (NUM_FINGERS - 1) as i32, 0, 0, 1);
    let tracking_id = AbsInfo::new(0, 0, 65535, 0, 0, 1);

    let mut props = AttributeSet::<PropType>::new();
    props.insert(PropType::DIRECT);

    Ok(VirtualDeviceBuilder::new()?
        .name("Virtual Touchscreen")
        .input_id(InputId::new(BusType::BUS_USB, VENDOR, PRODUCT, VERSION))
        .with_keys(&keys)?
        .with_properties(&props)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_X, pos_x))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Y, pos_y))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_PRESSURE, pressure))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_SLOT, slot))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_TRACKING_ID, tracking_id))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_POSITION_X, pos_x))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_POSITION_Y, pos_y))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_PRESSURE, pressure))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_MT_ORIENTATION, orientation))?
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touchscreen_has_no_left_button_semantics() {
        // The touchscreen type exposes no set_left_btn method at all;
        // this is a compile-time guarantee, not a runtime check.
        let _ = PRODUCT;
    }
}
