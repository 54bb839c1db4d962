//! Virtual multitouch trackpad, MT protocol B, with a physical click button
//! (`BTN_LEFT`) and `INPUT_PROP_BUTTONPAD` advertised so desktop environments
//! treat it as a clickpad rather than a touchscreen.

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode, PropType, UinputAbsSetup};

use crate::error::Result;
use crate::linux::touch::{FingerId, TouchCore, NUM_FINGERS, PRESSURE_MAX, SURFACE_H, SURFACE_W};
use crate::linux::uinput::EvdevSink;

const VENDOR: u16 = 0x06CB;
const PRODUCT: u16 = 0xCE00;
const VERSION: u16 = 0x0100;

pub struct Trackpad {
    core: TouchCore,
}

impl Trackpad {
    pub fn create() -> Result<Self> {
        Ok(Trackpad {
            core: TouchCore::new(EvdevSink::new(build_device()?)),
        })
    }

    pub fn place_finger(&mut self, finger: FingerId, x: f64, y: f64, pressure: f64, orientation: f64) -> Result<()> {
        self.core.place_finger(finger, x, y, pressure, orientation)
    }

    pub fn release_finger(&mut self, finger: FingerId) -> Result<()> {
        self.core.release_finger(finger)
    }

    pub fn set_left_btn(&mut self, pressed: bool) -> Result<()> {
        self.core
            .emit(&[InputEvent::new(EventType::KEY.0, KeyCode::BTN_LEFT.0, if pressed { 1 } else { 0 })])
    }

    pub fn get_nodes(&self) -> Result<Vec<String>> {
        self.core.get_nodes()
    }
}

fn build_device() -> Result<evdev::uinput::VirtualDevice> {
    let mut keys = AttributeSet::<KeyCode>::new();
    keys.insert(KeyCode::BTN_LEFT);
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
    props.insert(PropType::POINTER);
    props.insert(PropType::BUTTONPAD);

    Ok(VirtualDeviceBuilder::new()?
        .name("Virtual Trackpad")
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
    fn surface_geometry_matches_spec_constants() {
        assert_eq!(SURFACE_W, 19200);
        assert_eq!(SURFACE_H, 10800);
        assert_eq!(PRESSURE_MAX, 253);
    }
}
