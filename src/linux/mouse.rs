//! Virtual mouse: a relative-pointer evdev device for `move`/scroll/button
//! traffic plus a second absolute-pointer device for `move_abs`, mirroring
//! how real composite mice expose a separate digitizer interface.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode, MiscCode, PropType,
    RelativeAxisCode, UinputAbsSetup,
};

use crate::error::Result;
use crate::linux::uinput::EvdevSink;

const VENDOR: u16 = 0x046D;
const PRODUCT_REL: u16 = 0xC077;
const PRODUCT_ABS: u16 = 0xC078;
const VERSION: u16 = 0x0111;

const ABS_SURFACE_W: i32 = 19200;
const ABS_SURFACE_H: i32 = 12000;

const WHEEL_SCALE: i32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Side,
    Extra,
}

impl MouseButton {
    /// `(key code, PS/2-style scan code)`. Unrecognised buttons fall back to
    /// `Extra` at the call site, not here.
    fn code_and_scan(self) -> (KeyCode, u32) {
        match self {
            MouseButton::Left => (KeyCode::BTN_LEFT, 90001),
            MouseButton::Right => (KeyCode::BTN_RIGHT, 90002),
            MouseButton::Middle => (KeyCode::BTN_MIDDLE, 90003),
            MouseButton::Side => (KeyCode::BTN_SIDE, 90004),
            MouseButton::Extra => (KeyCode::BTN_EXTRA, 90005),
        }
    }
}

/// Virtual mouse exposing both a relative-motion pointer and an
/// absolute-positioning pointer as separate evdev devices.
pub struct Mouse {
    rel: EvdevSink,
    abs: EvdevSink,
}

impl Mouse {
    pub fn create() -> Result<Self> {
        Ok(Mouse {
            rel: EvdevSink::new(build_rel_device()?),
            abs: EvdevSink::new(build_abs_device()?),
        })
    }

    pub fn move_rel(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.rel.emit(&[
            InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_X.0, dx),
            InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_Y.0, dy),
        ])
    }

    /// Scales `(x, y)` from `sw × sh` screen space into the fixed
    /// `19200 × 12000` virtual surface before emitting.
    pub fn move_abs(&mut self, x: i32, y: i32, sw: i32, sh: i32) -> Result<()> {
        let vx = if sw > 0 { x * ABS_SURFACE_W / sw } else { 0 };
        let vy = if sh > 0 { y * ABS_SURFACE_H / sh } else { 0 };
        self.abs.emit(&[
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_X.0, vx),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Y.0, vy),
        ])
    }

    pub fn press(&mut self, button: MouseButton) -> Result<()> {
        let (code, scan) = button.code_and_scan();
        self.rel.emit(&[
            InputEvent::new(EventType::MISC.0, MiscCode::MSC_SCAN.0, scan as i32),
            InputEvent::new(EventType::KEY.0, code.0, 1),
        ])
    }

    pub fn release(&mut self, button: MouseButton) -> Result<()> {
        let (code, scan) = button.code_and_scan();
        self.rel.emit(&[
            InputEvent::new(EventType::MISC.0, MiscCode::MSC_SCAN.0, scan as i32),
            InputEvent::new(EventType::KEY.0, code.0, 0),
        ])
    }

    /// `hi_res` is in the Windows high-resolution wheel convention: 120
    /// units per detent. Emits both the legacy `REL_WHEEL` (divided down)
    /// and `REL_WHEEL_HI_RES` (the raw value).
    pub fn vertical_scroll(&mut self, hi_res: i32) -> Result<()> {
        self.rel.emit(&[
            InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_WHEEL.0, hi_res / WHEEL_SCALE),
            InputEvent::new(
                EventType::RELATIVE.0,
                RelativeAxisCode::REL_WHEEL_HI_RES.0,
                hi_res,
            ),
        ])
    }

    pub fn horizontal_scroll(&mut self, hi_res: i32) -> Result<()> {
        self.rel.emit(&[
            InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_HWHEEL.0, hi_res / WHEEL_SCALE),
            InputEvent::new(
                EventType::RELATIVE.0,
                RelativeAxisCode::REL_HWHEEL_HI_RES.0,
                hi_res,
            ),
        ])
    }

    /// Both device paths, relative pointer first.
    pub fn get_nodes(&self) -> Result<Vec<String>> {
        let mut nodes = self.rel.get_nodes()?;
        nodes.extend(self.abs.get_nodes()?);
        Ok(nodes)
    }
}

fn mouse_keys() -> AttributeSet<KeyCode> {
    let mut keys = AttributeSet::<KeyCode>::new();
    for key in [
        KeyCode::BTN_LEFT,
        KeyCode::BTN_RIGHT,
        KeyCode::BTN_MIDDLE,
        KeyCode::BTN_SIDE,
        KeyCode::BTN_EXTRA,
        KeyCode::BTN_FORWARD,
        KeyCode::BTN_BACK,
        KeyCode::BTN_TASK,
    ] {
        keys.insert(key);
    }
    keys
}

fn build_rel_device() -> Result<VirtualDevice> {
    let mut rel_axes = AttributeSet::<RelativeAxisCode>::new();
    for axis in [
        RelativeAxisCode::REL_X,
        RelativeAxisCode::REL_Y,
        RelativeAxisCode::REL_WHEEL,
        RelativeAxisCode::REL_WHEEL_HI_RES,
        RelativeAxisCode::REL_HWHEEL,
        RelativeAxisCode::REL_HWHEEL_HI_RES,
    ] {
        rel_axes.insert(axis);
    }

    Ok(VirtualDeviceBuilder::new()?
        .name("Virtual Mouse")
        .input_id(InputId::new(BusType::BUS_USB, VENDOR, PRODUCT_REL, VERSION))
        .with_keys(&mouse_keys())?
        .with_relative_axes(&rel_axes)?
        .build()?)
}

fn build_abs_device() -> Result<VirtualDevice> {
    let x = AbsInfo::new(0, 0, ABS_SURFACE_W, 1, 0, 28);
    let y = AbsInfo::new(0, 0, ABS_SURFACE_H, 1, 0, 28);

    let mut keys = AttributeSet::<KeyCode>::new();
    keys.insert(KeyCode::BTN_LEFT);

    let mut props = AttributeSet::<PropType>::new();
    props.insert(PropType::DIRECT);

    Ok(VirtualDeviceBuilder::new()?
        .name("Virtual Mouse (absolute)")
        .input_id(InputId::new(BusType::BUS_USB, VENDOR, PRODUCT_ABS, VERSION))
        .with_keys(&keys)?
        .with_properties(&props)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_X, x))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Y, y))?
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_fallback_is_extra() {
        let (code, scan) = MouseButton::Extra.code_and_scan();
        assert_eq!(code, KeyCode::BTN_EXTRA);
        assert_eq!(scan, 90005);
    }

    #[test]
    fn hi_res_scroll_divides_by_120_for_legacy_wheel() {
        assert_eq!(240 / WHEEL_SCALE, 2);
    }

    #[test]
    fn move_abs_scales_into_virtual_surface() {
        let x = 960 * ABS_SURFACE_W / 1920;
        assert_eq!(x, ABS_SURFACE_W / 2);
    }
}
