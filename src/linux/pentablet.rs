//! Virtual pen tablet: five tool classes (`BTN_TOOL_{PEN,RUBBER,BRUSH,
//! PENCIL,AIRBRUSH}`) plus three stylus buttons and absolute position,
//! pressure, distance and tilt axes, following the same event-code layout
//! `libevdev_uinput_write_event`-based devices in this crate use.

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode, PropType, UinputAbsSetup};

use crate::error::Result;
use crate::linux::uinput::EvdevSink;

const VENDOR: u16 = 0x256C;
const PRODUCT: u16 = 0x006D;
const VERSION: u16 = 0x0111;

const MAX_X: i32 = 1920;
const MAX_Y: i32 = 1080;
const PRESSURE_MAX: i32 = 253;
const DISTANCE_MAX: i32 = 1024;
const TILT_RESOLUTION: i32 = 28;

/// Active stylus tool. `SameAsBefore` is the sentinel meaning "don't change
/// tool class, just update position/pressure/tilt".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Pen,
    Eraser,
    Brush,
    Pencil,
    Airbrush,
    Touch,
    SameAsBefore,
}

impl ToolKind {
    fn key(self) -> Option<KeyCode> {
        match self {
            ToolKind::Pen => Some(KeyCode::BTN_TOOL_PEN),
            ToolKind::Eraser => Some(KeyCode::BTN_TOOL_RUBBER),
            ToolKind::Brush => Some(KeyCode::BTN_TOOL_BRUSH),
            ToolKind::Pencil => Some(KeyCode::BTN_TOOL_PENCIL),
            ToolKind::Airbrush => Some(KeyCode::BTN_TOOL_AIRBRUSH),
            ToolKind::Touch => Some(KeyCode::BTN_TOUCH),
            ToolKind::SameAsBefore => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylusButton {
    Primary,
    Secondary,
    Tertiary,
}

impl StylusButton {
    fn key(self) -> KeyCode {
        match self {
            StylusButton::Primary => KeyCode::BTN_STYLUS,
            StylusButton::Secondary => KeyCode::BTN_STYLUS2,
            StylusButton::Tertiary => KeyCode::BTN_STYLUS3,
        }
    }
}

/// Virtual pen tablet exposing a single evdev node.
pub struct PenTablet {
    sink: EvdevSink,
    last_tool: ToolKind,
}

impl PenTablet {
    pub fn create() -> Result<Self> {
        Ok(PenTablet {
            sink: EvdevSink::new(build_device()?),
            last_tool: ToolKind::SameAsBefore,
        })
    }

    /// `x, y ∈ [0, 1]` scaled to the `1920×1080` virtual surface. Negative
    /// `pressure` or `distance` means "the caller isn't reporting this
    /// axis"; the corresponding `ABS_*` event is skipped, matching how a
    /// real stylus reports pressure *or* hover distance, never both.
    pub fn place_tool(
        &mut self,
        kind: ToolKind,
        x: f64,
        y: f64,
        pressure: f64,
        distance: f64,
        tilt_x: f64,
        tilt_y: f64,
    ) -> Result<()> {
        let mut events = Vec::new();

        if kind != ToolKind::SameAsBefore && kind != self.last_tool {
            if let Some(key) = kind.key() {
                events.push(InputEvent::new(EventType::KEY.0, key.0, 1));
            }
            if let Some(key) = self.last_tool.key() {
                events.push(InputEvent::new(EventType::KEY.0, key.0, 0));
            }
            self.last_tool = kind;
        }

        let scaled_x = (x * MAX_X as f64).round() as i32;
        let scaled_y = (y * MAX_Y as f64).round() as i32;
        events.push(InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_X.0, scaled_x));
        events.push(InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Y.0, scaled_y));

        if pressure >= 0.0 {
            let scaled = (pressure * PRESSURE_MAX as f64).round() as i32;
            events.push(InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_PRESSURE.0, scaled));
        }

        if distance >= 0.0 {
            let scaled = (distance * DISTANCE_MAX as f64).round() as i32;
            events.push(InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_DISTANCE.0, scaled));
        }

        events.push(InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_TILT_X.0,
            tilt_to_units(tilt_x),
        ));
        events.push(InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_TILT_Y.0,
            tilt_to_units(tilt_y),
        ));

        self.sink.emit(&events)
    }

    pub fn set_btn(&mut self, btn: StylusButton, pressed: bool) -> Result<()> {
        self.sink.emit(&[InputEvent::new(EventType::KEY.0, btn.key().0, if pressed { 1 } else { 0 })])
    }

    pub fn get_nodes(&self) -> Result<Vec<String>> {
        self.sink.get_nodes()
    }
}

/// Clamps to `[-90, 90]` degrees then converts to units-per-radian, matching
/// the `ABS_TILT_*` resolution convention (kernel docs: "if resolution is
/// nonzero, it's in units/radian").
fn tilt_to_units(degrees: f64) -> i32 {
    let clamped = degrees.clamp(-90.0, 90.0);
    let radians = clamped * TILT_RESOLUTION as f64 * std::f64::consts::PI / 180.0;
    radians.round() as i32
}

fn build_device() -> Result<evdev::uinput::VirtualDevice> {
    let mut keys = AttributeSet::<KeyCode>::new();
    for key in [
        KeyCode::BTN_TOUCH,
        KeyCode::BTN_STYLUS,
        KeyCode::BTN_STYLUS2,
        KeyCode::BTN_STYLUS3,
        KeyCode::BTN_TOOL_PEN,
        KeyCode::BTN_TOOL_RUBBER,
        KeyCode::BTN_TOOL_BRUSH,
        KeyCode::BTN_TOOL_PENCIL,
        KeyCode::BTN_TOOL_AIRBRUSH,
    ] {
        keys.insert(key);
    }

    let pos_x = AbsInfo::new(0, 0, MAX_X, 1, 0, TILT_RESOLUTION);
    let pos_y = AbsInfo::new(0, 0, MAX_Y, 1, 0, TILT_RESOLUTION);
    let pressure = AbsInfo::new(0, 0, PRESSURE_MAX, 0, 0, 0);
    let distance = AbsInfo::new(0, 0, DISTANCE_MAX, 0, 0, 0);
    let tilt = AbsInfo::new(0, -90, 90, 0, 0, TILT_RESOLUTION);

    let mut props = AttributeSet::<PropType>::new();
    props.insert(PropType::POINTER);
    props.insert(PropType::DIRECT);

    Ok(VirtualDeviceBuilder::new()?
        .name("Virtual Pen Tablet")
        .input_id(InputId::new(BusType::BUS_USB, VENDOR, PRODUCT, VERSION))
        .with_keys(&keys)?
        .with_properties(&props)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_X, pos_x))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Y, pos_y))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_PRESSURE, pressure))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_DISTANCE, distance))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_TILT_X, tilt))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_TILT_Y, tilt))?
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_clamps_before_conversion() {
        assert_eq!(tilt_to_units(90.0), tilt_to_units(200.0));
        assert_eq!(tilt_to_units(-90.0), tilt_to_units(-200.0));
    }

    #[test]
    fn tilt_zero_is_zero() {
        assert_eq!(tilt_to_units(0.0), 0);
    }

    #[test]
    fn stylus_buttons_map_to_distinct_keys() {
        assert_ne!(StylusButton::Primary.key(), StylusButton::Secondary.key());
        assert_ne!(StylusButton::Secondary.key(), StylusButton::Tertiary.key());
    }
}
