//! Synthesises virtual human-interface devices on Linux: mice, keyboards,
//! multitouch trackpads/touchscreens, pen tablets, and gamepads (including a
//! PS5 DualSense emulator), so that unmodified input stacks (libinput, evdev
//! readers, SDL) see them as real hardware.
//!
//! Every device kind is created by a fallible factory that returns a
//! handle-or-[`Error`]. A handle exclusively owns its kernel device node(s)
//! and any worker thread (FF worker, UHID reader, keyboard repeat ticker);
//! dropping the handle stops the worker, joins it, and tears down the
//! kernel device.
//!
//! This crate only targets Linux: every device kind here is built directly
//! on the kernel's `uinput` and `uhid` character devices, which have no
//! analogue on other platforms.

#![cfg(target_os = "linux")]

mod error;
mod keycodes;
mod linux;

pub use error::{Error, Result};
pub use linux::device::DeviceDefinition;

pub use linux::gamepad::ff::{RumbleCallback, RumbleMagnitudes};
pub use linux::gamepad::{GamepadButton, StickSide};
pub use linux::gamepad::switch::SwitchJoypad;
pub use linux::gamepad::xbox::XboxOneJoypad;

pub use linux::keyboard::Keyboard;
pub use linux::mouse::{Mouse, MouseButton};
pub use linux::pentablet::{PenTablet, StylusButton, ToolKind};
pub use linux::touch::FingerId;
pub use linux::touchscreen::Touchscreen;
pub use linux::trackpad::Trackpad;

pub use linux::dualsense::{BatteryState, LedCallback, PS5Joypad};

pub use linux::uinput::EvdevSink;
