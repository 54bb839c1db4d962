use std::os::fd::AsRawFd;
use std::os::unix::io::RawFd;

use evdev::InputEvent;
use evdev::uinput::VirtualDevice;

use crate::error::Result;
use crate::linux::sysfs;

/// Thin wrapper around an `evdev` crate `VirtualDevice`: the uinput
/// character device created via `ui_dev_create2`. Every write goes through
/// [`EvdevSink::emit`], which hands a batch of `InputEvent`s straight to the
/// underlying crate. `evdev::uinput::VirtualDevice::emit` appends its own
/// terminating `SYN_REPORT` after writing the batch, so callers must not
/// include one themselves.
pub struct EvdevSink {
    device: VirtualDevice,
}

impl EvdevSink {
    pub fn new(device: VirtualDevice) -> Self {
        EvdevSink { device }
    }

    /// Writes one frame's worth of events; the underlying crate appends
    /// `SYN_REPORT` itself.
    pub fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        self.device.emit(events)?;
        Ok(())
    }

    pub fn raw_fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }

    /// Walks the sysfs children of this device's kernel-assigned sysname to
    /// find its `/dev/input/event*` and, for gamepads, `/dev/input/js*`
    /// nodes, in that stable order.
    pub fn get_nodes(&self) -> Result<Vec<String>> {
        sysfs::enumerate_dev_nodes(self.raw_fd())
    }

    pub fn inner_mut(&mut self) -> &mut VirtualDevice {
        &mut self.device
    }
}
