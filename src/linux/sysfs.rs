//! The one piece of `/dev/uinput` plumbing the `evdev` crate doesn't expose:
//! resolving the kernel-assigned sysfs name of a virtual device, then walking
//! its udev children to find `/dev/input/event*` and `/dev/input/js*` nodes —
//! the same `udev_enumerate_add_match_parent`/`udev_enumerate_scan_devices`
//! dance the distilled-from original runs through libudev.

use std::os::unix::io::RawFd;
use std::path::PathBuf;

use udev::{Device, Enumerator};

use crate::error::{Error, Result};

const UINPUT_IOCTL_BASE: u8 = b'U';
const UI_GET_SYSNAME_NR: u8 = 44;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_READ: u32 = 2;

/// `UI_GET_SYSNAME(len)` is parameterised by the caller's buffer length
/// (mirrors `libevdev_uinput_get_syspath`'s use of it), so it can't be a
/// plain `ioctl::ioctl_read!`-style constant.
fn ui_get_sysname(len: usize) -> u64 {
    ((IOC_READ << IOC_DIRSHIFT)
        | ((UINPUT_IOCTL_BASE as u32) << IOC_TYPESHIFT)
        | ((UI_GET_SYSNAME_NR as u32) << IOC_NRSHIFT)
        | ((len as u32) << IOC_SIZESHIFT)) as u64
}

fn get_sysname(fd: RawFd) -> Result<String> {
    let mut buf = [0u8; 64];
    let req = ui_get_sysname(buf.len());
    let ret = unsafe { libc::ioctl(fd, req, buf.as_mut_ptr()) };
    if ret < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..nul]).into_owned())
}

/// Walks the udev children of `fd`'s kernel-assigned sysname to find its
/// `/dev/input/event*` and, for gamepads, `/dev/input/js*` nodes, in that
/// stable order.
pub fn enumerate_dev_nodes(fd: RawFd) -> Result<Vec<String>> {
    let sysname = get_sysname(fd)?;
    let syspath = PathBuf::from(format!("/sys/devices/virtual/input/{sysname}"));
    let parent = Device::from_syspath(&syspath)?;

    let mut enumerator = Enumerator::new()?;
    enumerator.match_parent(&parent)?;

    let mut events = Vec::new();
    let mut joysticks = Vec::new();
    for device in enumerator.scan_devices()? {
        let Some(devnode) = device.devnode() else {
            continue;
        };
        let path = devnode.to_string_lossy().into_owned();
        let Some(name) = path.rsplit('/').next() else {
            continue;
        };
        if name.starts_with("event") {
            events.push(path.clone());
        } else if name.starts_with("js") {
            joysticks.push(path.clone());
        }
    }
    events.sort();
    joysticks.sort();
    events.extend(joysticks);
    Ok(events)
}
