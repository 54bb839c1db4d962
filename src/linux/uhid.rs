use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use nix::poll::{PollFd, PollFlags, PollTimeout};

use crate::error::{Error, Result};
use crate::linux::device::DeviceDefinition;
use crate::linux::uhid_proto::{self, UhidEvent, UhidIncoming};

/// Callback invoked from the reader thread for every event the kernel sends
/// back on `/dev/uhid` (`UHID_START`, `UHID_OUTPUT`, a feature `GET_REPORT`
/// request, ...). Handlers reply, if at all, through the [`UhidWriter`]
/// passed alongside the event.
pub trait UhidHandler: Send + Sync + 'static {
    fn on_event(&self, event: UhidIncoming, writer: &UhidWriter);
}

impl<F> UhidHandler for F
where
    F: Fn(UhidIncoming, &UhidWriter) + Send + Sync + 'static,
{
    fn on_event(&self, event: UhidIncoming, writer: &UhidWriter) {
        self(event, writer)
    }
}

/// A cheap, `Copy` handle to an open `/dev/uhid` fd. Valid for as long as
/// the owning [`UhidTransport`] is alive; the reader thread and the device's
/// public API both write through one of these.
#[derive(Clone, Copy)]
pub struct UhidWriter {
    fd: RawFd,
}

impl UhidWriter {
    pub fn send_input2(&self, data: &[u8]) -> Result<()> {
        write_event(self.fd, &uhid_proto::input2_event(data)?)
    }

    pub fn send_get_report_reply(&self, id: u32, err: u16, data: &[u8]) -> Result<()> {
        write_event(self.fd, &uhid_proto::get_report_reply_event(id, err, data)?)
    }
}

fn write_event(fd: RawFd, ev: &UhidEvent) -> Result<()> {
    let len = std::mem::size_of::<UhidEvent>();
    let ptr = ev as *const UhidEvent as *const libc::c_void;
    let n = unsafe { libc::write(fd, ptr, len) };
    if n < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    if n as usize != len {
        return Err(Error::Device(format!("short write to /dev/uhid ({n} of {len} bytes)")));
    }
    Ok(())
}

fn read_event(fd: RawFd) -> Result<UhidEvent> {
    let mut ev = UhidEvent::zeroed();
    let len = std::mem::size_of::<UhidEvent>();
    let ptr = &mut ev as *mut UhidEvent as *mut libc::c_void;
    let n = unsafe { libc::read(fd, ptr, len) };
    if n < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    if n as usize != len {
        return Err(Error::Device(format!("short read from /dev/uhid ({n} of {len} bytes)")));
    }
    Ok(ev)
}

/// An open `/dev/uhid` device plus the thread that reads the kernel's side
/// of the conversation. Dropping this writes `UHID_DESTROY`, closes the fd
/// (waking the reader thread's blocked `poll` with `POLLHUP`), and joins it.
pub struct UhidTransport {
    fd: RawFd,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl UhidTransport {
    pub fn create(def: &DeviceDefinition, handler: Arc<dyn UhidHandler>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open("/dev/uhid")?;
        let fd = file.as_raw_fd();
        let create_ev = uhid_proto::create2_event(
            &def.name,
            &def.phys,
            &def.uniq,
            def.bus.0,
            def.vendor as u32,
            def.product as u32,
            def.version as u32,
            def.country as u32,
            &def.report_descriptor,
        )?;
        write_event(fd, &create_ev)?;

        let fd = file.into_raw_fd();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread = thread::Builder::new()
            .name("uhid-reader".into())
            .spawn(move || reader_loop(fd, thread_stop, handler))
            .map_err(std::io::Error::from)?;

        Ok(UhidTransport {
            fd,
            stop,
            thread: Some(thread),
        })
    }

    pub fn writer(&self) -> UhidWriter {
        UhidWriter { fd: self.fd }
    }
}

fn reader_loop(fd: RawFd, stop: Arc<AtomicBool>, handler: Arc<dyn UhidHandler>) {
    let writer = UhidWriter { fd };
    let borrowed = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) };
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
        match nix::poll::poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(nix::Error::EINTR) => continue,
            Err(_) => return,
        }
        let revents = fds[0].revents().unwrap_or(PollFlags::empty());
        if revents.contains(PollFlags::POLLHUP) || revents.contains(PollFlags::POLLERR) {
            return;
        }
        if !revents.contains(PollFlags::POLLIN) {
            continue;
        }
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let ev = match read_event(fd) {
            Ok(ev) => ev,
            Err(err) => {
                tracing::debug!(?err, "uhid reader thread exiting");
                return;
            }
        };
        if let Some(incoming) = uhid_proto::parse_incoming(&ev) {
            handler.on_event(incoming, &writer);
        }
    }
}

impl Drop for UhidTransport {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = write_event(self.fd, &uhid_proto::destroy_event());
        unsafe {
            libc::close(self.fd);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
