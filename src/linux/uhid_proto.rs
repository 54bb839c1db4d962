//! Binary layout of `/dev/uhid` events (`linux/uhid.h`). Not exposed by any
//! crate this workspace depends on, so the ABI is reproduced here by hand,
//! the same way `ff_ioctl` reproduces the uinput FF ioctls.

pub const UHID_CREATE: u32 = 0;
pub const UHID_DESTROY: u32 = 1;
pub const UHID_START: u32 = 2;
pub const UHID_STOP: u32 = 3;
pub const UHID_OPEN: u32 = 4;
pub const UHID_CLOSE: u32 = 5;
pub const UHID_OUTPUT: u32 = 6;
pub const UHID_INPUT: u32 = 8;
pub const UHID_GET_REPORT: u32 = 9;
pub const UHID_GET_REPORT_REPLY: u32 = 10;
pub const UHID_CREATE2: u32 = 11;
pub const UHID_INPUT2: u32 = 12;
pub const UHID_SET_REPORT: u32 = 13;
pub const UHID_SET_REPORT_REPLY: u32 = 14;

pub const UHID_FEATURE_REPORT: u8 = 0;
pub const UHID_OUTPUT_REPORT: u8 = 1;
pub const UHID_INPUT_REPORT: u8 = 2;

const HID_MAX_DESCRIPTOR_SIZE: usize = 4096;
const UHID_DATA_MAX: usize = 4096;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct UhidCreate2Req {
    pub name: [u8; 128],
    pub phys: [u8; 64],
    pub uniq: [u8; 64],
    pub rd_size: u16,
    pub bus: u16,
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
    pub country: u32,
    pub rd_data: [u8; HID_MAX_DESCRIPTOR_SIZE],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct UhidInput2Req {
    pub size: u16,
    pub data: [u8; UHID_DATA_MAX],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct UhidOutputReq {
    pub data: [u8; UHID_DATA_MAX],
    pub size: u16,
    pub rtype: u8,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct UhidGetReportReq {
    pub id: u32,
    pub rnum: u8,
    pub rtype: u8,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct UhidGetReportReplyReq {
    pub id: u32,
    pub err: u16,
    pub size: u16,
    pub data: [u8; UHID_DATA_MAX],
}

/// Mirrors the anonymous union inside `struct uhid_event`. Only the member
/// matching the outer `ev_type` is meaningful.
#[repr(C)]
#[derive(Copy, Clone)]
pub union UhidEventUnion {
    pub create2: UhidCreate2Req,
    pub input2: UhidInput2Req,
    pub output: UhidOutputReq,
    pub get_report: UhidGetReportReq,
    pub get_report_reply: UhidGetReportReplyReq,
}

/// Mirrors `struct uhid_event`. Always read and written whole: the kernel
/// expects exactly `size_of::<UhidEvent>()` bytes per `read(2)`/`write(2)`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct UhidEvent {
    pub ev_type: u32,
    pub u: UhidEventUnion,
}

impl UhidEvent {
    pub fn zeroed() -> Self {
        // SAFETY: every field of every union member is a plain integer or
        // byte array; the all-zero bit pattern is valid for all of them.
        unsafe { std::mem::zeroed() }
    }
}

fn copy_into(dst: &mut [u8], src: &str) {
    let bytes = src.as_bytes();
    let n = bytes.len().min(dst.len().saturating_sub(1));
    dst[..n].copy_from_slice(&bytes[..n]);
}

pub fn create2_event(
    name: &str,
    phys: &str,
    uniq: &str,
    bus: u16,
    vendor: u32,
    product: u32,
    version: u32,
    country: u32,
    report_descriptor: &[u8],
) -> crate::error::Result<UhidEvent> {
    if report_descriptor.len() > HID_MAX_DESCRIPTOR_SIZE {
        return Err(crate::error::Error::Device(format!(
            "report descriptor too large ({} > {HID_MAX_DESCRIPTOR_SIZE})",
            report_descriptor.len()
        )));
    }
    let mut ev = UhidEvent::zeroed();
    ev.ev_type = UHID_CREATE2;
    let create2 = &mut ev.u.create2;
    copy_into(&mut create2.name, name);
    copy_into(&mut create2.phys, phys);
    copy_into(&mut create2.uniq, uniq);
    create2.rd_size = report_descriptor.len() as u16;
    create2.bus = bus;
    create2.vendor = vendor;
    create2.product = product;
    create2.version = version;
    create2.country = country;
    create2.rd_data[..report_descriptor.len()].copy_from_slice(report_descriptor);
    Ok(ev)
}

pub fn destroy_event() -> UhidEvent {
    let mut ev = UhidEvent::zeroed();
    ev.ev_type = UHID_DESTROY;
    ev
}

pub fn input2_event(data: &[u8]) -> crate::error::Result<UhidEvent> {
    if data.len() > UHID_DATA_MAX {
        return Err(crate::error::Error::Device(format!(
            "input report too large ({} > {UHID_DATA_MAX})",
            data.len()
        )));
    }
    let mut ev = UhidEvent::zeroed();
    ev.ev_type = UHID_INPUT2;
    ev.u.input2.size = data.len() as u16;
    ev.u.input2.data[..data.len()].copy_from_slice(data);
    Ok(ev)
}

pub fn get_report_reply_event(id: u32, err: u16, data: &[u8]) -> crate::error::Result<UhidEvent> {
    if data.len() > UHID_DATA_MAX {
        return Err(crate::error::Error::Device(format!(
            "report reply too large ({} > {UHID_DATA_MAX})",
            data.len()
        )));
    }
    let mut ev = UhidEvent::zeroed();
    ev.ev_type = UHID_GET_REPORT_REPLY;
    let reply = &mut ev.u.get_report_reply;
    reply.id = id;
    reply.err = err;
    reply.size = data.len() as u16;
    reply.data[..data.len()].copy_from_slice(data);
    Ok(ev)
}

/// What `UhidTransport`'s reader thread surfaces after parsing a raw event
/// read back from the kernel.
#[derive(Debug, Clone)]
pub enum UhidIncoming {
    Start,
    Stop,
    Open,
    Close,
    Output { data: Vec<u8>, rtype: u8 },
    GetReport { id: u32, rnum: u8, rtype: u8 },
}

/// Parses a raw `UhidEvent` into the subset of variants this crate's device
/// handlers act on; `UHID_INPUT`/`UHID_SET_REPORT`/unknown types are dropped
/// (the kernel never sends `UHID_INPUT*` back to us, and we never ask for
/// `SET_REPORT`).
pub fn parse_incoming(ev: &UhidEvent) -> Option<UhidIncoming> {
    // SAFETY: `ev_type` tags which union member is initialised; each arm
    // only reads the member the kernel just told us it wrote.
    unsafe {
        match ev.ev_type {
            UHID_START => Some(UhidIncoming::Start),
            UHID_STOP => Some(UhidIncoming::Stop),
            UHID_OPEN => Some(UhidIncoming::Open),
            UHID_CLOSE => Some(UhidIncoming::Close),
            UHID_OUTPUT => {
                let out = &ev.u.output;
                let size = out.size as usize;
                Some(UhidIncoming::Output {
                    data: out.data[..size.min(UHID_DATA_MAX)].to_vec(),
                    rtype: out.rtype,
                })
            }
            UHID_GET_REPORT => {
                let gr = &ev.u.get_report;
                Some(UhidIncoming::GetReport {
                    id: gr.id,
                    rnum: gr.rnum,
                    rtype: gr.rtype,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_truncates_and_nul_terminates() {
        let ev = create2_event("x".repeat(200).as_str(), "", "", 0, 0, 0, 0, 0, &[]).unwrap();
        let name = &ev.u.create2.name;
        assert_eq!(name.len(), 128);
        assert_eq!(name[127], 0);
    }

    #[test]
    fn descriptor_too_large_is_rejected() {
        let big = vec![0u8; HID_MAX_DESCRIPTOR_SIZE + 1];
        assert!(create2_event("n", "", "", 0, 0, 0, 0, 0, &big).is_err());
    }

    #[test]
    fn roundtrips_through_parse_incoming() {
        let mut ev = UhidEvent::zeroed();
        ev.ev_type = UHID_OUTPUT;
        ev.u.output.size = 3;
        ev.u.output.data[0] = 1;
        ev.u.output.data[1] = 2;
        ev.u.output.data[2] = 3;
        ev.u.output.rtype = UHID_OUTPUT_REPORT;
        match parse_incoming(&ev) {
            Some(UhidIncoming::Output { data, rtype }) => {
                assert_eq!(data, vec![1, 2, 3]);
                assert_eq!(rtype, UHID_OUTPUT_REPORT);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
