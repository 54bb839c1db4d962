//! Virtual keyboard. The kernel does not auto-repeat keys injected through
//! uinput, so a background ticker re-emits held keys at a configurable
//! period to simulate it — the same `Arc<AtomicBool>` stop-flag/`JoinHandle`
//! pattern the gamepad FF worker and UHID reader use for their own threads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode, MiscCode};
use tracing::warn;

use crate::error::Result;
use crate::keycodes;
use crate::linux::uinput::EvdevSink;

const VENDOR: u16 = 0x046D;
const PRODUCT: u16 = 0xC079;
const VERSION: u16 = 0x0111;

const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Virtual keyboard with a held-key auto-repeat ticker.
pub struct Keyboard {
    sink: Arc<Mutex<EvdevSink>>,
    held: Arc<Mutex<HashSet<u16>>>,
    stop: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl Keyboard {
    pub fn create() -> Result<Self> {
        Self::create_with_interval(DEFAULT_REPEAT_INTERVAL)
    }

    pub fn create_with_interval(repeat_interval: Duration) -> Result<Self> {
        let sink = Arc::new(Mutex::new(EvdevSink::new(build_device()?)));
        let held = Arc::new(Mutex::new(HashSet::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let ticker = {
            let sink = sink.clone();
            let held = held.clone();
            let stop = stop.clone();
            std::thread::spawn(move || repeat_loop(sink, held, stop, repeat_interval))
        };

        Ok(Keyboard {
            sink,
            held,
            stop,
            ticker: Some(ticker),
        })
    }

    /// Unknown VKs are silently dropped.
    pub fn press(&mut self, vk: u16) -> Result<()> {
        let Some(mapping) = keycodes::lookup(vk) else {
            return Ok(());
        };
        self.held.lock().unwrap().insert(vk);
        emit_key(&self.sink, mapping.linux_code, mapping.scan_code, 1)
    }

    pub fn release(&mut self, vk: u16) -> Result<()> {
        self.held.lock().unwrap().remove(&vk);
        let Some(mapping) = keycodes::lookup(vk) else {
            return Ok(());
        };
        emit_key(&self.sink, mapping.linux_code, mapping.scan_code, 0)
    }

    pub fn get_nodes(&self) -> Result<Vec<String>> {
        self.sink.lock().unwrap().get_nodes()
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
    }
}

fn emit_key(sink: &Arc<Mutex<EvdevSink>>, code: KeyCode, scan: u32, value: i32) -> Result<()> {
    sink.lock().unwrap().emit(&[
        InputEvent::new(EventType::MISC.0, MiscCode::MSC_SCAN.0, scan as i32),
        InputEvent::new(EventType::KEY.0, code.0, value),
    ])
}

fn repeat_loop(sink: Arc<Mutex<EvdevSink>>, held: Arc<Mutex<HashSet<u16>>>, stop: Arc<AtomicBool>, interval: Duration) {
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(interval);
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let vks: Vec<u16> = held.lock().unwrap().iter().copied().collect();
        for vk in vks {
            let Some(mapping) = keycodes::lookup(vk) else {
                continue;
            };
            if let Err(err) = emit_key(&sink, mapping.linux_code, mapping.scan_code, 1) {
                warn!(?err, vk, "auto-repeat emit failed");
            }
        }
    }
}

fn build_device() -> Result<evdev::uinput::VirtualDevice> {
    let mut keys = AttributeSet::<KeyCode>::new();
    for code in keycodes::all_linux_codes() {
        keys.insert(code);
    }

    Ok(VirtualDeviceBuilder::new()?
        .name("Virtual Keyboard")
        .input_id(InputId::new(BusType::BUS_USB, VENDOR, PRODUCT, VERSION))
        .with_keys(&keys)?
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_repeat_interval_is_50ms() {
        assert_eq!(DEFAULT_REPEAT_INTERVAL, Duration::from_millis(50));
    }
}
