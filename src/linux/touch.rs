//! Shared MT protocol B slot bookkeeping for the trackpad and touchscreen.
//!
//! Slots are allocated from `0` so the `[0, NUM_FINGERS)` invariant holds
//! literally; the original implementation this tracks starts counting at 1
//! (see DESIGN.md).

use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode};

use crate::error::Result;
use crate::linux::uinput::EvdevSink;

pub const NUM_FINGERS: usize = 16;
pub const SURFACE_W: i32 = 19200;
pub const SURFACE_H: i32 = 10800;
pub const PRESSURE_MAX: i32 = 253;

/// Caller-assigned touch identity. Opaque beyond equality/ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerId(pub u32);

/// The `EV_KEY` tool-class code for a given number of simultaneous contacts.
/// `0` has no corresponding key: all tool-class keys are released.
fn tool_class_key(count: usize) -> Option<KeyCode> {
    match count {
        1 => Some(KeyCode::BTN_TOOL_FINGER),
        2 => Some(KeyCode::BTN_TOOL_DOUBLETAP),
        3 => Some(KeyCode::BTN_TOOL_TRIPLETAP),
        4 => Some(KeyCode::BTN_TOOL_QUADTAP),
        5 => Some(KeyCode::BTN_TOOL_QUINTTAP),
        _ => None,
    }
}

/// Maps currently-down finger ids to MT slot indices and tracks which slot
/// is presently selected (the last `ABS_MT_SLOT` written).
#[derive(Debug, Default)]
pub struct SlotMap {
    slots: Vec<Option<FingerId>>,
    current_slot: Option<usize>,
}

impl SlotMap {
    pub fn new() -> Self {
        SlotMap {
            slots: vec![None; NUM_FINGERS],
            current_slot: None,
        }
    }

    pub fn slot_for(&self, finger: FingerId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(finger))
    }

    /// Allocates the lowest free slot for a new finger. Returns `None` if
    /// all `NUM_FINGERS` slots are occupied.
    pub fn allocate(&mut self, finger: FingerId) -> Option<usize> {
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(finger);
        Some(slot)
    }

    pub fn release(&mut self, finger: FingerId) -> Option<usize> {
        let slot = self.slot_for(finger)?;
        self.slots[slot] = None;
        Some(slot)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn current_slot(&self) -> Option<usize> {
        self.current_slot
    }

    pub fn set_current_slot(&mut self, slot: usize) {
        self.current_slot = Some(slot);
    }

    /// The tool-class key transition to perform when the occupied count
    /// changes from `before` to `after`: the key to release (if any) and
    /// the key to press (if any).
    pub fn tool_class_transition(before: usize, after: usize) -> (Option<KeyCode>, Option<KeyCode>) {
        (tool_class_key(before), tool_class_key(after))
    }
}

/// Core MT-B bookkeeping shared by [`crate::linux::trackpad::Trackpad`] and
/// [`crate::linux::touchscreen::Touchscreen`]. Those device-specific wrappers
/// differ only in what keys/properties their uinput device advertises
/// (`BTN_LEFT` + `INPUT_PROP_BUTTONPAD` on the trackpad, neither on the
/// touchscreen); the MT slot protocol itself is identical.
pub(crate) struct TouchCore {
    sink: EvdevSink,
    slots: SlotMap,
}

impl TouchCore {
    pub(crate) fn new(sink: EvdevSink) -> Self {
        TouchCore {
            sink,
            slots: SlotMap::new(),
        }
    }

    pub(crate) fn get_nodes(&self) -> Result<Vec<String>> {
        self.sink.get_nodes()
    }

    pub(crate) fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        self.sink.emit(events)
    }

    /// `x, y ∈ [0, 1]`, `pressure ∈ [0, 1]`, `orientation ∈ [-90, 90]`.
    pub(crate) fn place_finger(
        &mut self,
        finger: FingerId,
        x: f64,
        y: f64,
        pressure: f64,
        orientation: f64,
    ) -> Result<()> {
        let mut events = Vec::new();
        let before = self.slots.occupied_count();

        let slot = match self.slots.slot_for(finger) {
            Some(slot) => slot,
            None => {
                let Some(slot) = self.slots.allocate(finger) else {
                    return Ok(());
                };
                slot
            }
        };

        if self.slots.current_slot() != Some(slot) {
            events.push(mt_slot_event(slot));
            self.slots.set_current_slot(slot);
        }

        if before < self.slots.occupied_count() {
            events.push(InputEvent::new(
                EventType::ABSOLUTE.0,
                AbsoluteAxisCode::ABS_MT_TRACKING_ID.0,
                slot as i32,
            ));
            let after = self.slots.occupied_count();
            let (release, press) = SlotMap::tool_class_transition(before, after);
            if let Some(key) = release {
                events.push(InputEvent::new(EventType::KEY.0, key.0, 0));
            }
            if let Some(key) = press {
                events.push(InputEvent::new(EventType::KEY.0, key.0, 1));
            }
            if before == 0 && after > 0 {
                events.push(InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 1));
            }
        }

        let px = (x.clamp(0.0, 1.0) * SURFACE_W as f64) as i32;
        let py = (y.clamp(0.0, 1.0) * SURFACE_H as f64) as i32;
        let pp = (pressure.clamp(0.0, 1.0) * PRESSURE_MAX as f64) as i32;
        let po = orientation.clamp(-90.0, 90.0) as i32;

        events.extend([
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_X.0, px),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Y.0, py),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_POSITION_X.0, px),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_POSITION_Y.0, py),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_PRESSURE.0, pp),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_PRESSURE.0, pp),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_ORIENTATION.0, po),
        ]);

        self.sink.emit(&events)
    }

    pub(crate) fn release_finger(&mut self, finger: FingerId) -> Result<()> {
        let Some(slot) = self.slots.slot_for(finger) else {
            return Ok(());
        };
        let before = self.slots.occupied_count();

        let mut events = Vec::new();
        if self.slots.current_slot() != Some(slot) {
            events.push(mt_slot_event(slot));
            self.slots.set_current_slot(slot);
        }
        events.push(InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_MT_TRACKING_ID.0,
            -1,
        ));

        self.slots.release(finger);
        let after = self.slots.occupied_count();
        let (release, press) = SlotMap::tool_class_transition(before, after);
        if let Some(key) = release {
            events.push(InputEvent::new(EventType::KEY.0, key.0, 0));
        }
        if let Some(key) = press {
            events.push(InputEvent::new(EventType::KEY.0, key.0, 1));
        }
        if after == 0 {
            events.push(InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 0));
        }

        self.sink.emit(&events)
    }
}

fn mt_slot_event(slot: usize) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_SLOT.0, slot as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_slot() {
        let mut map = SlotMap::new();
        assert_eq!(map.allocate(FingerId(10)), Some(0));
        assert_eq!(map.allocate(FingerId(11)), Some(1));
        map.release(FingerId(10));
        assert_eq!(map.allocate(FingerId(12)), Some(0));
    }

    #[test]
    fn fails_when_all_slots_full() {
        let mut map = SlotMap::new();
        for i in 0..NUM_FINGERS as u32 {
            assert!(map.allocate(FingerId(i)).is_some());
        }
        assert_eq!(map.allocate(FingerId(999)), None);
    }

    #[test]
    fn tool_class_maps_count_to_key() {
        assert_eq!(tool_class_key(1), Some(KeyCode::BTN_TOOL_FINGER));
        assert_eq!(tool_class_key(5), Some(KeyCode::BTN_TOOL_QUINTTAP));
        assert_eq!(tool_class_key(0), None);
        assert_eq!(tool_class_key(6), None);
    }

    #[test]
    fn occupied_count_tracks_allocations_and_releases() {
        let mut map = SlotMap::new();
        map.allocate(FingerId(1));
        map.allocate(FingerId(2));
        assert_eq!(map.occupied_count(), 2);
        map.release(FingerId(1));
        assert_eq!(map.occupied_count(), 1);
    }
}
