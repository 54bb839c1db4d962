//! The asynchronous rumble loop shared by [`super::xbox::XboxOneJoypad`] and
//! [`super::switch::SwitchJoypad`]: a worker thread that drains uinput force-
//! feedback events from the kernel, maintains the upload/active-effect
//! tables, and reports envelope-shaped `(weak, strong)` magnitudes to a user
//! callback whenever they change.
//!
//! Built directly on the `evdev` crate's own FF plumbing
//! (`process_ff_upload`/`process_ff_erase`/`fetch_events`), the same API
//! `InputPlumber`'s `GenericGamepad` target uses for its FF thread, rather
//! than hand-rolled `UI_BEGIN_FF_UPLOAD`/`UI_END_FF_UPLOAD` ioctls.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use evdev::uinput::VirtualDevice;
use evdev::{EventSummary, EventType, FFEffectKind, UInputCode};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const FF_GAIN_CODE: u16 = 0x60;

/// Magnitudes reported to the rumble callback, already gain-scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RumbleMagnitudes {
    pub weak: u16,
    pub strong: u16,
}

impl RumbleMagnitudes {
    pub const ZERO: RumbleMagnitudes = RumbleMagnitudes { weak: 0, strong: 0 };
}

pub type RumbleCallback = Arc<dyn Fn(RumbleMagnitudes) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Envelope {
    attack_length: u16,
    attack_level: i16,
    fade_length: u16,
    fade_level: i16,
}

impl From<evdev::FFEnvelope> for Envelope {
    fn from(e: evdev::FFEnvelope) -> Self {
        Envelope {
            attack_length: e.attack_length,
            attack_level: e.attack_level,
            fade_length: e.fade_length,
            fade_level: e.fade_level,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Constant { level: i16, envelope: Envelope },
    Ramp { start_level: i16, end_level: i16, envelope: Envelope },
    Periodic { magnitude: i16, envelope: Envelope },
    Rumble { strong: u16, weak: u16 },
}

fn envelope_of(kind: &Kind) -> Option<&Envelope> {
    match kind {
        Kind::Constant { envelope, .. } | Kind::Ramp { envelope, .. } | Kind::Periodic { envelope, .. } => {
            Some(envelope)
        }
        Kind::Rumble { .. } => None,
    }
}

/// Scalar force level at `elapsed_ms` into the effect's run, ignoring the
/// attack/fade envelope (applied separately by [`magnitude_at`]).
fn base_level(kind: &Kind, elapsed_ms: i64, length_ms: u16) -> i32 {
    match kind {
        Kind::Constant { level, .. } => *level as i32,
        Kind::Ramp {
            start_level,
            end_level,
            ..
        } => {
            if length_ms == 0 {
                return *end_level as i32;
            }
            let frac = (elapsed_ms.clamp(0, length_ms as i64)) as f64 / length_ms as f64;
            *start_level as f64 as i32 + ((*end_level - *start_level) as f64 * frac) as i32
        }
        Kind::Periodic { magnitude, .. } => *magnitude as i32,
        Kind::Rumble { .. } => 0,
    }
}

#[derive(Debug, Clone)]
struct StoredEffect {
    kind: Kind,
    replay_length: u16,
    replay_delay: u16,
}

impl StoredEffect {
    fn from_data(data: evdev::FFEffectData) -> Self {
        let kind = match data.kind {
            FFEffectKind::Constant { level, envelope } => Kind::Constant {
                level,
                envelope: envelope.into(),
            },
            FFEffectKind::Ramp {
                start_level,
                end_level,
                envelope,
            } => Kind::Ramp {
                start_level,
                end_level,
                envelope: envelope.into(),
            },
            FFEffectKind::Periodic {
                magnitude, envelope, ..
            } => Kind::Periodic {
                magnitude,
                envelope: envelope.into(),
            },
            FFEffectKind::Rumble {
                strong_magnitude,
                weak_magnitude,
            } => Kind::Rumble {
                strong: strong_magnitude,
                weak: weak_magnitude,
            },
            _ => Kind::Rumble { strong: 0, weak: 0 },
        };
        StoredEffect {
            kind,
            replay_length: data.replay.length,
            replay_delay: data.replay.delay,
        }
    }
}

struct ActiveEffect {
    effect_id: i16,
    start: Instant,
    end: Instant,
    effect: StoredEffect,
    previous: RumbleMagnitudes,
}

/// Converts a signed kernel force level into an unsigned dual-motor
/// magnitude. Constant/ramp/periodic effects carry one scalar level; this
/// crate drives both motors from it equally since the abstract rumble
/// callback only has one weak/strong pair to report.
fn level_to_magnitude(level: i32) -> u16 {
    ((level.unsigned_abs() as u32) * 2).min(0xFFFF) as u16
}

fn magnitude_at(active: &ActiveEffect, now: Instant, gain: u16) -> RumbleMagnitudes {
    if let Kind::Rumble { strong, weak } = active.effect.kind {
        let scale = |v: u16| ((v as u32 * gain as u32) / 0xFFFF) as u16;
        return RumbleMagnitudes {
            weak: scale(weak),
            strong: scale(strong),
        };
    }
    if now < active.start {
        return RumbleMagnitudes::ZERO;
    }
    let elapsed_ms = now.duration_since(active.start).as_millis() as i64;
    let length_ms = active.effect.replay_length;
    let remaining_ms = if now >= active.end {
        0
    } else {
        active.end.duration_since(now).as_millis() as i64
    };
    let level = match envelope_of(&active.effect.kind) {
        Some(env) if env.attack_length != 0 && elapsed_ms < env.attack_length as i64 => {
            let frac = elapsed_ms as f64 / env.attack_length as f64;
            (env.attack_level as f64 * frac) as i32
        }
        Some(env) if env.fade_length != 0 && remaining_ms < env.fade_length as i64 => {
            let base = base_level(&active.effect.kind, elapsed_ms, length_ms);
            let frac = remaining_ms as f64 / env.fade_length as f64;
            env.fade_level as i32 + ((base - env.fade_level as i32) as f64 * frac) as i32
        }
        _ => base_level(&active.effect.kind, elapsed_ms, length_ms),
    };
    let magnitude = level_to_magnitude(level);
    let scale = |v: u16| ((v as u32 * gain as u32) / 0xFFFF) as u16;
    RumbleMagnitudes {
        weak: scale(magnitude),
        strong: scale(magnitude),
    }
}

/// Owns the FF worker thread for one gamepad handle. Dropping it stops and
/// joins the thread; the effect table and active-effect list live entirely
/// inside the thread and are never touched from the owning handle.
pub struct FfWorker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FfWorker {
    pub fn spawn(device: Arc<Mutex<VirtualDevice>>, callback: Option<RumbleCallback>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread = thread::Builder::new()
            .name("gamepad-ff".into())
            .spawn(move || run(device, thread_stop, callback))
            .expect("spawn gamepad FF worker thread");
        FfWorker {
            stop,
            thread: Some(thread),
        }
    }
}

impl Drop for FfWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(device: Arc<Mutex<VirtualDevice>>, stop: Arc<AtomicBool>, callback: Option<RumbleCallback>) {
    let mut effects: HashMap<i16, StoredEffect> = HashMap::new();
    let mut active: Vec<ActiveEffect> = Vec::new();
    let mut gain: u16 = 0xFFFF;

    while !stop.load(Ordering::SeqCst) {
        let mut pending_zero = 0u32;
        {
            let mut dev = device.lock().unwrap();
            match dev.fetch_events() {
                Ok(events) => {
                    for event in events {
                        handle_event(&mut dev, event, &mut effects, &mut active, &mut gain, &mut pending_zero);
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {}
                Err(err) => {
                    tracing::warn!(?err, "gamepad FF worker: fetch_events failed");
                }
            }
        }
        for _ in 0..pending_zero {
            if let Some(cb) = &callback {
                cb(RumbleMagnitudes::ZERO);
            }
        }

        let now = Instant::now();
        let (still_active, ended): (Vec<_>, Vec<_>) = active.drain(..).partition(|a| a.end > now);
        active.extend(still_active);
        for a in ended {
            if a.previous != RumbleMagnitudes::ZERO {
                if let Some(cb) = &callback {
                    cb(RumbleMagnitudes::ZERO);
                }
            }
        }

        for a in active.iter_mut() {
            let magnitude = magnitude_at(a, now, gain);
            if magnitude != a.previous {
                a.previous = magnitude;
                if let Some(cb) = &callback {
                    cb(magnitude);
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Removes an effect from `active` if present; returns `true` if it was
/// last reported at a nonzero magnitude, meaning the caller owes the user
/// callback one final `(0, 0)` delivery once the device lock is released.
fn remove_active(active: &mut Vec<ActiveEffect>, id: i16) -> bool {
    let Some(pos) = active.iter().position(|a| a.effect_id == id) else {
        return false;
    };
    active.remove(pos).previous != RumbleMagnitudes::ZERO
}

fn handle_event(
    dev: &mut VirtualDevice,
    event: evdev::InputEvent,
    effects: &mut HashMap<i16, StoredEffect>,
    active: &mut Vec<ActiveEffect>,
    gain: &mut u16,
    pending_zero: &mut u32,
) {
    match event.destructure() {
        EventSummary::UInput(raw, UInputCode::UI_FF_UPLOAD, ..) => match dev.process_ff_upload(raw) {
            Ok(mut upload) => {
                let id = upload.effect_id();
                effects.insert(id, StoredEffect::from_data(upload.effect()));
                upload.set_retval(0);
            }
            Err(err) => tracing::warn!(?err, "gamepad FF worker: upload failed"),
        },
        EventSummary::UInput(raw, UInputCode::UI_FF_ERASE, ..) => match dev.process_ff_erase(raw) {
            Ok(erase) => {
                let id = erase.effect_id();
                effects.remove(&id);
                if remove_active(active, id) {
                    *pending_zero += 1;
                }
            }
            Err(err) => tracing::warn!(?err, "gamepad FF worker: erase failed"),
        },
        EventSummary::ForceFeedback(_, code, value) if code.0 == FF_GAIN_CODE => {
            *gain = value.clamp(0, 0xFFFF) as u16;
        }
        EventSummary::ForceFeedback(_, code, value) => {
            let id = code.0 as i16;
            if value != 0 {
                if let Some(effect) = effects.get(&id) {
                    let now = Instant::now();
                    let start = now + Duration::from_millis(effect.replay_delay as u64);
                    let end = start + Duration::from_millis(effect.replay_length as u64);
                    active.retain(|a| a.effect_id != id);
                    active.push(ActiveEffect {
                        effect_id: id,
                        start,
                        end,
                        effect: effect.clone(),
                        previous: RumbleMagnitudes::ZERO,
                    });
                }
            } else if remove_active(active, id) {
                *pending_zero += 1;
            }
        }
        _ if event.event_type() == EventType::FORCEFEEDBACK => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(attack_length: u16, attack_level: i16, fade_length: u16, fade_level: i16) -> Envelope {
        Envelope {
            attack_length,
            attack_level,
            fade_length,
            fade_level,
        }
    }

    #[test]
    fn zero_length_attack_skips_ramp() {
        let active = ActiveEffect {
            effect_id: 0,
            start: Instant::now() - Duration::from_millis(5),
            end: Instant::now() + Duration::from_secs(1),
            effect: StoredEffect {
                kind: Kind::Constant {
                    level: 100,
                    envelope: envelope(0, 50, 0, 10),
                },
                replay_length: 1000,
                replay_delay: 0,
            },
            previous: RumbleMagnitudes::ZERO,
        };
        let m = magnitude_at(&active, Instant::now(), 0xFFFF);
        assert_eq!(m, RumbleMagnitudes { weak: 200, strong: 200 });
    }

    #[test]
    fn not_yet_started_is_silent() {
        let now = Instant::now();
        let active = ActiveEffect {
            effect_id: 1,
            start: now + Duration::from_millis(50),
            end: now + Duration::from_millis(500),
            effect: StoredEffect {
                kind: Kind::Rumble { strong: 0, weak: 0 },
                replay_length: 450,
                replay_delay: 50,
            },
            previous: RumbleMagnitudes::ZERO,
        };
        assert_eq!(magnitude_at(&active, now, 0xFFFF), RumbleMagnitudes::ZERO);
    }

    #[test]
    fn rumble_scaled_by_gain() {
        let now = Instant::now();
        let active = ActiveEffect {
            effect_id: 2,
            start: now,
            end: now + Duration::from_secs(1),
            effect: StoredEffect {
                kind: Kind::Rumble {
                    strong: 0xFFFF,
                    weak: 0x8000,
                },
                replay_length: 1000,
                replay_delay: 0,
            },
            previous: RumbleMagnitudes::ZERO,
        };
        let half_gain = magnitude_at(&active, now, 0x7FFF);
        assert!(half_gain.strong < 0xFFFF);
        assert!(half_gain.weak < 0x8000);
    }

    #[test]
    fn ramp_interpolates_linearly() {
        let now = Instant::now();
        let start = now - Duration::from_millis(500);
        let active = ActiveEffect {
            effect_id: 3,
            start,
            end: start + Duration::from_secs(1),
            effect: StoredEffect {
                kind: Kind::Ramp {
                    start_level: 0,
                    end_level: 1000,
                    envelope: envelope(0, 0, 0, 0),
                },
                replay_length: 1000,
                replay_delay: 0,
            },
            previous: RumbleMagnitudes::ZERO,
        };
        let m = magnitude_at(&active, now, 0xFFFF);
        assert_eq!(m, RumbleMagnitudes { weak: 1000, strong: 1000 });
    }
}
