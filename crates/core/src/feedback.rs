//! Narrow interfaces to the collaborators the playground drives but does not implement:
//! audio synthesis, haptics, accessibility announcements and the scene renderer.
//!
//! Audio, haptics and the announcer are optional capabilities (bundled in [`Feedback`]); a
//! missing one silently skips its side effect. The scene sink is always present; the
//! [`HeadlessScene`] stands in when nothing renders.

use bevy::color::Color;
use bevy::log::trace;
use bevy::prelude::{Event, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::notes::Note;
use crate::voice::Voice;

/// A struck wall's note, ready for synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteCue {
    pub note: Note,
    pub frequency: f32,
    pub duration: f32,
    pub volume: f32,
    pub voice: Voice,
}

/// Short confirmation tone played when a wall is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpCue {
    pub note: Note,
    pub frequency: f32,
    pub duration: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Output device missing or suspended.
    Unavailable,
    /// The engine refused the request (voice limit, bad parameters...).
    Rejected(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Unavailable => write!(f, "audio device unavailable"),
            AudioError::Rejected(reason) => write!(f, "audio request rejected: {reason}"),
        }
    }
}

impl std::error::Error for AudioError {}

pub trait AudioSink: Send + Sync {
    fn play_note(&mut self, cue: &NoteCue) -> Result<(), AudioError>;
    fn play_bounce(&mut self, volume: f32) -> Result<(), AudioError>;
    fn play_chirp(&mut self, cue: &ChirpCue) -> Result<(), AudioError>;
}

pub trait HapticSink: Send + Sync {
    fn pulse(&mut self, duration_ms: u32, magnitude: f32);
}

/// Accessibility output (screen-reader live region or equivalent).
pub trait Announcer: Send + Sync {
    fn announce(&mut self, text: &str);
    fn collision(&mut self, notification: &CollisionNotification);
}

/// Emitted when an important body is struck audibly.
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionNotification {
    pub object_name: String,
    /// Post-amplification intensity.
    pub intensity: f32,
    pub is_significant: bool,
    pub note: Option<Note>,
}

/// Optional capabilities injected into a session.
#[derive(Default)]
pub struct Feedback {
    pub audio: Option<Box<dyn AudioSink>>,
    pub haptics: Option<Box<dyn HapticSink>>,
    pub announcer: Option<Box<dyn Announcer>>,
}

impl Feedback {
    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn with_haptics(mut self, haptics: impl HapticSink + 'static) -> Self {
        self.haptics = Some(Box::new(haptics));
        self
    }

    pub fn with_announcer(mut self, announcer: impl Announcer + 'static) -> Self {
        self.announcer = Some(Box::new(announcer));
        self
    }

    pub fn announce(&mut self, text: &str) {
        if let Some(announcer) = self.announcer.as_mut() {
            announcer.announce(text);
        }
    }

    pub fn pulse(&mut self, duration_ms: u32, magnitude: f32) {
        if let Some(haptics) = self.haptics.as_mut() {
            haptics.pulse(duration_ms, magnitude);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Wall,
    Preview,
    Ball,
    Dispenser,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualDesc {
    pub kind: VisualKind,
    pub center: Vec3,
    pub rotation: Quat,
    /// Box half extents; balls use the radius on every axis.
    pub half_extents: Vec3,
    pub color: Color,
}

pub trait SceneSink: Send + Sync {
    fn spawn(&mut self, desc: &VisualDesc) -> MeshHandle;
    fn dispose(&mut self, mesh: MeshHandle);
}

/// Scene sink for runs without a renderer: hands out handles and tracks which are live.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next: u64,
    live: HashSet<MeshHandle>,
}

impl HeadlessScene {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl SceneSink for HeadlessScene {
    fn spawn(&mut self, desc: &VisualDesc) -> MeshHandle {
        self.next += 1;
        let handle = MeshHandle(self.next);
        self.live.insert(handle);
        trace!(?handle, kind = ?desc.kind, "visual spawned");
        handle
    }

    fn dispose(&mut self, mesh: MeshHandle) {
        if !self.live.remove(&mesh) {
            trace!(?mesh, "dispose of unknown visual ignored");
        }
    }
}

/// Recording doubles for every collaborator. Clones share their log, so a test keeps one clone
/// and hands the other to the session.
pub mod recording {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum AudioCall {
        Note(NoteCue),
        Bounce(f32),
        Chirp(ChirpCue),
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingAudio {
        calls: Arc<Mutex<Vec<AudioCall>>>,
        fail: bool,
    }

    impl RecordingAudio {
        pub fn new() -> Self {
            Self::default()
        }

        /// Records every request, then reports the device as unavailable.
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        pub fn calls(&self) -> Vec<AudioCall> {
            lock(&self.calls).clone()
        }

        pub fn notes(&self) -> Vec<NoteCue> {
            lock(&self.calls)
                .iter()
                .filter_map(|c| match c {
                    AudioCall::Note(cue) => Some(*cue),
                    _ => None,
                })
                .collect()
        }

        pub fn bounces(&self) -> Vec<f32> {
            lock(&self.calls)
                .iter()
                .filter_map(|c| match c {
                    AudioCall::Bounce(v) => Some(*v),
                    _ => None,
                })
                .collect()
        }

        pub fn chirps(&self) -> Vec<ChirpCue> {
            lock(&self.calls)
                .iter()
                .filter_map(|c| match c {
                    AudioCall::Chirp(cue) => Some(*cue),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            lock(&self.calls).clear();
        }

        fn record(&self, call: AudioCall) -> Result<(), AudioError> {
            lock(&self.calls).push(call);
            if self.fail {
                Err(AudioError::Unavailable)
            } else {
                Ok(())
            }
        }
    }

    impl AudioSink for RecordingAudio {
        fn play_note(&mut self, cue: &NoteCue) -> Result<(), AudioError> {
            self.record(AudioCall::Note(*cue))
        }

        fn play_bounce(&mut self, volume: f32) -> Result<(), AudioError> {
            self.record(AudioCall::Bounce(volume))
        }

        fn play_chirp(&mut self, cue: &ChirpCue) -> Result<(), AudioError> {
            self.record(AudioCall::Chirp(*cue))
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingHaptics {
        pulses: Arc<Mutex<Vec<(u32, f32)>>>,
    }

    impl RecordingHaptics {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn pulses(&self) -> Vec<(u32, f32)> {
            lock(&self.pulses).clone()
        }
    }

    impl HapticSink for RecordingHaptics {
        fn pulse(&mut self, duration_ms: u32, magnitude: f32) {
            lock(&self.pulses).push((duration_ms, magnitude));
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingAnnouncer {
        lines: Arc<Mutex<Vec<String>>>,
        notifications: Arc<Mutex<Vec<CollisionNotification>>>,
    }

    impl RecordingAnnouncer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<String> {
            lock(&self.lines).clone()
        }

        pub fn notifications(&self) -> Vec<CollisionNotification> {
            lock(&self.notifications).clone()
        }
    }

    impl Announcer for RecordingAnnouncer {
        fn announce(&mut self, text: &str) {
            lock(&self.lines).push(text.to_string());
        }

        fn collision(&mut self, notification: &CollisionNotification) {
            lock(&self.notifications).push(notification.clone());
        }
    }

    #[derive(Debug, Default)]
    pub struct SceneLedger {
        next: u64,
        pub live: HashSet<MeshHandle>,
        pub spawned: Vec<(MeshHandle, VisualKind)>,
        pub disposed: Vec<MeshHandle>,
        /// Dispose calls for handles that were not live.
        pub double_disposed: usize,
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingScene {
        ledger: Arc<Mutex<SceneLedger>>,
    }

    impl RecordingScene {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn live_count(&self) -> usize {
            lock(&self.ledger).live.len()
        }

        pub fn live_of(&self, kind: VisualKind) -> usize {
            let ledger = lock(&self.ledger);
            ledger
                .spawned
                .iter()
                .filter(|(h, k)| *k == kind && ledger.live.contains(h))
                .count()
        }

        pub fn spawned_of(&self, kind: VisualKind) -> usize {
            lock(&self.ledger).spawned.iter().filter(|(_, k)| *k == kind).count()
        }

        pub fn disposed_count(&self) -> usize {
            lock(&self.ledger).disposed.len()
        }

        pub fn double_disposed(&self) -> usize {
            lock(&self.ledger).double_disposed
        }
    }

    impl SceneSink for RecordingScene {
        fn spawn(&mut self, desc: &VisualDesc) -> MeshHandle {
            let mut ledger = lock(&self.ledger);
            ledger.next += 1;
            let handle = MeshHandle(ledger.next);
            ledger.live.insert(handle);
            ledger.spawned.push((handle, desc.kind));
            handle
        }

        fn dispose(&mut self, mesh: MeshHandle) {
            let mut ledger = lock(&self.ledger);
            if ledger.live.remove(&mesh) {
                ledger.disposed.push(mesh);
            } else {
                ledger.double_disposed += 1;
            }
        }
    }
}
