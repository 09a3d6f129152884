//! Collaborators for headless runs: every request becomes a log line.

use bevy::log::{debug, info};

use chime_core::{
    Announcer, AudioError, AudioSink, ChirpCue, CollisionNotification, HapticSink, NoteCue,
};

#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play_note(&mut self, cue: &NoteCue) -> Result<(), AudioError> {
        info!(
            note = %cue.note,
            hz = cue.frequency,
            secs = cue.duration,
            volume = cue.volume,
            voice = ?cue.voice,
            "note"
        );
        Ok(())
    }

    fn play_bounce(&mut self, volume: f32) -> Result<(), AudioError> {
        info!(volume, "bounce");
        Ok(())
    }

    fn play_chirp(&mut self, cue: &ChirpCue) -> Result<(), AudioError> {
        debug!(note = %cue.note, hz = cue.frequency, "chirp");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogHaptics;

impl HapticSink for LogHaptics {
    fn pulse(&mut self, duration_ms: u32, magnitude: f32) {
        debug!(duration_ms, magnitude, "haptic pulse");
    }
}

#[derive(Debug, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&mut self, text: &str) {
        info!("announce: {text}");
    }

    fn collision(&mut self, notification: &CollisionNotification) {
        debug!(
            object = %notification.object_name,
            intensity = notification.intensity,
            significant = notification.is_significant,
            "collision"
        );
    }
}
