//! Collision-to-audio bridge.
//!
//! Each contact is resolved to at most one sound: the struck wall's note when the wall carries a
//! well-formed tone, a generic bounce otherwise. Material amplification is applied after that
//! decision. Important targets also produce a [`CollisionNotification`].

use bevy::log::debug;

use chime_config::{AudioConfig, NoteConfig};
use chime_core::{
    amplify, map_impact_to_intensity, BodyMetadata, CollisionNotification, Feedback, NoteCue,
    NoteLength, VoiceTable, NOTE_GAIN,
};
use chime_physics::CollisionEvent;

/// The parts of a collision the bridge looks at.
#[derive(Debug, Clone, Copy)]
pub struct Contact<'a> {
    pub impact_velocity: f32,
    pub participants: [Option<&'a BodyMetadata>; 2],
}

impl<'a> From<&'a CollisionEvent> for Contact<'a> {
    fn from(event: &'a CollisionEvent) -> Self {
        Self {
            impact_velocity: event.impact_velocity,
            participants: [event.metadata[0].as_ref(), event.metadata[1].as_ref()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundDispatch {
    Note(NoteCue),
    Bounce { volume: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub sound: SoundDispatch,
    /// Intensity after material amplification.
    pub intensity: f32,
    pub notification: Option<CollisionNotification>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub processed: u64,
    pub silent: u64,
    pub notes: u64,
    pub bounces: u64,
    pub notifications: u64,
    pub failures: u64,
}

pub struct CollisionAudioBridge {
    threshold: f32,
    significance: f32,
    tempo_bpm: f32,
    stats: BridgeStats,
}

impl CollisionAudioBridge {
    pub fn new(audio: &AudioConfig, notes: &NoteConfig) -> Self {
        Self {
            threshold: audio.impact_threshold,
            significance: audio.significance,
            tempo_bpm: notes.tempo_bpm,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// The body whose sound is played: the non-ball participant, or the second ball. Ball-ball
    /// contacts only reach the bridge under `BallBallPolicy::Bounce`.
    fn target<'a>(contact: &Contact<'a>) -> Option<&'a BodyMetadata> {
        contact
            .participants
            .iter()
            .flatten()
            .copied()
            .find(|m| !m.is_ball())
            .or(contact.participants[1])
            .or(contact.participants[0])
    }

    /// Decide what a contact sounds like without side effects.
    pub fn resolve(&self, contact: &Contact<'_>, voices: &VoiceTable) -> Option<Resolution> {
        let intensity = map_impact_to_intensity(contact.impact_velocity, self.threshold)?;
        let target = Self::target(contact);
        let amplification = target
            .and_then(BodyMetadata::material)
            .and_then(|m| m.sound_amplification());
        let amplified = amplify(intensity, amplification);

        let (sound, note) = match target {
            Some(BodyMetadata::Wall {
                wall,
                tone: Some(tone),
                ..
            }) if tone.is_well_formed() => {
                let cue = NoteCue {
                    note: tone.note,
                    frequency: tone.note.frequency(),
                    duration: NoteLength::from_wall_length(tone.length).seconds(self.tempo_bpm),
                    volume: amplified * NOTE_GAIN,
                    voice: voices.voice_for(*wall),
                };
                (SoundDispatch::Note(cue), Some(tone.note))
            }
            _ => (SoundDispatch::Bounce { volume: amplified }, None),
        };

        let notification = target
            .filter(|m| m.is_important())
            .map(|m| CollisionNotification {
                object_name: m.name().unwrap_or("object").to_string(),
                intensity: amplified,
                is_significant: amplified > self.significance,
                note,
            });

        Some(Resolution {
            sound,
            intensity: amplified,
            notification,
        })
    }

    /// Resolve a contact and send it to the injected sinks. Audio failures are counted and
    /// otherwise ignored.
    pub fn dispatch(
        &mut self,
        contact: &Contact<'_>,
        voices: &VoiceTable,
        feedback: &mut Feedback,
    ) -> Option<Resolution> {
        self.stats.processed += 1;
        let Some(resolution) = self.resolve(contact, voices) else {
            self.stats.silent += 1;
            return None;
        };

        let played = match (&resolution.sound, feedback.audio.as_mut()) {
            (SoundDispatch::Note(cue), audio) => {
                self.stats.notes += 1;
                audio.map(|a| a.play_note(cue))
            }
            (SoundDispatch::Bounce { volume }, audio) => {
                self.stats.bounces += 1;
                audio.map(|a| a.play_bounce(*volume))
            }
        };
        if let Some(Err(err)) = played {
            self.stats.failures += 1;
            debug!("collision sound dropped: {err}");
        }

        if let Some(notification) = &resolution.notification {
            self.stats.notifications += 1;
            if let Some(announcer) = feedback.announcer.as_mut() {
                announcer.collision(notification);
            }
        }
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_core::feedback::recording::{RecordingAnnouncer, RecordingAudio};
    use chime_core::{map_length_to_note, BallId, Material, Voice, WallId, WallTone};

    fn bridge() -> CollisionAudioBridge {
        CollisionAudioBridge::new(&AudioConfig::default(), &NoteConfig::default())
    }

    #[test]
    fn config_threshold_matches_intensity_mapping() {
        assert_eq!(chime_config::STANDARD_IMPACT_THRESHOLD, chime_core::IMPACT_THRESHOLD);
        assert_eq!(AudioConfig::default().impact_threshold, chime_core::IMPACT_THRESHOLD);
    }

    fn ball() -> BodyMetadata {
        BodyMetadata::Ball { ball: BallId(1) }
    }

    fn wall(length: f32, material: Option<Material>, important: bool) -> BodyMetadata {
        BodyMetadata::Wall {
            wall: WallId(9),
            name: "long wall".into(),
            tone: Some(WallTone {
                note: map_length_to_note(length),
                length,
            }),
            material,
            important,
        }
    }

    fn obstacle(material: Option<Material>) -> BodyMetadata {
        BodyMetadata::Obstacle {
            name: "floor".into(),
            material,
            important: false,
        }
    }

    fn contact<'a>(v: f32, a: &'a BodyMetadata, b: &'a BodyMetadata) -> Contact<'a> {
        Contact {
            impact_velocity: v,
            participants: [Some(a), Some(b)],
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn wall_hit_plays_its_note_at_half_intensity() {
        let (b, w) = (ball(), wall(5.0, None, false));
        let r = bridge()
            .resolve(&contact(5.0, &b, &w), &VoiceTable::default())
            .expect("audible");
        let SoundDispatch::Note(cue) = r.sound else {
            panic!("expected note, got {:?}", r.sound);
        };
        assert_eq!(cue.note, map_length_to_note(5.0));
        assert!(approx(cue.volume, 0.25));
        assert!(approx(cue.duration, 0.5), "quarter note at 120 bpm");
        assert_eq!(cue.voice, Voice::A);
    }

    #[test]
    fn participant_order_does_not_matter() {
        let (b, w) = (ball(), wall(3.0, None, false));
        let voices = VoiceTable::default();
        let r1 = bridge().resolve(&contact(4.0, &b, &w), &voices);
        let r2 = bridge().resolve(&contact(-4.0, &w, &b), &voices);
        assert_eq!(r1, r2);
    }

    #[test]
    fn slow_contacts_are_silent() {
        let (b, w) = (ball(), wall(5.0, None, false));
        let voices = VoiceTable::default();
        assert!(bridge().resolve(&contact(0.3, &b, &w), &voices).is_none());
        assert!(bridge().resolve(&contact(0.5, &b, &w), &voices).is_none());
    }

    #[test]
    fn obstacle_and_malformed_tone_bounce() {
        let b = ball();
        let voices = VoiceTable::default();
        let floor = obstacle(None);
        let r = bridge().resolve(&contact(5.0, &b, &floor), &voices).expect("audible");
        assert_eq!(r.sound, SoundDispatch::Bounce { volume: 0.5 });

        let broken = BodyMetadata::Wall {
            wall: WallId(2),
            name: "broken".into(),
            tone: Some(WallTone {
                note: map_length_to_note(1.0),
                length: f32::NAN,
            }),
            material: None,
            important: false,
        };
        let r = bridge().resolve(&contact(5.0, &b, &broken), &voices).expect("audible");
        assert!(matches!(r.sound, SoundDispatch::Bounce { .. }));
    }

    #[test]
    fn material_scales_after_branch() {
        let b = ball();
        let voices = VoiceTable::default();
        let rubber = obstacle(Some(Material::Rubber));
        let r = bridge().resolve(&contact(5.0, &b, &rubber), &voices).expect("audible");
        assert!(matches!(r.sound, SoundDispatch::Bounce { volume } if approx(volume, 0.35)));

        let metal = obstacle(Some(Material::Metal));
        let r = bridge().resolve(&contact(5.0, &b, &metal), &voices).expect("audible");
        assert!(matches!(r.sound, SoundDispatch::Bounce { volume } if approx(volume, 0.65)));

        let metal_wall = wall(5.0, Some(Material::Metal), false);
        let r = bridge().resolve(&contact(5.0, &b, &metal_wall), &voices).expect("audible");
        assert!(matches!(r.sound, SoundDispatch::Note(cue) if approx(cue.volume, 0.325)));

        // Amplified intensity never exceeds 1.
        let r = bridge().resolve(&contact(50.0, &b, &metal), &voices).expect("audible");
        assert!(approx(r.intensity, 1.0));
    }

    #[test]
    fn ball_ball_uses_second_ball_and_bounces() {
        let (a, b) = (ball(), BodyMetadata::Ball { ball: BallId(2) });
        let r = bridge()
            .resolve(&contact(2.0, &a, &b), &VoiceTable::default())
            .expect("audible");
        assert_eq!(r.sound, SoundDispatch::Bounce { volume: 0.2 });
        assert!(r.notification.is_none());
    }

    #[test]
    fn voice_table_routes_note() {
        let (b, w) = (ball(), wall(5.0, None, false));
        let mut voices = VoiceTable::default();
        voices.assign(WallId(9), Voice::B);
        let r = bridge().resolve(&contact(5.0, &b, &w), &voices).expect("audible");
        assert!(matches!(r.sound, SoundDispatch::Note(cue) if cue.voice == Voice::B));
    }

    #[test]
    fn important_targets_notify() {
        let b = ball();
        let voices = VoiceTable::default();
        let w = wall(5.0, None, true);
        let n = bridge()
            .resolve(&contact(5.0, &b, &w), &voices)
            .and_then(|r| r.notification)
            .expect("notification");
        assert_eq!(n.object_name, "long wall");
        assert!(approx(n.intensity, 0.5));
        assert!(n.is_significant);
        assert_eq!(n.note, Some(map_length_to_note(5.0)));

        let quiet = bridge()
            .resolve(&contact(2.0, &b, &w), &voices)
            .and_then(|r| r.notification)
            .expect("notification");
        assert!(!quiet.is_significant);
    }

    #[test]
    fn dispatch_plays_exactly_one_sound() {
        let audio = RecordingAudio::new();
        let announcer = RecordingAnnouncer::new();
        let mut feedback = Feedback::default()
            .with_audio(audio.clone())
            .with_announcer(announcer.clone());
        let mut bridge = bridge();
        let voices = VoiceTable::default();
        let (b, w, floor) = (ball(), wall(5.0, None, true), obstacle(None));

        bridge.dispatch(&contact(5.0, &b, &w), &voices, &mut feedback);
        assert_eq!(audio.notes().len(), 1);
        assert!(audio.bounces().is_empty());

        bridge.dispatch(&contact(5.0, &b, &floor), &voices, &mut feedback);
        bridge.dispatch(&contact(0.1, &b, &floor), &voices, &mut feedback);
        assert_eq!(audio.notes().len(), 1);
        assert_eq!(audio.bounces().len(), 1);
        assert_eq!(announcer.notifications().len(), 1);
        assert_eq!(
            bridge.stats(),
            BridgeStats {
                processed: 3,
                silent: 1,
                notes: 1,
                bounces: 1,
                notifications: 1,
                failures: 0,
            }
        );
    }

    #[test]
    fn audio_failures_are_swallowed() {
        let audio = RecordingAudio::failing();
        let mut feedback = Feedback::default().with_audio(audio.clone());
        let mut bridge = bridge();
        let (b, w) = (ball(), wall(5.0, None, false));
        let r = bridge.dispatch(&contact(5.0, &b, &w), &VoiceTable::default(), &mut feedback);
        assert!(r.is_some());
        assert_eq!(bridge.stats().failures, 1);
    }

    #[test]
    fn missing_audio_is_a_noop() {
        let mut feedback = Feedback::default();
        let mut bridge = bridge();
        let (b, w) = (ball(), wall(5.0, None, false));
        assert!(bridge
            .dispatch(&contact(5.0, &b, &w), &VoiceTable::default(), &mut feedback)
            .is_some());
        assert_eq!(bridge.stats().notes, 1);
        assert_eq!(bridge.stats().failures, 0);
    }
}
