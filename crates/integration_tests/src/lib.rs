// Integration tests: black-box scenarios across the published playground APIs
// (config -> session -> physics -> bridge -> collaborators, and the Bevy plugin on top).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use chime_app::{PlaygroundConfigRes, PlaygroundPlugin, PlaygroundStats};
use chime_config::PlaygroundConfig;
use chime_core::feedback::recording::{
    RecordingAnnouncer, RecordingAudio, RecordingHaptics, RecordingScene,
};
use chime_core::{CollisionNotification, Feedback};
use chime_gameplay::PlaygroundSession;

pub fn build_minimal_app(cfg: PlaygroundConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(PlaygroundConfigRes(cfg));
    app
}

/// A session wired to recording collaborators.
pub struct Harness {
    pub session: PlaygroundSession,
    pub audio: RecordingAudio,
    pub haptics: RecordingHaptics,
    pub announcer: RecordingAnnouncer,
    pub scene: RecordingScene,
}

pub fn harness(cfg: PlaygroundConfig) -> Harness {
    let audio = RecordingAudio::new();
    let haptics = RecordingHaptics::new();
    let announcer = RecordingAnnouncer::new();
    let scene = RecordingScene::new();
    let session = PlaygroundSession::new(cfg)
        .with_scene(scene.clone())
        .with_feedback(
            Feedback::default()
                .with_audio(audio.clone())
                .with_haptics(haptics.clone())
                .with_announcer(announcer.clone()),
        );
    Harness {
        session,
        audio,
        haptics,
        announcer,
        scene,
    }
}

/// One line of run telemetry, as an external dashboard would consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryLine {
    pub tick: u64,
    pub notification: CollisionNotification,
}

pub fn seeded(seed: u64) -> PlaygroundConfig {
    PlaygroundConfig {
        seed: Some(seed),
        ..PlaygroundConfig::default()
    }
}
