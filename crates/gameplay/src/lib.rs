//! Playground gameplay: walls, balls, dispensers, the collision-to-audio bridge and the
//! per-session context that ties them to the physics world.
//!
//! Everything a session owns lives in [`PlaygroundSession`]; there are no global registries.
//! Input goes through [`PlaygroundSession::enqueue`] and is applied by
//! [`PlaygroundSession::tick`] between physics steps.

use std::collections::{BTreeMap, VecDeque};

use bevy::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;

use chime_config::PlaygroundConfig;
use chime_core::{
    BallId, CollisionNotification, DispenserId, Feedback, HeadlessScene, IdAllocator, SceneSink,
    VoiceTable, WallId,
};
use chime_physics::{BodyState, PhysicsWorld};

pub mod bridge;
mod commands;
mod lifecycle;
mod spawner;
mod walls;

pub use bridge::{BridgeStats, CollisionAudioBridge, Contact, Resolution, SoundDispatch};
pub use commands::{PlaygroundCommand, TickReport};
pub use lifecycle::{Obstacle, ObstacleSpec, Release};
pub use spawner::{Ball, Dispenser};
pub use walls::{Wall, WallGeometry, WallOptions, WallPreview};

type Subscriber = Box<dyn FnMut(&CollisionNotification) + Send + Sync>;

/// Per-session context: configuration, physics world, collaborators and entity registries.
#[derive(Resource)]
pub struct PlaygroundSession {
    config: PlaygroundConfig,
    physics: PhysicsWorld,
    scene: Box<dyn SceneSink>,
    feedback: Feedback,
    voices: VoiceTable,
    ids: IdAllocator,
    walls: BTreeMap<WallId, Wall>,
    balls: BTreeMap<BallId, Ball>,
    dispensers: BTreeMap<DispenserId, Dispenser>,
    obstacles: Vec<Obstacle>,
    preview: Option<WallPreview>,
    bridge: CollisionAudioBridge,
    rng: StdRng,
    commands: VecDeque<PlaygroundCommand>,
    subscribers: Vec<Subscriber>,
}

impl PlaygroundSession {
    /// A headless session with no optional capabilities.
    pub fn new(config: PlaygroundConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            physics: PhysicsWorld::new(&config.physics),
            scene: Box::new(HeadlessScene::default()),
            feedback: Feedback::default(),
            voices: VoiceTable::default(),
            ids: IdAllocator::default(),
            walls: BTreeMap::new(),
            balls: BTreeMap::new(),
            dispensers: BTreeMap::new(),
            obstacles: Vec::new(),
            preview: None,
            bridge: CollisionAudioBridge::new(&config.audio, &config.notes),
            rng,
            commands: VecDeque::new(),
            subscribers: Vec::new(),
            config,
        }
    }

    pub fn with_scene(mut self, scene: impl SceneSink + 'static) -> Self {
        self.scene = Box::new(scene);
        self
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn voices(&self) -> &VoiceTable {
        &self.voices
    }

    pub fn bridge_stats(&self) -> BridgeStats {
        self.bridge.stats()
    }

    pub fn wall(&self, id: WallId) -> Option<&Wall> {
        self.walls.get(&id)
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.walls.values()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.get(&id)
    }

    pub fn balls(&self) -> impl Iterator<Item = &Ball> {
        self.balls.values()
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    /// Live pose and motion of a ball, read from the physics world.
    pub fn ball_state(&self, id: BallId) -> Option<BodyState> {
        let body = self.balls.get(&id)?.body()?;
        self.physics.body_state(body)
    }

    pub fn dispenser(&self, id: DispenserId) -> Option<&Dispenser> {
        self.dispensers.get(&id)
    }

    pub fn dispenser_count(&self) -> usize {
        self.dispensers.len()
    }

    pub fn preview(&self) -> Option<&WallPreview> {
        self.preview.as_ref()
    }

    /// Register a collision-notification callback. Callbacks run after the step's sounds are
    /// dispatched and only ever see the notification.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&CollisionNotification) + Send + Sync + 'static,
    ) {
        self.subscribers.push(Box::new(callback));
    }

    fn notify(&mut self, notification: &CollisionNotification) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(notification);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chime_core::feedback::recording::{
        RecordingAnnouncer, RecordingAudio, RecordingHaptics, RecordingScene,
    };

    /// Session wired to recording doubles, plus handles to read them back.
    pub struct Rig {
        pub session: PlaygroundSession,
        pub audio: RecordingAudio,
        pub haptics: RecordingHaptics,
        pub announcer: RecordingAnnouncer,
        pub scene: RecordingScene,
    }

    pub fn rig_with(config: PlaygroundConfig) -> Rig {
        let audio = RecordingAudio::new();
        let haptics = RecordingHaptics::new();
        let announcer = RecordingAnnouncer::new();
        let scene = RecordingScene::new();
        let session = PlaygroundSession::new(config)
            .with_scene(scene.clone())
            .with_feedback(
                Feedback::default()
                    .with_audio(audio.clone())
                    .with_haptics(haptics.clone())
                    .with_announcer(announcer.clone()),
            );
        Rig {
            session,
            audio,
            haptics,
            announcer,
            scene,
        }
    }

    pub fn rig() -> Rig {
        rig_with(PlaygroundConfig {
            seed: Some(7),
            ..PlaygroundConfig::default()
        })
    }
}
