//! Bevy integration: drives a [`PlaygroundSession`] from the fixed-timestep schedule.
//!
//! Input arrives as [`PlaygroundInput`] events and is forwarded into the session's command
//! queue in `PreUpdate`; each `FixedUpdate` runs one session tick and re-emits collision
//! notifications as [`CollisionNotification`] events.

use bevy::log::{debug, warn};
use bevy::prelude::*;
use serde::Serialize;

use chime_config::PlaygroundConfig;
use chime_core::CollisionNotification;
use chime_gameplay::{PlaygroundCommand, PlaygroundSession, SoundDispatch};

pub mod sinks;

/// Bevy resource wrapper for the pure-data config (keeps `chime_config` free of Bevy).
#[derive(Resource, Debug, Clone, Default)]
pub struct PlaygroundConfigRes(pub PlaygroundConfig);

/// A user request entering the app (pointer handlers, scripted scenes, tests).
#[derive(Event, Debug, Clone, PartialEq)]
pub struct PlaygroundInput(pub PlaygroundCommand);

/// Running totals across all ticks.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlaygroundStats {
    pub ticks: u64,
    pub notes: u64,
    pub bounces: u64,
    pub notifications: u64,
    pub spawned: u64,
    pub evicted: u64,
    pub resets: u64,
    pub deferred_events: u64,
    pub skipped_steps: u64,
}

#[derive(SystemSet, Debug, Hash, Eq, PartialEq, Clone)]
pub struct PlaygroundInputSet;

#[derive(SystemSet, Debug, Hash, Eq, PartialEq, Clone)]
pub struct PlaygroundTickSet;

pub struct PlaygroundPlugin;

impl Plugin for PlaygroundPlugin {
    fn build(&self, app: &mut App) {
        let cfg = app
            .world()
            .get_resource::<PlaygroundConfigRes>()
            .map(|c| c.0.clone())
            .unwrap_or_default();
        let hz = if cfg.physics.fixed_hz.is_finite() && cfg.physics.fixed_hz > 0.0 {
            cfg.physics.fixed_hz
        } else {
            warn!("invalid physics.fixed_hz {}; using 60", cfg.physics.fixed_hz);
            60.0
        };
        if !app.world().contains_resource::<PlaygroundSession>() {
            app.insert_resource(PlaygroundSession::new(cfg.clone()));
        }
        if !app.world().contains_resource::<PlaygroundConfigRes>() {
            app.insert_resource(PlaygroundConfigRes(cfg));
        }
        app.insert_resource(Time::<Fixed>::from_hz(hz as f64))
            .init_resource::<PlaygroundStats>()
            .add_event::<PlaygroundInput>()
            .add_event::<CollisionNotification>()
            .add_systems(PreUpdate, forward_inputs.in_set(PlaygroundInputSet))
            .add_systems(FixedUpdate, tick_session.in_set(PlaygroundTickSet));
    }
}

fn forward_inputs(
    mut inputs: EventReader<PlaygroundInput>,
    mut session: ResMut<PlaygroundSession>,
) {
    for PlaygroundInput(command) in inputs.read() {
        session.enqueue(command.clone());
    }
}

fn tick_session(
    time: Res<Time<Fixed>>,
    mut session: ResMut<PlaygroundSession>,
    mut stats: ResMut<PlaygroundStats>,
    mut notifications: EventWriter<CollisionNotification>,
) {
    let report = session.tick(time.timestep().as_secs_f32());

    stats.ticks += 1;
    for resolution in &report.sounds {
        match resolution.sound {
            SoundDispatch::Note(_) => stats.notes += 1,
            SoundDispatch::Bounce { .. } => stats.bounces += 1,
        }
    }
    stats.notifications += report.notifications.len() as u64;
    stats.spawned += report.spawned.len() as u64;
    stats.evicted += report.evicted.len() as u64;
    stats.resets += report.step.reset.len() as u64;
    stats.deferred_events += report.step.deferred_events as u64;
    if report.step.skipped {
        stats.skipped_steps += 1;
    }
    if report.step.deferred_events > 0 {
        debug!(
            deferred = report.step.deferred_events,
            "collision queue full; contacts carried to later steps"
        );
    }

    for notification in report.notifications {
        notifications.write(notification);
    }
}
