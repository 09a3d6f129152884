//! Input commands and the per-step driver.

use bevy::log::{debug, trace};
use bevy::prelude::Vec3;

use chime_config::BallBallPolicy;
use chime_core::{BallId, CollisionNotification, DispenserId, Voice, WallId};
use chime_physics::StepReport;

use crate::bridge::{Contact, Resolution};
use crate::walls::WallOptions;
use crate::PlaygroundSession;

/// A user request. Queued with [`PlaygroundSession::enqueue`] and applied at the start of the
/// next [`PlaygroundSession::tick`], never from inside collision handling.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaygroundCommand {
    PreviewWall { start: Vec3, end: Vec3 },
    CancelPreview,
    FinishWall { start: Vec3, end: Vec3 },
    CreateWall { start: Vec3, end: Vec3, options: WallOptions },
    RemoveWall(WallId),
    AssignVoice { wall: WallId, voice: Voice },
    AddDispenser { position: Vec3, cadence: Option<f32> },
    RemoveDispenser(DispenserId),
    DropBall(DispenserId),
    PlaceBall { position: Vec3, velocity: Vec3 },
    RemoveBall(BallId),
    SetBallPolicy(BallBallPolicy),
    ClearAll,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Commands taken off the queue this tick.
    pub applied: usize,
    pub created_walls: Vec<WallId>,
    /// Balls created by commands or dispenser cadence.
    pub spawned: Vec<BallId>,
    pub step: StepReport,
    /// One entry per audible collision, in event order.
    pub sounds: Vec<Resolution>,
    pub notifications: Vec<CollisionNotification>,
    pub evicted: Vec<BallId>,
}

impl PlaygroundSession {
    pub fn enqueue(&mut self, command: PlaygroundCommand) {
        trace!(?command, "command queued");
        self.commands.push_back(command);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    fn apply(&mut self, command: PlaygroundCommand, report: &mut TickReport) {
        use PlaygroundCommand::*;
        match command {
            PreviewWall { start, end } => {
                self.update_temp_wall(start, end);
            }
            CancelPreview => {
                self.cancel_preview();
            }
            FinishWall { start, end } => {
                report.created_walls.extend(self.finish_wall(start, end));
            }
            CreateWall {
                start,
                end,
                options,
            } => {
                report
                    .created_walls
                    .extend(self.create_wall_with(start, end, options));
            }
            RemoveWall(id) => {
                self.cleanup_wall(id);
            }
            AssignVoice { wall, voice } => {
                self.assign_voice(wall, voice);
            }
            AddDispenser { position, cadence } => {
                self.add_dispenser(position, cadence);
            }
            RemoveDispenser(id) => {
                self.remove_dispenser(id);
            }
            DropBall(id) => {
                report.spawned.extend(self.drop_ball(id));
            }
            PlaceBall { position, velocity } => {
                report.spawned.extend(self.place_ball(position, velocity));
            }
            RemoveBall(id) => {
                self.remove_ball(id);
            }
            SetBallPolicy(policy) => self.physics.set_ball_policy(policy),
            ClearAll => {
                self.clear_all();
            }
        }
    }

    /// One simulation tick: queued commands, dispenser cadence, physics step, collision sounds,
    /// subscriber notifications, out-of-bounds eviction.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        while let Some(command) = self.commands.pop_front() {
            self.apply(command, &mut report);
            report.applied += 1;
        }

        let dropped = self.run_cadence(dt);
        report.spawned.extend(dropped);

        report.step = self.physics.step(dt);
        for event in &report.step.events {
            let contact = Contact::from(event);
            if let Some(resolution) = self.bridge.dispatch(&contact, &self.voices, &mut self.feedback)
            {
                report.sounds.push(resolution);
            }
        }
        let notifications: Vec<CollisionNotification> = report
            .sounds
            .iter()
            .filter_map(|r| r.notification.clone())
            .collect();
        for notification in &notifications {
            self.notify(notification);
        }
        report.notifications = notifications;

        report.evicted = self.evict_out_of_bounds();
        if !report.step.reset.is_empty() {
            debug!(count = report.step.reset.len(), "bodies reset after instability");
        }
        report
    }
}
