//! Dispensers and ball creation.
//!
//! Drops are jittered so balls released from the same dispenser do not stack on one vertical
//! line. Jitter comes from the session RNG, which is seeded from `config.seed` when set.

use bevy::log::{debug, trace};
use bevy::prelude::{Color, Quat, Vec3};
use rand::Rng;

use chime_core::{BallId, BodyMetadata, DispenserId, MeshHandle, VisualDesc, VisualKind};
use chime_physics::{BallSpec, BodyHandle};

use crate::PlaygroundSession;

#[derive(Debug)]
pub struct Ball {
    pub id: BallId,
    pub radius: f32,
    pub mass: f32,
    pub initial_position: Vec3,
    pub initial_velocity: Vec3,
    pub initial_angular_velocity: Vec3,
    /// Dispenser that dropped this ball; `None` for direct placement.
    pub source: Option<DispenserId>,
    pub(crate) body: Option<BodyHandle>,
    pub(crate) mesh: Option<MeshHandle>,
}

impl Ball {
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}

#[derive(Debug)]
pub struct Dispenser {
    pub id: DispenserId,
    pub position: Vec3,
    /// Offset from `position` to the bottom opening.
    pub opening_offset: Vec3,
    /// Seconds between automatic drops; `None` drops only on request.
    pub cadence: Option<f32>,
    pub(crate) elapsed: f32,
    pub(crate) mesh: Option<MeshHandle>,
}

impl Dispenser {
    pub fn spawn_point(&self) -> Vec3 {
        self.position + self.opening_offset
    }
}

fn sanitize_cadence(cadence: Option<f32>) -> Option<f32> {
    cadence.filter(|c| c.is_finite() && *c > 0.0)
}

fn jitter(rng: &mut impl Rng, amount: f32) -> f32 {
    if amount > 0.0 && amount.is_finite() {
        rng.gen_range(-amount..=amount)
    } else {
        0.0
    }
}

impl PlaygroundSession {
    pub fn add_dispenser(&mut self, position: Vec3, cadence: Option<f32>) -> DispenserId {
        let id = self.ids.dispenser();
        let mesh = self.scene.spawn(&VisualDesc {
            kind: VisualKind::Dispenser,
            center: position,
            rotation: Quat::IDENTITY,
            half_extents: Vec3::new(0.3, 0.3, 0.3),
            color: Color::srgb(0.8, 0.8, 0.85),
        });
        self.dispensers.insert(
            id,
            Dispenser {
                id,
                position,
                opening_offset: Vec3::new(0.0, self.config.spawner.opening_offset_y, 0.0),
                cadence: sanitize_cadence(cadence),
                elapsed: 0.0,
                mesh: Some(mesh),
            },
        );
        debug!(dispenser = %id, %position, "dispenser added");
        id
    }

    pub fn set_dispenser_cadence(&mut self, id: DispenserId, cadence: Option<f32>) -> bool {
        let Some(dispenser) = self.dispensers.get_mut(&id) else {
            return false;
        };
        dispenser.cadence = sanitize_cadence(cadence);
        dispenser.elapsed = 0.0;
        true
    }

    fn at_capacity(&self) -> bool {
        let full = self.balls.len() >= self.config.spawner.max_live_balls;
        if full {
            debug!(max = self.config.spawner.max_live_balls, "ball cap reached; drop refused");
        }
        full
    }

    /// Release one ball from a dispenser's opening with randomized position, velocity and spin.
    pub fn drop_ball(&mut self, dispenser: DispenserId) -> Option<BallId> {
        let origin = self.dispensers.get(&dispenser)?.spawn_point();
        if self.at_capacity() {
            return None;
        }
        let s = &self.config.spawner;
        let (pj, vj, sj, down) = (
            s.position_jitter,
            s.velocity_jitter,
            s.spin_jitter,
            s.downward_speed,
        );
        let rng = &mut self.rng;
        let position = origin + Vec3::new(jitter(rng, pj), 0.0, jitter(rng, pj));
        let velocity = Vec3::new(jitter(rng, vj), -down, jitter(rng, vj));
        let spin = Vec3::new(jitter(rng, sj), jitter(rng, sj), jitter(rng, sj));
        Some(self.spawn_ball(position, velocity, spin, Some(dispenser)))
    }

    /// Place a ball directly. Rejects non-finite input.
    pub fn place_ball(&mut self, position: Vec3, velocity: Vec3) -> Option<BallId> {
        if !position.is_finite() || !velocity.is_finite() {
            return None;
        }
        if self.at_capacity() {
            return None;
        }
        Some(self.spawn_ball(position, velocity, Vec3::ZERO, None))
    }

    fn spawn_ball(
        &mut self,
        position: Vec3,
        velocity: Vec3,
        angular_velocity: Vec3,
        source: Option<DispenserId>,
    ) -> BallId {
        let id = self.ids.ball();
        let s = &self.config.spawner;
        let (radius, mass) = (s.ball_radius, s.ball_mass);
        let body = self.physics.add_ball_body(
            &BallSpec {
                position,
                velocity,
                angular_velocity,
                radius,
                mass,
            },
            BodyMetadata::Ball { ball: id },
        );
        let mesh = self.scene.spawn(&VisualDesc {
            kind: VisualKind::Ball,
            center: position,
            rotation: Quat::IDENTITY,
            half_extents: Vec3::splat(radius),
            color: Color::WHITE,
        });
        self.balls.insert(
            id,
            Ball {
                id,
                radius,
                mass,
                initial_position: position,
                initial_velocity: velocity,
                initial_angular_velocity: angular_velocity,
                source,
                body: Some(body),
                mesh: Some(mesh),
            },
        );
        trace!(ball = %id, %position, "ball spawned");
        id
    }

    /// Advance dispenser timers and drop a ball for every elapsed cadence period.
    pub(crate) fn run_cadence(&mut self, dt: f32) -> Vec<BallId> {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }
        let mut due = Vec::new();
        for dispenser in self.dispensers.values_mut() {
            let Some(cadence) = dispenser.cadence else {
                continue;
            };
            dispenser.elapsed += dt;
            while dispenser.elapsed >= cadence {
                dispenser.elapsed -= cadence;
                due.push(dispenser.id);
            }
        }
        due.into_iter().filter_map(|d| self.drop_ball(d)).collect()
    }
}
