use std::collections::HashMap;

use bevy::log::{debug, warn};
use bevy::prelude::{Quat, Vec3};
use rapier3d::prelude::*;

use chime_config::{BallBallPolicy, PhysicsConfig};
use chime_core::{BodyMetadata, Material};

use crate::contacts::ContactCollector;
use crate::{to_rotation, to_vec3, to_vector, BodyHandle, BodyState, CollisionEvent};

const WALL_GROUP: Group = Group::GROUP_1;
const BALL_GROUP: Group = Group::GROUP_2;

/// Fixed cuboid. `half_extents` are in the box's local frame, before `rotation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticBoxSpec {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
    pub friction: f32,
    pub restitution: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallSpec {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub radius: f32,
    pub mass: f32,
}

/// Outcome of one [`PhysicsWorld::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Contacts that began during this step, deduplicated per pair.
    pub events: Vec<CollisionEvent>,
    /// Bodies force-reset to their last finite pose.
    pub reset: Vec<BodyHandle>,
    /// Contacts captured but held back for later steps because the queue was full.
    pub deferred_events: usize,
    /// True when the requested dt was rejected and the world did not advance.
    pub skipped: bool,
    /// The dt actually simulated (after clamping).
    pub dt: f32,
}

struct BodyRecord {
    collider: ColliderHandle,
    metadata: BodyMetadata,
    last_good: Isometry<Real>,
}

/// Owns the Rapier world and everything registered in it.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collector: ContactCollector,
    records: HashMap<RigidBodyHandle, BodyRecord>,
    config: PhysicsConfig,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            gravity: vector![0.0, config.gravity_y, 0.0],
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collector: ContactCollector::new(config.max_events_per_step.max(1)),
            records: HashMap::new(),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn ball_policy(&self) -> BallBallPolicy {
        self.config.ball_ball
    }

    /// Used for both collision and solver groups: pass-through balls never even form a
    /// contact pair, so they produce no events and no narrow-phase work.
    fn ball_groups(policy: BallBallPolicy) -> InteractionGroups {
        match policy {
            BallBallPolicy::PassThrough => {
                InteractionGroups::new(BALL_GROUP, Group::ALL.difference(BALL_GROUP))
            }
            BallBallPolicy::Bounce => InteractionGroups::new(BALL_GROUP, Group::ALL),
        }
    }

    /// Switch the ball-ball contact policy for every live and future ball.
    pub fn set_ball_policy(&mut self, policy: BallBallPolicy) {
        if self.config.ball_ball == policy {
            return;
        }
        self.config.ball_ball = policy;
        let groups = Self::ball_groups(policy);
        for record in self.records.values() {
            if !record.metadata.is_ball() {
                continue;
            }
            if let Some(collider) = self.colliders.get_mut(record.collider) {
                collider.set_collision_groups(groups);
                collider.set_solver_groups(groups);
            }
        }
        debug!("ball-ball policy now {policy:?}");
    }

    fn insert(&mut self, body: RigidBody, collider: Collider, metadata: BodyMetadata) -> BodyHandle {
        let last_good = *body.position();
        let handle = self.bodies.insert(body);
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.records.insert(
            handle,
            BodyRecord {
                collider,
                metadata,
                last_good,
            },
        );
        BodyHandle(handle)
    }

    fn add_static_box(&mut self, spec: &StaticBoxSpec, metadata: BodyMetadata) -> BodyHandle {
        let body = RigidBodyBuilder::fixed()
            .position(Isometry::from_parts(
                to_vector(spec.center).into(),
                to_rotation(spec.rotation),
            ))
            .build();
        let he = spec.half_extents;
        let collider = ColliderBuilder::cuboid(he.x, he.y, he.z)
            .friction(spec.friction)
            .restitution(spec.restitution)
            .collision_groups(InteractionGroups::new(WALL_GROUP, Group::ALL))
            .solver_groups(InteractionGroups::new(WALL_GROUP, Group::ALL))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.insert(body, collider, metadata)
    }

    /// Register a wall. `metadata` should be the wall's `BodyMetadata::Wall` record.
    pub fn add_wall_body(&mut self, spec: &StaticBoxSpec, metadata: BodyMetadata) -> BodyHandle {
        self.add_static_box(spec, metadata)
    }

    /// Register static scenery that has no note (floors, bumpers).
    pub fn add_obstacle_body(
        &mut self,
        spec: &StaticBoxSpec,
        name: impl Into<String>,
        material: Option<Material>,
        important: bool,
    ) -> BodyHandle {
        let metadata = BodyMetadata::Obstacle {
            name: name.into(),
            material,
            important,
        };
        self.add_static_box(spec, metadata)
    }

    pub fn add_ball_body(&mut self, spec: &BallSpec, metadata: BodyMetadata) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(spec.position))
            .linvel(to_vector(spec.velocity))
            .angvel(to_vector(spec.angular_velocity))
            .ccd_enabled(self.config.ccd)
            .build();
        let collider = ColliderBuilder::ball(spec.radius)
            .mass(spec.mass)
            .friction(self.config.ball_friction)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(self.config.ball_restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .collision_groups(Self::ball_groups(self.config.ball_ball))
            .solver_groups(Self::ball_groups(self.config.ball_ball))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.insert(body, collider, metadata)
    }

    /// Returns whether a registration was removed.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        if self.records.remove(&handle.0).is_none() {
            return false;
        }
        self.bodies
            .remove(
                handle.0,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Remove every registration, along with any contacts still waiting for delivery.
    pub fn clear(&mut self) {
        let handles: Vec<BodyHandle> = self.handles().collect();
        for handle in handles {
            self.remove_body(handle);
        }
        self.collector.clear();
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.records.contains_key(&handle.0)
    }

    pub fn body_count(&self) -> usize {
        self.records.len()
    }

    pub fn handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.records.keys().copied().map(BodyHandle)
    }

    pub fn metadata(&self, handle: BodyHandle) -> Option<&BodyMetadata> {
        self.records.get(&handle.0).map(|r| &r.metadata)
    }

    pub fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        let rb = self.bodies.get(handle.0)?;
        let pos = rb.position();
        let q = pos.rotation.coords;
        Some(BodyState {
            position: to_vec3(&pos.translation.vector),
            rotation: Quat::from_xyzw(q.x, q.y, q.z, q.w),
            velocity: to_vec3(rb.linvel()),
            angular_velocity: to_vec3(rb.angvel()),
        })
    }

    /// Overwrite a body's velocities. Values are not validated here; `step` sanitizes them.
    pub fn set_velocity(&mut self, handle: BodyHandle, linear: Vec3, angular: Vec3) -> bool {
        let Some(rb) = self.bodies.get_mut(handle.0) else {
            return false;
        };
        rb.set_linvel(to_vector(linear), true);
        rb.set_angvel(to_vector(angular), true);
        true
    }

    fn body_is_finite(rb: &RigidBody) -> bool {
        let pos = rb.position();
        pos.translation.vector.iter().all(|v| v.is_finite())
            && pos.rotation.coords.iter().all(|v| v.is_finite())
            && rb.linvel().iter().all(|v| v.is_finite())
            && rb.angvel().iter().all(|v| v.is_finite())
    }

    /// Reset non-finite dynamic bodies to their last good pose at rest and record finite poses.
    fn sanitize(&mut self, reset: &mut Vec<BodyHandle>) {
        for (handle, record) in self.records.iter_mut() {
            let Some(rb) = self.bodies.get_mut(*handle) else {
                continue;
            };
            if !rb.is_dynamic() {
                continue;
            }
            if Self::body_is_finite(rb) {
                record.last_good = *rb.position();
                continue;
            }
            rb.set_position(record.last_good, true);
            rb.set_linvel(Vector::zeros(), true);
            rb.set_angvel(Vector::zeros(), true);
            if !reset.contains(&BodyHandle(*handle)) {
                reset.push(BodyHandle(*handle));
            }
        }
    }

    fn clamp_velocities(&mut self) {
        let max_lin = self.config.max_linear_speed;
        let max_ang = self.config.max_angular_speed;
        for rb in self.bodies.iter_mut().map(|(_, rb)| rb) {
            if !rb.is_dynamic() {
                continue;
            }
            let lin = *rb.linvel();
            if lin.norm() > max_lin {
                rb.set_linvel(lin.normalize() * max_lin, true);
            }
            let ang = *rb.angvel();
            if ang.norm() > max_ang {
                rb.set_angvel(ang.normalize() * max_ang, true);
            }
        }
    }

    /// Advance the world by `dt` seconds (clamped to `max_dt`).
    pub fn step(&mut self, dt: f32) -> StepReport {
        if !dt.is_finite() || dt <= 0.0 {
            debug!("rejected physics step dt={dt}");
            return StepReport {
                skipped: true,
                ..StepReport::default()
            };
        }
        let dt = dt.min(self.config.max_dt);
        let mut reset = Vec::new();

        self.sanitize(&mut reset);
        self.clamp_velocities();

        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.collector,
        );

        self.sanitize(&mut reset);
        for handle in &reset {
            warn!("physics body {:?} went non-finite; reset to last finite pose", handle.0);
        }

        let (contacts, deferred_events) = self.collector.drain();
        if deferred_events > 0 {
            debug!("collision queue full: {deferred_events} contacts deferred to later steps");
        }
        // Deferred contacts may name bodies removed since they were captured.
        let events = contacts
            .into_iter()
            .filter(|c| self.records.contains_key(&c.body1) && self.records.contains_key(&c.body2))
            .map(|c| CollisionEvent {
                bodies: [BodyHandle(c.body1), BodyHandle(c.body2)],
                impact_velocity: c.impact_velocity,
                metadata: [
                    self.records.get(&c.body1).map(|r| r.metadata.clone()),
                    self.records.get(&c.body2).map(|r| r.metadata.clone()),
                ],
            })
            .collect();

        StepReport {
            events,
            reset,
            deferred_events,
            skipped: false,
            dt,
        }
    }
}
