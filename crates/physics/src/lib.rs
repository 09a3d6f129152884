//! Physics adapter: owns the Rapier world, the collision-group policy and the collision queue.
//!
//! Bodies are addressed through [`BodyHandle`]; the metadata registered with each body is
//! snapshotted into every [`CollisionEvent`] it takes part in.

use bevy::prelude::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::{Real, RigidBodyHandle, Vector};

use chime_core::BodyMetadata;

mod contacts;
mod world;

pub use world::{BallSpec, PhysicsWorld, StaticBoxSpec, StepReport};

/// Registration of a body inside the physics world. Owned by exactly one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

/// Snapshot of a body's pose and motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl BodyState {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.rotation.is_finite()
            && self.velocity.is_finite()
            && self.angular_velocity.is_finite()
    }
}

/// A contact that began during the last step. Lives for one processing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub bodies: [BodyHandle; 2],
    /// Relative velocity projected on the contact normal, measured before the solver responds.
    pub impact_velocity: f32,
    pub metadata: [Option<BodyMetadata>; 2],
}

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub(crate) fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}
