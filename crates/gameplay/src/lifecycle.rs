//! Resource release for every entity kind, plus the bulk removal paths (clear, eviction).

use bevy::log::{debug, info};
use bevy::prelude::{Color, Quat, Vec3};

use chime_core::{BallId, DispenserId, Material, MeshHandle, SceneSink, VisualDesc, VisualKind};
use chime_physics::{BodyHandle, PhysicsWorld, StaticBoxSpec};

use crate::spawner::{Ball, Dispenser};
use crate::walls::{Wall, WallPreview};
use crate::PlaygroundSession;

/// Give back the physics body and visual an entity owns.
///
/// Handles are taken out of the entity as they are released, so a second call finds nothing
/// and returns false.
pub trait Release {
    fn release(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) -> bool;
}

fn release_parts(
    body: &mut Option<BodyHandle>,
    mesh: &mut Option<MeshHandle>,
    physics: &mut PhysicsWorld,
    scene: &mut dyn SceneSink,
) -> bool {
    let mut released = false;
    if let Some(body) = body.take() {
        physics.remove_body(body);
        released = true;
    }
    if let Some(mesh) = mesh.take() {
        scene.dispose(mesh);
        released = true;
    }
    released
}

impl Release for Wall {
    fn release(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) -> bool {
        release_parts(&mut self.body, &mut self.mesh, physics, scene)
    }
}

impl Release for Ball {
    fn release(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) -> bool {
        release_parts(&mut self.body, &mut self.mesh, physics, scene)
    }
}

impl Release for Dispenser {
    fn release(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) -> bool {
        release_parts(&mut None, &mut self.mesh, physics, scene)
    }
}

impl Release for WallPreview {
    fn release(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) -> bool {
        release_parts(&mut None, &mut self.mesh, physics, scene)
    }
}

/// Static scenery without a note: floors, bumpers.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSpec {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub angle_z: f32,
    pub name: String,
    pub material: Option<Material>,
    pub important: bool,
}

#[derive(Debug)]
pub struct Obstacle {
    pub name: String,
    body: Option<BodyHandle>,
    mesh: Option<MeshHandle>,
}

impl Obstacle {
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}

impl Release for Obstacle {
    fn release(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) -> bool {
        release_parts(&mut self.body, &mut self.mesh, physics, scene)
    }
}

impl PlaygroundSession {
    pub fn add_obstacle(&mut self, spec: ObstacleSpec) -> BodyHandle {
        let walls = &self.config.walls;
        let rotation = Quat::from_rotation_z(spec.angle_z);
        let body = self.physics.add_obstacle_body(
            &StaticBoxSpec {
                center: spec.center,
                half_extents: spec.half_extents,
                rotation,
                friction: walls.friction,
                restitution: walls.restitution,
            },
            spec.name.clone(),
            spec.material,
            spec.important,
        );
        let desc = VisualDesc {
            kind: VisualKind::Wall,
            center: spec.center,
            rotation,
            half_extents: spec.half_extents,
            color: Color::srgb(0.4, 0.4, 0.45),
        };
        let mesh = self.scene.spawn(&desc);
        self.obstacles.push(Obstacle {
            name: spec.name,
            body: Some(body),
            mesh: Some(mesh),
        });
        body
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn remove_ball(&mut self, id: BallId) -> bool {
        let Some(mut ball) = self.balls.remove(&id) else {
            return false;
        };
        ball.release(&mut self.physics, self.scene.as_mut());
        true
    }

    /// Remove a dispenser. Balls it already dropped stay in the world.
    pub fn remove_dispenser(&mut self, id: DispenserId) -> bool {
        let Some(mut dispenser) = self.dispensers.remove(&id) else {
            return false;
        };
        dispenser.release(&mut self.physics, self.scene.as_mut());
        true
    }

    /// Release every wall, ball, dispenser, obstacle and the preview. Returns how many entities
    /// were released. Afterwards the physics world holds no registrations.
    pub fn clear_all(&mut self) -> usize {
        let scene = self.scene.as_mut();
        let physics = &mut self.physics;
        let mut released = 0;
        for (_, mut wall) in std::mem::take(&mut self.walls) {
            wall.release(physics, scene);
            released += 1;
        }
        for (_, mut ball) in std::mem::take(&mut self.balls) {
            ball.release(physics, scene);
            released += 1;
        }
        for (_, mut dispenser) in std::mem::take(&mut self.dispensers) {
            dispenser.release(physics, scene);
            released += 1;
        }
        for mut obstacle in std::mem::take(&mut self.obstacles) {
            obstacle.release(physics, scene);
            released += 1;
        }
        if let Some(mut preview) = self.preview.take() {
            preview.release(physics, scene);
            released += 1;
        }
        // Bodies registered directly through `physics_mut` have no owner here.
        physics.clear();
        self.voices.clear();
        info!(released, "playground cleared");
        released
    }

    /// Remove balls that fell below the kill plane.
    pub fn evict_out_of_bounds(&mut self) -> Vec<BallId> {
        let kill_y = self.config.physics.kill_plane_y;
        let doomed: Vec<BallId> = self
            .balls
            .values()
            .filter(|ball| {
                ball.body()
                    .and_then(|b| self.physics.body_state(b))
                    .is_some_and(|s| s.position.y < kill_y)
            })
            .map(|ball| ball.id)
            .collect();
        for id in &doomed {
            self.remove_ball(*id);
        }
        if !doomed.is_empty() {
            debug!(count = doomed.len(), "evicted balls below kill plane");
        }
        doomed
    }
}
