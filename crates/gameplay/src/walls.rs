use bevy::log::{debug, info};
use bevy::prelude::{Mat3, Quat, Vec3};

use chime_core::{
    map_length_to_note, note_color, BodyMetadata, ChirpCue, Material, MeshHandle, Note,
    VisualDesc, VisualKind, Voice, WallId, WallTone, MIN_WALL_LENGTH,
};
use chime_physics::{BodyHandle, StaticBoxSpec};

use crate::lifecycle::Release;
use crate::PlaygroundSession;

/// Derived shape of a candidate wall. Shared by the preview and the final wall so both get the
/// same note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGeometry {
    pub length: f32,
    /// Heading in the XY drawing plane, `atan2(dy, dx)`.
    pub angle: f32,
    pub center: Vec3,
    /// Orientation of the wall box: local X along `end - start`, local Z (depth) as close to
    /// world Z as the direction allows.
    pub rotation: Quat,
    pub note: Note,
}

impl WallGeometry {
    /// `None` for non-finite endpoints or walls shorter than [`MIN_WALL_LENGTH`].
    pub fn between(start: Vec3, end: Vec3) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        let length = start.distance(end);
        if !length.is_finite() || length < MIN_WALL_LENGTH {
            return None;
        }
        let delta = end - start;
        Some(Self {
            length,
            angle: delta.y.atan2(delta.x),
            center: (start + end) * 0.5,
            rotation: axis_rotation(delta / length),
            note: map_length_to_note(length),
        })
    }
}

/// Rotation taking local X onto `dir` (unit length). For walls in the XY plane this is the
/// plain rotation about Z; walls running along Z keep their thickness vertical.
fn axis_rotation(dir: Vec3) -> Quat {
    let depth = Vec3::Z - dir * dir.z;
    let depth = if depth.length_squared() > 1e-8 {
        depth.normalize()
    } else {
        Vec3::X
    };
    let thickness = depth.cross(dir);
    Quat::from_mat3(&Mat3::from_cols(dir, thickness, depth)).normalize()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WallOptions {
    pub material: Material,
    pub voice: Option<Voice>,
    /// Display name; defaults to the wall id.
    pub name: Option<String>,
    pub important: bool,
}

#[derive(Debug)]
pub struct Wall {
    pub id: WallId,
    pub start: Vec3,
    pub end: Vec3,
    pub geometry: WallGeometry,
    pub material: Material,
    pub name: String,
    pub important: bool,
    pub(crate) body: Option<BodyHandle>,
    pub(crate) mesh: Option<MeshHandle>,
}

impl Wall {
    pub fn length(&self) -> f32 {
        self.geometry.length
    }

    pub fn angle(&self) -> f32 {
        self.geometry.angle
    }

    pub fn center(&self) -> Vec3 {
        self.geometry.center
    }

    pub fn note(&self) -> Note {
        self.geometry.note
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }
}

/// The single in-progress wall shown while the user drags. Never registered with physics.
#[derive(Debug)]
pub struct WallPreview {
    pub start: Vec3,
    pub end: Vec3,
    pub geometry: WallGeometry,
    pub(crate) mesh: Option<MeshHandle>,
}

impl PlaygroundSession {
    fn wall_visual(&self, kind: VisualKind, geometry: &WallGeometry) -> VisualDesc {
        VisualDesc {
            kind,
            center: geometry.center,
            rotation: geometry.rotation,
            half_extents: self.wall_half_extents(geometry.length),
            color: note_color(geometry.note),
        }
    }

    fn wall_half_extents(&self, length: f32) -> Vec3 {
        let walls = &self.config.walls;
        Vec3::new(length * 0.5, walls.thickness * 0.5, walls.depth * 0.5)
    }

    pub fn create_wall(&mut self, start: Vec3, end: Vec3) -> Option<WallId> {
        self.create_wall_with(start, end, WallOptions::default())
    }

    pub fn create_wall_with(
        &mut self,
        start: Vec3,
        end: Vec3,
        options: WallOptions,
    ) -> Option<WallId> {
        let Some(geometry) = WallGeometry::between(start, end) else {
            debug!("wall rejected: {start} -> {end} is shorter than {MIN_WALL_LENGTH}");
            return None;
        };
        let id = self.ids.wall();
        let name = options.name.unwrap_or_else(|| id.to_string());
        let walls = &self.config.walls;
        let spec = StaticBoxSpec {
            center: geometry.center,
            half_extents: self.wall_half_extents(geometry.length),
            rotation: geometry.rotation,
            friction: walls.friction,
            restitution: walls.restitution,
        };
        let metadata = BodyMetadata::Wall {
            wall: id,
            name: name.clone(),
            tone: Some(WallTone {
                note: geometry.note,
                length: geometry.length,
            }),
            material: Some(options.material),
            important: options.important,
        };
        let body = self.physics.add_wall_body(&spec, metadata);
        let desc = self.wall_visual(VisualKind::Wall, &geometry);
        let mesh = self.scene.spawn(&desc);
        if let Some(voice) = options.voice {
            self.voices.assign(id, voice);
        }

        let fb = &self.config.feedback;
        self.feedback.pulse(fb.haptic_pulse_ms, fb.haptic_magnitude);
        if self.config.walls.announce {
            self.feedback.announce(&format!(
                "Wall created, length {:.1}, note {}",
                geometry.length, geometry.note
            ));
        }
        if let Some(audio) = self.feedback.audio.as_mut() {
            let cue = ChirpCue {
                note: geometry.note,
                frequency: geometry.note.frequency(),
                duration: self.config.audio.chirp_duration,
                volume: self.config.audio.chirp_gain,
            };
            if let Err(err) = audio.play_chirp(&cue) {
                debug!("creation chirp dropped: {err}");
            }
        }

        info!(
            wall = %id,
            length = geometry.length,
            note = %geometry.note,
            "wall created"
        );
        self.walls.insert(
            id,
            Wall {
                id,
                start,
                end,
                geometry,
                material: options.material,
                name,
                important: options.important,
                body: Some(body),
                mesh: Some(mesh),
            },
        );
        Some(id)
    }

    /// Replace the preview with one spanning `start -> end`. Returns false (and keeps the
    /// current preview) when the candidate is too short.
    pub fn update_temp_wall(&mut self, start: Vec3, end: Vec3) -> bool {
        let Some(geometry) = WallGeometry::between(start, end) else {
            return false;
        };
        self.cancel_preview();
        let desc = self.wall_visual(VisualKind::Preview, &geometry);
        let mesh = self.scene.spawn(&desc);
        self.preview = Some(WallPreview {
            start,
            end,
            geometry,
            mesh: Some(mesh),
        });
        true
    }

    /// Drop the preview, if any.
    pub fn cancel_preview(&mut self) -> bool {
        match self.preview.take() {
            Some(mut preview) => preview.release(&mut self.physics, self.scene.as_mut()),
            None => false,
        }
    }

    /// End a drag: the preview goes away and the wall is created (if long enough).
    pub fn finish_wall(&mut self, start: Vec3, end: Vec3) -> Option<WallId> {
        self.cancel_preview();
        self.create_wall(start, end)
    }

    /// Release a wall's body and visual. Idempotent: a second call returns false.
    pub fn cleanup_wall(&mut self, id: WallId) -> bool {
        let Some(mut wall) = self.walls.remove(&id) else {
            return false;
        };
        wall.release(&mut self.physics, self.scene.as_mut());
        self.voices.remove(id);
        debug!(wall = %id, "wall removed");
        true
    }

    /// Route a wall's notes to `voice`. False for unknown walls.
    pub fn assign_voice(&mut self, id: WallId, voice: Voice) -> bool {
        if !self.walls.contains_key(&id) {
            return false;
        }
        self.voices.assign(id, voice);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rig;
    use chime_config::PlaygroundConfig;
    use chime_core::feedback::recording::RecordingScene;
    use chime_core::Feedback;

    #[test]
    fn short_walls_are_rejected() {
        let mut r = rig();
        assert!(r.session.create_wall(Vec3::ZERO, Vec3::new(0.49, 0.0, 0.0)).is_none());
        assert!(r
            .session
            .create_wall(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0))
            .is_none());
        assert_eq!(r.session.wall_count(), 0);
        assert_eq!(r.session.physics().body_count(), 0);
        assert!(r.haptics.pulses().is_empty());
        assert!(r.announcer.lines().is_empty());
    }

    #[test]
    fn wall_geometry_and_note() {
        let mut r = rig();
        let id = r
            .session
            .create_wall(Vec3::new(1.0, 1.0, 0.0), Vec3::new(4.0, 5.0, 0.0))
            .expect("wall");
        let wall = r.session.wall(id).expect("wall");
        assert!((wall.length() - 5.0).abs() < 1e-6);
        assert!((wall.angle() - 4.0f32.atan2(3.0)).abs() < 1e-6);
        assert_eq!(wall.center(), Vec3::new(2.5, 3.0, 0.0));
        assert_eq!(wall.note(), map_length_to_note(5.0));

        let body = wall.body().expect("body");
        match r.session.physics().metadata(body) {
            Some(BodyMetadata::Wall { tone: Some(tone), .. }) => {
                assert_eq!(tone.note, wall.note());
                assert!((tone.length - 5.0).abs() < 1e-6);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
        assert_eq!(r.scene.live_of(VisualKind::Wall), 1);
    }

    #[test]
    fn rotation_follows_the_wall_axis() {
        let planar = WallGeometry::between(Vec3::new(1.0, 1.0, 0.0), Vec3::new(4.0, 5.0, 0.0))
            .expect("planar wall");
        let expected = Quat::from_rotation_z(planar.angle);
        assert!(planar.rotation.angle_between(expected) < 1e-5);

        for end in [
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::new(3.0, 1.0, 2.0),
            Vec3::new(0.0, 4.0, 0.0),
        ] {
            let g = WallGeometry::between(Vec3::ZERO, end).expect("wall");
            let axis = g.rotation * Vec3::X;
            assert!((axis - end.normalize()).length() < 1e-5, "{end}: {axis}");
        }
        // Along Z the plank stays flat: thickness vertical.
        let along_z = WallGeometry::between(Vec3::ZERO, Vec3::Z * 5.0).expect("wall");
        assert!((along_z.rotation * Vec3::Y).y.abs() > 0.999);
    }

    #[test]
    fn wall_along_z_is_struck_along_its_length() {
        let run = |ball: Vec3| {
            let mut cfg = PlaygroundConfig::default();
            cfg.physics.gravity_y = 0.0;
            let mut r = crate::testing::rig_with(cfg);
            let id = r
                .session
                .create_wall(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0))
                .expect("wall");
            let wall = r.session.wall(id).expect("wall");
            assert!((wall.length() - 5.0).abs() < 1e-6);
            assert_eq!(wall.center(), Vec3::new(0.0, 0.0, 2.5));
            r.session.place_ball(ball, Vec3::new(0.0, -5.0, 0.0)).expect("ball");
            for _ in 0..30 {
                r.session.tick(1.0 / 60.0);
            }
            r.audio.notes().len()
        };
        assert_eq!(run(Vec3::new(0.0, 0.5, 4.5)), 1, "over the far end of the wall");
        assert_eq!(run(Vec3::new(2.0, 0.5, 2.5)), 0, "beside the wall");
    }

    #[test]
    fn creation_side_effects() {
        let mut r = rig();
        r.session
            .create_wall(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0))
            .expect("wall");
        let cfg = PlaygroundConfig::default().feedback;
        assert_eq!(r.haptics.pulses(), vec![(cfg.haptic_pulse_ms, cfg.haptic_magnitude)]);
        let lines = r.announcer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("5.0"), "{lines:?}");
        let chirps = r.audio.chirps();
        assert_eq!(chirps.len(), 1);
        assert_eq!(chirps[0].note, map_length_to_note(5.0));
    }

    #[test]
    fn no_chirp_without_audio() {
        let scene = RecordingScene::new();
        let mut session = PlaygroundSession::new(PlaygroundConfig::default())
            .with_scene(scene.clone())
            .with_feedback(Feedback::default());
        assert!(session.create_wall(Vec3::ZERO, Vec3::X * 2.0).is_some());
        assert_eq!(scene.live_of(VisualKind::Wall), 1);
    }

    #[test]
    fn preview_keeps_one_visual() {
        let mut r = rig();
        assert!(r.session.update_temp_wall(Vec3::ZERO, Vec3::X));
        assert!(r.session.update_temp_wall(Vec3::ZERO, Vec3::X * 3.0));
        assert!(!r.session.update_temp_wall(Vec3::ZERO, Vec3::X * 0.1));
        assert_eq!(r.scene.live_of(VisualKind::Preview), 1);
        assert_eq!(r.scene.spawned_of(VisualKind::Preview), 2);
        assert_eq!(r.session.physics().body_count(), 0);

        let preview = r.session.preview().expect("preview");
        assert_eq!(preview.geometry.note, map_length_to_note(3.0));
        assert_eq!(preview.end, Vec3::X * 3.0);

        assert!(r.session.cancel_preview());
        assert!(!r.session.cancel_preview());
        assert_eq!(r.scene.live_of(VisualKind::Preview), 0);
    }

    #[test]
    fn finish_replaces_preview_with_wall() {
        let mut r = rig();
        r.session.update_temp_wall(Vec3::ZERO, Vec3::X * 2.0);
        let id = r.session.finish_wall(Vec3::ZERO, Vec3::X * 2.0).expect("wall");
        assert!(r.session.preview().is_none());
        assert_eq!(r.scene.live_of(VisualKind::Preview), 0);
        assert_eq!(r.session.wall(id).map(Wall::note), Some(map_length_to_note(2.0)));
    }

    #[test]
    fn cleanup_twice_is_harmless() {
        let mut r = rig();
        let id = r
            .session
            .create_wall_with(
                Vec3::ZERO,
                Vec3::X * 4.0,
                WallOptions {
                    voice: Some(Voice::B),
                    ..WallOptions::default()
                },
            )
            .expect("wall");
        let body = r.session.wall(id).and_then(Wall::body).expect("body");
        assert_eq!(r.session.voices().voice_for(id), Voice::B);

        assert!(r.session.cleanup_wall(id));
        assert!(!r.session.physics().contains(body));
        assert!(!r.session.voices().contains(id));
        assert!(!r.session.cleanup_wall(id));
        assert_eq!(r.scene.live_count(), 0);
        assert_eq!(r.scene.double_disposed(), 0);
    }

    #[test]
    fn voice_assignment_needs_a_wall() {
        let mut r = rig();
        assert!(!r.session.assign_voice(WallId(99), Voice::B));
        let id = r.session.create_wall(Vec3::ZERO, Vec3::Y).expect("wall");
        assert!(r.session.assign_voice(id, Voice::B));
        assert_eq!(r.session.voices().voice_for(id), Voice::B);
    }

    #[test]
    fn options_reach_metadata() {
        let mut r = rig();
        let id = r
            .session
            .create_wall_with(
                Vec3::ZERO,
                Vec3::X,
                WallOptions {
                    material: Material::Glass,
                    name: Some("chime bar".into()),
                    important: true,
                    ..WallOptions::default()
                },
            )
            .expect("wall");
        let body = r.session.wall(id).and_then(Wall::body).expect("body");
        let meta = r.session.physics().metadata(body).expect("metadata");
        assert_eq!(meta.name(), Some("chime bar"));
        assert_eq!(meta.material(), Some(Material::Glass));
        assert!(meta.is_important());
    }
}
