// Playground configuration (pure data crate; no Bevy dependency).
// Provides: data structures, layered loading, validation producing warnings (non-fatal), and tests.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Impact speed at or below which a collision is silent. Part of the sound contract; other
/// values are accepted but flagged by [`PlaygroundConfig::validate`].
pub const STANDARD_IMPACT_THRESHOLD: f32 = 0.5;

/// How two balls interact when their shapes overlap.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum BallBallPolicy {
    /// Contacts are detected but never resolved; balls fall through each other.
    #[default]
    PassThrough,
    /// Balls bounce off each other like any other rigid pair.
    Bounce,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity_y: f32,
    /// Rate of the fixed simulation loop driving `tick`.
    pub fixed_hz: f32,
    /// Upper bound for a single step; larger deltas are clamped.
    pub max_dt: f32,
    pub max_linear_speed: f32,
    pub max_angular_speed: f32,
    pub ccd: bool,
    pub ball_ball: BallBallPolicy,
    pub ball_friction: f32,
    pub ball_restitution: f32,
    /// Balls whose center falls below this height are evicted.
    pub kill_plane_y: f32,
    /// Collision events delivered per step; overflow waits for later steps.
    pub max_events_per_step: usize,
}
impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_y: -9.82,
            fixed_hz: 60.0,
            max_dt: 1.0 / 30.0,
            max_linear_speed: 40.0,
            max_angular_speed: 60.0,
            ccd: true,
            ball_ball: BallBallPolicy::PassThrough,
            ball_friction: 0.05,
            ball_restitution: 0.85,
            kill_plane_y: -30.0,
            max_events_per_step: 256,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WallConfig {
    pub thickness: f32,
    pub depth: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Speak an accessibility announcement when a wall is created.
    pub announce: bool,
}
impl Default for WallConfig {
    fn default() -> Self {
        Self {
            thickness: 0.1,
            depth: 1.0,
            friction: 0.05,
            restitution: 0.9,
            announce: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NoteConfig {
    /// Tempo used to turn note-length classes into seconds.
    pub tempo_bpm: f32,
}
impl Default for NoteConfig {
    fn default() -> Self {
        Self { tempo_bpm: 120.0 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpawnerConfig {
    pub ball_radius: f32,
    pub ball_mass: f32,
    /// Vertical offset from the dispenser center to its bottom opening.
    pub opening_offset_y: f32,
    /// Uniform jitter (+/-) applied independently on X and Z at spawn.
    pub position_jitter: f32,
    /// Uniform jitter (+/-) applied independently to the X and Z velocity.
    pub velocity_jitter: f32,
    /// Initial downward speed (positive number, applied along -Y).
    pub downward_speed: f32,
    /// Uniform jitter (+/-) applied independently to each angular velocity axis.
    pub spin_jitter: f32,
    pub max_live_balls: usize,
}
impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            ball_radius: 0.15,
            ball_mass: 1.0,
            opening_offset_y: -0.35,
            position_jitter: 0.05,
            velocity_jitter: 0.1,
            downward_speed: 0.5,
            spin_jitter: 1.0,
            max_live_balls: 400,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Impacts at or below this speed are silent.
    pub impact_threshold: f32,
    /// Post-amplification intensity above which a notification is flagged significant.
    pub significance: f32,
    pub chirp_duration: f32,
    pub chirp_gain: f32,
}
impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            impact_threshold: STANDARD_IMPACT_THRESHOLD,
            significance: 0.3,
            chirp_duration: 0.12,
            chirp_gain: 0.2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    pub haptic_pulse_ms: u32,
    pub haptic_magnitude: f32,
}
impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            haptic_pulse_ms: 15,
            haptic_magnitude: 0.6,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Fixed RNG seed for spawner jitter; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub physics: PhysicsConfig,
    pub walls: WallConfig,
    pub notes: NoteConfig,
    pub spawner: SpawnerConfig,
    pub audio: AudioConfig,
    pub feedback: FeedbackConfig,
}

impl PlaygroundConfig {
    /// Load from a single RON file (errors contain human-readable context).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let data = fs::read_to_string(&path).map_err(|e| format!("read config: {e}"))?;
        ron::from_str(&data).map_err(|e| format!("parse RON: {e}"))
    }

    /// Load file; on failure returns default config plus error string.
    pub fn load_or_default(path: impl AsRef<Path>) -> (Self, Option<String>) {
        match Self::load_from_file(&path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load multiple layers; later overrides earlier (deep merge).
    /// Skips missing files; returns (config, used_paths, errors).
    pub fn load_layered<P, I>(paths: I) -> (Self, Vec<String>, Vec<String>)
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        use ron::value::Value;
        let mut merged: Option<Value> = None;
        let mut used = Vec::new();
        let mut errors = Vec::new();
        fn merge_value(base: &mut Value, overlay: Value) {
            match (base, overlay) {
                (Value::Map(bm), Value::Map(om)) => {
                    for (k, v) in om.into_iter() {
                        if let Some((_, ev)) = bm.iter_mut().find(|(ek, _)| **ek == k) {
                            merge_value(ev, v);
                            continue;
                        }
                        bm.insert(k, v);
                    }
                }
                (b, o) => *b = o,
            }
        }
        for p in paths {
            let path_ref = p.as_ref();
            match fs::read_to_string(path_ref) {
                Ok(txt) => match ron::from_str::<Value>(&txt) {
                    Ok(val) => {
                        match &mut merged {
                            Some(cur) => merge_value(cur, val),
                            None => merged = Some(val),
                        }
                        used.push(path_ref.as_os_str().to_string_lossy().to_string());
                    }
                    Err(e) => errors.push(format!("{}: parse error: {e}", path_ref.display())),
                },
                Err(e) => errors.push(format!("{}: read error: {e}", path_ref.display())),
            }
        }
        let Some(val) = merged else {
            return (PlaygroundConfig::default(), used, errors);
        };
        match val.into_rust::<PlaygroundConfig>() {
            Ok(cfg) => (cfg, used, errors),
            Err(e) => {
                errors.push(format!(
                    "failed to deserialize merged config; using defaults: {e}"
                ));
                (PlaygroundConfig::default(), used, errors)
            }
        }
    }

    /// Non-fatal sanity checks; each entry is a human readable warning.
    pub fn validate(&self) -> Vec<String> {
        let mut w = Vec::new();
        let p = &self.physics;
        if p.gravity_y.abs() < 1e-4 {
            w.push("physics.gravity_y magnitude near zero; balls will float".into());
        }
        if p.gravity_y > 0.0 {
            w.push(format!(
                "physics.gravity_y is positive ({}); typical configs pull downward",
                p.gravity_y
            ));
        }
        if p.fixed_hz <= 0.0 {
            w.push("physics.fixed_hz must be > 0".into());
        } else if p.fixed_hz < 20.0 {
            w.push(format!(
                "physics.fixed_hz {} low; fast balls may tunnel through thin walls",
                p.fixed_hz
            ));
        }
        if p.max_dt <= 0.0 {
            w.push("physics.max_dt must be > 0".into());
        }
        if p.max_linear_speed <= 0.0 {
            w.push("physics.max_linear_speed must be > 0".into());
        }
        if p.max_angular_speed <= 0.0 {
            w.push("physics.max_angular_speed must be > 0".into());
        }
        if !(0.0..=1.0).contains(&p.ball_restitution) {
            w.push(format!(
                "physics.ball_restitution {} outside 0..1 (energy gain)",
                p.ball_restitution
            ));
        }
        if p.ball_friction < 0.0 {
            w.push("physics.ball_friction negative".into());
        }
        if p.max_events_per_step == 0 {
            w.push("physics.max_events_per_step is 0; treated as 1, collisions will sound late".into());
        }
        if self.walls.thickness <= 0.0 || self.walls.depth <= 0.0 {
            w.push("walls.thickness and walls.depth must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.walls.restitution) {
            w.push(format!(
                "walls.restitution {} outside 0..1 (energy gain)",
                self.walls.restitution
            ));
        }
        if self.notes.tempo_bpm <= 0.0 {
            w.push("notes.tempo_bpm must be > 0".into());
        }
        let s = &self.spawner;
        if s.ball_radius <= 0.0 {
            w.push("spawner.ball_radius must be > 0".into());
        }
        if s.ball_mass <= 0.0 {
            w.push("spawner.ball_mass must be > 0".into());
        }
        if s.position_jitter < 0.0 || s.velocity_jitter < 0.0 || s.spin_jitter < 0.0 {
            w.push("spawner jitter values must be >= 0".into());
        }
        if s.position_jitter == 0.0 {
            w.push("spawner.position_jitter is 0; repeated drops will stack exactly".into());
        }
        if s.max_live_balls == 0 {
            w.push("spawner.max_live_balls is 0; nothing can spawn".into());
        }
        let a = &self.audio;
        if a.impact_threshold < 0.0 {
            w.push("audio.impact_threshold negative; resting contacts will make sound".into());
        } else if a.impact_threshold != STANDARD_IMPACT_THRESHOLD {
            w.push(format!(
                "audio.impact_threshold {} differs from the standard {STANDARD_IMPACT_THRESHOLD}; \
                 collisions will not sound like the reference playground",
                a.impact_threshold
            ));
        }
        if !(0.0..=1.0).contains(&a.significance) {
            w.push(format!("audio.significance {} outside 0..1", a.significance));
        }
        if a.chirp_duration < 0.0 || !(0.0..=1.0).contains(&a.chirp_gain) {
            w.push("audio chirp duration must be >= 0 and gain within 0..1".into());
        }
        if !(0.0..=1.0).contains(&self.feedback.haptic_magnitude) {
            w.push(format!(
                "feedback.haptic_magnitude {} outside 0..1",
                self.feedback.haptic_magnitude
            ));
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate_clean() {
        let cfg = PlaygroundConfig::default();
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
        assert_eq!(cfg.physics.ball_ball, BallBallPolicy::PassThrough);
        assert_eq!(cfg.audio.impact_threshold, 0.5);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn parse_sample_config() {
        let sample = r#"(
            seed: Some(7),
            physics: (
                gravity_y: -9.0,
                ball_ball: Bounce,
                kill_plane_y: -12.0,
            ),
            walls: (thickness: 0.2, depth: 2.0),
            notes: (tempo_bpm: 90.0),
            spawner: (position_jitter: 0.02, max_live_balls: 50),
            audio: (impact_threshold: 0.5, significance: 0.3),
        )"#;
        let cfg = PlaygroundConfig::load_from_file(write_temp(sample).path()).expect("parse config");
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.physics.gravity_y, -9.0);
        assert_eq!(cfg.physics.ball_ball, BallBallPolicy::Bounce);
        assert_eq!(cfg.walls.depth, 2.0);
        assert_eq!(cfg.notes.tempo_bpm, 90.0);
        assert_eq!(cfg.spawner.max_live_balls, 50);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.physics.fixed_hz, PhysicsConfig::default().fixed_hz);
        assert!(cfg.validate().is_empty(), "expected no warnings");
    }

    #[test]
    fn validate_detects_warnings() {
        let mut bad = PlaygroundConfig::default();
        bad.physics.gravity_y = 0.0;
        bad.physics.ball_restitution = 1.4;
        bad.physics.max_events_per_step = 0;
        bad.walls.thickness = 0.0;
        bad.notes.tempo_bpm = -1.0;
        bad.spawner.position_jitter = 0.0;
        bad.spawner.max_live_balls = 0;
        bad.audio.significance = 2.0;
        let warnings = bad.validate();
        let joined = warnings.join(" | ");
        assert!(joined.contains("gravity_y magnitude near zero"));
        assert!(joined.contains("ball_restitution 1.4"));
        assert!(joined.contains("max_events_per_step is 0"));
        assert!(joined.contains("walls.thickness"));
        assert!(joined.contains("tempo_bpm"));
        assert!(joined.contains("stack exactly"));
        assert!(joined.contains("max_live_balls is 0"));
        assert!(joined.contains("audio.significance"));
        assert!(warnings.len() >= 8, "got {}: {joined}", warnings.len());
    }

    #[test]
    fn nonstandard_impact_threshold_warns() {
        let mut cfg = PlaygroundConfig::default();
        cfg.audio.impact_threshold = 0.8;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("audio.impact_threshold 0.8"));

        cfg.audio.impact_threshold = -1.0;
        assert!(cfg.validate()[0].contains("negative"));
    }

    #[test]
    fn load_or_default_missing_file() {
        let (cfg, err) = PlaygroundConfig::load_or_default("this/file/does/not/exist.ron");
        assert!(err.is_some());
        assert_eq!(cfg, PlaygroundConfig::default());
    }

    #[test]
    fn layered_merge_overrides() {
        let base = r"(
            physics: (gravity_y: -5.0, max_linear_speed: 30.0),
            spawner: (ball_radius: 0.2),
        )";
        let override_one = r"(
            physics: (max_linear_speed: 25.0, kill_plane_y: -8.0),
            audio: (significance: 0.4),
        )";
        let (cfg, used, errors) = PlaygroundConfig::load_layered([
            write_temp(base).path().to_path_buf(),
            write_temp(override_one).path().to_path_buf(),
        ]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(used.len(), 2);
        assert_eq!(cfg.physics.gravity_y, -5.0);
        assert_eq!(cfg.physics.max_linear_speed, 25.0);
        assert_eq!(cfg.physics.kill_plane_y, -8.0);
        assert_eq!(cfg.spawner.ball_radius, 0.2);
        assert_eq!(cfg.audio.significance, 0.4);
        assert_eq!(cfg.walls, WallConfig::default());
    }

    #[test]
    fn layered_skips_missing_and_reports() {
        let base = r"(notes: (tempo_bpm: 100.0))";
        let base_file = write_temp(base);
        let (cfg, used, errors) = PlaygroundConfig::load_layered([
            base_file.path().to_path_buf(),
            std::path::PathBuf::from("missing/playground.local.ron"),
        ]);
        assert_eq!(used.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("read error"));
        assert_eq!(cfg.notes.tempo_bpm, 100.0);
    }

    // Helper: create a temp file with given contents; returns handle (kept for lifetime)
    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("tmp");
        f.write_all(contents.as_bytes()).unwrap();
        f
    }
}
