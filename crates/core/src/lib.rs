//! Core vocabulary shared by every playground crate.
//!
//! - `notes`: wall length -> musical note / display color / note-length class.
//! - `intensity`: impact velocity -> normalized loudness.
//! - `material`: wall material tags and their sound amplification.
//! - `metadata`: tagged metadata attached to every physics body.
//! - `feedback`: traits for the external collaborators (audio, haptics, announcer, scene).
//!
//! Nothing here touches the physics backend; the adapter lives in `chime_physics`.

pub mod feedback;
pub mod ids;
pub mod intensity;
pub mod material;
pub mod metadata;
pub mod notes;
pub mod voice;

pub use feedback::{
    Announcer, AudioError, AudioSink, ChirpCue, CollisionNotification, Feedback, HapticSink,
    HeadlessScene, MeshHandle, NoteCue, SceneSink, VisualDesc, VisualKind,
};
pub use ids::{BallId, DispenserId, IdAllocator, WallId};
pub use intensity::{
    amplify, impact_intensity, map_impact_to_intensity, IMPACT_THRESHOLD, INTENSITY_NORMALIZER,
    NOTE_GAIN,
};
pub use material::Material;
pub use metadata::{BodyMetadata, WallTone};
pub use notes::{
    map_length_to_note, note_color, Note, NoteLength, PitchClass, MAX_NOTE_LENGTH,
    MIN_WALL_LENGTH, NOTE_SCALE,
};
pub use voice::{Voice, VoiceTable};
