use crate::ids::{BallId, WallId};
use crate::material::Material;
use crate::notes::Note;

/// Pitch information fixed at wall creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallTone {
    pub note: Note,
    pub length: f32,
}

impl WallTone {
    /// A tone is usable only with a finite, positive length.
    pub fn is_well_formed(&self) -> bool {
        self.length.is_finite() && self.length > 0.0
    }
}

/// Metadata registered alongside every physics body and read back when it collides.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyMetadata {
    Ball {
        ball: BallId,
    },
    Wall {
        wall: WallId,
        name: String,
        tone: Option<WallTone>,
        material: Option<Material>,
        important: bool,
    },
    /// Static scenery without a note (floors, bumpers placed by code).
    Obstacle {
        name: String,
        material: Option<Material>,
        important: bool,
    },
}

impl BodyMetadata {
    pub fn is_ball(&self) -> bool {
        matches!(self, BodyMetadata::Ball { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            BodyMetadata::Ball { .. } => None,
            BodyMetadata::Wall { name, .. } | BodyMetadata::Obstacle { name, .. } => {
                Some(name.as_str())
            }
        }
    }

    pub fn material(&self) -> Option<Material> {
        match self {
            BodyMetadata::Ball { .. } => None,
            BodyMetadata::Wall { material, .. } | BodyMetadata::Obstacle { material, .. } => {
                *material
            }
        }
    }

    pub fn is_important(&self) -> bool {
        match self {
            BodyMetadata::Ball { .. } => false,
            BodyMetadata::Wall { important, .. } | BodyMetadata::Obstacle { important, .. } => {
                *important
            }
        }
    }
}
