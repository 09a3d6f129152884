use crate::ids::WallId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timbre / channel routing label for a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Voice {
    #[default]
    A,
    B,
}

/// Per-session wall -> voice assignments. Walls without an entry use [`Voice::A`].
#[derive(Debug, Default, Clone)]
pub struct VoiceTable {
    entries: HashMap<WallId, Voice>,
}

impl VoiceTable {
    pub fn assign(&mut self, wall: WallId, voice: Voice) {
        self.entries.insert(wall, voice);
    }

    pub fn voice_for(&self, wall: WallId) -> Voice {
        self.entries.get(&wall).copied().unwrap_or_default()
    }

    pub fn remove(&mut self, wall: WallId) -> Option<Voice> {
        self.entries.remove(&wall)
    }

    pub fn contains(&self, wall: WallId) -> bool {
        self.entries.contains_key(&wall)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
