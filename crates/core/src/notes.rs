//! Wall length -> note mapping.
//!
//! The scale is two octaves of C major (C3..=C5). Lengths are clamped into
//! `[MIN_WALL_LENGTH, MAX_NOTE_LENGTH]` and split into equal buckets, one per note; short walls
//! ring high, long walls ring low. The preview and the finalized wall both go through
//! [`map_length_to_note`], so the pitch heard while drawing is the pitch the wall keeps.

use bevy::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Walls shorter than this are never created.
pub const MIN_WALL_LENGTH: f32 = 0.5;
/// Lengths at or above this all map to the lowest note.
pub const MAX_NOTE_LENGTH: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl PitchClass {
    /// Semitones above C within the octave.
    pub const fn semitone(self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::D => 2,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::G => 7,
            PitchClass::A => 9,
            PitchClass::B => 11,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            PitchClass::C => 'C',
            PitchClass::D => 'D',
            PitchClass::E => 'E',
            PitchClass::F => 'F',
            PitchClass::G => 'G',
            PitchClass::A => 'A',
            PitchClass::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: PitchClass,
    pub octave: u8,
}

impl Note {
    pub const fn new(pitch: PitchClass, octave: u8) -> Self {
        Self { pitch, octave }
    }

    pub fn midi(self) -> u8 {
        12 * (self.octave + 1) + self.pitch.semitone()
    }

    /// Equal temperament, A4 = 440 Hz.
    pub fn frequency(self) -> f32 {
        440.0 * 2f32.powf((self.midi() as f32 - 69.0) / 12.0)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch.letter(), self.octave)
    }
}

/// Ascending scale; index 0 is the lowest pitch.
pub const NOTE_SCALE: [Note; 15] = {
    use PitchClass::*;
    [
        Note::new(C, 3),
        Note::new(D, 3),
        Note::new(E, 3),
        Note::new(F, 3),
        Note::new(G, 3),
        Note::new(A, 3),
        Note::new(B, 3),
        Note::new(C, 4),
        Note::new(D, 4),
        Note::new(E, 4),
        Note::new(F, 4),
        Note::new(G, 4),
        Note::new(A, 4),
        Note::new(B, 4),
        Note::new(C, 5),
    ]
};

/// Deterministic length -> note. Non-finite lengths land in the shortest bucket.
pub fn map_length_to_note(length: f32) -> Note {
    let buckets = NOTE_SCALE.len();
    let clamped = if length.is_finite() {
        length.clamp(MIN_WALL_LENGTH, MAX_NOTE_LENGTH)
    } else {
        MIN_WALL_LENGTH
    };
    let t = (clamped - MIN_WALL_LENGTH) / (MAX_NOTE_LENGTH - MIN_WALL_LENGTH);
    let bucket = ((t * buckets as f32) as usize).min(buckets - 1);
    NOTE_SCALE[buckets - 1 - bucket]
}

/// Display color for a note: hue from the pitch class, lightness from the octave.
pub fn note_color(note: Note) -> Color {
    let hue = note.pitch.semitone() as f32 * 30.0;
    let lightness = (0.35 + 0.15 * (note.octave as f32 - 3.0)).clamp(0.1, 0.9);
    Color::hsl(hue, 0.75, lightness)
}

/// Rhythmic class of the sound a wall makes when struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteLength {
    Sixteenth,
    Eighth,
    Quarter,
    Half,
}

impl NoteLength {
    pub fn from_wall_length(length: f32) -> Self {
        if length < 2.0 {
            NoteLength::Sixteenth
        } else if length < 4.0 {
            NoteLength::Eighth
        } else if length < 7.0 {
            NoteLength::Quarter
        } else {
            NoteLength::Half
        }
    }

    pub fn beats(self) -> f32 {
        match self {
            NoteLength::Sixteenth => 0.25,
            NoteLength::Eighth => 0.5,
            NoteLength::Quarter => 1.0,
            NoteLength::Half => 2.0,
        }
    }

    pub fn seconds(self, tempo_bpm: f32) -> f32 {
        self.beats() * 60.0 / tempo_bpm.max(1.0)
    }
}
