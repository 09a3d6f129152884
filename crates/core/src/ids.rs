use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(WallId, "wall");
entity_id!(BallId, "ball");
entity_id!(DispenserId, "dispenser");

/// Monotonic id source; ids are never reused within a session.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    fn bump(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn wall(&mut self) -> WallId {
        WallId(self.bump())
    }

    pub fn ball(&mut self) -> BallId {
        BallId(self.bump())
    }

    pub fn dispenser(&mut self) -> DispenserId {
        DispenserId(self.bump())
    }
}
