use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, crate::error::ScarifError>;

/// Horizontal coordinate of a chunk or a region file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord2 {
    pub x: i32,
    pub z: i32,
}

impl Coord2 {
    pub const fn new(x: i32, z: i32) -> Self {
        Coord2 { x, z }
    }

    /// Region file holding this chunk.
    pub fn region(&self) -> Coord2 {
        Coord2::new(self.x >> 5, self.z >> 5)
    }

    /// Slot of this chunk in its region's 32x32 location table.
    pub fn region_slot(&self) -> usize {
        ((self.x & 31) + (self.z & 31) * 32) as usize
    }
}

impl fmt::Display for Coord2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Block position. Ordered by x, then y, then z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord3 {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Coord3 { x, y, z }
    }

    pub fn flatten(&self) -> Coord2 {
        Coord2::new(self.x, self.z)
    }

    pub fn region(&self) -> Coord2 {
        Coord2::new(self.x >> 9, self.z >> 9)
    }

    pub fn chunk(&self) -> Coord2 {
        Coord2::new(self.x >> 4, self.z >> 4)
    }

    pub fn section_y(&self) -> i32 {
        self.y >> 4
    }

    /// Position inside the owning 16x16x16 section.
    pub fn local(&self) -> Coord3 {
        Coord3::new(self.x & 15, self.y & 15, self.z & 15)
    }

    /// Position inside the owning chunk; y stays absolute.
    pub fn chunk_local(&self) -> Coord3 {
        Coord3::new(self.x & 15, self.y, self.z & 15)
    }
}

impl fmt::Display for Coord3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Region file identity: its coordinate plus the dimension directory it lives in
/// (`None` for the overworld).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId {
    pub coord: Coord2,
    pub dimension: Option<String>,
}

impl RegionId {
    pub fn new(coord: Coord2, dimension: Option<String>) -> Self {
        RegionId { coord, dimension }
    }
}
