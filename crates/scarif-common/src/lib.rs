pub mod error;
pub mod types;

pub use error::ScarifError;
pub use types::{Coord2, Coord3, RegionId, Result};
