pub mod block_state;
pub mod chunk;
pub mod packed;
pub mod region;
pub mod registry;
pub mod section;
pub mod world;

pub use block_state::BlockState;
pub use chunk::Chunk;
pub use region::Region;
pub use registry::{BiMap, Registry};
pub use section::{PalettedContainer, Section, SECTION_BIOMES, SECTION_BLOCKS};
pub use world::{RegionCache, World};
