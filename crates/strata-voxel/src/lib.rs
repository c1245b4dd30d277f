//! Block grid math, chunk storage with mirrored seams, and the chunk store.

pub mod block;
pub mod chunk;
pub mod grid;
pub mod store;

pub use block::{Block, BlockType};
pub use chunk::Chunk;
pub use grid::{Aabb, Direction, GridIndex, MAX_BLOCK_INDEX, TerrainGrid};
pub use store::{ChunkPool, ChunkStore};
