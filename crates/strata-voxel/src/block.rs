//! Block materials and the block view record.

use glam::Vec3;

use crate::grid::{Aabb, GridIndex, TerrainGrid};

/// Material tag of a single block. [`BlockType::Empty`] is the only
/// non-solid value and is the zero value so fresh storage reads as air.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    /// No block.
    #[default]
    Empty = 0,
    /// Grass-topped soil.
    Grass = 1,
    /// Plain soil.
    Dirt = 2,
    /// Rock.
    Stone = 3,
    /// Beach and sea-floor sand.
    Sand = 4,
    /// Bottom floor layer.
    Bedrock = 5,
}

impl BlockType {
    /// Every solid material.
    pub const SOLID: [BlockType; 5] = [
        Self::Grass,
        Self::Dirt,
        Self::Stone,
        Self::Sand,
        Self::Bedrock,
    ];

    /// Returns `true` for [`BlockType::Empty`].
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    /// Returns `true` for every material except [`BlockType::Empty`].
    pub fn is_solid(self) -> bool {
        !self.is_empty()
    }
}

/// A block as seen from its owning chunk.
///
/// The center is computed once from the grid formula when the record is
/// built and cannot be changed afterwards; bounds are always derived from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    /// Material at this position.
    pub block_type: BlockType,
    /// Chunk that owns the block.
    pub chunk_index: GridIndex,
    /// Index inside the owning chunk's frame.
    pub local_index: GridIndex,
    center: Vec3,
    half_size: f32,
}

impl Block {
    /// Builds the record for `local` in `chunk`.
    pub fn new(
        grid: &TerrainGrid,
        chunk_index: GridIndex,
        local_index: GridIndex,
        block_type: BlockType,
    ) -> Self {
        Self {
            block_type,
            chunk_index,
            local_index,
            center: grid.block_center(chunk_index, local_index),
            half_size: grid.half_block_size(),
        }
    }

    /// World-space center.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Global block index.
    pub fn global_index(&self, grid: &TerrainGrid) -> GridIndex {
        grid.global_index(self.chunk_index, self.local_index)
    }

    /// Axis-aligned bounds around [`center`](Self::center()).
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.center, self.half_size)
    }

    /// Returns `true` if the block holds no material.
    pub fn is_empty(&self) -> bool {
        self.block_type.is_empty()
    }
}
