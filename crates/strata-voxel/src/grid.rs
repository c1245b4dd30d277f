//! Grid coordinate math: conversions between continuous world positions and
//! discrete block/chunk indices, plus axis-direction arithmetic.
//!
//! All conversions use floor division, so negative coordinates land in the
//! cell below zero (`-0.1` maps to `-1`, never to `0`).
//!
//! Indices are `i64`. World points are clamped to [`MAX_BLOCK_INDEX`] blocks
//! from the origin, which leaves enough headroom that chunk, neighbor and
//! mirror arithmetic on any resolved index cannot overflow.

use std::ops::{Add, Mul, Sub};

use glam::Vec3;
use strata_config::TerrainConfig;

/// Largest block index magnitude a world point resolves to (`2^62`).
pub const MAX_BLOCK_INDEX: i64 = 1 << 62;

/// Integer triple addressing either a block (global or chunk-local) or a chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridIndex {
    /// X component.
    pub x: i64,
    /// Y component.
    pub y: i64,
    /// Z component.
    pub z: i64,
}

impl GridIndex {
    /// `(0, 0, 0)`.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a new index.
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Returns the index offset by `(dx, dy, dz)`.
    pub fn offset(self, dx: i64, dy: i64, dz: i64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Returns the neighbor one step away in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        self + direction.unit()
    }

    /// Component-wise product.
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Converts to a float vector.
    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    /// Squared length of the horizontal (XZ) offset.
    ///
    /// Saturates at `u64::MAX`.
    pub fn horizontal_length_sq(self) -> u64 {
        let x = self.x.unsigned_abs();
        let z = self.z.unsigned_abs();
        x.saturating_mul(x).saturating_add(z.saturating_mul(z))
    }
}

impl Add for GridIndex {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for GridIndex {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<i64> for GridIndex {
    type Output = Self;

    fn mul(self, factor: i64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// One of the six axis directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// +X direction.
    PosX = 0,
    /// −X direction.
    NegX = 1,
    /// +Y direction.
    PosY = 2,
    /// −Y direction.
    NegY = 3,
    /// +Z direction.
    PosZ = 4,
    /// −Z direction.
    NegZ = 5,
}

impl Direction {
    /// All six directions in order.
    pub const ALL: [Direction; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// Unit step for this direction.
    pub fn unit(self) -> GridIndex {
        match self {
            Self::PosX => GridIndex::new(1, 0, 0),
            Self::NegX => GridIndex::new(-1, 0, 0),
            Self::PosY => GridIndex::new(0, 1, 0),
            Self::NegY => GridIndex::new(0, -1, 0),
            Self::PosZ => GridIndex::new(0, 0, 1),
            Self::NegZ => GridIndex::new(0, 0, -1),
        }
    }

    /// Unit normal as a float vector.
    pub fn normal(self) -> Vec3 {
        self.unit().as_vec3()
    }

    /// Returns the opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::PosX => Self::NegX,
            Self::NegX => Self::PosX,
            Self::PosY => Self::NegY,
            Self::NegY => Self::PosY,
            Self::PosZ => Self::NegZ,
            Self::NegZ => Self::PosZ,
        }
    }
}

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box centered on `center` with half-extent `half` on every axis.
    pub fn from_center(center: Vec3, half: f32) -> Self {
        Self {
            min: center - Vec3::splat(half),
            max: center + Vec3::splat(half),
        }
    }

    /// Midpoint of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns `true` if `point` lies inside or on the boundary.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Chunk and block dimensions shared read-only by every terrain component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainGrid {
    chunk_size_in_blocks: GridIndex,
    block_size: f32,
}

impl TerrainGrid {
    /// Builds the grid from a validated [`TerrainConfig`].
    pub fn new(config: &TerrainConfig) -> Self {
        Self::with_dimensions(config.chunk_size_in_blocks, config.block_size)
    }

    /// Builds a grid from raw chunk dimensions and block size.
    pub fn with_dimensions(chunk_size_in_blocks: [u32; 3], block_size: f32) -> Self {
        debug_assert!(chunk_size_in_blocks.iter().all(|&d| d > 0));
        debug_assert!(block_size > 0.0);
        let [x, y, z] = chunk_size_in_blocks.map(|d| i64::from(d.max(1)));
        Self {
            chunk_size_in_blocks: GridIndex::new(x, y, z),
            block_size,
        }
    }

    /// Chunk dimensions in blocks.
    pub fn chunk_size_in_blocks(&self) -> GridIndex {
        self.chunk_size_in_blocks
    }

    /// Edge length of one block in world units.
    pub fn block_size(&self) -> f32 {
        self.block_size
    }

    /// Half of [`block_size`](Self::block_size).
    pub fn half_block_size(&self) -> f32 {
        self.block_size * 0.5
    }

    /// Chunk extent in world units per axis.
    pub fn chunk_size(&self) -> Vec3 {
        self.chunk_size_in_blocks.as_vec3() * self.block_size
    }

    /// Global block index containing `point`.
    ///
    /// Components are clamped to `±MAX_BLOCK_INDEX`; NaN resolves to `0`.
    pub fn block_index_at(&self, point: Vec3) -> GridIndex {
        let scaled = (point / self.block_size).floor();
        let index = |v: f32| (v as i64).clamp(-MAX_BLOCK_INDEX, MAX_BLOCK_INDEX);
        GridIndex::new(index(scaled.x), index(scaled.y), index(scaled.z))
    }

    /// Chunk index containing `point`.
    ///
    /// Derived from [`block_index_at`](Self::block_index_at) so that the two
    /// never disagree at chunk seams.
    pub fn chunk_index_at(&self, point: Vec3) -> GridIndex {
        self.chunk_of_block(self.block_index_at(point))
    }

    /// Chunk owning the global block `global`.
    pub fn chunk_of_block(&self, global: GridIndex) -> GridIndex {
        let size = self.chunk_size_in_blocks;
        GridIndex::new(
            global.x.div_euclid(size.x),
            global.y.div_euclid(size.y),
            global.z.div_euclid(size.z),
        )
    }

    /// Local index of the global block `global` in the frame of `chunk`.
    ///
    /// The result may fall outside the chunk's own bounds; one step outside
    /// addresses the chunk's mirror of a neighbor's block.
    pub fn local_index(&self, chunk: GridIndex, global: GridIndex) -> GridIndex {
        global - chunk.scale(self.chunk_size_in_blocks)
    }

    /// Global block index of `local` in the frame of `chunk`.
    pub fn global_index(&self, chunk: GridIndex, local: GridIndex) -> GridIndex {
        chunk.scale(self.chunk_size_in_blocks) + local
    }

    /// World-space center of block `local` in the frame of `chunk`.
    pub fn block_center(&self, chunk: GridIndex, local: GridIndex) -> Vec3 {
        chunk.as_vec3() * self.chunk_size()
            + local.as_vec3() * self.block_size
            + Vec3::splat(self.half_block_size())
    }

    /// World-space center of the global block `global`.
    pub fn global_block_center(&self, global: GridIndex) -> Vec3 {
        global.as_vec3() * self.block_size + Vec3::splat(self.half_block_size())
    }
}
