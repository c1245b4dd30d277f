//! Chunk geometry building.
//!
//! The engine only needs two things from a renderer: rebuild a chunk's
//! geometry from its current contents, and take a retired chunk's scene
//! object back. [`ChunkGeometry`] is that seam. [`SurfaceMesher`] is the
//! built-in implementation: it extracts the visible faces of each chunk
//! using the mirror border, so no neighbor chunk is ever touched.

use rustc_hash::FxHashMap;
use strata_voxel::{BlockType, Chunk, ChunkPool, Direction, GridIndex};

/// Geometry builder and scene-object pool for chunks.
pub trait ChunkGeometry: ChunkPool {
    /// Rebuilds the geometry of `chunk` from its owned blocks and mirrors.
    fn rebuild(&mut self, chunk: &Chunk);
}

/// One visible face of a solid block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceFace {
    /// Owned local index of the block.
    pub local: GridIndex,
    /// Side of the block the face is on.
    pub direction: Direction,
    /// Material of the block.
    pub block_type: BlockType,
}

/// Visible faces of a single chunk.
#[derive(Clone, Debug, Default)]
pub struct ChunkSurface {
    /// Faces in storage order.
    pub faces: Vec<SurfaceFace>,
}

impl ChunkSurface {
    /// Extracts every face of a solid owned block whose neighbor is empty.
    ///
    /// Neighbors across the chunk edge are read from the mirror border.
    pub fn extract(chunk: &Chunk) -> Self {
        let mut faces = Vec::new();
        for local in chunk.owned_indices() {
            let block_type = chunk.get(local);
            if block_type.is_empty() {
                continue;
            }
            for direction in Direction::ALL {
                if chunk.get(local.step(direction)).is_empty() {
                    faces.push(SurfaceFace {
                        local,
                        direction,
                        block_type,
                    });
                }
            }
        }
        Self { faces }
    }

    /// Returns `true` if no face is visible.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Keeps the visible-face surface of every shown chunk.
#[derive(Default)]
pub struct SurfaceMesher {
    surfaces: FxHashMap<GridIndex, ChunkSurface>,
    rebuilds: u64,
}

impl SurfaceMesher {
    /// Creates a mesher with nothing shown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface of a shown chunk.
    pub fn surface(&self, index: &GridIndex) -> Option<&ChunkSurface> {
        self.surfaces.get(index)
    }

    /// Number of chunks currently shown.
    pub fn shown_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Total faces across every shown chunk.
    pub fn face_count(&self) -> usize {
        self.surfaces.values().map(|s| s.faces.len()).sum()
    }

    /// Number of rebuilds performed since creation.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}

impl ChunkPool for SurfaceMesher {
    fn release_chunk(&mut self, index: GridIndex) {
        self.surfaces.remove(&index);
    }
}

impl ChunkGeometry for SurfaceMesher {
    fn rebuild(&mut self, chunk: &Chunk) {
        let surface = ChunkSurface::extract(chunk);
        tracing::trace!(chunk = ?chunk.index(), faces = surface.faces.len(), "rebuilt chunk surface");
        self.surfaces.insert(chunk.index(), surface);
        self.rebuilds += 1;
    }
}
