//! Chunk population and activation.
//!
//! [`ChunkGenerator`] owns the [`ChunkStore`] together with the block source
//! that fills chunks and the geometry backend that shows them. Generating a
//! chunk types every cell of its padded storage (mirrors included), marks it
//! active and builds its geometry. A chunk is populated at most once; later
//! `generate` calls only re-activate it and rebuild geometry.

use strata_voxel::{BlockType, Chunk, ChunkStore, GridIndex, TerrainGrid};

use crate::geometry::ChunkGeometry;
use crate::source::BlockSource;

/// Fills, activates and meshes chunks.
pub struct ChunkGenerator<S, G> {
    store: ChunkStore,
    source: S,
    geometry: G,
}

impl<S: BlockSource, G: ChunkGeometry> ChunkGenerator<S, G> {
    /// Creates a generator over an empty store laid out by `grid`.
    pub fn new(grid: TerrainGrid, source: S, geometry: G) -> Self {
        Self {
            store: ChunkStore::new(grid),
            source,
            geometry,
        }
    }

    /// Grid the store is laid out on.
    pub fn grid(&self) -> &TerrainGrid {
        self.store.grid()
    }

    /// Every chunk created so far.
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Mutable access to the chunk store.
    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }

    /// Block source used to populate chunks.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Geometry backend.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Mutable access to the geometry backend.
    pub fn geometry_mut(&mut self) -> &mut G {
        &mut self.geometry
    }

    /// Returns the chunk at `index`, creating an empty one on first reference.
    pub fn get_or_create_empty(&mut self, index: GridIndex) -> &mut Chunk {
        self.store.get_or_create_empty(index)
    }

    /// Populates `index` if needed, marks it active and builds its geometry.
    pub fn generate(&mut self, index: GridIndex) -> &Chunk {
        let populated = self.store.get_or_create_empty(index).is_populated();
        if !populated {
            let blocks = self.type_storage(index);
            if let Some(chunk) = self.store.get_mut(&index) {
                chunk.populate(blocks);
            }
            tracing::debug!(chunk = ?index, "populated chunk");
        }

        self.store.activate(index);
        self.build_mesh_for(index);
        self.store.get_or_create_empty(index)
    }

    /// Rebuilds the geometry of `index` from its current contents.
    ///
    /// Does nothing if the chunk does not exist.
    pub fn build_mesh_for(&mut self, index: GridIndex) {
        let Some(chunk) = self.store.get_mut(&index) else {
            tracing::warn!(chunk = ?index, "build_mesh_for on unknown chunk");
            return;
        };
        self.geometry.rebuild(chunk);
        chunk.mark_geometry_built();
    }

    /// Deactivates `index` and hands its scene object back to the geometry
    /// pool. Returns `false` if the chunk was neither active nor built.
    pub fn retire(&mut self, index: GridIndex) -> bool {
        self.store.retire(index, &mut self.geometry)
    }

    /// Computes the padded storage of `index` in [`Chunk::storage_indices`]
    /// order.
    ///
    /// Owned cells edited before population keep their value. A mirror cell
    /// copies its owner when the owner already holds authoritative data for
    /// it (populated, or that block was edited early); otherwise it is typed
    /// by the source like any other cell.
    fn type_storage(&self, index: GridIndex) -> Vec<BlockType> {
        let grid = self.store.grid();
        let size = grid.chunk_size_in_blocks();
        let target = self.store.get(&index);

        Chunk::storage_indices(size)
            .map(|local| {
                let global = grid.global_index(index, local);
                let owns = (0..size.x).contains(&local.x)
                    && (0..size.y).contains(&local.y)
                    && (0..size.z).contains(&local.z);

                if owns {
                    if let Some(chunk) = target.filter(|c| c.has_early_edit(local)) {
                        return chunk.get(local);
                    }
                } else {
                    let owner = grid.chunk_of_block(global);
                    let owner_local = grid.local_index(owner, global);
                    if let Some(chunk) = self
                        .store
                        .get(&owner)
                        .filter(|c| c.is_populated() || c.has_early_edit(owner_local))
                    {
                        return chunk.get(owner_local);
                    }
                }

                self.source.block_type(global).unwrap_or(BlockType::Empty)
            })
            .collect()
    }
}
