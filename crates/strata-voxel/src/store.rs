//! Memoizing owner of every chunk, keyed by chunk [`GridIndex`].
//!
//! The [`ChunkStore`] never evicts on its own and never replaces an existing
//! entry: a chunk index maps to at most one [`Chunk`] for the store's
//! lifetime. Separately it tracks which chunks are *active* (visible and
//! backed by a scene object); retiring a chunk only clears that flag and
//! hands the scene object back to the pool.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{Block, BlockType};
use crate::chunk::Chunk;
use crate::grid::{GridIndex, TerrainGrid};

/// Scene-object pool that receives retired chunks.
pub trait ChunkPool {
    /// Deactivates the scene object showing `index` and returns it to the pool.
    fn release_chunk(&mut self, index: GridIndex);
}

/// Owns all chunks and the active-chunk set.
pub struct ChunkStore {
    grid: TerrainGrid,
    chunks: FxHashMap<GridIndex, Chunk>,
    active: FxHashSet<GridIndex>,
    /// Smallest and largest chunk index ever stored, per axis.
    extent: Option<(GridIndex, GridIndex)>,
}

impl ChunkStore {
    /// Creates an empty store for chunks shaped by `grid`.
    pub fn new(grid: TerrainGrid) -> Self {
        Self {
            grid,
            chunks: FxHashMap::default(),
            active: FxHashSet::default(),
            extent: None,
        }
    }

    /// The grid every stored chunk is shaped by.
    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// Returns the chunk at `index`, creating an empty one on first reference.
    ///
    /// Repeated calls with the same index return the same chunk; an existing
    /// entry is never replaced.
    pub fn get_or_create_empty(&mut self, index: GridIndex) -> &mut Chunk {
        let size = self.grid.chunk_size_in_blocks();
        let extent = &mut self.extent;
        self.chunks.entry(index).or_insert_with(|| {
            tracing::trace!(chunk = ?index, "created empty chunk");
            *extent = Some(match *extent {
                Some((min, max)) => (
                    GridIndex::new(min.x.min(index.x), min.y.min(index.y), min.z.min(index.z)),
                    GridIndex::new(max.x.max(index.x), max.y.max(index.y), max.z.max(index.z)),
                ),
                None => (index, index),
            });
            Chunk::new_empty(index, size)
        })
    }

    /// Inclusive global block range covered by stored chunks, or `None` if
    /// the store is empty. Every block outside it reads as empty.
    pub fn loaded_block_bounds(&self) -> Option<(GridIndex, GridIndex)> {
        let (min, max) = self.extent?;
        let size = self.grid.chunk_size_in_blocks();
        Some((
            self.grid.global_index(min, GridIndex::ZERO),
            self.grid.global_index(max, size.offset(-1, -1, -1)),
        ))
    }

    /// Immutable access to a stored chunk.
    pub fn get(&self, index: &GridIndex) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Mutable access to a stored chunk.
    pub fn get_mut(&mut self, index: &GridIndex) -> Option<&mut Chunk> {
        self.chunks.get_mut(index)
    }

    /// Returns `true` if a chunk exists at `index`.
    pub fn contains(&self, index: &GridIndex) -> bool {
        self.chunks.contains_key(index)
    }

    /// Number of stored chunks, active or not.
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Marks `index` active. Returns `false` if it already was.
    pub fn activate(&mut self, index: GridIndex) -> bool {
        self.active.insert(index)
    }

    /// Removes `index` from the active set and releases its scene object.
    ///
    /// A chunk holds a scene object while it is active or has geometry (edits
    /// rebuild hidden chunks too). Safe on chunks holding neither: nothing is
    /// released and `false` is returned. The chunk data stays cached for reuse.
    pub fn retire(&mut self, index: GridIndex, pool: &mut impl ChunkPool) -> bool {
        let was_active = self.active.remove(&index);
        let had_geometry = match self.chunks.get_mut(&index) {
            Some(chunk) => {
                let built = chunk.has_geometry();
                chunk.clear_geometry();
                built
            }
            None => false,
        };
        if !was_active && !had_geometry {
            return false;
        }
        pool.release_chunk(index);
        tracing::trace!(chunk = ?index, "retired chunk");
        true
    }

    /// Chunks holding a scene object: active or with built geometry.
    pub fn shown(&self) -> impl Iterator<Item = GridIndex> + '_ {
        self.chunks
            .iter()
            .filter(|(index, chunk)| chunk.has_geometry() || self.active.contains(*index))
            .map(|(index, _)| *index)
    }

    /// Returns `true` if `index` is active.
    pub fn is_active(&self, index: &GridIndex) -> bool {
        self.active.contains(index)
    }

    /// Iterates the active chunk indices.
    pub fn active(&self) -> impl Iterator<Item = &GridIndex> {
        self.active.iter()
    }

    /// Number of active chunks.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Iterates all `(index, chunk)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&GridIndex, &Chunk)> {
        self.chunks.iter()
    }

    /// Block type of the global block `global` without creating anything.
    ///
    /// Absent chunks read as empty, exactly as a freshly created one would.
    pub fn block_type_at(&self, global: GridIndex) -> BlockType {
        let chunk_index = self.grid.chunk_of_block(global);
        self.chunks
            .get(&chunk_index)
            .map(|chunk| chunk.get(self.grid.local_index(chunk_index, global)))
            .unwrap_or(BlockType::Empty)
    }

    /// Block record owning the global block `global`, without creating anything.
    pub fn block_at(&self, global: GridIndex) -> Block {
        let chunk_index = self.grid.chunk_of_block(global);
        let local = self.grid.local_index(chunk_index, global);
        Block::new(&self.grid, chunk_index, local, self.block_type_at(global))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPool {
        released: Vec<GridIndex>,
    }

    impl ChunkPool for RecordingPool {
        fn release_chunk(&mut self, index: GridIndex) {
            self.released.push(index);
        }
    }

    fn store() -> ChunkStore {
        ChunkStore::new(TerrainGrid::with_dimensions([4, 4, 4], 1.0))
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let mut s = store();
        let a = GridIndex::new(1, 0, -2);

        let first: *const Chunk = s.get_or_create_empty(a);
        let second: *const Chunk = s.get_or_create_empty(a);

        assert_eq!(first, second);
        assert_eq!(s.loaded_count(), 1);
    }

    #[test]
    fn test_get_or_create_never_replaces_contents() {
        let mut s = store();
        let a = GridIndex::new(0, 0, 0);
        s.get_or_create_empty(a).set(GridIndex::new(1, 1, 1), BlockType::Stone);

        let again = s.get_or_create_empty(a);
        assert_eq!(again.get(GridIndex::new(1, 1, 1)), BlockType::Stone);
    }

    #[test]
    fn test_retire_releases_only_active_chunks() {
        let mut s = store();
        let mut pool = RecordingPool::default();
        let a = GridIndex::new(0, 0, 0);
        s.get_or_create_empty(a);

        // Not active yet: nothing happens.
        assert!(!s.retire(a, &mut pool));
        assert!(pool.released.is_empty());

        assert!(s.activate(a));
        assert!(!s.activate(a));
        assert!(s.retire(a, &mut pool));
        assert!(!s.retire(a, &mut pool));

        assert_eq!(pool.released, vec![a]);
        assert!(!s.is_active(&a));
        // Data stays cached.
        assert!(s.contains(&a));
    }

    #[test]
    fn test_retire_releases_hidden_chunk_with_geometry() {
        let mut s = store();
        let mut pool = RecordingPool::default();
        let a = GridIndex::new(2, 0, 0);
        s.get_or_create_empty(a).mark_geometry_built();
        assert_eq!(s.shown().collect::<Vec<_>>(), vec![a]);

        assert!(s.retire(a, &mut pool));
        assert!(!s.retire(a, &mut pool));
        assert_eq!(pool.released, vec![a]);
        assert!(!s.get(&a).unwrap().has_geometry());
        assert_eq!(s.shown().count(), 0);
    }

    #[test]
    fn test_loaded_block_bounds_track_every_created_chunk() {
        let mut s = store();
        assert!(s.loaded_block_bounds().is_none());

        s.get_or_create_empty(GridIndex::new(-1, 0, 2));
        s.get_or_create_empty(GridIndex::new(3, -2, 0));
        let (min, max) = s.loaded_block_bounds().unwrap();
        assert_eq!(min, GridIndex::new(-4, -8, 0));
        assert_eq!(max, GridIndex::new(15, 3, 11));
    }

    #[test]
    fn test_retire_unknown_chunk_is_safe() {
        let mut s = store();
        let mut pool = RecordingPool::default();
        assert!(!s.retire(GridIndex::new(9, 9, 9), &mut pool));
        assert_eq!(s.loaded_count(), 0);
    }

    #[test]
    fn test_block_type_at_does_not_create_chunks() {
        let mut s = store();
        assert_eq!(s.block_type_at(GridIndex::new(-1, 0, 0)), BlockType::Empty);
        assert_eq!(s.loaded_count(), 0);

        s.get_or_create_empty(GridIndex::new(-1, 0, 0))
            .set(GridIndex::new(3, 0, 0), BlockType::Sand);
        assert_eq!(s.block_type_at(GridIndex::new(-1, 0, 0)), BlockType::Sand);

        let block = s.block_at(GridIndex::new(-1, 0, 0));
        assert_eq!(block.chunk_index, GridIndex::new(-1, 0, 0));
        assert_eq!(block.local_index, GridIndex::new(3, 0, 0));
        assert_eq!(block.block_type, BlockType::Sand);
    }
}
