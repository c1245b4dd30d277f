//! Dense chunk storage with a one-block mirror border.
//!
//! A chunk owns the blocks in `[0, size)` on every axis. Around them it keeps
//! a one-block shell of *mirror* cells at local index `-1` and `size`, copies
//! of the blocks owned by the 26 surrounding chunks. Geometry building reads
//! the mirrors instead of the neighbors. Whoever edits an owned block is
//! responsible for writing the same value into every mirror of it.

use rustc_hash::FxHashSet;

use crate::block::BlockType;
use crate::grid::GridIndex;

/// A fixed-size rectangular block of voxels plus its mirror border.
#[derive(Clone, Debug)]
pub struct Chunk {
    index: GridIndex,
    size: GridIndex,
    /// Padded storage, `(size + 2)` per axis, x varies fastest.
    blocks: Vec<BlockType>,
    /// Set once procedural typing has filled the chunk.
    populated: bool,
    /// Owned cells written before population; population keeps them.
    early_edits: FxHashSet<GridIndex>,
    has_geometry: bool,
    /// Incremented on every write.
    version: u64,
}

impl Chunk {
    /// Creates an unpopulated chunk with every cell (mirrors included) empty.
    pub fn new_empty(index: GridIndex, size: GridIndex) -> Self {
        Self {
            index,
            size,
            blocks: vec![BlockType::Empty; Self::padded_len(size)],
            populated: false,
            early_edits: FxHashSet::default(),
            has_geometry: false,
            version: 0,
        }
    }

    /// Number of cells in padded storage for a chunk of `size`.
    pub fn padded_len(size: GridIndex) -> usize {
        ((size.x + 2) * (size.y + 2) * (size.z + 2)) as usize
    }

    /// Chunk index in world frame.
    pub fn index(&self) -> GridIndex {
        self.index
    }

    /// Dimensions in blocks, excluding the mirror border.
    pub fn size(&self) -> GridIndex {
        self.size
    }

    /// Lowest owned local index.
    pub fn min_block_index(&self) -> GridIndex {
        GridIndex::ZERO
    }

    /// Highest owned local index.
    pub fn max_block_index(&self) -> GridIndex {
        self.size.offset(-1, -1, -1)
    }

    /// Returns `true` if `local` is a block this chunk owns.
    pub fn owns(&self, local: GridIndex) -> bool {
        (0..self.size.x).contains(&local.x)
            && (0..self.size.y).contains(&local.y)
            && (0..self.size.z).contains(&local.z)
    }

    /// Returns `true` if `local` addresses an owned block or a mirror cell.
    pub fn in_storage(&self, local: GridIndex) -> bool {
        (-1..=self.size.x).contains(&local.x)
            && (-1..=self.size.y).contains(&local.y)
            && (-1..=self.size.z).contains(&local.z)
    }

    /// Returns `true` if `local` is a mirror cell.
    pub fn is_mirror(&self, local: GridIndex) -> bool {
        self.in_storage(local) && !self.owns(local)
    }

    /// Block type at `local` (owned or mirror).
    ///
    /// Returns [`BlockType::Empty`] outside padded storage.
    pub fn get(&self, local: GridIndex) -> BlockType {
        match self.linear_index(local) {
            Some(i) => self.blocks[i],
            None => {
                tracing::warn!(chunk = ?self.index, ?local, "Chunk::get outside storage");
                BlockType::Empty
            }
        }
    }

    /// Writes `block_type` at `local` and returns the previous type.
    ///
    /// Owned cells written before population are remembered so that
    /// population does not overwrite them. Writes outside padded storage are
    /// ignored with a warning and report [`BlockType::Empty`].
    pub fn set(&mut self, local: GridIndex, block_type: BlockType) -> BlockType {
        let Some(i) = self.linear_index(local) else {
            tracing::warn!(chunk = ?self.index, ?local, "Chunk::set outside storage");
            return BlockType::Empty;
        };
        if !self.populated && self.owns(local) {
            self.early_edits.insert(local);
        }
        self.version += 1;
        std::mem::replace(&mut self.blocks[i], block_type)
    }

    /// Returns `true` once procedural typing has run.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Returns `true` if the owned cell `local` was edited before population.
    pub fn has_early_edit(&self, local: GridIndex) -> bool {
        self.early_edits.contains(&local)
    }

    /// Replaces the whole padded storage with `blocks` and marks the chunk
    /// populated.
    ///
    /// `blocks` must be laid out like [`local_indices`](Self::local_indices)
    /// and already contain any early edits the caller wants to keep.
    pub fn populate(&mut self, blocks: Vec<BlockType>) {
        assert_eq!(blocks.len(), self.blocks.len(), "populate: storage size mismatch");
        self.blocks = blocks;
        self.populated = true;
        self.early_edits.clear();
        self.version += 1;
    }

    /// Iterates every local index of padded storage in storage order.
    pub fn local_indices(&self) -> impl Iterator<Item = GridIndex> + use<> {
        Self::storage_indices(self.size)
    }

    /// Iterates every local index of padded storage for a chunk of `size`.
    pub fn storage_indices(size: GridIndex) -> impl Iterator<Item = GridIndex> {
        (-1..=size.z).flat_map(move |z| {
            (-1..=size.y).flat_map(move |y| (-1..=size.x).map(move |x| GridIndex::new(x, y, z)))
        })
    }

    /// Iterates every owned local index.
    pub fn owned_indices(&self) -> impl Iterator<Item = GridIndex> + use<> {
        let size = self.size;
        (0..size.z).flat_map(move |z| {
            (0..size.y).flat_map(move |y| (0..size.x).map(move |x| GridIndex::new(x, y, z)))
        })
    }

    /// Returns `true` if geometry has been built at least once.
    pub fn has_geometry(&self) -> bool {
        self.has_geometry
    }

    /// Records that geometry was (re)built from the current contents.
    pub fn mark_geometry_built(&mut self) {
        self.has_geometry = true;
    }

    /// Records that the chunk's geometry was handed back to the pool.
    pub fn clear_geometry(&mut self) {
        self.has_geometry = false;
    }

    /// Monotonic write counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn linear_index(&self, local: GridIndex) -> Option<usize> {
        if !self.in_storage(local) {
            return None;
        }
        let sx = (self.size.x + 2) as usize;
        let sy = (self.size.y + 2) as usize;
        let x = (local.x + 1) as usize;
        let y = (local.y + 1) as usize;
        let z = (local.z + 1) as usize;
        Some(x + y * sx + z * sx * sy)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk::new_empty(GridIndex::new(2, 0, -1), GridIndex::new(4, 8, 4))
    }

    #[test]
    fn test_new_chunk_is_empty_and_unpopulated() {
        let c = chunk();
        assert!(!c.is_populated());
        assert!(!c.has_geometry());
        assert!(c.local_indices().all(|l| c.get(l) == BlockType::Empty));
        assert_eq!(c.local_indices().count(), Chunk::padded_len(c.size()));
    }

    #[test]
    fn test_bounds_exclude_mirrors() {
        let c = chunk();
        assert_eq!(c.min_block_index(), GridIndex::ZERO);
        assert_eq!(c.max_block_index(), GridIndex::new(3, 7, 3));
        assert!(c.owns(GridIndex::new(3, 7, 3)));
        assert!(c.is_mirror(GridIndex::new(4, 0, 0)));
        assert!(c.is_mirror(GridIndex::new(-1, -1, -1)));
        assert!(!c.in_storage(GridIndex::new(5, 0, 0)));
        assert_eq!(c.owned_indices().count(), 4 * 8 * 4);
    }

    #[test]
    fn test_set_returns_previous_type() {
        let mut c = chunk();
        let local = GridIndex::new(1, 2, 3);
        assert_eq!(c.set(local, BlockType::Stone), BlockType::Empty);
        assert_eq!(c.set(local, BlockType::Dirt), BlockType::Stone);
        assert_eq!(c.get(local), BlockType::Dirt);
        assert_eq!(c.version(), 2);
    }

    #[test]
    fn test_mirror_cells_are_writable() {
        let mut c = chunk();
        let mirror = GridIndex::new(-1, 4, 4);
        c.set(mirror, BlockType::Sand);
        assert_eq!(c.get(mirror), BlockType::Sand);
        assert!(!c.has_early_edit(mirror));
    }

    #[test]
    fn test_out_of_storage_access_is_ignored() {
        let mut c = chunk();
        assert_eq!(c.set(GridIndex::new(9, 0, 0), BlockType::Stone), BlockType::Empty);
        assert_eq!(c.get(GridIndex::new(9, 0, 0)), BlockType::Empty);
        assert_eq!(c.version(), 0);
    }

    #[test]
    fn test_early_edits_tracked_until_population() {
        let mut c = chunk();
        let local = GridIndex::new(0, 0, 0);
        c.set(local, BlockType::Grass);
        assert!(c.has_early_edit(local));

        let mut blocks = vec![BlockType::Stone; Chunk::padded_len(c.size())];
        let position = c.local_indices().position(|l| l == local).unwrap();
        blocks[position] = c.get(local);
        c.populate(blocks);

        assert!(c.is_populated());
        assert!(!c.has_early_edit(local));
        assert_eq!(c.get(local), BlockType::Grass);
        assert_eq!(c.get(GridIndex::new(1, 0, 0)), BlockType::Stone);

        c.set(GridIndex::new(1, 0, 0), BlockType::Empty);
        assert!(!c.has_early_edit(GridIndex::new(1, 0, 0)));
    }

    #[test]
    fn test_storage_order_matches_local_indices() {
        let mut c = chunk();
        let order: Vec<_> = c.local_indices().collect();
        let blocks: Vec<_> = order
            .iter()
            .map(|l| if (l.x + l.y + l.z) % 2 == 0 { BlockType::Dirt } else { BlockType::Empty })
            .collect();
        c.populate(blocks.clone());
        for (l, expected) in order.iter().zip(blocks) {
            assert_eq!(c.get(*l), expected);
        }
    }
}
