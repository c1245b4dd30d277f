//! Observer-driven chunk streaming.
//!
//! The streamer keeps a square of chunks around the observer active. When
//! the observer's chunk changes it starts a *pass*: stale chunks are retired
//! at once, then the missing ones are generated nearest-first, a few per
//! [`tick`](TerrainStreamer::tick), so generation is spread across frames.
//! At most one pass is in flight; observer moves during a pass are ignored
//! until it settles.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::Vec3;
use rustc_hash::FxHashSet;
use strata_config::{StreamingConfig, TerrainConfig};
use strata_voxel::GridIndex;

use crate::generator::ChunkGenerator;
use crate::geometry::ChunkGeometry;
use crate::source::BlockSource;

/// Streaming state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamPhase {
    /// No pass in flight.
    #[default]
    Idle,
    /// A pass is generating chunks.
    Generating,
}

/// What a single [`TerrainStreamer::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamTick {
    /// Phase after the tick.
    pub phase: StreamPhase,
    /// Chunks generated during the tick.
    pub generated: usize,
    /// Chunks retired during the tick.
    pub retired: usize,
    /// `true` if a pass completed during the tick.
    pub settled: bool,
}

/// Priority queue for chunks awaiting generation, nearest first.
#[derive(Debug, Default)]
pub struct GenerationQueue {
    /// Min-heap: `(horizontal distance squared, chunk index)`.
    queue: BinaryHeap<Reverse<(u64, GridIndex)>>,
    /// Indices already in the queue (dedup guard).
    pending: FxHashSet<GridIndex>,
}

impl GenerationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a chunk index with its squared distance to the observer.
    ///
    /// Duplicate indices are silently ignored.
    pub fn enqueue(&mut self, index: GridIndex, dist_sq: u64) {
        if self.pending.insert(index) {
            self.queue.push(Reverse((dist_sq, index)));
        }
    }

    /// Dequeues the nearest chunk. Returns `None` if the queue is empty.
    pub fn dequeue(&mut self) -> Option<GridIndex> {
        while let Some(Reverse((_, index))) = self.queue.pop() {
            if self.pending.remove(&index) {
                return Some(index);
            }
        }
        None
    }

    /// Number of queued chunks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every queued chunk.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }
}

type FirstLoadCallback = Box<dyn FnOnce() + Send>;

/// Keeps the chunks around an observer generated and active.
pub struct TerrainStreamer {
    radius: i64,
    max_chunk_layer: i64,
    chunks_per_tick: u32,
    phase: StreamPhase,
    /// Unclamped observer chunk of the last completed pass.
    settled_center: Option<GridIndex>,
    /// Unclamped observer chunk of the pass in flight.
    pass_center: GridIndex,
    active: FxHashSet<GridIndex>,
    wanted: FxHashSet<GridIndex>,
    queue: GenerationQueue,
    pass_total: usize,
    pass_generated: usize,
    progress: f32,
    first_load_finished: bool,
    first_load_callbacks: Vec<FirstLoadCallback>,
}

impl TerrainStreamer {
    /// Idle streamer with no active chunks.
    pub fn new(terrain: &TerrainConfig, streaming: &StreamingConfig) -> Self {
        Self {
            radius: i64::from(terrain.visible_chunks_radius),
            max_chunk_layer: i64::from(terrain.max_chunk_layer),
            chunks_per_tick: streaming.chunks_per_tick.max(1),
            phase: StreamPhase::Idle,
            settled_center: None,
            pass_center: GridIndex::ZERO,
            active: FxHashSet::default(),
            wanted: FxHashSet::default(),
            queue: GenerationQueue::new(),
            pass_total: 0,
            pass_generated: 0,
            progress: 0.0,
            first_load_finished: false,
            first_load_callbacks: Vec::new(),
        }
    }

    /// Advances streaming by one scheduling tick.
    ///
    /// Starts a pass if idle and the observer's chunk changed, then generates
    /// up to `chunks_per_tick` queued chunks. The change is judged on the
    /// unclamped chunk, so a vertical move above the ceiling still starts a
    /// (usually empty) pass.
    pub fn tick<S, G>(&mut self, observer: Vec3, generator: &mut ChunkGenerator<S, G>) -> StreamTick
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let mut report = StreamTick::default();

        if self.phase == StreamPhase::Idle {
            let chunk = generator.grid().chunk_index_at(observer);
            if self.settled_center != Some(chunk) {
                report.retired = self.start_pass(chunk, generator);
            }
        }

        if self.phase == StreamPhase::Generating {
            for _ in 0..self.chunks_per_tick {
                let Some(index) = self.queue.dequeue() else {
                    break;
                };
                generator.generate(index);
                self.pass_generated += 1;
                report.generated += 1;
                self.progress = self.pass_generated as f32 / self.pass_total as f32;
            }

            if self.queue.is_empty() {
                self.settle();
                report.settled = true;
            }
        }

        report.phase = self.phase;
        report
    }

    /// Fraction of the current (or last) pass that is generated, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Current streaming state.
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Active set of the last completed pass.
    pub fn active_chunks(&self) -> &FxHashSet<GridIndex> {
        &self.active
    }

    /// Unclamped observer chunk of the last completed pass.
    pub fn settled_center(&self) -> Option<GridIndex> {
        self.settled_center
    }

    /// Chunks queued in the pass in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Every chunk within the square radius around `center` on the horizontal
    /// plane, at `center`'s vertical layer.
    pub fn wanted_chunks(&self, center: GridIndex) -> FxHashSet<GridIndex> {
        let r = self.radius;
        let mut wanted = FxHashSet::default();
        for dz in -r..=r {
            for dx in -r..=r {
                wanted.insert(center.offset(dx, 0, dz));
            }
        }
        wanted
    }

    /// Clamps the observer's chunk to the highest generated layer.
    pub fn observer_chunk(&self, chunk: GridIndex) -> GridIndex {
        GridIndex::new(chunk.x, chunk.y.min(self.max_chunk_layer), chunk.z)
    }

    /// Returns `true` once the first pass has completed.
    pub fn is_first_load_finished(&self) -> bool {
        self.first_load_finished
    }

    /// Registers `callback` to run once when the first pass completes.
    ///
    /// Runs it immediately if that already happened.
    pub fn on_first_load_finished(&mut self, callback: impl FnOnce() + Send + 'static) {
        if self.first_load_finished {
            callback();
        } else {
            self.first_load_callbacks.push(Box::new(callback));
        }
    }

    /// Retires stale chunks and queues missing ones. Returns the number
    /// retired.
    ///
    /// Stale chunks are the active ones outside the wanted set plus any hidden
    /// chunk an edit built geometry for.
    fn start_pass<S, G>(&mut self, chunk: GridIndex, generator: &mut ChunkGenerator<S, G>) -> usize
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let center = self.observer_chunk(chunk);
        let wanted = self.wanted_chunks(center);

        let mut stale: Vec<_> = self
            .active
            .iter()
            .copied()
            .chain(generator.store().shown())
            .filter(|index| !wanted.contains(index))
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        stale.sort_unstable();
        let retired = stale.iter().filter(|&&index| generator.retire(index)).count();

        self.queue.clear();
        for &index in wanted.difference(&self.active) {
            self.queue.enqueue(index, (index - center).horizontal_length_sq());
        }

        self.pass_center = chunk;
        self.pass_total = self.queue.len();
        self.pass_generated = 0;
        self.progress = if self.pass_total == 0 { 1.0 } else { 0.0 };
        self.wanted = wanted;
        self.phase = StreamPhase::Generating;

        tracing::debug!(
            center = ?center,
            queued = self.pass_total,
            retired,
            "streaming pass started"
        );
        retired
    }

    fn settle(&mut self) {
        self.active = std::mem::take(&mut self.wanted);
        self.settled_center = Some(self.pass_center);
        self.phase = StreamPhase::Idle;
        self.progress = 1.0;
        tracing::debug!(center = ?self.pass_center, active = self.active.len(), "streaming pass settled");

        if !self.first_load_finished {
            self.first_load_finished = true;
            tracing::info!(chunks = self.active.len(), "first load finished");
            for callback in self.first_load_callbacks.drain(..) {
                callback();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::geometry::SurfaceMesher;
    use strata_voxel::{BlockType, TerrainGrid};

    type Source = fn(GridIndex) -> Option<BlockType>;

    fn flat(global: GridIndex) -> Option<BlockType> {
        Some(if global.y < 2 { BlockType::Stone } else { BlockType::Empty })
    }

    fn generator() -> ChunkGenerator<Source, SurfaceMesher> {
        ChunkGenerator::new(
            TerrainGrid::with_dimensions([4, 4, 4], 1.0),
            flat as Source,
            SurfaceMesher::new(),
        )
    }

    fn streamer(radius: u32, chunks_per_tick: u32) -> TerrainStreamer {
        let terrain = TerrainConfig {
            chunk_size_in_blocks: [4, 4, 4],
            visible_chunks_radius: radius,
            ..Default::default()
        };
        let streaming = StreamingConfig { chunks_per_tick };
        TerrainStreamer::new(&terrain, &streaming)
    }

    fn run_until_idle(s: &mut TerrainStreamer, observer: Vec3, g: &mut ChunkGenerator<Source, SurfaceMesher>) {
        for _ in 0..1000 {
            if s.tick(observer, g).settled {
                return;
            }
        }
        panic!("streaming pass did not settle");
    }

    #[test]
    fn test_queue_is_nearest_first_and_dedups() {
        let mut q = GenerationQueue::new();
        q.enqueue(GridIndex::new(3, 0, 0), 9);
        q.enqueue(GridIndex::new(1, 0, 0), 1);
        q.enqueue(GridIndex::new(1, 0, 0), 1);
        q.enqueue(GridIndex::new(2, 0, 0), 4);

        assert_eq!(q.len(), 3);
        assert_eq!(q.dequeue(), Some(GridIndex::new(1, 0, 0)));
        assert_eq!(q.dequeue(), Some(GridIndex::new(2, 0, 0)));
        assert_eq!(q.dequeue(), Some(GridIndex::new(3, 0, 0)));
        assert_eq!(q.dequeue(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_wanted_set_is_square_at_clamped_layer() {
        let s = streamer(2, 1);
        let center = s.observer_chunk(GridIndex::new(5, 3, -1));
        assert_eq!(center, GridIndex::new(5, 0, -1));

        let wanted = s.wanted_chunks(center);
        assert_eq!(wanted.len(), 25);
        assert!(wanted.contains(&GridIndex::new(7, 0, 1)));
        assert!(wanted.contains(&GridIndex::new(3, 0, -3)));
        assert!(!wanted.contains(&GridIndex::new(8, 0, -1)));

        // Below the ceiling the observer's own layer is kept.
        assert_eq!(s.observer_chunk(GridIndex::new(0, -2, 0)).y, -2);
    }

    #[test]
    fn test_settled_active_set_matches_wanted_set() {
        let mut g = generator();
        let mut s = streamer(1, 1);
        let observer = Vec3::new(1.0, 1.0, 1.0);

        run_until_idle(&mut s, observer, &mut g);

        let wanted = s.wanted_chunks(GridIndex::ZERO);
        assert_eq!(s.active_chunks(), &wanted);
        let store_active: FxHashSet<_> = g.store().active().copied().collect();
        assert_eq!(store_active, wanted);
        assert_eq!(g.geometry().shown_count(), 9);
    }

    #[test]
    fn test_one_chunk_per_tick_and_progress() {
        let mut g = generator();
        let mut s = streamer(1, 1);
        let observer = Vec3::new(1.0, 1.0, 1.0);

        let first = s.tick(observer, &mut g);
        assert_eq!(first.generated, 1);
        assert_eq!(first.phase, StreamPhase::Generating);
        assert!((s.progress() - 1.0 / 9.0).abs() < 1e-6);

        // The nearest chunk goes first.
        assert!(g.store().is_active(&GridIndex::ZERO));

        for n in 2..9 {
            let t = s.tick(observer, &mut g);
            assert_eq!(t.generated, 1);
            assert!(!t.settled);
            assert!((s.progress() - n as f32 / 9.0).abs() < 1e-6);
        }
        let last = s.tick(observer, &mut g);
        assert!(last.settled);
        assert_eq!(last.phase, StreamPhase::Idle);
        assert_eq!(s.progress(), 1.0);

        // Nothing changed: nothing to do.
        assert_eq!(s.tick(observer, &mut g), StreamTick::default());
    }

    #[test]
    fn test_stale_chunks_retired_once_when_observer_moves() {
        let mut g = generator();
        let mut s = streamer(1, 4);
        run_until_idle(&mut s, Vec3::new(1.0, 1.0, 1.0), &mut g);

        // One chunk over on +X.
        let observer = Vec3::new(5.0, 1.0, 1.0);
        let first = s.tick(observer, &mut g);
        assert_eq!(first.retired, 3);
        assert_eq!(first.generated, 3);
        assert!(first.settled);

        for z in -1..=1 {
            assert!(!g.store().is_active(&GridIndex::new(-1, 0, z)));
            assert!(g.store().is_active(&GridIndex::new(2, 0, z)));
        }
        assert_eq!(s.active_chunks(), &s.wanted_chunks(GridIndex::new(1, 0, 0)));
        assert_eq!(g.geometry().shown_count(), 9);
        // Retired chunk data stays cached.
        assert_eq!(g.store().loaded_count(), 12);
    }

    #[test]
    fn test_moves_ignored_while_generating() {
        let mut g = generator();
        let mut s = streamer(1, 1);

        s.tick(Vec3::new(1.0, 1.0, 1.0), &mut g);
        assert_eq!(s.phase(), StreamPhase::Generating);

        // Far away: ignored until the pass in flight settles.
        let far = Vec3::new(41.0, 1.0, 1.0);
        for _ in 0..8 {
            s.tick(far, &mut g);
        }
        assert_eq!(s.phase(), StreamPhase::Idle);
        assert_eq!(s.settled_center(), Some(GridIndex::ZERO));
        assert_eq!(s.active_chunks(), &s.wanted_chunks(GridIndex::ZERO));

        // The next idle tick picks up the new position.
        let t = s.tick(far, &mut g);
        assert_eq!(t.retired, 9);
        assert_eq!(t.phase, StreamPhase::Generating);
    }

    #[test]
    fn test_vertical_move_above_ceiling_settles_empty_pass() {
        let mut g = generator();
        let mut s = streamer(0, 1);
        run_until_idle(&mut s, Vec3::new(1.0, 1.0, 1.0), &mut g);

        let high = Vec3::new(1.0, 30.0, 1.0);
        let t = s.tick(high, &mut g);
        assert_eq!(
            t,
            StreamTick {
                phase: StreamPhase::Idle,
                generated: 0,
                retired: 0,
                settled: true,
            }
        );
        assert_eq!(s.settled_center(), Some(GridIndex::new(0, 7, 0)));
        assert_eq!(s.active_chunks(), &s.wanted_chunks(GridIndex::ZERO));
        assert_eq!(s.progress(), 1.0);

        // Same raw chunk again: nothing to do.
        assert_eq!(s.tick(high, &mut g), StreamTick::default());
    }

    #[test]
    fn test_pass_retires_hidden_chunks_with_geometry() {
        let mut g = generator();
        let mut s = streamer(0, 1);
        run_until_idle(&mut s, Vec3::new(1.0, 1.0, 1.0), &mut g);

        // An edit rebuilt a chunk the streamer never activated.
        let hidden = GridIndex::new(3, 0, 0);
        g.get_or_create_empty(hidden);
        g.build_mesh_for(hidden);
        assert_eq!(g.geometry().shown_count(), 2);

        let t = s.tick(Vec3::new(5.0, 1.0, 1.0), &mut g);
        assert_eq!(t.retired, 2);
        assert!(t.settled);
        assert_eq!(g.geometry().shown_count(), 1);
        assert!(!g.store().get(&hidden).unwrap().has_geometry());
    }

    #[test]
    fn test_first_load_fires_once() {
        let mut g = generator();
        let mut s = streamer(1, 9);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        s.on_first_load_finished(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!s.is_first_load_finished());

        run_until_idle(&mut s, Vec3::new(1.0, 1.0, 1.0), &mut g);
        run_until_idle(&mut s, Vec3::new(9.0, 1.0, 1.0), &mut g);
        assert!(s.is_first_load_finished());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Late registration runs at once.
        let counter = Arc::clone(&fired);
        s.on_first_load_finished(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
