//! The assembled terrain: generator, mutator and streamer behind one owner.

use glam::Vec3;
use strata_config::{Config, ConfigError, EditConfig};
use strata_voxel::{Block, BlockType, ChunkStore, TerrainGrid};

use crate::debris::DebrisPool;
use crate::explosion::TerrainExplosion;
use crate::generator::ChunkGenerator;
use crate::geometry::ChunkGeometry;
use crate::mutator::TerrainMutator;
use crate::raycast::{PointOnTerrainMesh, Ray, SurfaceRaycaster};
use crate::source::BlockSource;
use crate::streamer::{StreamPhase, StreamTick, TerrainStreamer};

/// Single-threaded owner of every terrain component.
///
/// Streaming ticks and edits take `&mut self`, so an edit always runs
/// between two generation steps, never inside one.
pub struct Terrain<S, G, R, D> {
    generator: ChunkGenerator<S, G>,
    mutator: TerrainMutator<R, D>,
    streamer: TerrainStreamer,
}

impl<S, G, R, D> Terrain<S, G, R, D>
where
    S: BlockSource,
    G: ChunkGeometry,
    R: SurfaceRaycaster,
    D: DebrisPool,
{
    /// Validates `config` and wires the components together.
    pub fn new(
        config: &Config,
        source: S,
        geometry: G,
        raycaster: R,
        debris: D,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let grid = TerrainGrid::new(&config.terrain);
        let generator = ChunkGenerator::new(grid, source, geometry);
        let mutator = TerrainMutator::new(
            raycaster,
            debris,
            config.edit.clone(),
            u64::from(config.terrain.seed),
        );
        let streamer = TerrainStreamer::new(&config.terrain, &config.streaming);

        tracing::info!(
            chunk_size = ?config.terrain.chunk_size_in_blocks,
            block_size = config.terrain.block_size,
            radius = config.terrain.visible_chunks_radius,
            "terrain created"
        );
        Ok(Self {
            generator,
            mutator,
            streamer,
        })
    }

    /// Advances streaming around `observer` by one tick.
    pub fn tick(&mut self, observer: Vec3) -> StreamTick {
        self.streamer.tick(observer, &mut self.generator)
    }

    /// Fraction of the current (or last) streaming pass generated.
    pub fn progress(&self) -> f32 {
        self.streamer.progress()
    }

    /// Current streaming state.
    pub fn phase(&self) -> StreamPhase {
        self.streamer.phase()
    }

    /// Returns `true` once the first streaming pass has completed.
    pub fn is_first_load_finished(&self) -> bool {
        self.streamer.is_first_load_finished()
    }

    /// See [`TerrainStreamer::on_first_load_finished`].
    pub fn on_first_load_finished(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.streamer.on_first_load_finished(callback);
    }

    /// Writes `block_type` at `point` and returns the type it replaced.
    pub fn set_block(&mut self, point: Vec3, block_type: BlockType) -> BlockType {
        self.mutator.set_block(&mut self.generator, point, block_type)
    }

    /// Block record at `point`.
    pub fn block_at(&self, point: Vec3) -> Block {
        self.mutator.block_at(&self.generator, point)
    }

    /// Places `block_type` in front of the surface `ray` hits.
    pub fn add_block(&mut self, ray: &Ray, block_type: BlockType) -> Option<Block> {
        self.mutator.add_block(&mut self.generator, ray, block_type)
    }

    /// Empties the block `ray` hits and returns its former type.
    pub fn remove_block(&mut self, ray: &Ray) -> Option<BlockType> {
        self.mutator.remove_block(&mut self.generator, ray)
    }

    /// Removes the block `ray` hits and turns it into a debris body.
    pub fn detach_block(&mut self, ray: &Ray, add_force: bool) -> Option<D::Handle> {
        self.mutator.detach_block(&mut self.generator, ray, add_force)
    }

    /// Destroys every solid block within `radius` of `surface`.
    pub fn explode(&mut self, surface: PointOnTerrainMesh, radius: f32) -> TerrainExplosion<D::Handle> {
        self.mutator.explode(&mut self.generator, surface, radius)
    }

    /// Surface point along `ray`, nudged into the hit block by the configured
    /// raycast offset.
    pub fn raycast_surface(&mut self, ray: &Ray, max_distance: f32) -> Option<PointOnTerrainMesh> {
        let offset = self.mutator.edit_config().raycast_offset;
        self.raycast_surface_with_offset(ray, max_distance, offset)
    }

    /// Surface point along `ray` nudged by `offset` blocks.
    pub fn raycast_surface_with_offset(
        &mut self,
        ray: &Ray,
        max_distance: f32,
        offset: f32,
    ) -> Option<PointOnTerrainMesh> {
        self.mutator
            .raycast_surface(&self.generator, ray, max_distance, offset)
    }

    /// Returns a debris body to its pool.
    pub fn release_debris(&mut self, handle: D::Handle) {
        self.mutator.debris_mut().release(handle);
    }

    /// Grid the terrain is laid out on.
    pub fn grid(&self) -> &TerrainGrid {
        self.generator.grid()
    }

    /// Every chunk created so far.
    pub fn store(&self) -> &ChunkStore {
        self.generator.store()
    }

    /// Chunk generator.
    pub fn generator(&self) -> &ChunkGenerator<S, G> {
        &self.generator
    }

    /// Observer-driven streamer.
    pub fn streamer(&self) -> &TerrainStreamer {
        &self.streamer
    }

    /// Geometry backend.
    pub fn geometry(&self) -> &G {
        self.generator.geometry()
    }

    /// Debris pool.
    pub fn debris(&self) -> &D {
        self.mutator.debris()
    }

    /// Edit settings in use.
    pub fn edit_config(&self) -> &EditConfig {
        self.mutator.edit_config()
    }
}
