//! Block edits and explosions.
//!
//! Every write to an owned block is replicated into the mirror border of
//! each chunk that borders it: the face neighbors on the axes where the block
//! sits on the chunk boundary, plus every edge and corner neighbor formed by
//! combining those axes. Geometry of every chunk touched by one operation is
//! rebuilt once after the whole operation.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use strata_config::EditConfig;
use strata_voxel::{Block, BlockType, ChunkStore, Direction, GridIndex};

use crate::debris::DebrisPool;
use crate::explosion::TerrainExplosion;
use crate::generator::ChunkGenerator;
use crate::geometry::ChunkGeometry;
use crate::raycast::{PointOnTerrainMesh, Ray, SurfaceRaycaster};
use crate::source::BlockSource;

/// Applies edits to the chunks of a [`ChunkGenerator`].
pub struct TerrainMutator<R, D> {
    raycaster: R,
    debris: D,
    edit: EditConfig,
    rng: ChaCha8Rng,
}

impl<R: SurfaceRaycaster, D: DebrisPool> TerrainMutator<R, D> {
    /// Creates a mutator. `seed` drives the detach impulse magnitudes.
    pub fn new(raycaster: R, debris: D, edit: EditConfig, seed: u64) -> Self {
        Self {
            raycaster,
            debris,
            edit,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Edit settings in use.
    pub fn edit_config(&self) -> &EditConfig {
        &self.edit
    }

    /// Debris pool detached blocks are taken from.
    pub fn debris(&self) -> &D {
        &self.debris
    }

    /// Mutable access to the debris pool.
    pub fn debris_mut(&mut self) -> &mut D {
        &mut self.debris
    }

    /// Mutable access to the surface raycaster.
    pub fn raycaster_mut(&mut self) -> &mut R {
        &mut self.raycaster
    }

    /// Casts `ray` against the terrain surface and nudges the hit point by
    /// `offset` blocks along the ray.
    ///
    /// A positive offset lands inside the hit block, a negative one in the
    /// empty cell in front of it.
    pub fn raycast_surface<S, G>(
        &mut self,
        generator: &ChunkGenerator<S, G>,
        ray: &Ray,
        max_distance: f32,
        offset: f32,
    ) -> Option<PointOnTerrainMesh>
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let hit = self.raycaster.cast(generator.store(), ray, max_distance)?;
        let nudge = ray.direction * (generator.grid().block_size() * offset);
        Some(PointOnTerrainMesh {
            point: hit.point + nudge,
            normal: hit.normal,
            ray: *ray,
        })
    }

    /// Block record at `point`. Never creates chunks.
    pub fn block_at<S, G>(&self, generator: &ChunkGenerator<S, G>, point: Vec3) -> Block
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let global = generator.grid().block_index_at(point);
        generator.store().block_at(global)
    }

    /// Writes `block_type` at `point` and returns the type it replaced.
    pub fn set_block<S, G>(
        &mut self,
        generator: &mut ChunkGenerator<S, G>,
        point: Vec3,
        block_type: BlockType,
    ) -> BlockType
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let global = generator.grid().block_index_at(point);
        let mut touched = FxHashSet::default();
        let previous = write_block(generator, global, block_type, &mut touched);
        rebuild_touched(generator, touched);
        tracing::debug!(block = ?global, ?previous, new = ?block_type, "set block");
        previous
    }

    /// Places `block_type` in the empty cell in front of the surface `ray`
    /// hits. Returns the placed block, or `None` on a miss.
    pub fn add_block<S, G>(
        &mut self,
        generator: &mut ChunkGenerator<S, G>,
        ray: &Ray,
        block_type: BlockType,
    ) -> Option<Block>
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let max_distance = self.edit.raycast_max_distance;
        let offset = -self.edit.raycast_offset;
        let hit = self.raycast_surface(generator, ray, max_distance, offset)?;
        self.set_block(generator, hit.point, block_type);
        Some(self.block_at(generator, hit.point))
    }

    /// Removes the block `ray` hits and returns its type, or `None` on a miss.
    pub fn remove_block<S, G>(
        &mut self,
        generator: &mut ChunkGenerator<S, G>,
        ray: &Ray,
    ) -> Option<BlockType>
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let max_distance = self.edit.raycast_max_distance;
        let offset = self.edit.raycast_offset;
        let hit = self.raycast_surface(generator, ray, max_distance, offset)?;
        if self.block_at(generator, hit.point).is_empty() {
            return Some(BlockType::Empty);
        }
        Some(self.set_block(generator, hit.point, BlockType::Empty))
    }

    /// Removes the block `ray` hits and spawns a debris body in its place.
    ///
    /// With `add_force` the body gets an impulse away from its solid
    /// neighbors. Returns `None` on a miss or when the hit cell is empty.
    pub fn detach_block<S, G>(
        &mut self,
        generator: &mut ChunkGenerator<S, G>,
        ray: &Ray,
        add_force: bool,
    ) -> Option<D::Handle>
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let max_distance = self.edit.raycast_max_distance;
        let offset = self.edit.raycast_offset;
        let hit = self.raycast_surface(generator, ray, max_distance, offset)?;
        let block = self.block_at(generator, hit.point);
        if block.is_empty() {
            return None;
        }

        let removed = self.set_block(generator, hit.point, BlockType::Empty);
        let handle = self.debris.acquire(block.center(), removed);
        if add_force {
            let global = block.global_index(generator.grid());
            let impulse = self.detach_impulse(generator.store(), global);
            self.debris.apply_impulse(&handle, impulse);
        }
        Some(handle)
    }

    /// Destroys every solid block whose center lies within `radius` of the
    /// surface point.
    ///
    /// Destroyed blocks with at least one empty neighbor (checked before
    /// anything is destroyed) spawn a debris body of their former type.
    pub fn explode<S, G>(
        &mut self,
        generator: &mut ChunkGenerator<S, G>,
        surface: PointOnTerrainMesh,
        radius: f32,
    ) -> TerrainExplosion<D::Handle>
    where
        S: BlockSource,
        G: ChunkGeometry,
    {
        let grid = *generator.grid();
        let radius = radius.max(0.0);
        let center = surface.point;
        let min = grid.block_index_at(center - Vec3::splat(radius));
        let max = grid.block_index_at(center + Vec3::splat(radius));

        let mut doomed = Vec::new();
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let global = GridIndex::new(x, y, z);
                    let block_center = grid.global_block_center(global);
                    if block_center.distance_squared(center) > radius * radius {
                        continue;
                    }
                    let block_type = generator.store().block_type_at(global);
                    if block_type.is_solid() {
                        doomed.push((global, block_type, block_center));
                    }
                }
            }
        }

        let surface_blocks: Vec<bool> = doomed
            .iter()
            .map(|&(global, _, _)| is_surface(generator.store(), global))
            .collect();

        let mut debris = Vec::new();
        for (&(_, block_type, block_center), surface_block) in doomed.iter().zip(surface_blocks) {
            if surface_block {
                debris.push(self.debris.acquire(block_center, block_type));
            }
        }

        let mut touched = FxHashSet::default();
        let mut sum = Vec3::ZERO;
        for &(global, _, block_center) in &doomed {
            write_block(generator, global, BlockType::Empty, &mut touched);
            sum += block_center;
        }
        let chunks = touched.len();
        rebuild_touched(generator, touched);

        let destroyed = doomed.len();
        let explosion_center = (destroyed > 0).then(|| sum / destroyed as f32);
        tracing::info!(
            destroyed,
            debris = debris.len(),
            chunks,
            radius,
            "explosion"
        );

        TerrainExplosion::new(surface, explosion_center, debris, destroyed)
    }

    /// Impulse for a block detached at `global`.
    ///
    /// Zero if the cell below is empty (it just falls), straight up if the
    /// cell above is empty, otherwise sideways toward one empty X neighbor
    /// (-X first) and one empty Z neighbor (-Z first).
    fn detach_impulse(&mut self, store: &ChunkStore, global: GridIndex) -> Vec3 {
        let empty = |direction: Direction| store.block_type_at(global.step(direction)).is_empty();

        if empty(Direction::NegY) {
            return Vec3::ZERO;
        }

        let magnitude = self.impulse_magnitude();
        if empty(Direction::PosY) {
            return Vec3::Y * magnitude;
        }

        let mut direction = Vec3::ZERO;
        if empty(Direction::NegX) {
            direction += Direction::NegX.normal();
        } else if empty(Direction::PosX) {
            direction += Direction::PosX.normal();
        }
        if empty(Direction::NegZ) {
            direction += Direction::NegZ.normal();
        } else if empty(Direction::PosZ) {
            direction += Direction::PosZ.normal();
        }

        if direction.length_squared() >= 0.01 {
            direction = direction.normalize();
        }
        direction * magnitude
    }

    fn impulse_magnitude(&mut self) -> f32 {
        let (min, max) = (self.edit.detach_impulse_min, self.edit.detach_impulse_max);
        if min < max { self.rng.random_range(min..max) } else { min }
    }
}

/// Writes `block_type` into the owner of `global` and every mirror of it,
/// creating chunks as needed. Returns the owner's previous type.
fn write_block<S, G>(
    generator: &mut ChunkGenerator<S, G>,
    global: GridIndex,
    block_type: BlockType,
    touched: &mut FxHashSet<GridIndex>,
) -> BlockType
where
    S: BlockSource,
    G: ChunkGeometry,
{
    let grid = *generator.grid();
    let chunk_index = grid.chunk_of_block(global);
    let local = grid.local_index(chunk_index, global);

    let previous = generator.get_or_create_empty(chunk_index).set(local, block_type);
    touched.insert(chunk_index);

    for offset in mirror_offsets(local, grid.chunk_size_in_blocks()) {
        let neighbor = chunk_index + offset;
        let mirror = grid.local_index(neighbor, global);
        generator.get_or_create_empty(neighbor).set(mirror, block_type);
        touched.insert(neighbor);
    }
    previous
}

/// Chunk offsets of every neighbor that mirrors the owned block `local`.
///
/// Per axis the block can sit on the low face, the high face, both (one-block
/// chunks) or neither. Every non-zero combination of the per-axis steps is a
/// face, edge or corner neighbor.
fn mirror_offsets(local: GridIndex, size: GridIndex) -> Vec<GridIndex> {
    let steps = |l: i64, s: i64| {
        let mut v = vec![0];
        if l <= 0 {
            v.push(-1);
        }
        if l >= s - 1 {
            v.push(1);
        }
        v
    };

    let (xs, ys, zs) = (steps(local.x, size.x), steps(local.y, size.y), steps(local.z, size.z));
    let mut offsets = Vec::new();
    for &dz in &zs {
        for &dy in &ys {
            for &dx in &xs {
                if (dx, dy, dz) != (0, 0, 0) {
                    offsets.push(GridIndex::new(dx, dy, dz));
                }
            }
        }
    }
    offsets
}

/// A block is on the surface if any of its six neighbors is empty.
fn is_surface(store: &ChunkStore, global: GridIndex) -> bool {
    Direction::ALL
        .iter()
        .any(|&d| store.block_type_at(global.step(d)).is_empty())
}

/// Rebuilds every touched chunk once, shown or not.
///
/// Geometry built for a hidden chunk is released when the streamer retires
/// it, like that of any active chunk.
fn rebuild_touched<S, G>(generator: &mut ChunkGenerator<S, G>, touched: FxHashSet<GridIndex>)
where
    S: BlockSource,
    G: ChunkGeometry,
{
    let mut touched: Vec<_> = touched.into_iter().collect();
    touched.sort_unstable();
    for index in touched {
        generator.build_mesh_for(index);
    }
}
