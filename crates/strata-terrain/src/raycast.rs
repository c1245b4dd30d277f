//! Ray/surface intersection against the terrain.
//!
//! The mutator consumes intersection through [`SurfaceRaycaster`] so a
//! physics engine can answer it from real collision meshes. [`GridRaycaster`]
//! is the built-in answer: a DDA (Amanatides & Woo) walk over the block grid
//! that reads block types straight from the [`ChunkStore`].

use glam::Vec3;
use strata_voxel::ChunkStore;

/// A world-space ray. The direction is kept normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction, or zero for a degenerate ray.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Raw intersection reported by a [`SurfaceRaycaster`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    /// Point where the ray enters the surface.
    pub point: Vec3,
    /// Outward normal of the hit face.
    pub normal: Vec3,
    /// Distance from the ray origin to `point`, in world units.
    pub distance: f32,
}

/// A surface hit nudged along the ray so it resolves to the intended block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointOnTerrainMesh {
    /// Hit point plus the configured offset along the ray direction.
    pub point: Vec3,
    /// Outward normal of the hit face.
    pub normal: Vec3,
    /// The ray that produced the hit.
    pub ray: Ray,
}

/// Casts rays against the current terrain surface.
pub trait SurfaceRaycaster {
    /// First surface hit along `ray` within `max_distance`, or `None`.
    fn cast(&mut self, store: &ChunkStore, ray: &Ray, max_distance: f32) -> Option<SurfaceHit>;
}

/// Block-grid DDA intersector.
///
/// The block containing the ray origin is never reported, so a ray starting
/// inside terrain finds the next solid block after it. The walk stops once it
/// leaves the blocks covered by stored chunks for good, so an infinite
/// `max_distance` is accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridRaycaster;

impl GridRaycaster {
    /// Creates the intersector.
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceRaycaster for GridRaycaster {
    fn cast(&mut self, store: &ChunkStore, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        let dir = ray.direction;
        if dir == Vec3::ZERO
            || !ray.origin.is_finite()
            || max_distance.is_nan()
            || max_distance < 0.0
        {
            return None;
        }
        // Nothing solid exists outside stored chunks.
        let (min, max) = store.loaded_block_bounds()?;

        // Work in block units.
        let block_size = store.grid().block_size();
        let start = ray.origin / block_size;
        let max_t = max_distance / block_size;

        let mut voxel = store.grid().block_index_at(ray.origin);
        let sub = start - voxel.as_vec3();

        let step_x = if dir.x >= 0.0 { 1 } else { -1 };
        let step_y = if dir.y >= 0.0 { 1 } else { -1 };
        let step_z = if dir.z >= 0.0 { 1 } else { -1 };

        let t_delta = Vec3::new(
            safe_inv(dir.x.abs()),
            safe_inv(dir.y.abs()),
            safe_inv(dir.z.abs()),
        );
        let mut t_max = Vec3::new(
            initial_t_max(sub.x, dir.x, t_delta.x),
            initial_t_max(sub.y, dir.y, t_delta.y),
            initial_t_max(sub.z, dir.z, t_delta.z),
        );

        loop {
            let (t, normal) = if t_max.x < t_max.y && t_max.x < t_max.z {
                let t = t_max.x;
                t_max.x += t_delta.x;
                voxel.x += step_x;
                (t, Vec3::new(-step_x as f32, 0.0, 0.0))
            } else if t_max.y < t_max.z {
                let t = t_max.y;
                t_max.y += t_delta.y;
                voxel.y += step_y;
                (t, Vec3::new(0.0, -step_y as f32, 0.0))
            } else {
                let t = t_max.z;
                t_max.z += t_delta.z;
                voxel.z += step_z;
                (t, Vec3::new(0.0, 0.0, -step_z as f32))
            };

            if t > max_t
                || leaving(voxel.x, min.x, max.x, dir.x)
                || leaving(voxel.y, min.y, max.y, dir.y)
                || leaving(voxel.z, min.z, max.z, dir.z)
            {
                return None;
            }
            if store.block_type_at(voxel).is_solid() {
                let distance = t * block_size;
                return Some(SurfaceHit {
                    point: ray.at(distance),
                    normal,
                    distance,
                });
            }
        }
    }
}

/// Returns `true` if `v` lies outside `[lo, hi]` and the ray never steps back
/// toward that range on this axis.
fn leaving(v: i64, lo: i64, hi: i64, dir_component: f32) -> bool {
    let rising = dir_component >= f32::EPSILON;
    let falling = dir_component <= -f32::EPSILON;
    (v < lo && !rising) || (v > hi && !falling)
}

/// Safely compute 1.0 / x, clamping to `f32::MAX` when x ≈ 0.
fn safe_inv(x: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        f32::MAX
    } else {
        1.0 / x
    }
}

/// Parametric distance to the first block boundary on one axis.
fn initial_t_max(sub: f32, dir_component: f32, t_delta: f32) -> f32 {
    if dir_component > 0.0 {
        (1.0 - sub) * t_delta
    } else if dir_component < 0.0 {
        sub * t_delta
    } else {
        f32::MAX
    }
}
