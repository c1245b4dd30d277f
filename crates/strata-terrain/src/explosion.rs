//! Result record of a terrain explosion.

use glam::Vec3;

use crate::raycast::PointOnTerrainMesh;

/// Outcome of a single [`explode`](crate::TerrainMutator::explode) call.
#[derive(Clone, Debug)]
pub struct TerrainExplosion<H> {
    surface_point: PointOnTerrainMesh,
    center: Option<Vec3>,
    debris: Vec<H>,
    destroyed: usize,
}

impl<H> TerrainExplosion<H> {
    pub(crate) fn new(
        surface_point: PointOnTerrainMesh,
        center: Option<Vec3>,
        debris: Vec<H>,
        destroyed: usize,
    ) -> Self {
        Self {
            surface_point,
            center,
            debris,
            destroyed,
        }
    }

    /// The surface point the explosion was triggered at.
    pub fn surface_point(&self) -> &PointOnTerrainMesh {
        &self.surface_point
    }

    /// Mean world center of the destroyed blocks.
    ///
    /// `None` when nothing was destroyed.
    pub fn center(&self) -> Option<Vec3> {
        self.center
    }

    /// Debris bodies spawned for destroyed surface blocks.
    pub fn debris(&self) -> &[H] {
        &self.debris
    }

    /// Takes ownership of the spawned debris handles.
    pub fn into_debris(self) -> Vec<H> {
        self.debris
    }

    /// Number of blocks destroyed.
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    /// Returns `true` if no block was destroyed.
    pub fn is_inert(&self) -> bool {
        self.destroyed == 0
    }
}
