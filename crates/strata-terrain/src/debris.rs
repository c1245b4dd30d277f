//! Scene-instance pool for detached blocks.

use std::fmt::Debug;

use glam::Vec3;
use strata_voxel::BlockType;

/// Acquires and releases the rigid bodies spawned for destroyed blocks.
///
/// Handles are opaque to the terrain; it only hands them back to the caller
/// or forwards an impulse.
pub trait DebrisPool {
    /// Handle to one spawned body.
    type Handle: Clone + Debug;

    /// Spawns a body at `position` shaped like a block of `block_type`.
    fn acquire(&mut self, position: Vec3, block_type: BlockType) -> Self::Handle;

    /// Applies an instantaneous impulse to a spawned body.
    fn apply_impulse(&mut self, handle: &Self::Handle, impulse: Vec3);

    /// Returns a body to the pool.
    fn release(&mut self, handle: Self::Handle);
}
