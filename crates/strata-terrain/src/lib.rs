//! Streamed voxel terrain: chunk generation, block edits and explosions with
//! mirrored chunk seams, and observer-driven streaming under a per-tick budget.

pub mod debris;
pub mod explosion;
pub mod generator;
pub mod geometry;
pub mod mutator;
pub mod raycast;
pub mod source;
pub mod streamer;
pub mod terrain;

pub use debris::DebrisPool;
pub use explosion::TerrainExplosion;
pub use generator::ChunkGenerator;
pub use geometry::{ChunkGeometry, ChunkSurface, SurfaceFace, SurfaceMesher};
pub use mutator::TerrainMutator;
pub use raycast::{GridRaycaster, PointOnTerrainMesh, Ray, SurfaceHit, SurfaceRaycaster};
pub use source::{BlockSource, HeightmapParams, HeightmapSource};
pub use streamer::{GenerationQueue, StreamPhase, StreamTick, TerrainStreamer};
pub use terrain::Terrain;
