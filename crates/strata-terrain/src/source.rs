//! Procedural block typing.
//!
//! The generator asks a [`BlockSource`] for the material of every global
//! block index it fills. Sources are pure: the same index always yields the
//! same answer. [`HeightmapSource`] is the stock rolling-hills source.

use noise::{NoiseFn, Simplex};
use strata_config::TerrainConfig;
use strata_voxel::{BlockType, GridIndex};

/// Pure function from a global block index to a material.
///
/// `None` means the source has no answer for that index; the generator then
/// stores [`BlockType::Empty`].
pub trait BlockSource {
    /// Material of the block at `global`.
    fn block_type(&self, global: GridIndex) -> Option<BlockType>;
}

impl<F> BlockSource for F
where
    F: Fn(GridIndex) -> Option<BlockType>,
{
    fn block_type(&self, global: GridIndex) -> Option<BlockType> {
        self(global)
    }
}

/// Configuration for the fBm height field of [`HeightmapSource`].
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// Seed for deterministic generation.
    pub seed: u32,
    /// Sea level in global block rows; the height field oscillates around it.
    pub water_level: i32,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per block.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in blocks.
    pub amplitude: f64,
    /// Constant lift of the surface above sea level, in blocks.
    pub surface_bias: f64,
    /// Depth of the dirt layer under the surface block.
    pub soil_depth: i32,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            water_level: 27,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.015,
            amplitude: 12.0,
            surface_bias: 3.0,
            soil_depth: 3,
        }
    }
}

impl HeightmapParams {
    /// Default shape with the seed and sea level taken from `config`.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self {
            seed: config.seed,
            water_level: config.water_level_in_blocks,
            ..Default::default()
        }
    }
}

/// Rolling terrain over multi-octave simplex noise.
///
/// Columns are bedrock at `y == 0`, stone up to the soil layer, dirt under
/// the surface, and grass on top. Sand replaces grass and dirt in columns
/// whose surface sits at or just above sea level. Everything above the
/// surface and below zero is empty.
pub struct HeightmapSource {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSource {
    /// Create a new source with the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Simplex::new(params.seed);
        Self { noise, params }
    }

    /// Surface row (global block `y`) of the column at `(x, z)`.
    pub fn surface_height(&self, x: i64, z: i64) -> i64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            let nx = x as f64 * frequency;
            let nz = z as f64 * frequency;
            total += self.noise.get([nx, nz]) * amplitude;

            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        let height = self.params.water_level as f64 + self.params.surface_bias + total;
        (height.floor() as i64).max(1)
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

impl BlockSource for HeightmapSource {
    fn block_type(&self, global: GridIndex) -> Option<BlockType> {
        if global.y < 0 {
            return Some(BlockType::Empty);
        }
        if global.y == 0 {
            return Some(BlockType::Bedrock);
        }

        let surface = self.surface_height(global.x, global.z);
        let beach = surface <= i64::from(self.params.water_level) + 1;

        let block = if global.y > surface {
            BlockType::Empty
        } else if global.y == surface {
            if beach { BlockType::Sand } else { BlockType::Grass }
        } else if global.y >= surface - i64::from(self.params.soil_depth) {
            if beach { BlockType::Sand } else { BlockType::Dirt }
        } else {
            BlockType::Stone
        };
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(seed: u32) -> HeightmapSource {
        HeightmapSource::new(HeightmapParams {
            seed,
            ..Default::default()
        })
    }

    #[test]
    fn test_determinism_same_seed_same_index() {
        let a = source(42);
        let b = source(42);
        for x in -20..20 {
            assert_eq!(a.surface_height(x, x * 3), b.surface_height(x, x * 3));
            let index = GridIndex::new(x, 25, -x);
            assert_eq!(a.block_type(index), b.block_type(index));
        }
    }

    #[test]
    fn test_column_layers() {
        let s = source(7);
        for (x, z) in [(0, 0), (13, -40), (-77, 5)] {
            let surface = s.surface_height(x, z);
            assert_eq!(s.block_type(GridIndex::new(x, 0, z)), Some(BlockType::Bedrock));
            assert_eq!(s.block_type(GridIndex::new(x, -1, z)), Some(BlockType::Empty));
            assert_eq!(s.block_type(GridIndex::new(x, surface + 1, z)), Some(BlockType::Empty));
            let top = s.block_type(GridIndex::new(x, surface, z)).unwrap();
            assert!(matches!(top, BlockType::Grass | BlockType::Sand | BlockType::Bedrock));
            let soil = i64::from(s.params().soil_depth);
            if surface > soil + 1 {
                assert_eq!(
                    s.block_type(GridIndex::new(x, surface - soil - 1, z)),
                    Some(BlockType::Stone)
                );
            }
        }
    }

    #[test]
    fn test_surface_stays_near_water_level() {
        let s = source(3);
        let max_offset = s.params().amplitude * 2.0 + s.params().surface_bias + 1.0;
        for x in (-200..200).step_by(17) {
            for z in (-200..200).step_by(19) {
                let h = s.surface_height(x, z) as f64;
                assert!((h - s.params().water_level as f64).abs() <= max_offset);
            }
        }
    }

    #[test]
    fn test_far_columns_are_typed() {
        let s = source(11);
        let x = 3_000_000_000;
        let surface = s.surface_height(x, -x);
        assert!(surface >= 1);
        assert_eq!(s.block_type(GridIndex::new(x, 0, -x)), Some(BlockType::Bedrock));
        assert_eq!(s.block_type(GridIndex::new(x, surface + 1, -x)), Some(BlockType::Empty));
    }

    #[test]
    fn test_closure_is_a_source() {
        let flat = |g: GridIndex| Some(if g.y < 4 { BlockType::Stone } else { BlockType::Empty });
        assert_eq!(flat.block_type(GridIndex::new(0, 3, 0)), Some(BlockType::Stone));
        assert_eq!(flat.block_type(GridIndex::new(0, 4, 0)), Some(BlockType::Empty));
    }
}
