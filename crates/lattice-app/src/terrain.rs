//! Heightmap terrain: fBm simplex noise over the x/z plane, layered stone,
//! dirt and a clay crust.

use lattice_voxel::{Block, BlockType, CHUNK_SIZE, Chunk, ChunkPos, WorldGenerator};
use noise::{NoiseFn, Simplex};

pub const STONE: BlockType = BlockType(1);
pub const DIRT: BlockType = BlockType(2);
pub const CLAY: BlockType = BlockType(3);

/// Shape of the height field.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapParams {
    pub seed: u32,
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per block.
    pub base_frequency: f64,
    /// Amplitude of the first octave in blocks.
    pub amplitude: f64,
    /// Surface height where the noise is zero.
    pub base_height: i32,
    /// Dirt layer thickness under the clay crust.
    pub dirt_depth: i32,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.01,
            amplitude: 16.0,
            base_height: 8,
            dirt_depth: 3,
        }
    }
}

/// Deterministic terrain generator.
pub struct HeightmapTerrain {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapTerrain {
    pub fn new(params: HeightmapParams) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
        }
    }

    /// Surface height (y of the topmost solid block) of column `(x, z)`.
    pub fn height(&self, x: i32, z: i32) -> i32 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;
        for _ in 0..self.params.octaves {
            total += self.noise.get([f64::from(x) * frequency, f64::from(z) * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        self.params.base_height + total.round() as i32
    }

    /// Block at world `y` in a column whose surface is `surface`.
    fn layer(&self, y: i32, surface: i32) -> Block {
        if y > surface {
            Block::AIR
        } else if y == surface {
            Block::new(CLAY)
        } else if y >= surface - self.params.dirt_depth {
            Block::new(DIRT)
        } else {
            Block::new(STONE)
        }
    }
}

impl WorldGenerator for HeightmapTerrain {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(pos);
        let origin = pos.origin_block();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let surface = self.height(origin.x + x as i32, origin.z + z as i32);
                let top = (surface - origin.y + 1).clamp(0, CHUNK_SIZE as i32) as usize;
                for y in 0..top {
                    chunk.set(x, y, z, self.layer(origin.y + y as i32, surface));
                }
            }
        }
        chunk
    }
}
