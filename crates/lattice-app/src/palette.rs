//! Atlas layout and block sprites for the terrain's block types.

use std::sync::Arc;

use lattice_mesh::{BlockSprites, SpriteAtlas, SpriteId, SpriteLookup};

use crate::terrain::{CLAY, DIRT, STONE};

const SPRITES: [&str; 6] = ["missing", "stone", "dirt", "clay", "moss_top", "moss_side"];

/// Sprites for stone, dirt and clay, with moss on clay that sees the sky.
pub fn block_sprites() -> Arc<BlockSprites> {
    let atlas = Arc::new(SpriteAtlas::grid(&SPRITES, 4));
    let missing = atlas.sprite_index("missing").unwrap_or(SpriteId(0));
    Arc::new(
        BlockSprites::new(atlas, missing)
            .with_named(STONE, "stone")
            .with_named(DIRT, "dirt")
            .with_named(CLAY, "clay")
            .with_moss(CLAY, "moss_top", "moss_side"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_voxel::{Block, Face};

    #[test]
    fn test_every_block_has_a_sprite() {
        let sprites = block_sprites();
        for block_type in [STONE, DIRT, CLAY] {
            let sprite = sprites.face_sprite(Block::new(block_type), Face::North, false);
            assert_ne!(sprite, SpriteId(0), "{block_type:?}");
        }
    }

    #[test]
    fn test_exposed_clay_is_mossy() {
        let sprites = block_sprites();
        let moss = sprites.moss().expect("moss rule");
        assert_eq!(sprites.face_sprite(Block::new(CLAY), Face::Up, true), moss.top);
    }
}
