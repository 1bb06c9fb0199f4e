//! Sprite lookup and the block-to-sprite table used by the mesher.

use std::sync::Arc;

use lattice_voxel::{Block, BlockType, Face};
use rustc_hash::FxHashMap;

/// Index of a baked sprite in an atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u32);

/// Normalized atlas rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: Self = Self {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    /// Packs into `[u0, v0, u1, v1]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.u0, self.v0, self.u1, self.v1]
    }
}

/// Resolves sprite names to ids and ids to atlas rectangles.
pub trait SpriteLookup: Send + Sync {
    /// Looks up a sprite by name.
    fn sprite_index(&self, name: &str) -> Option<SpriteId>;

    /// Atlas rectangle of a sprite. Unknown ids map to [`UvRect::FULL`].
    fn baked_sprite(&self, id: SpriteId) -> UvRect;
}

/// In-memory atlas laid out as a uniform grid of square tiles.
#[derive(Clone, Debug, Default)]
pub struct SpriteAtlas {
    names: FxHashMap<String, SpriteId>,
    rects: Vec<UvRect>,
}

impl SpriteAtlas {
    /// Creates an empty atlas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays `names` out row-major on a grid `columns` tiles wide.
    pub fn grid(names: &[&str], columns: usize) -> Self {
        let columns = columns.max(1);
        let rows = names.len().div_ceil(columns).max(1);
        let (tile_w, tile_h) = (1.0 / columns as f32, 1.0 / rows as f32);
        let mut atlas = Self::new();
        for (i, name) in names.iter().enumerate() {
            let (col, row) = ((i % columns) as f32, (i / columns) as f32);
            atlas.insert(
                name,
                UvRect {
                    u0: col * tile_w,
                    v0: row * tile_h,
                    u1: (col + 1.0) * tile_w,
                    v1: (row + 1.0) * tile_h,
                },
            );
        }
        atlas
    }

    /// Adds (or replaces) a named sprite and returns its id.
    pub fn insert(&mut self, name: &str, rect: UvRect) -> SpriteId {
        if let Some(&id) = self.names.get(name) {
            self.rects[id.0 as usize] = rect;
            return id;
        }
        let id = SpriteId(self.rects.len() as u32);
        self.rects.push(rect);
        self.names.insert(name.to_owned(), id);
        id
    }

    /// Number of sprites.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Returns `true` if no sprite has been added.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

impl SpriteLookup for SpriteAtlas {
    fn sprite_index(&self, name: &str) -> Option<SpriteId> {
        self.names.get(name).copied()
    }

    fn baked_sprite(&self, id: SpriteId) -> UvRect {
        self.rects.get(id.0 as usize).copied().unwrap_or(UvRect::FULL)
    }
}

/// Sprites used for clay covered by air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MossRule {
    /// The clay block type.
    pub clay: BlockType,
    /// Sprite for the exposed top face.
    pub top: SpriteId,
    /// Sprite for the four side faces.
    pub side: SpriteId,
}

/// Maps block types and faces to sprites.
#[derive(Clone)]
pub struct BlockSprites {
    lookup: Arc<dyn SpriteLookup>,
    faces: FxHashMap<BlockType, [SpriteId; 6]>,
    missing: SpriteId,
    moss: Option<MossRule>,
}

impl BlockSprites {
    /// Creates a table where every block uses `missing` until registered.
    pub fn new(lookup: Arc<dyn SpriteLookup>, missing: SpriteId) -> Self {
        Self {
            lookup,
            faces: FxHashMap::default(),
            missing,
            moss: None,
        }
    }

    /// Uses one sprite on all six faces of `block_type`.
    pub fn with_block(self, block_type: BlockType, sprite: SpriteId) -> Self {
        self.with_faces(block_type, [sprite; 6])
    }

    /// Uses per-face sprites, indexed by [`Face::index`].
    pub fn with_faces(mut self, block_type: BlockType, sprites: [SpriteId; 6]) -> Self {
        self.faces.insert(block_type, sprites);
        self
    }

    /// Uses `top` for the Up face, `bottom` for Down and `side` elsewhere.
    pub fn with_column(self, block_type: BlockType, top: SpriteId, side: SpriteId, bottom: SpriteId) -> Self {
        let mut sprites = [side; 6];
        sprites[Face::Up.index()] = top;
        sprites[Face::Down.index()] = bottom;
        self.with_faces(block_type, sprites)
    }

    /// Resolves `name` through the lookup and uses it on all faces.
    ///
    /// Unknown names are logged and fall back to the missing sprite.
    pub fn with_named(self, block_type: BlockType, name: &str) -> Self {
        let sprite = self.resolve(name);
        self.with_block(block_type, sprite)
    }

    /// Enables the moss rule for `clay`, resolving sprite names through the lookup.
    pub fn with_moss(mut self, clay: BlockType, top: &str, side: &str) -> Self {
        let (top, side) = (self.resolve(top), self.resolve(side));
        self.moss = Some(MossRule { clay, top, side });
        self
    }

    /// The active moss rule, if any.
    pub fn moss(&self) -> Option<MossRule> {
        self.moss
    }

    /// Sprite for `face` of `block`. `air_above` enables the moss rule.
    pub fn face_sprite(&self, block: Block, face: Face, air_above: bool) -> SpriteId {
        let block_type = block.block_type();
        if let Some(moss) = self.moss
            && air_above
            && block_type == moss.clay
        {
            match face {
                Face::Up => return moss.top,
                Face::Down => {}
                _ => return moss.side,
            }
        }
        self.faces
            .get(&block_type)
            .map_or(self.missing, |sprites| sprites[face.index()])
    }

    /// Atlas rectangle for a sprite.
    pub fn rect(&self, sprite: SpriteId) -> UvRect {
        self.lookup.baked_sprite(sprite)
    }

    fn resolve(&self, name: &str) -> SpriteId {
        self.lookup.sprite_index(name).unwrap_or_else(|| {
            tracing::warn!(sprite = name, "unknown sprite, using missing texture");
            self.missing
        })
    }
}

impl std::fmt::Debug for BlockSprites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSprites")
            .field("blocks", &self.faces.len())
            .field("missing", &self.missing)
            .field("moss", &self.moss)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAY: BlockType = BlockType(3);

    fn atlas() -> Arc<SpriteAtlas> {
        Arc::new(SpriteAtlas::grid(
            &["missing", "stone", "clay", "moss_top", "moss_side"],
            4,
        ))
    }

    #[test]
    fn test_grid_atlas_rects() {
        let atlas = atlas();
        assert_eq!(atlas.len(), 5);
        let stone = atlas.sprite_index("stone").expect("stone");
        assert_eq!(stone, SpriteId(1));
        let rect = atlas.baked_sprite(stone);
        assert_eq!(rect.to_array(), [0.25, 0.0, 0.5, 0.5]);
        let fifth = atlas.baked_sprite(SpriteId(4));
        assert_eq!(fifth.to_array(), [0.0, 0.5, 0.25, 1.0]);
        assert_eq!(atlas.baked_sprite(SpriteId(99)), UvRect::FULL);
        assert_eq!(atlas.sprite_index("nope"), None);
    }

    #[test]
    fn test_unknown_block_uses_missing() {
        let sprites = BlockSprites::new(atlas(), SpriteId(0));
        assert_eq!(
            sprites.face_sprite(Block::new(BlockType(9)), Face::Up, true),
            SpriteId(0)
        );
    }

    #[test]
    fn test_moss_rule_only_with_air_above() {
        let sprites = BlockSprites::new(atlas(), SpriteId(0))
            .with_named(CLAY, "clay")
            .with_moss(CLAY, "moss_top", "moss_side");
        let clay = Block::new(CLAY);
        assert_eq!(sprites.face_sprite(clay, Face::Up, true), SpriteId(3));
        assert_eq!(sprites.face_sprite(clay, Face::North, true), SpriteId(4));
        assert_eq!(sprites.face_sprite(clay, Face::Down, true), SpriteId(2));
        assert_eq!(sprites.face_sprite(clay, Face::Up, false), SpriteId(2));
        assert_eq!(sprites.face_sprite(clay, Face::East, false), SpriteId(2));
    }

    #[test]
    fn test_column_sprites() {
        let sprites = BlockSprites::new(atlas(), SpriteId(0)).with_column(
            BlockType(1),
            SpriteId(3),
            SpriteId(4),
            SpriteId(2),
        );
        let block = Block::new(BlockType(1));
        assert_eq!(sprites.face_sprite(block, Face::Up, false), SpriteId(3));
        assert_eq!(sprites.face_sprite(block, Face::Down, false), SpriteId(2));
        assert_eq!(sprites.face_sprite(block, Face::West, false), SpriteId(4));
    }
}
