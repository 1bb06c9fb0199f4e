//! Packed 64-bit voxel value.
//!
//! Layout (least significant bit first):
//!
//! | Bits    | Field                          |
//! |---------|--------------------------------|
//! | 0..16   | block type id (0 = air)        |
//! | 16..20  | fluid type                     |
//! | 20..24  | fluid amount                   |
//! | 24..40  | local-object chain index       |
//! | 40..64  | reserved                       |

/// Identifier of a block type. `BlockType(0)` is air.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockType(pub u16);

impl BlockType {
    /// The empty block type.
    pub const AIR: Self = Self(0);
}

const TYPE_MASK: u64 = 0xFFFF;
const FLUID_TYPE_SHIFT: u32 = 16;
const FLUID_AMOUNT_SHIFT: u32 = 20;
const NIBBLE_MASK: u64 = 0xF;
const LOCAL_OBJECT_SHIFT: u32 = 24;
const LOCAL_OBJECT_MASK: u64 = 0xFFFF;

/// A single voxel, copied by value. Equality is bitwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Block(u64);

impl Block {
    /// The all-zero block.
    pub const AIR: Self = Self(0);

    /// Wraps a raw packed value.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Creates a block of the given type with no fluid and no local object.
    pub const fn new(block_type: BlockType) -> Self {
        Self(block_type.0 as u64)
    }

    /// Raw packed representation.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns the block type.
    pub const fn block_type(self) -> BlockType {
        BlockType((self.0 & TYPE_MASK) as u16)
    }

    /// Returns `true` when the block type is air, regardless of the other fields.
    pub const fn is_air(self) -> bool {
        self.0 & TYPE_MASK == 0
    }

    /// Fluid type nibble (0..16).
    pub const fn fluid_type(self) -> u8 {
        ((self.0 >> FLUID_TYPE_SHIFT) & NIBBLE_MASK) as u8
    }

    /// Fluid amount nibble (0..16).
    pub const fn fluid_amount(self) -> u8 {
        ((self.0 >> FLUID_AMOUNT_SHIFT) & NIBBLE_MASK) as u8
    }

    /// Index of the first entry in the chunk-local object chain, 0 when unused.
    pub const fn local_object(self) -> u16 {
        ((self.0 >> LOCAL_OBJECT_SHIFT) & LOCAL_OBJECT_MASK) as u16
    }

    /// Returns a copy with the given block type.
    pub const fn with_type(self, block_type: BlockType) -> Self {
        Self((self.0 & !TYPE_MASK) | block_type.0 as u64)
    }

    /// Returns a copy with the given fluid type and amount (both truncated to 4 bits).
    pub const fn with_fluid(self, fluid_type: u8, amount: u8) -> Self {
        let cleared = self.0
            & !(NIBBLE_MASK << FLUID_TYPE_SHIFT)
            & !(NIBBLE_MASK << FLUID_AMOUNT_SHIFT);
        Self(
            cleared
                | ((fluid_type as u64 & NIBBLE_MASK) << FLUID_TYPE_SHIFT)
                | ((amount as u64 & NIBBLE_MASK) << FLUID_AMOUNT_SHIFT),
        )
    }

    /// Returns a copy linked to the given local-object chain index.
    pub const fn with_local_object(self, index: u16) -> Self {
        let cleared = self.0 & !(LOCAL_OBJECT_MASK << LOCAL_OBJECT_SHIFT);
        Self(cleared | ((index as u64) << LOCAL_OBJECT_SHIFT))
    }
}

impl From<BlockType> for Block {
    fn from(block_type: BlockType) -> Self {
        Self::new(block_type)
    }
}
