//! Axis-aligned faces and the direction bitmask used for dirty propagation
//! and snapshot neighbour requirements.

use std::ops::{BitOr, BitOrAssign};

use glam::IVec3;

/// One of the six axis-aligned faces of a voxel or chunk.
///
/// The `repr(u8)` discriminant doubles as the bit index inside [`Direction`]
/// and as the stream index inside a mesh emitter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Face {
    /// −X.
    West = 0,
    /// +X.
    East = 1,
    /// −Y.
    Down = 2,
    /// +Y.
    Up = 3,
    /// −Z.
    North = 4,
    /// +Z.
    South = 5,
}

impl Face {
    /// All six faces in index order.
    pub const ALL: [Face; 6] = [
        Self::West,
        Self::East,
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
    ];

    /// Returns the face index (0–5).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis perpendicular to the face: 0 = X, 1 = Y, 2 = Z.
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    /// `true` for faces pointing along the positive axis.
    pub fn is_positive(self) -> bool {
        self.index() % 2 == 1
    }

    /// Returns the sweep axes for plane meshing: `(layer_axis, u_axis, v_axis)`.
    ///
    /// `layer_axis` is the face normal axis; `u_axis` runs along a row and
    /// `v_axis` advances between rows.
    pub fn sweep_axes(self) -> (usize, usize, usize) {
        match self {
            Self::West | Self::East => (0, 2, 1),
            Self::Down | Self::Up => (1, 0, 2),
            Self::North | Self::South => (2, 0, 1),
        }
    }

    /// Unit offset towards the neighbour on this side.
    pub fn offset(self) -> IVec3 {
        match self {
            Self::West => IVec3::NEG_X,
            Self::East => IVec3::X,
            Self::Down => IVec3::NEG_Y,
            Self::Up => IVec3::Y,
            Self::North => IVec3::NEG_Z,
            Self::South => IVec3::Z,
        }
    }

    /// Unit normal as `[f32; 3]`.
    pub fn normal(self) -> [f32; 3] {
        self.offset().as_vec3().to_array()
    }

    /// Returns the opposite face.
    pub fn opposite(self) -> Self {
        match self {
            Self::West => Self::East,
            Self::East => Self::West,
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
        }
    }

    /// Converts a face index back into a face.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Bitmask over the six faces.
///
/// Bit `n` corresponds to `Face` with index `n`. Dirty updates use it to name
/// which neighbouring chunks must be remeshed alongside the owning chunk; a
/// [`WorldView`](crate::WorldView) uses it to name which neighbours are
/// required.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Direction(pub u8);

impl Direction {
    /// No direction.
    pub const NONE: Self = Self(0);
    /// −X neighbour.
    pub const WEST: Self = Self(1 << Face::West as u8);
    /// +X neighbour.
    pub const EAST: Self = Self(1 << Face::East as u8);
    /// −Y neighbour.
    pub const DOWN: Self = Self(1 << Face::Down as u8);
    /// +Y neighbour.
    pub const UP: Self = Self(1 << Face::Up as u8);
    /// −Z neighbour.
    pub const NORTH: Self = Self(1 << Face::North as u8);
    /// +Z neighbour.
    pub const SOUTH: Self = Self(1 << Face::South as u8);
    /// All six directions.
    pub const ALL: Self = Self(0b0011_1111);

    /// Mask containing only `face`.
    pub fn from_face(face: Face) -> Self {
        Self(1 << face as u8)
    }

    /// Returns `true` if `face` is in the mask.
    pub fn contains(self, face: Face) -> bool {
        self.0 & (1 << face as u8) != 0
    }

    /// Adds `face` to the mask.
    pub fn insert(&mut self, face: Face) {
        self.0 |= 1 << face as u8;
    }

    /// Returns `true` if no direction is set.
    pub fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    /// Iterates over the faces contained in the mask.
    pub fn faces(self) -> impl Iterator<Item = Face> {
        Face::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// Returns `true` if every non-zero axis of `offset` points in a direction
    /// contained in the mask. The zero offset is always covered.
    pub fn covers_offset(self, offset: IVec3) -> bool {
        let axis_ok = |value: i32, neg: Face, pos: Face| match value.signum() {
            -1 => self.contains(neg),
            1 => self.contains(pos),
            _ => true,
        };
        axis_ok(offset.x, Face::West, Face::East)
            && axis_ok(offset.y, Face::Down, Face::Up)
            && axis_ok(offset.z, Face::North, Face::South)
    }
}

impl BitOr for Direction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Direction {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<Face> for Direction {
    fn from(face: Face) -> Self {
        Self::from_face(face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_eq!(face.offset() + face.opposite().offset(), IVec3::ZERO);
        }
    }

    #[test]
    fn test_axis_and_sign_match_offset() {
        for face in Face::ALL {
            let offset = face.offset().to_array();
            let expected = if face.is_positive() { 1 } else { -1 };
            assert_eq!(offset[face.axis()], expected);
        }
    }

    #[test]
    fn test_all_mask_contains_every_face() {
        for face in Face::ALL {
            assert!(Direction::ALL.contains(face));
            assert!(!Direction::NONE.contains(face));
        }
        assert_eq!(Direction::ALL.faces().count(), 6);
    }

    #[test]
    fn test_covers_offset_requires_each_axis() {
        let mask = Direction::WEST | Direction::UP;
        assert!(mask.covers_offset(IVec3::ZERO));
        assert!(mask.covers_offset(IVec3::new(-1, 0, 0)));
        assert!(mask.covers_offset(IVec3::new(-1, 1, 0)));
        assert!(!mask.covers_offset(IVec3::new(1, 0, 0)));
        assert!(!mask.covers_offset(IVec3::new(-1, 1, 1)));
        assert!(Direction::ALL.covers_offset(IVec3::new(1, -1, 1)));
        assert!(!Direction::NONE.covers_offset(IVec3::new(0, 0, 1)));
    }

    #[test]
    fn test_sweep_axes_are_a_permutation() {
        for face in Face::ALL {
            let (l, u, v) = face.sweep_axes();
            assert_eq!(l, face.axis());
            let mut axes = [l, u, v];
            axes.sort_unstable();
            assert_eq!(axes, [0, 1, 2]);
        }
    }
}
