//! View-frustum culling of chunk bounding boxes.
//!
//! Planes are extracted from the view-projection matrix (Griggs-Hartmann) for
//! wgpu's `0..1` depth range. The plane test alone keeps boxes that sit just
//! outside a frustum edge, so the eight frustum corners are kept as well and
//! a box that every corner lies beyond on some axis is rejected too.

use glam::{Mat4, Vec3, Vec4};
use lattice_voxel::{CHUNK_SIZE, ChunkPos};

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// An axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of the chunk at `pos`.
    pub fn of_chunk(pos: ChunkPos) -> Self {
        let min = pos.origin_block().as_vec3();
        Self::new(min, min + Vec3::splat(CHUNK_SIZE as f32))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis.
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Six inward-facing planes plus the world-space corners of the frustum.
#[derive(Clone, Debug)]
pub struct Frustum {
    /// `Vec4(a, b, c, d)` with `(a, b, c)` the unit inward normal.
    planes: [Vec4; 6],
    corners: [Vec3; 8],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // Clip depth is 0..w, so the near plane is row 2 on its own.
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        let inverse = vp.inverse();
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let ndc = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { 0.0 } else { 1.0 },
            );
            *corner = inverse.project_point3(ndc);
        }

        Self { planes, corners }
    }

    /// World-space frustum corners: near plane first, then far.
    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    /// `true` if `aabb` may intersect the frustum.
    ///
    /// Never returns `false` for a visible box.
    pub fn test_box_3d(&self, aabb: &Aabb) -> bool {
        !self.outside_a_plane(aabb) && !self.corners_beyond(aabb)
    }

    /// p-vertex test: the box corner furthest along each plane normal must
    /// lie on the inner side.
    fn outside_a_plane(&self, aabb: &Aabb) -> bool {
        self.planes.iter().any(|plane| {
            let normal = plane.truncate();
            let p = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(p) + plane.w < 0.0
        })
    }

    /// All eight frustum corners lie on one side of the box on some axis.
    fn corners_beyond(&self, aabb: &Aabb) -> bool {
        (0..3).any(|axis| {
            self.corners.iter().all(|c| c[axis] > aabb.max[axis])
                || self.corners.iter().all(|c| c[axis] < aabb.min[axis])
        })
    }
}
