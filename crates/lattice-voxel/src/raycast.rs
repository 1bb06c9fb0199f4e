//! Voxel ray traversal using the Amanatides & Woo DDA.

use glam::{IVec3, Vec3};

use crate::block::Block;

/// A successful voxel hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Raycast {
    /// World block coordinate of the first non-air block.
    pub hit: IVec3,
    /// Last empty cell the ray crossed before `hit`. Equal to `hit` when the
    /// ray starts inside a solid block.
    pub previous: IVec3,
    /// Normal of the face the ray entered through, zero when starting inside.
    pub normal: IVec3,
    /// Parametric distance travelled along the normalized ray.
    pub distance: f32,
}

/// Walks the voxel grid from `from` along `direction`.
///
/// `lookup` returns the block at a world block coordinate, or `None` if the
/// containing chunk is not loaded. Traversal stops with `None` when it
/// reaches an unloaded cell or travels farther than `max_distance`.
pub fn raycast<F>(from: Vec3, direction: Vec3, max_distance: f32, mut lookup: F) -> Option<Raycast>
where
    F: FnMut(IVec3) -> Option<Block>,
{
    let dir = direction.try_normalize()?;
    let mut voxel = from.floor().as_ivec3();
    let sub = from - voxel.as_vec3();

    let step = IVec3::new(step_of(dir.x), step_of(dir.y), step_of(dir.z));
    let t_delta = Vec3::new(
        safe_inv(dir.x.abs()),
        safe_inv(dir.y.abs()),
        safe_inv(dir.z.abs()),
    );
    let mut t_max = Vec3::new(
        initial_t_max(sub.x, dir.x, t_delta.x),
        initial_t_max(sub.y, dir.y, t_delta.y),
        initial_t_max(sub.z, dir.z, t_delta.z),
    );

    let mut previous = voxel;
    let mut normal = IVec3::ZERO;
    let mut t = 0.0_f32;

    loop {
        let block = lookup(voxel)?;
        if !block.is_air() {
            return Some(Raycast {
                hit: voxel,
                previous,
                normal,
                distance: t,
            });
        }
        previous = voxel;

        if t_max.x < t_max.y && t_max.x < t_max.z {
            t = t_max.x;
            t_max.x += t_delta.x;
            voxel.x += step.x;
            normal = IVec3::new(-step.x, 0, 0);
        } else if t_max.y < t_max.z {
            t = t_max.y;
            t_max.y += t_delta.y;
            voxel.y += step.y;
            normal = IVec3::new(0, -step.y, 0);
        } else {
            t = t_max.z;
            t_max.z += t_delta.z;
            voxel.z += step.z;
            normal = IVec3::new(0, 0, -step.z);
        }

        if t > max_distance {
            return None;
        }
    }
}

fn step_of(component: f32) -> i32 {
    if component >= 0.0 { 1 } else { -1 }
}

fn safe_inv(x: f32) -> f32 {
    if x < f32::EPSILON { f32::MAX } else { 1.0 / x }
}

fn initial_t_max(sub: f32, dir_component: f32, t_delta: f32) -> f32 {
    if dir_component > 0.0 {
        (1.0 - sub) * t_delta
    } else if dir_component < 0.0 {
        sub * t_delta
    } else {
        f32::MAX
    }
}
