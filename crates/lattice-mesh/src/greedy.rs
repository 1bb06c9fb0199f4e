//! Greedy meshing: merges coplanar faces with the same sprite into large quads.
//!
//! Meshing runs in two passes per level of detail:
//!
//! 1. [`GreedyMesher::emit_level`] samples the chunk at a stride (1 or 2) and
//!    imprints every face into a [`ChunkFaceBuffer`] as a sprite id or
//!    [`CULLED`].
//! 2. [`GreedyMesher::emit_plane`] sweeps one layer of one direction row by
//!    row. Each row is split into runs ("quad delegates") which are extended
//!    over adjacent culled cells and then merged with the open quads of the
//!    previous row.
//!
//! Culled cells are hidden by a solid neighbour, so a quad may safely cover
//! them. That freedom is what lets rows bridge gaps and rows of different
//! visible width merge vertically.

use glam::IVec3;
use lattice_voxel::{CHUNK_SIZE, Face, WorldView};

use crate::emitter::{GENERIC_STREAM, MeshEmitterSet};
use crate::face_buffer::{CULLED, ChunkFaceBuffer, EMPTY};
use crate::sprites::{BlockSprites, SpriteId};
use crate::vertex::ChunkVertex;

/// Stride of the coarse level of detail.
pub const LOD_STRIDE: usize = 2;

/// Merge policy knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MesherSettings {
    /// Bridge culled gaps between two runs of the same sprite.
    pub greedier_rows: bool,
    /// Merge rows whose visible spans differ when both windows cover the union.
    pub greedier_merge: bool,
    /// Longest culled gap `greedier_rows` may bridge.
    pub greedier_culling_limit: usize,
}

impl Default for MesherSettings {
    fn default() -> Self {
        Self {
            greedier_rows: true,
            greedier_merge: true,
            greedier_culling_limit: 32,
        }
    }
}

/// A run of one sprite inside a row, possibly extended vertically.
///
/// `vis_lo..vis_hi` is the span that must be covered; `lo..hi` is the window
/// the quad may occupy, which also includes credited culled cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QuadDelegate {
    vis_lo: usize,
    vis_hi: usize,
    lo: usize,
    hi: usize,
    sprite: u32,
    v_start: usize,
    height: usize,
}

/// A maximal stretch of identical non-empty cells within a row.
#[derive(Clone, Copy, Debug)]
struct Span {
    lo: usize,
    hi: usize,
    cell: u32,
}

impl Span {
    fn is_culled(&self) -> bool {
        self.cell == CULLED
    }

    fn len(&self) -> usize {
        self.hi - self.lo
    }
}

/// Stateless mesher; scratch space is passed in by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyMesher {
    settings: MesherSettings,
}

impl GreedyMesher {
    pub fn new(settings: MesherSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MesherSettings {
        &self.settings
    }

    /// Meshes the view's centre chunk into `out`.
    ///
    /// Full detail goes to the six face streams, the stride-2 level to the
    /// generic stream. `out` is cleared first; an empty or fully enclosed
    /// chunk leaves it empty.
    pub fn emit_chunk(
        &self,
        view: &WorldView,
        sprites: &BlockSprites,
        faces: &mut ChunkFaceBuffer,
        out: &mut MeshEmitterSet,
    ) {
        out.clear();
        if view.is_empty() {
            return;
        }
        let origin = view.center().origin_block();

        self.emit_level(view, sprites, 1, faces);
        for face in Face::ALL {
            let stream = out.stream_mut(face.index());
            for layer in 0..faces.size() {
                self.emit_plane(faces, face, layer, 1, origin, sprites, stream);
            }
        }

        self.emit_level(view, sprites, LOD_STRIDE, faces);
        let stream = out.stream_mut(GENERIC_STREAM);
        for face in Face::ALL {
            for layer in 0..faces.size() {
                self.emit_plane(faces, face, layer, LOD_STRIDE, origin, sprites, stream);
            }
        }
    }

    /// Imprints face visibility of the centre chunk sampled every `stride`
    /// voxels. `faces` is reset to `CHUNK_SIZE / stride` cells per side.
    pub fn emit_level(
        &self,
        view: &WorldView,
        sprites: &BlockSprites,
        stride: usize,
        faces: &mut ChunkFaceBuffer,
    ) {
        let n = CHUNK_SIZE / stride;
        faces.reset(n);
        let s = stride as i32;

        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    let (x, y, z) = (i as i32 * s, j as i32 * s, k as i32 * s);
                    let block = view.get_block(x, y, z);
                    if block.is_air() {
                        continue;
                    }
                    let air_above = view.get_block(x, y + s, z).is_air();
                    let cell = [i, j, k];
                    for face in Face::ALL {
                        let d = face.offset() * s;
                        let neighbour = view.get_block(x + d.x, y + d.y, z + d.z);
                        let value = if neighbour.is_air() {
                            let SpriteId(id) = sprites.face_sprite(block, face, air_above);
                            debug_assert!(id < CULLED, "sprite id collides with a sentinel");
                            id
                        } else {
                            CULLED
                        };
                        let (l, u, v) = face.sweep_axes();
                        faces.set(face, cell[l], cell[u], cell[v], value);
                    }
                }
            }
        }
    }

    /// Greedily merges one layer of one direction and appends the quads to
    /// `out`. Returns the number of quads emitted.
    #[allow(clippy::too_many_arguments)]
    pub fn emit_plane(
        &self,
        faces: &ChunkFaceBuffer,
        face: Face,
        layer: usize,
        stride: usize,
        origin: IVec3,
        sprites: &BlockSprites,
        out: &mut Vec<ChunkVertex>,
    ) -> usize {
        let plane = faces.plane(face, layer);
        if plane.has_no_visible() {
            return 0;
        }

        let mut front: Vec<QuadDelegate> = Vec::new();
        let mut back: Vec<QuadDelegate> = Vec::new();
        let mut next: Vec<QuadDelegate> = Vec::new();
        let mut taken: Vec<bool> = Vec::new();
        let mut emitted = 0;

        for v in 0..plane.size() {
            self.collect_row(plane.row(v), v, &mut back);

            taken.clear();
            taken.resize(front.len(), false);
            for candidate in back.drain(..) {
                let open = front
                    .iter()
                    .enumerate()
                    .position(|(i, quad)| !taken[i] && self.can_merge(quad, &candidate));
                match open {
                    Some(i) => {
                        taken[i] = true;
                        next.push(merge(&front[i], &candidate));
                    }
                    None => next.push(candidate),
                }
            }
            for (quad, _) in front.iter().zip(&taken).filter(|(_, t)| !**t) {
                emit_quad(face, layer, quad, stride, origin, sprites, out);
                emitted += 1;
            }
            front.clear();
            std::mem::swap(&mut front, &mut next);
        }

        for quad in &front {
            emit_quad(face, layer, quad, stride, origin, sprites, out);
            emitted += 1;
        }
        emitted
    }

    /// Splits a row into delegates, bridging and crediting culled gaps.
    fn collect_row(&self, row: &[u32], v: usize, out: &mut Vec<QuadDelegate>) {
        out.clear();
        let mut spans: Vec<Span> = Vec::new();
        let mut u = 0;
        while u < row.len() {
            let cell = row[u];
            if cell == EMPTY {
                u += 1;
                continue;
            }
            let lo = u;
            while u < row.len() && row[u] == cell {
                u += 1;
            }
            let span = Span { lo, hi: u, cell };

            if self.settings.greedier_rows
                && !span.is_culled()
                && let [.., run, gap] = spans.as_slice()
                && gap.is_culled()
                && run.cell == span.cell
                && run.hi == gap.lo
                && gap.hi == span.lo
                && gap.len() <= self.settings.greedier_culling_limit
            {
                spans.pop();
                if let Some(run) = spans.last_mut() {
                    run.hi = span.hi;
                }
                continue;
            }
            spans.push(span);
        }

        for (i, span) in spans.iter().enumerate() {
            if span.is_culled() {
                continue;
            }
            let left = i
                .checked_sub(1)
                .map(|g| gap_credit(&spans, g, span.lo, GapSide::Right))
                .unwrap_or(0);
            let right = gap_credit(&spans, i + 1, span.hi, GapSide::Left);
            out.push(QuadDelegate {
                vis_lo: span.lo,
                vis_hi: span.hi,
                lo: span.lo - left,
                hi: span.hi + right,
                sprite: span.cell,
                v_start: v,
                height: 1,
            });
        }
    }

    fn can_merge(&self, open: &QuadDelegate, candidate: &QuadDelegate) -> bool {
        if open.sprite != candidate.sprite {
            return false;
        }
        if self.settings.greedier_merge {
            let union_lo = open.vis_lo.min(candidate.vis_lo);
            let union_hi = open.vis_hi.max(candidate.vis_hi);
            let inter_lo = open.lo.max(candidate.lo);
            let inter_hi = open.hi.min(candidate.hi);
            inter_lo <= union_lo && union_hi <= inter_hi
        } else {
            open.vis_lo == candidate.vis_lo && open.vis_hi == candidate.vis_hi
        }
    }
}

/// Which side of a culled gap a run sits on.
#[derive(Clone, Copy, PartialEq, Eq)]
enum GapSide {
    /// The run ends where the gap starts.
    Left,
    /// The run starts where the gap ends.
    Right,
}

/// Culled cells credited to the run touching `spans[gap]` at `edge`.
///
/// A gap shared by two runs is split with the odd cell going to the left
/// run; a gap touching a single run goes entirely to it.
fn gap_credit(spans: &[Span], gap: usize, edge: usize, side: GapSide) -> usize {
    let Some(g) = spans.get(gap).filter(|g| g.is_culled()) else {
        return 0;
    };
    let touches = match side {
        GapSide::Left => g.lo == edge,
        GapSide::Right => g.hi == edge,
    };
    if !touches {
        return 0;
    }
    let other = match side {
        GapSide::Left => spans.get(gap + 1).filter(|s| !s.is_culled() && s.lo == g.hi),
        GapSide::Right => gap
            .checked_sub(1)
            .and_then(|i| spans.get(i))
            .filter(|s| !s.is_culled() && s.hi == g.lo),
    };
    match (other, side) {
        (None, _) => g.len(),
        (Some(_), GapSide::Left) => g.len().div_ceil(2),
        (Some(_), GapSide::Right) => g.len() / 2,
    }
}

fn merge(open: &QuadDelegate, candidate: &QuadDelegate) -> QuadDelegate {
    QuadDelegate {
        vis_lo: open.vis_lo.min(candidate.vis_lo),
        vis_hi: open.vis_hi.max(candidate.vis_hi),
        lo: open.lo.max(candidate.lo),
        hi: open.hi.min(candidate.hi),
        sprite: open.sprite,
        v_start: open.v_start,
        height: open.height + 1,
    }
}

/// Appends one quad as two triangles wound counter-clockwise seen from
/// outside. UVs count voxels so the sprite tiles once per covered voxel.
fn emit_quad(
    face: Face,
    layer: usize,
    quad: &QuadDelegate,
    stride: usize,
    origin: IVec3,
    sprites: &BlockSprites,
    out: &mut Vec<ChunkVertex>,
) {
    let (l_axis, u_axis, v_axis) = face.sweep_axes();
    let s = stride as f32;
    let depth = (layer + usize::from(face.is_positive())) as f32 * s;
    let origin = origin.as_vec3().to_array();
    let (u0, v0) = (quad.lo as f32 * s, quad.v_start as f32 * s);
    let (w, h) = ((quad.hi - quad.lo) as f32 * s, quad.height as f32 * s);

    let corner = |du: f32, dv: f32| -> ([f32; 3], [f32; 2]) {
        let mut p = [0.0_f32; 3];
        p[l_axis] = depth;
        p[u_axis] = u0 + du;
        p[v_axis] = v0 + dv;
        (
            [p[0] + origin[0], p[1] + origin[1], p[2] + origin[2]],
            [du, dv],
        )
    };
    let (c00, c10, c11, c01) = (corner(0.0, 0.0), corner(w, 0.0), corner(w, h), corner(0.0, h));

    let mut u_unit = IVec3::ZERO.to_array();
    let mut v_unit = IVec3::ZERO.to_array();
    u_unit[u_axis] = 1;
    v_unit[v_axis] = 1;
    let ccw = IVec3::from_array(u_unit)
        .cross(IVec3::from_array(v_unit))
        .dot(face.offset())
        > 0;
    let order = if ccw {
        [c00, c10, c11, c00, c11, c01]
    } else {
        [c00, c11, c10, c00, c01, c11]
    };

    let sprite_rect = sprites.rect(SpriteId(quad.sprite)).to_array();
    out.extend(order.map(|(position, uv)| ChunkVertex {
        position,
        uv,
        sprite_rect,
    }));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lattice_voxel::{Block, BlockType, Chunk, ChunkPos, Direction};
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::emitter::VERTICES_PER_QUAD;
    use crate::sprites::{SpriteAtlas, SpriteLookup};

    const STONE: BlockType = BlockType(1);
    const DIRT: BlockType = BlockType(2);
    const CLAY: BlockType = BlockType(3);

    fn sprites() -> BlockSprites {
        let atlas = Arc::new(SpriteAtlas::grid(
            &["missing", "stone", "dirt", "clay", "moss_top", "moss_side"],
            4,
        ));
        BlockSprites::new(atlas, SpriteId(0))
            .with_named(STONE, "stone")
            .with_named(DIRT, "dirt")
            .with_named(CLAY, "clay")
            .with_moss(CLAY, "moss_top", "moss_side")
    }

    fn view_of(chunks: Vec<Chunk>) -> WorldView {
        let map: FxHashMap<ChunkPos, Arc<Chunk>> =
            chunks.into_iter().map(|c| (c.pos(), Arc::new(c))).collect();
        WorldView::capture(ChunkPos::default(), Direction::NONE, |p| map.get(&p).cloned())
    }

    fn chunk_with(blocks: &[([usize; 3], BlockType)]) -> Chunk {
        let mut chunk = Chunk::new(ChunkPos::default());
        for &([x, y, z], t) in blocks {
            chunk.set(x, y, z, Block::new(t));
        }
        chunk
    }

    fn mesh(view: &WorldView, settings: MesherSettings) -> MeshEmitterSet {
        let mut faces = ChunkFaceBuffer::new(CHUNK_SIZE);
        let mut out = MeshEmitterSet::new();
        GreedyMesher::new(settings).emit_chunk(view, &sprites(), &mut faces, &mut out);
        out
    }

    /// Axis-aligned extent of the quads in a vertex list: (min, max).
    fn bounds(vertices: &[ChunkVertex]) -> ([f32; 3], [f32; 3]) {
        let mut lo = [f32::MAX; 3];
        let mut hi = [f32::MIN; 3];
        for v in vertices {
            for a in 0..3 {
                lo[a] = lo[a].min(v.position[a]);
                hi[a] = hi[a].max(v.position[a]);
            }
        }
        (lo, hi)
    }

    fn plane_quads(
        chunk: Chunk,
        face: Face,
        layer: usize,
        settings: MesherSettings,
    ) -> Vec<ChunkVertex> {
        let view = view_of(vec![chunk]);
        let sprites = sprites();
        let mesher = GreedyMesher::new(settings);
        let mut faces = ChunkFaceBuffer::new(CHUNK_SIZE);
        mesher.emit_level(&view, &sprites, 1, &mut faces);
        let mut out = Vec::new();
        let count = mesher.emit_plane(&faces, face, layer, 1, IVec3::ZERO, &sprites, &mut out);
        assert_eq!(count * VERTICES_PER_QUAD, out.len());
        out
    }

    #[test]
    fn test_single_voxel_emits_six_unit_quads() {
        let view = view_of(vec![chunk_with(&[([5, 5, 5], STONE)])]);
        let out = mesh(&view, MesherSettings::default());
        for face in Face::ALL {
            assert_eq!(out.quad_count(face.index()), 1, "{face:?}");
            let (lo, hi) = bounds(out.face(face));
            let extent: Vec<f32> = (0..3).map(|a| hi[a] - lo[a]).collect();
            let mut sorted = extent.clone();
            sorted.sort_by(f32::total_cmp);
            assert_eq!(sorted, vec![0.0, 1.0, 1.0], "{face:?} extent {extent:?}");
        }
        // Odd coordinates are never sampled at stride 2.
        assert!(out.generic().is_empty());
    }

    #[test]
    fn test_face_positions_sit_on_voxel_boundary() {
        let view = view_of(vec![chunk_with(&[([5, 5, 5], STONE)])]);
        let out = mesh(&view, MesherSettings::default());
        let (lo, hi) = bounds(out.face(Face::Up));
        assert_eq!(lo, [5.0, 6.0, 5.0]);
        assert_eq!(hi, [6.0, 6.0, 6.0]);
        let (lo, hi) = bounds(out.face(Face::West));
        assert_eq!(lo, [5.0, 5.0, 5.0]);
        assert_eq!(hi, [5.0, 6.0, 6.0]);
    }

    #[test]
    fn test_quads_face_outwards() {
        let view = view_of(vec![chunk_with(&[([5, 5, 5], STONE)])]);
        let out = mesh(&view, MesherSettings::default());
        for face in Face::ALL {
            let tri = &out.face(face)[0..3];
            let p = |i: usize| glam::Vec3::from_array(tri[i].position);
            let normal = (p(1) - p(0)).cross(p(2) - p(0)).normalize();
            assert_eq!(normal, face.offset().as_vec3(), "{face:?}");
        }
    }

    #[test]
    fn test_run_merges_along_its_length() {
        let blocks: Vec<_> = (3..8).map(|x| ([x, 4, 4], STONE)).collect();
        let view = view_of(vec![chunk_with(&blocks)]);
        let out = mesh(&view, MesherSettings::default());

        assert_eq!(out.quad_count(Face::West.index()), 1);
        assert_eq!(out.quad_count(Face::East.index()), 1);
        for face in [Face::Down, Face::Up, Face::North, Face::South] {
            assert_eq!(out.quad_count(face.index()), 1, "{face:?}");
            let (lo, hi) = bounds(out.face(face));
            assert_eq!((lo[0], hi[0]), (3.0, 8.0), "{face:?}");
        }
        let max_u = out.face(Face::Up).iter().map(|v| v.uv[0]).fold(0.0, f32::max);
        assert_eq!(max_u, 5.0);
    }

    #[test]
    fn test_run_without_merge_emits_per_voxel_when_sprites_alternate() {
        let blocks: Vec<_> = (0..4)
            .map(|x| ([x, 0, 0], if x % 2 == 0 { STONE } else { DIRT }))
            .collect();
        let view = view_of(vec![chunk_with(&blocks)]);
        let out = mesh(&view, MesherSettings::default());
        assert_eq!(out.quad_count(Face::Up.index()), 4);
        assert_eq!(out.quad_count(Face::West.index()), 1);
    }

    /// Up plane, layer 0, row z = 0 reads `[A, CULLED, A]`.
    fn gap_row() -> Chunk {
        chunk_with(&[
            ([0, 0, 0], STONE),
            ([1, 0, 0], STONE),
            ([2, 0, 0], STONE),
            ([1, 1, 0], STONE),
        ])
    }

    #[test]
    fn test_greedier_rows_bridges_culled_gap() {
        let settings = MesherSettings {
            greedier_rows: true,
            greedier_merge: false,
            greedier_culling_limit: 32,
        };
        let quads = plane_quads(gap_row(), Face::Up, 0, settings);
        assert_eq!(quads.len(), VERTICES_PER_QUAD);
        let (lo, hi) = bounds(&quads);
        assert_eq!((lo[0], hi[0]), (0.0, 3.0));
    }

    #[test]
    fn test_gap_without_greedier_rows_splits() {
        let settings = MesherSettings {
            greedier_rows: false,
            greedier_merge: false,
            greedier_culling_limit: 32,
        };
        let quads = plane_quads(gap_row(), Face::Up, 0, settings);
        assert_eq!(quads.len(), 2 * VERTICES_PER_QUAD);
        // The odd culled cell is credited to the left run.
        let (lo, hi) = bounds(&quads[..VERTICES_PER_QUAD]);
        assert_eq!((lo[0], hi[0]), (0.0, 2.0));
        let (lo, hi) = bounds(&quads[VERTICES_PER_QUAD..]);
        assert_eq!((lo[0], hi[0]), (2.0, 3.0));
    }

    #[test]
    fn test_gap_longer_than_limit_is_not_bridged() {
        let settings = MesherSettings {
            greedier_rows: true,
            greedier_merge: false,
            greedier_culling_limit: 0,
        };
        let quads = plane_quads(gap_row(), Face::Up, 0, settings);
        assert_eq!(quads.len(), 2 * VERTICES_PER_QUAD);
    }

    #[test]
    fn test_gap_between_different_sprites_is_not_bridged() {
        let chunk = chunk_with(&[
            ([0, 0, 0], STONE),
            ([1, 0, 0], STONE),
            ([2, 0, 0], DIRT),
            ([1, 1, 0], STONE),
        ]);
        let quads = plane_quads(chunk, Face::Up, 0, MesherSettings::default());
        assert_eq!(quads.len(), 2 * VERTICES_PER_QUAD);
    }

    /// Row z = 0 is `[A, A, A]`, row z = 1 is `[CULLED, A, CULLED]`.
    fn narrowing_rows() -> Chunk {
        chunk_with(&[
            ([0, 0, 0], STONE),
            ([1, 0, 0], STONE),
            ([2, 0, 0], STONE),
            ([0, 0, 1], STONE),
            ([1, 0, 1], STONE),
            ([2, 0, 1], STONE),
            ([0, 1, 1], STONE),
            ([2, 1, 1], STONE),
        ])
    }

    #[test]
    fn test_greedier_merge_joins_rows_within_windows() {
        let quads = plane_quads(narrowing_rows(), Face::Up, 0, MesherSettings::default());
        assert_eq!(quads.len(), VERTICES_PER_QUAD);
        let (lo, hi) = bounds(&quads);
        assert_eq!((lo[0], hi[0], lo[2], hi[2]), (0.0, 3.0, 0.0, 2.0));
    }

    #[test]
    fn test_exact_merge_keeps_differing_rows_apart() {
        let settings = MesherSettings {
            greedier_merge: false,
            ..MesherSettings::default()
        };
        let quads = plane_quads(narrowing_rows(), Face::Up, 0, settings);
        assert_eq!(quads.len(), 2 * VERTICES_PER_QUAD);
    }

    #[test]
    fn test_greedier_merge_requires_window_to_cover_union() {
        // Row z = 1 is `[CULLED, A, EMPTY]`: its window stops short of u = 3.
        let chunk = chunk_with(&[
            ([0, 0, 0], STONE),
            ([1, 0, 0], STONE),
            ([2, 0, 0], STONE),
            ([0, 0, 1], STONE),
            ([1, 0, 1], STONE),
            ([0, 1, 1], STONE),
        ]);
        let quads = plane_quads(chunk, Face::Up, 0, MesherSettings::default());
        assert_eq!(quads.len(), 2 * VERTICES_PER_QUAD);
    }

    #[test]
    fn test_slab_meshes_to_single_quads() {
        let mut chunk = Chunk::new(ChunkPos::default());
        chunk.fill_box([0, 0, 0], [32, 1, 32], Block::new(STONE));
        let view = view_of(vec![chunk]);
        let out = mesh(&view, MesherSettings::default());

        assert_eq!(out.quad_count(Face::Up.index()), 1);
        assert_eq!(out.quad_count(Face::Down.index()), 1);
        let (lo, hi) = bounds(out.face(Face::Up));
        assert_eq!(lo, [0.0, 1.0, 0.0]);
        assert_eq!(hi, [32.0, 1.0, 32.0]);
        for face in [Face::West, Face::East, Face::North, Face::South] {
            assert_eq!(out.quad_count(face.index()), 1, "{face:?}");
            let (lo, hi) = bounds(out.face(face));
            assert_eq!((lo[1], hi[1]), (0.0, 1.0), "{face:?}");
        }
    }

    #[test]
    fn test_air_chunk_yields_empty_set() {
        let view = view_of(vec![Chunk::new(ChunkPos::default())]);
        assert!(mesh(&view, MesherSettings::default()).is_empty());

        let mut touched = Chunk::new(ChunkPos::default());
        touched.set(0, 0, 0, Block::AIR);
        let view = view_of(vec![touched]);
        assert!(mesh(&view, MesherSettings::default()).is_empty());
    }

    #[test]
    fn test_enclosed_chunk_yields_empty_set() {
        let mut chunks = Vec::new();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let mut chunk = Chunk::new(ChunkPos::new(dx, dy, dz));
                    chunk.fill_box([0, 0, 0], [32, 32, 32], Block::new(STONE));
                    chunks.push(chunk);
                }
            }
        }
        let view = view_of(chunks);
        assert!(!view.failed());
        assert!(mesh(&view, MesherSettings::default()).is_empty());
    }

    #[test]
    fn test_solid_chunk_alone_emits_one_quad_per_face_at_both_levels() {
        let mut chunk = Chunk::new(ChunkPos::default());
        chunk.fill_box([0, 0, 0], [32, 32, 32], Block::new(STONE));
        let out = mesh(&view_of(vec![chunk]), MesherSettings::default());
        for face in Face::ALL {
            assert_eq!(out.quad_count(face.index()), 1);
        }
        assert_eq!(out.quad_count(GENERIC_STREAM), 6);
        let (lo, hi) = bounds(out.generic());
        assert_eq!(lo, [0.0, 0.0, 0.0]);
        assert_eq!(hi, [32.0, 32.0, 32.0]);
    }

    #[test]
    fn test_lod_quads_scale_by_stride() {
        let view = view_of(vec![chunk_with(&[([4, 4, 4], STONE)])]);
        let out = mesh(&view, MesherSettings::default());
        assert_eq!(out.quad_count(GENERIC_STREAM), 6);
        let (lo, hi) = bounds(out.generic());
        assert_eq!(lo, [4.0, 4.0, 4.0]);
        assert_eq!(hi, [6.0, 6.0, 6.0]);
        let max_uv = out.generic().iter().map(|v| v.uv[0].max(v.uv[1])).fold(0.0, f32::max);
        assert_eq!(max_uv, 2.0);
    }

    #[test]
    fn test_neighbour_chunk_culls_border_face() {
        let center = chunk_with(&[([31, 0, 0], STONE)]);
        let mut east = Chunk::new(ChunkPos::new(1, 0, 0));
        east.set(0, 0, 0, Block::new(STONE));
        let out = mesh(&view_of(vec![center, east]), MesherSettings::default());
        assert!(out.face(Face::East).is_empty());
        assert_eq!(out.quad_count(Face::West.index()), 1);
    }

    #[test]
    fn test_chunk_origin_offsets_vertices() {
        let pos = ChunkPos::new(1, -1, 2);
        let mut chunk = Chunk::new(pos);
        chunk.set(0, 0, 0, Block::new(STONE));
        let map: FxHashMap<ChunkPos, Arc<Chunk>> = [(pos, Arc::new(chunk))].into_iter().collect();
        let view = WorldView::capture(pos, Direction::NONE, |p| map.get(&p).cloned());
        let out = mesh(&view, MesherSettings::default());
        let (lo, _) = bounds(out.face(Face::Down));
        assert_eq!(lo, [32.0, -32.0, 64.0]);
    }

    #[test]
    fn test_clay_under_air_uses_moss_sprites() {
        let view = view_of(vec![chunk_with(&[([0, 0, 0], CLAY), ([5, 0, 0], CLAY), ([5, 1, 0], STONE)])]);
        let out = mesh(&view, MesherSettings::default());

        let atlas = SpriteAtlas::grid(
            &["missing", "stone", "dirt", "clay", "moss_top", "moss_side"],
            4,
        );
        let rect_of = |name: &str| {
            atlas.baked_sprite(atlas.sprite_index(name).expect("sprite")).to_array()
        };
        let up_rects: Vec<[f32; 4]> = out.face(Face::Up).iter().map(|v| v.sprite_rect).collect();
        assert!(up_rects.contains(&rect_of("moss_top")));
        assert!(up_rects.contains(&rect_of("stone")));
        assert!(!up_rects.contains(&rect_of("clay")));

        let west: Vec<[f32; 4]> = out.face(Face::West).iter().map(|v| v.sprite_rect).collect();
        assert!(west.contains(&rect_of("moss_side")));
        assert!(west.contains(&rect_of("clay")));

        assert!(out.face(Face::Down).iter().all(|v| v.sprite_rect == rect_of("clay")));
    }
}
