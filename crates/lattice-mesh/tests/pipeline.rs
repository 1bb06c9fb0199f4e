//! World edits flowing through the mesh pool into a sink.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lattice_mesh::{BlockSprites, ChunkMesh, ChunkRenderPool, MeshSink, PoolSettings, SpriteAtlas, SpriteId};
use lattice_voxel::{Block, BlockType, Chunk, ChunkPos, Direction, Face, World, WorldSettings};

const STONE: BlockType = BlockType(1);

#[derive(Default)]
struct Collector {
    meshes: Mutex<Vec<(ChunkMesh, u64)>>,
}

impl Collector {
    fn wait_for(&self, count: usize) -> Vec<(ChunkMesh, u64)> {
        let start = Instant::now();
        loop {
            {
                let meshes = self.meshes.lock().unwrap();
                if meshes.len() >= count {
                    return meshes.clone();
                }
            }
            assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for meshes");
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl MeshSink for Collector {
    fn submit(&self, mesh: ChunkMesh, stamp: u64) {
        self.meshes.lock().unwrap().push((mesh, stamp));
    }
}

fn sprites() -> Arc<BlockSprites> {
    let atlas = Arc::new(SpriteAtlas::grid(&["missing", "stone"], 2));
    Arc::new(BlockSprites::new(atlas, SpriteId(0)).with_named(STONE, "stone"))
}

fn world() -> World {
    World::new(WorldSettings {
        generation_threads: 1,
        ..Default::default()
    })
}

fn quads(mesh: &ChunkMesh, face: Face) -> usize {
    mesh.face_range(face).len() / 6
}

#[test]
fn test_slab_in_two_by_two_world() {
    let world = world();
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                world.insert_chunk(Chunk::new(ChunkPos::new(x, y, z)));
            }
        }
    }
    for x in 0..32 {
        for z in 0..32 {
            world.set_block(x, 0, z, Block::new(STONE)).unwrap();
        }
    }

    let sink = Arc::new(Collector::default());
    let pool = ChunkRenderPool::new(PoolSettings::default(), sprites(), sink.clone());
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                let view = world.view(ChunkPos::new(x, y, z), Direction::NONE);
                assert!(!view.failed());
                assert!(pool.enqueue(view, false));
            }
        }
    }

    let meshes = sink.wait_for(1);
    std::thread::sleep(Duration::from_millis(50));
    let meshes_after = sink.meshes.lock().unwrap().len();
    assert_eq!(meshes.len(), 1, "only the slab chunk produces geometry");
    assert_eq!(meshes_after, 1);

    let slab = &meshes[0].0;
    assert_eq!(slab.pos, ChunkPos::new(0, 0, 0));
    assert_eq!(quads(slab, Face::Up), 1);
    assert_eq!(quads(slab, Face::Down), 1);
    let up = &slab.vertices[slab.face_range(Face::Up).start as usize..slab.face_range(Face::Up).end as usize];
    let max_x = up.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
    let max_z = up.iter().map(|v| v.position[2]).fold(f32::MIN, f32::max);
    assert_eq!((max_x, max_z), (32.0, 32.0));

    // East and South border the loaded neighbours' air; West, North and Down
    // face unloaded space which reads as air as well.
    for face in [Face::West, Face::East, Face::North, Face::South] {
        assert_eq!(quads(slab, face), 1, "{face:?}");
    }
}

#[test]
fn test_edit_triggers_important_remesh() {
    let world = world();
    for z in -1..=1 {
        for y in -1..=1 {
            for x in -1..=1 {
                let mut chunk = Chunk::new(ChunkPos::new(x, y, z));
                if y < 0 {
                    chunk.fill_box([0, 0, 0], [32, 32, 32], Block::new(STONE));
                }
                world.insert_chunk(chunk);
            }
        }
    }
    world.set_block(4, 0, 4, Block::new(STONE)).unwrap();

    let sink = Arc::new(Collector::default());
    let pool = ChunkRenderPool::new(PoolSettings::default(), sprites(), sink.clone());

    let mut important_seen = None;
    let delivered = world.consume_updates(|view, important| {
        important_seen = Some(important);
        assert!(pool.enqueue(view, important));
    });
    assert_eq!(delivered, 1);
    assert_eq!(important_seen, Some(true));

    let first = sink.wait_for(1);
    let mesh = &first[0].0;
    assert_eq!(mesh.pos, ChunkPos::new(0, 0, 0));
    assert_eq!(quads(mesh, Face::Up), 1);
    assert_eq!(quads(mesh, Face::Down), 0, "stone below culls the bottom face");

    world.set_block(4, 0, 4, Block::AIR).unwrap();
    world.consume_updates(|view, important| {
        assert!(pool.enqueue(view, important));
    });
    let second = sink.wait_for(2);
    let (mesh, stamp) = &second[1];
    assert!(mesh.is_empty(), "removing the only block clears the mesh");
    assert!(*stamp > second[0].1);
}
