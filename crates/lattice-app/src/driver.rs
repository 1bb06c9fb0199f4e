//! Frame loop tying the world, the mesh pool and the renderer together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use lattice_config::Config;
use lattice_mesh::{BlockSprites, ChunkRenderPool, MesherSettings, MeshSink, PoolSettings};
use lattice_render::{
    Camera, DrawStats, FrameDeferQueue, HeadlessFactory, HeadlessQueries, HeadlessRecorder,
    RendererSettings, WorldRenderer,
};
use lattice_voxel::{Block, ChunkPos, StreamStats, World, WorldGenerator, WorldSettings};

/// What happened during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub stream: StreamStats,
    /// Views handed to the mesh pool.
    pub enqueued: usize,
    /// Meshes uploaded by `prepare`.
    pub uploaded: usize,
    pub draw: DrawStats,
    pub loaded: usize,
}

pub fn world_settings(config: &Config) -> WorldSettings {
    WorldSettings {
        min_chunk_y: config.world.min_chunk_y,
        max_chunk_y: config.world.max_chunk_y,
        max_generation_in_flight: config.world.max_generation_in_flight,
        generation_threads: config.world.generation_threads,
    }
}

pub fn pool_settings(config: &Config) -> PoolSettings {
    PoolSettings {
        workers: config.meshing.worker_threads,
        queue_capacity: config.meshing.queue_capacity,
        starvation_warning: Duration::from_millis(config.meshing.starvation_warning_ms),
        mesher: MesherSettings {
            greedier_rows: config.meshing.greedier_rows,
            greedier_merge: config.meshing.greedier_merge,
            greedier_culling_limit: config.meshing.greedier_culling_limit,
        },
    }
}

pub fn renderer_settings(config: &Config) -> RendererSettings {
    RendererSettings {
        occlusion_culling: config.render.occlusion_culling,
        lod_distance: config.render.lod_distance,
    }
}

/// Owns the pipeline and runs it against the headless backend.
pub struct Driver {
    world: World,
    generator: Arc<dyn WorldGenerator>,
    pool: ChunkRenderPool,
    renderer: WorldRenderer<HeadlessFactory>,
    defer: Arc<FrameDeferQueue>,
    recorder: HeadlessRecorder,
    queries: HeadlessQueries,
    render_distance: u32,
}

impl Driver {
    pub fn new(config: &Config, generator: Arc<dyn WorldGenerator>, sprites: Arc<BlockSprites>) -> Self {
        let defer = Arc::new(FrameDeferQueue::new(config.render.frames_in_flight));
        let renderer = WorldRenderer::new(HeadlessFactory::new(), renderer_settings(config), defer.clone());
        let sink: Arc<dyn MeshSink> = Arc::new(renderer.submitter());
        let pool = ChunkRenderPool::new(pool_settings(config), sprites, sink);
        Self {
            world: World::new(world_settings(config)),
            generator,
            pool,
            renderer,
            defer,
            recorder: HeadlessRecorder::new(),
            queries: HeadlessQueries::new(),
            render_distance: config.world.render_distance,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn renderer(&self) -> &WorldRenderer<HeadlessFactory> {
        &self.renderer
    }

    /// Streams around the camera, remeshes dirty chunks and draws.
    pub fn frame(&mut self, camera: &Camera) -> FrameStats {
        let origin = ChunkPos::from_world(camera.position);
        let stream = self
            .world
            .update(&self.generator, origin, self.render_distance as i32);

        let pool = &self.pool;
        let mut enqueued = 0;
        self.world.consume_updates(|view, important| {
            if pool.enqueue(view, important) {
                enqueued += 1;
            }
        });

        self.renderer.erase_outside(origin, self.render_distance);
        let uploaded = self.renderer.prepare();
        self.recorder.clear();
        let draw = self.renderer.draw(camera, &mut self.recorder, &self.queries);
        self.defer.end_frame();

        FrameStats {
            stream,
            enqueued,
            uploaded,
            draw,
            loaded: self.world.loaded_count(),
        }
    }

    /// Removes the first solid block along the camera's view ray.
    pub fn dig(&self, camera: &Camera, reach: f32) -> Option<glam::IVec3> {
        let hit = self.world.raycast(camera.position, camera.forward(), reach)?;
        match self.world.set_block(hit.hit.x, hit.hit.y, hit.hit.z, Block::AIR) {
            Ok(()) => Some(hit.hit),
            Err(e) => {
                tracing::debug!("dig failed: {e}");
                None
            }
        }
    }

    /// Runs frames until nothing is generating, queued or awaiting upload.
    /// Returns `false` on timeout.
    pub fn settle(&mut self, camera: &Camera, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            let stats = self.frame(camera);
            let idle = stats.stream.dispatched == 0
                && stats.uploaded == 0
                && self.world.generation_in_flight() == 0
                && self.world.pending_updates() == 0
                && self.pool.queued_len() == 0;
            if idle {
                // One more frame catches meshes still inside a worker.
                std::thread::sleep(Duration::from_millis(20));
                if self.frame(camera).uploaded == 0 {
                    return true;
                }
            }
            if start.elapsed() > timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// Stops the workers and releases every buffer.
    pub fn shutdown(mut self) {
        self.pool.close();
        self.renderer.close();
        let flushed = self.defer.flush();
        tracing::info!(flushed, "driver shut down");
    }
}

/// Camera path: a straight flight along +x at a fixed height, looking ahead
/// and down.
pub fn flight_camera(frame: u32, speed: f32, height: f32) -> Camera {
    let position = Vec3::new(frame as f32 * speed, height, 0.0);
    Camera::looking_at(position, position + Vec3::new(32.0, -16.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::block_sprites;
    use lattice_voxel::FlatGenerator;

    fn config() -> Config {
        let mut config = Config::default();
        config.world.render_distance = 2;
        config.world.min_chunk_y = -1;
        config.world.max_chunk_y = 0;
        config.world.generation_threads = 2;
        config.world.max_generation_in_flight = 64;
        config.meshing.worker_threads = 2;
        config.render.occlusion_culling = false;
        config
    }

    fn flat() -> Arc<dyn WorldGenerator> {
        Arc::new(FlatGenerator {
            surface_y: 0,
            block: Block::new(crate::terrain::STONE),
        })
    }

    #[test]
    fn test_flat_world_settles_and_draws() {
        let mut driver = Driver::new(&config(), flat(), block_sprites());
        let camera = Camera::looking_at(Vec3::new(16.0, 16.0, 16.0), Vec3::new(16.0, -16.0, 48.0));
        assert!(driver.settle(&camera, Duration::from_secs(20)), "pipeline never settled");

        // Radius 2 sphere around (0, 0, 0) clipped to y in -1..=0: both layers
        // out to dx² + dz² = 2, then only y = 0 on the four axis columns at 2.
        assert_eq!(driver.world().loaded_count(), 22);
        let stats = driver.frame(&camera);
        assert!(stats.draw.drawn > 0);
        assert_eq!(stats.draw.promoted, 0);
        assert!(driver.renderer().chunk(ChunkPos::new(0, -1, 0)).is_some());
        driver.shutdown();
    }

    #[test]
    fn test_dig_remeshes_chunk() {
        let mut driver = Driver::new(&config(), flat(), block_sprites());
        let camera = Camera::looking_at(Vec3::new(16.5, 10.0, 16.5), Vec3::new(16.5, -10.0, 16.6));
        assert!(driver.settle(&camera, Duration::from_secs(20)));
        let pos = ChunkPos::new(0, -1, 0);
        let before = driver.renderer().chunk(pos).map(|c| c.stamp).expect("meshed");

        let hit = driver.dig(&camera, 64.0).expect("ground below");
        assert_eq!(hit.y, -1);
        assert!(driver.world().get_block(hit.x, hit.y, hit.z).expect("loaded").is_air());
        assert!(driver.settle(&camera, Duration::from_secs(20)));
        let after = driver.renderer().chunk(pos).map(|c| c.stamp).expect("remeshed");
        assert!(after > before);
        driver.shutdown();
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = Config::default();
        config.meshing.greedier_culling_limit = 4;
        config.meshing.starvation_warning_ms = 250;
        config.render.lod_distance = 0;
        let pool = pool_settings(&config);
        assert_eq!(pool.mesher.greedier_culling_limit, 4);
        assert_eq!(pool.starvation_warning, Duration::from_millis(250));
        assert_eq!(renderer_settings(&config).lod_distance, 0);
        assert_eq!(world_settings(&config).max_chunk_y, 8);
    }

    #[test]
    fn test_flight_camera_moves_forward() {
        let a = flight_camera(0, 2.0, 40.0);
        let b = flight_camera(10, 2.0, 40.0);
        assert_eq!(b.position.x - a.position.x, 20.0);
        assert!(a.forward().x > 0.0 && a.forward().y < 0.0);
    }
}
