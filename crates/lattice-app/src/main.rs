//! `lattice` binary: runs the voxel pipeline headlessly for a fixed number of
//! frames and logs what each stage did.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use lattice_app::palette::block_sprites;
use lattice_app::terrain::{HeightmapParams, HeightmapTerrain};
use lattice_app::{Driver, flight_camera};
use lattice_config::{CliArgs, Config, default_config_dir};

/// Blocks the camera advances per frame.
const CAMERA_SPEED: f32 = 2.0;
const CAMERA_HEIGHT: f32 = 48.0;
/// Frames between digs along the view ray.
const DIG_INTERVAL: u32 = 30;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(default_config_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}, using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    let log_file = lattice_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );
    if let Some(path) = log_file {
        tracing::info!(path = %path.display(), "writing JSON log");
    }
    tracing::info!(
        render_distance = config.world.render_distance,
        workers = config.meshing.worker_threads,
        frames = args.frames,
        "starting lattice"
    );

    let generator = Arc::new(HeightmapTerrain::new(HeightmapParams::default()));
    let mut driver = Driver::new(&config, generator, block_sprites());

    let start = Instant::now();
    let mut totals = (0usize, 0usize, 0usize);
    for frame in 0..args.frames {
        let camera = flight_camera(frame, CAMERA_SPEED, CAMERA_HEIGHT);
        let stats = driver.frame(&camera);
        totals.0 += stats.stream.dispatched;
        totals.1 += stats.uploaded;
        totals.2 += stats.draw.draw_calls;

        if frame > 0
            && frame % DIG_INTERVAL == 0
            && let Some(hit) = driver.dig(&camera, 96.0)
        {
            tracing::debug!(frame, ?hit, "dug block");
        }

        tracing::debug!(
            frame,
            loaded = stats.loaded,
            dispatched = stats.stream.dispatched,
            evicted = stats.stream.evicted,
            enqueued = stats.enqueued,
            uploaded = stats.uploaded,
            drawn = stats.draw.drawn,
            draw_calls = stats.draw.draw_calls,
            frustum_culled = stats.draw.frustum_culled,
            occluded = stats.draw.occluded,
            lod = stats.draw.lod,
            "frame"
        );
    }

    tracing::info!(
        frames = args.frames,
        elapsed_ms = start.elapsed().as_millis() as u64,
        generated = totals.0,
        uploaded = totals.1,
        draw_calls = totals.2,
        steady = driver.renderer().steady_len(),
        "run finished"
    );
    driver.shutdown();
    ExitCode::SUCCESS
}
