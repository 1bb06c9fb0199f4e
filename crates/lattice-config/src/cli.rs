//! Command-line overrides.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Headless lattice driver.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "lattice", about = "Streams, meshes and culls a voxel world headlessly")]
pub struct CliArgs {
    /// Streaming radius in chunks.
    #[arg(long)]
    pub render_distance: Option<u32>,

    /// Mesh worker threads (0 = one per logical CPU).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace) or a full filter.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Frames to run before exiting.
    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    /// Config directory (overrides the platform default).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Applies CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(distance) = args.render_distance {
            self.world.render_distance = distance;
        }
        if let Some(workers) = args.workers {
            self.meshing.worker_threads = workers;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
