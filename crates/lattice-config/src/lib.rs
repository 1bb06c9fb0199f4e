//! Configuration for the lattice voxel pipeline.
//!
//! Settings persist to disk as RON, tolerate missing or unknown fields, and
//! can be overridden from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, MeshingConfig, RenderConfig, WorldConfig, default_config_dir};
pub use error::ConfigError;
