//! Headless lattice driver: a noise terrain generator, the block palette and
//! a frame loop running world streaming, meshing and culling together.

pub mod driver;
pub mod palette;
pub mod terrain;

pub use driver::{Driver, FrameStats, flight_camera};
