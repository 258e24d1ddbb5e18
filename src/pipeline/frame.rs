//! Frame loading module
//!
//! Readers for the two input shapes the rig produces: raw FITS frames from
//! the capture camera, and already-encoded images dropped into the watched
//! folder by hand.

mod fits_reader;
mod loader;
mod reader;
pub mod types;

pub use fits_reader::FitsFrameReader;
pub use loader::{SensorLoader, StandardSensorLoader};
pub use reader::FrameReader;
pub use types::{BayerFrame, SensorImage};
