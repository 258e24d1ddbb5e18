//! Post-processing for a slit-spectrograph capture rig.
//!
//! Watches the capture directory for new sensor frames and derives two
//! artifacts per frame: a color JPEG preview with a ratio-preserving asinh
//! tone curve, and a wavelength-calibrated spectral trace rendered as a PNG
//! plot. See [`pipeline`] for the transforms and [`watch`] for the polling
//! scheduler that drives them.

pub mod logger;
pub mod pipeline;
pub mod watch;
