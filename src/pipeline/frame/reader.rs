use std::path::Path;

use crate::pipeline::common::error::Result;
use crate::pipeline::frame::types::BayerFrame;

pub trait FrameReader {
    fn read_frame(&self, path: &Path) -> Result<BayerFrame>;
}
