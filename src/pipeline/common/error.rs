use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Watched directory not found: {0}")]
    MissingDirectory(String),

    #[error("No image data in file: {0}")]
    MissingData(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode frame: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Failed to render plot: {0}")]
    PlotError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
