use thiserror::Error;

pub type RasterResult<T> = Result<T, RasterError>;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Raster task failed: {0}")]
    Task(String),
}
