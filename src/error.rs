use thiserror::Error;

/// Errors from the fallible edges of the editor: file I/O, PNG encode/decode
/// and raster validation. Painting itself never fails.
#[derive(Debug, Error)]
pub enum SkinError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("layer '{layer}' must be 192x192, got {width}x{height}")]
    InvalidSize {
        layer: String,
        width: u32,
        height: u32,
    },

    #[error("unknown layer '{0}'")]
    UnknownLayer(String),
}
