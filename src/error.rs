use thiserror::Error;

/// Failure kinds surfaced by the geotagging pipeline.
///
/// A corrupt pre-existing metadata block is deliberately *not* represented
/// here: the pipeline recovers from it with a fresh directory instead of
/// failing the request (see [`crate::pipeline::geotag_image`]).
#[derive(Debug, Error)]
pub enum GeotagError {
    /// The codec could not decode the input bytes as an image at all.
    #[error("could not decode input image: {0}")]
    UnreadableImage(String),

    /// The merged metadata block does not fit a JPEG APP1 segment; typically
    /// caused by an oversized annotation string. Nothing is written.
    #[error("metadata block of {size} bytes exceeds the {limit}-byte EXIF segment limit")]
    OversizedAnnotation { size: usize, limit: usize },

    /// Re-encoding or re-assembling the output JPEG failed.
    #[error("failed to encode output JPEG: {0}")]
    EncodeFailure(String),

    /// The input payload exceeds the configured size ceiling. Enforced by the
    /// HTTP layer before any decoding starts.
    #[error("payload of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
}
