use image::codecs::jpeg::JpegEncoder;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, DynImage, ImageEXIF};

use crate::error::GeotagError;
use crate::exif::{self, ExifDirectory};

/// Quality setting for the re-encoded output JPEG. Fixed so output size and
/// fidelity are stable across requests.
pub const JPEG_QUALITY: u8 = 92;

/// Embed GPS coordinates (and an optional annotation) into an image.
///
/// Full transform, buffer to buffer:
///
/// 1. Extract the existing EXIF block, if any, and parse it — a missing or
///    corrupt block yields a fresh directory instead of an error
/// 2. Merge the four GPS tags (and ImageDescription when annotated)
/// 3. Decode the pixels, normalize to RGB, re-encode as JPEG at
///    [`JPEG_QUALITY`]
/// 4. Attach the serialized EXIF block as the APP1 segment
///
/// Input may be any format the codec supports (JPEG, PNG, WebP, …); output
/// is always JPEG. All-or-nothing: on any error no output bytes exist.
///
/// # Example
///
/// ```rust,no_run
/// let input = std::fs::read("photo.png")?;
/// let tagged = geostamp::pipeline::geotag_image(&input, 37.4219999, -122.0840575, None)?;
/// std::fs::write("photo-tagged.jpg", tagged)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn geotag_image(
    image_bytes: &[u8],
    latitude: f64,
    longitude: f64,
    annotation: Option<&str>,
) -> Result<Vec<u8>, GeotagError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| GeotagError::UnreadableImage(e.to_string()))?;

    let mut dir = extract_directory(image_bytes);
    exif::merge_gps(&mut dir, latitude, longitude, annotation);

    let tiff = exif::serialize(&dir);
    if tiff.len() > exif::MAX_EXIF_BYTES {
        return Err(GeotagError::OversizedAnnotation {
            size: tiff.len(),
            limit: exif::MAX_EXIF_BYTES,
        });
    }

    // Palette, grayscale, and alpha modes all normalize to 3-channel RGB.
    let rgb = decoded.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| GeotagError::EncodeFailure(e.to_string()))?;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded))
        .map_err(|e| GeotagError::EncodeFailure(e.to_string()))?;
    jpeg.set_exif(Some(Bytes::from(tiff)));

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Load the input's metadata directory, or a fresh one.
///
/// Both "no embedded block" and "block fails to parse" land on the fresh
/// directory; corruption in the input metadata is logged, never surfaced.
fn extract_directory(image_bytes: &[u8]) -> ExifDirectory {
    let block = DynImage::from_bytes(Bytes::copy_from_slice(image_bytes))
        .ok()
        .flatten()
        .and_then(|container| container.exif());

    match block {
        None => ExifDirectory::new(),
        Some(tiff) => match exif::parse(&tiff) {
            Ok(dir) => {
                log::debug!(
                    "loaded existing EXIF directory ({} 0th / {} Exif / {} GPS tags)",
                    dir.zeroth.len(),
                    dir.exif.len(),
                    dir.gps.len()
                );
                dir
            }
            Err(e) => {
                log::debug!("existing EXIF block failed to parse, starting fresh: {e}");
                ExifDirectory::new()
            }
        },
    }
}
