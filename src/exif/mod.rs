//! EXIF metadata directory model, parsing, and serialization.
//!
//! The directory is a closed model of the four standard IFDs
//! (`0th`, `Exif`, `GPS`, `1st`); [`reader::parse`] decodes a raw TIFF block
//! into it and [`writer::serialize`] turns it back into bytes. GPS tags are
//! merged with [`writer::merge_gps`].

pub mod directory;
pub mod reader;
pub mod writer;

pub use directory::{ExifDirectory, TagValue};
pub use reader::parse;
pub use writer::{merge_gps, serialize, MAX_EXIF_BYTES};
