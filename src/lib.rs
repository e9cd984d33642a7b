//! # geostamp
//!
//! HTTP service that embeds GPS coordinates into image EXIF metadata.
//! Post an image and a coordinate; get back a JPEG whose GPS tags any
//! EXIF-aware viewer can read.
//!
//! ## Quick Start
//!
//! The library entry point is [`pipeline::geotag_image`], a pure
//! bytes-to-bytes transform:
//!
//! ```rust,no_run
//! use geostamp::pipeline::geotag_image;
//!
//! fn main() -> anyhow::Result<()> {
//!     let input = std::fs::read("photo.png")?;
//!
//!     // Googleplex, with a caption
//!     let tagged = geotag_image(&input, 37.4219999, -122.0840575, Some("office"))?;
//!
//!     std::fs::write("photo-tagged.jpg", tagged)?;
//!     Ok(())
//! }
//! ```
//!
//! Any input format the codec supports (JPEG, PNG, WebP) works; output is
//! always an RGB JPEG. Existing metadata — orientation, camera make/model,
//! timestamps, even an embedded thumbnail — is carried over untouched; only
//! the GPS tags (and optionally the image description) are written.
//!
//! ## Running the service
//!
//! The `geostamp` binary serves the pipeline over HTTP:
//!
//! ```text
//! geostamp --init                 # write a default config.json
//! geostamp --config config.json   # serve (default 127.0.0.1:8080)
//! ```
//!
//! `POST /v1/geotag` takes `{"image_base64", "latitude", "longitude",
//! "annotation"?}` and answers with a base64 data URI;
//! `POST /v1/geotag/binary` takes raw image bytes plus query parameters and
//! answers with an `image/jpeg` attachment.
//!
//! ## Modules
//!
//! - [`coord`] — decimal degrees ↔ EXIF DMS rationals
//! - [`exif`] — metadata directory model, TIFF parsing and serialization
//! - [`pipeline`] — the end-to-end geotag transform
//! - [`config`] — service configuration
//! - [`web`] — tide HTTP front end
//! - [`error`] — typed failure kinds

pub mod config;
pub mod coord;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod web;
