use std::collections::BTreeMap;

// GPS IFD tag IDs
pub const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;

// 0th IFD tag IDs
pub const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
pub const TAG_GPS_IFD_POINTER: u16 = 0x8825;
pub const TAG_INTEROP_IFD_POINTER: u16 = 0xA005;

// 1st IFD tag IDs (compressed thumbnail location)
pub const TAG_THUMBNAIL_OFFSET: u16 = 0x0201;
pub const TAG_THUMBNAIL_LENGTH: u16 = 0x0202;

/// A single EXIF tag value, covering the TIFF value formats this crate
/// preserves. The format code and payload layout follow TIFF 6.0.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Format 1 — unsigned bytes.
    Byte(Vec<u8>),
    /// Format 2 — NUL-terminated ASCII (terminator added at serialization).
    Ascii(String),
    /// Format 3 — unsigned 16-bit integers.
    Short(Vec<u16>),
    /// Format 4 — unsigned 32-bit integers.
    Long(Vec<u32>),
    /// Format 5 — unsigned rationals as `(numerator, denominator)`.
    Rational(Vec<(u32, u32)>),
    /// Format 7 — opaque bytes.
    Undefined(Vec<u8>),
    /// Format 10 — signed rationals (ExposureBiasValue and friends).
    SRational(Vec<(i32, i32)>),
}

impl TagValue {
    /// TIFF format code for this value.
    pub(crate) fn format(&self) -> u16 {
        match self {
            TagValue::Byte(_) => 1,
            TagValue::Ascii(_) => 2,
            TagValue::Short(_) => 3,
            TagValue::Long(_) => 4,
            TagValue::Rational(_) => 5,
            TagValue::Undefined(_) => 7,
            TagValue::SRational(_) => 10,
        }
    }

    /// TIFF component count for this value.
    pub(crate) fn count(&self) -> u32 {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len() as u32,
            TagValue::Ascii(s) => s.len() as u32 + 1, // NUL terminator
            TagValue::Short(v) => v.len() as u32,
            TagValue::Long(v) => v.len() as u32,
            TagValue::Rational(v) => v.len() as u32,
            TagValue::SRational(v) => v.len() as u32,
        }
    }

    /// Little-endian payload bytes for this value.
    pub(crate) fn payload(&self) -> Vec<u8> {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.clone(),
            TagValue::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                bytes
            }
            TagValue::Short(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
            TagValue::Long(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
            TagValue::Rational(v) => v
                .iter()
                .flat_map(|(num, den)| {
                    let mut pair = num.to_le_bytes().to_vec();
                    pair.extend_from_slice(&den.to_le_bytes());
                    pair
                })
                .collect(),
            TagValue::SRational(v) => v
                .iter()
                .flat_map(|(num, den)| {
                    let mut pair = num.to_le_bytes().to_vec();
                    pair.extend_from_slice(&den.to_le_bytes());
                    pair
                })
                .collect(),
        }
    }
}

/// Decoded EXIF metadata: the four standard IFDs as tag → value maps, plus
/// the 1st IFD's compressed thumbnail resolved into an owned buffer.
///
/// The sub-IFD pointer tags (0x8769, 0x8825) are never stored here; they are
/// reconstructed from map emptiness at serialization time. Likewise the
/// thumbnail offset/length pair lives in `thumbnail`, not in `first`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifDirectory {
    pub zeroth: BTreeMap<u16, TagValue>,
    pub exif: BTreeMap<u16, TagValue>,
    pub gps: BTreeMap<u16, TagValue>,
    pub first: BTreeMap<u16, TagValue>,
    pub thumbnail: Option<Vec<u8>>,
}

impl ExifDirectory {
    /// Fresh directory with all four IFDs empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.zeroth.is_empty()
            && self.exif.is_empty()
            && self.gps.is_empty()
            && self.first.is_empty()
            && self.thumbnail.is_none()
    }
}
