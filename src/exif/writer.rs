use crate::coord;

use super::directory::{
    ExifDirectory, TagValue, TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER, TAG_GPS_LATITUDE,
    TAG_GPS_LATITUDE_REF, TAG_GPS_LONGITUDE, TAG_GPS_LONGITUDE_REF, TAG_IMAGE_DESCRIPTION,
    TAG_THUMBNAIL_LENGTH, TAG_THUMBNAIL_OFFSET,
};

/// Largest TIFF payload that fits a JPEG APP1 segment:
/// 65535 (max segment length) − 2 (length field) − 6 (`Exif\0\0`).
pub const MAX_EXIF_BYTES: usize = 65_527;

/// Write GPS coordinates (and an optional annotation) into the directory.
///
/// The GPS IFD is replaced outright — after the merge it holds exactly the
/// four required tags (latitude ref, latitude, longitude ref, longitude), so
/// stale coordinates or altitude from a previous tagging never survive next
/// to the new position. All other IFDs are left untouched except for the
/// annotation, which goes into ImageDescription in the 0th IFD.
pub fn merge_gps(dir: &mut ExifDirectory, latitude: f64, longitude: f64, annotation: Option<&str>) {
    let (lat, lat_sign) = coord::to_dms(latitude);
    let (lon, lon_sign) = coord::to_dms(longitude);

    dir.gps.clear();
    dir.gps.insert(
        TAG_GPS_LATITUDE_REF,
        TagValue::Ascii(lat_sign.latitude_ref().to_string()),
    );
    dir.gps
        .insert(TAG_GPS_LATITUDE, TagValue::Rational(lat.rationals().to_vec()));
    dir.gps.insert(
        TAG_GPS_LONGITUDE_REF,
        TagValue::Ascii(lon_sign.longitude_ref().to_string()),
    );
    dir.gps
        .insert(TAG_GPS_LONGITUDE, TagValue::Rational(lon.rationals().to_vec()));

    if let Some(text) = annotation {
        // ASCII tag values are NUL-terminated on the wire, so an interior
        // NUL would silently truncate the annotation on the next read.
        let clean: String = text.chars().filter(|&c| c != '\0').collect();
        dir.zeroth
            .insert(TAG_IMAGE_DESCRIPTION, TagValue::Ascii(clean));
    }
}

/// A fully-resolved IFD entry ready to be written.
struct RawEntry {
    tag_id: u16,
    format: u16,
    count: u32,
    payload: Vec<u8>,
}

impl RawEntry {
    fn from_tag(tag_id: u16, value: &TagValue) -> Self {
        Self {
            tag_id,
            format: value.format(),
            count: value.count(),
            payload: value.payload(),
        }
    }

    fn pointer(tag_id: u16, offset: u32) -> Self {
        Self {
            tag_id,
            format: 4, // LONG
            count: 1,
            payload: offset.to_le_bytes().to_vec(),
        }
    }

    /// Bytes this entry adds beyond its 12-byte slot.
    fn outline_len(&self) -> usize {
        if self.payload.len() > 4 {
            self.payload.len()
        } else {
            0
        }
    }
}

/// Serialize a directory into a little-endian TIFF block suitable for a JPEG
/// APP1 EXIF segment.
///
/// Deterministic: entries are emitted in ascending tag order and sub-IFDs in
/// a fixed sequence (0th, Exif, GPS, 1st, thumbnail), so equal directories
/// produce identical bytes. `parse(serialize(d)) == d` holds for any
/// directory this crate produces.
pub fn serialize(dir: &ExifDirectory) -> Vec<u8> {
    let has_exif = !dir.exif.is_empty();
    let has_gps = !dir.gps.is_empty();
    let has_first = !dir.first.is_empty() || dir.thumbnail.is_some();

    // Sizes first: the 0th IFD needs the sub-IFD offsets before it can be
    // written, and the 1st IFD needs the thumbnail offset.
    let entry_slots = |tags: &std::collections::BTreeMap<u16, TagValue>, extra: usize| {
        tags.len() + extra
    };
    let outline = |tags: &std::collections::BTreeMap<u16, TagValue>| -> usize {
        tags.values()
            .map(|v| {
                let len = v.payload().len();
                if len > 4 { len } else { 0 }
            })
            .sum()
    };
    let ifd_size = |slots: usize, outline_bytes: usize| 2 + slots * 12 + 4 + outline_bytes;

    let zeroth_slots = entry_slots(&dir.zeroth, has_exif as usize + has_gps as usize);
    let zeroth_size = ifd_size(zeroth_slots, outline(&dir.zeroth));

    let exif_offset = 8 + zeroth_size as u32;
    let exif_size = if has_exif {
        ifd_size(dir.exif.len(), outline(&dir.exif))
    } else {
        0
    };

    let gps_offset = exif_offset + exif_size as u32;
    let gps_size = if has_gps {
        ifd_size(dir.gps.len(), outline(&dir.gps))
    } else {
        0
    };

    let first_offset = gps_offset + gps_size as u32;
    let thumb_slots = if dir.thumbnail.is_some() { 2 } else { 0 };
    let first_size = if has_first {
        ifd_size(entry_slots(&dir.first, thumb_slots), outline(&dir.first))
    } else {
        0
    };
    let thumb_offset = first_offset + first_size as u32;

    // TIFF header
    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    // 0th IFD, with pointer entries merged into tag order
    let mut zeroth_entries: Vec<RawEntry> = dir
        .zeroth
        .iter()
        .map(|(&tag, value)| RawEntry::from_tag(tag, value))
        .collect();
    if has_exif {
        zeroth_entries.push(RawEntry::pointer(TAG_EXIF_IFD_POINTER, exif_offset));
    }
    if has_gps {
        zeroth_entries.push(RawEntry::pointer(TAG_GPS_IFD_POINTER, gps_offset));
    }
    zeroth_entries.sort_by_key(|e| e.tag_id);
    let next_ifd = if has_first { first_offset } else { 0 };
    write_ifd(&mut out, 8, &zeroth_entries, next_ifd);

    if has_exif {
        let entries: Vec<RawEntry> = dir
            .exif
            .iter()
            .map(|(&tag, value)| RawEntry::from_tag(tag, value))
            .collect();
        write_ifd(&mut out, exif_offset, &entries, 0);
    }

    if has_gps {
        let entries: Vec<RawEntry> = dir
            .gps
            .iter()
            .map(|(&tag, value)| RawEntry::from_tag(tag, value))
            .collect();
        write_ifd(&mut out, gps_offset, &entries, 0);
    }

    if has_first {
        let mut entries: Vec<RawEntry> = dir
            .first
            .iter()
            .map(|(&tag, value)| RawEntry::from_tag(tag, value))
            .collect();
        if let Some(ref thumb) = dir.thumbnail {
            entries.push(RawEntry::pointer(TAG_THUMBNAIL_OFFSET, thumb_offset));
            entries.push(RawEntry::pointer(TAG_THUMBNAIL_LENGTH, thumb.len() as u32));
        }
        entries.sort_by_key(|e| e.tag_id);
        write_ifd(&mut out, first_offset, &entries, 0);

        if let Some(ref thumb) = dir.thumbnail {
            out.extend_from_slice(thumb);
        }
    }

    out
}

/// Append one IFD (entry table, next-IFD pointer, out-of-line data) to the
/// buffer. `ifd_offset` is where this IFD starts; the caller's size planning
/// must already have placed the write cursor there.
fn write_ifd(out: &mut Vec<u8>, ifd_offset: u32, entries: &[RawEntry], next_ifd: u32) {
    debug_assert_eq!(out.len(), ifd_offset as usize);

    let mut data_offset = ifd_offset + 2 + entries.len() as u32 * 12 + 4;
    let mut outline: Vec<u8> = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag_id.to_le_bytes());
        out.extend_from_slice(&entry.format.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.payload.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.payload.len()].copy_from_slice(&entry.payload);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&data_offset.to_le_bytes());
            outline.extend_from_slice(&entry.payload);
            data_offset += entry.payload.len() as u32;
        }
    }
    out.extend_from_slice(&next_ifd.to_le_bytes());
    out.extend_from_slice(&outline);
}
