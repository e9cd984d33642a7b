use anyhow::{bail, Result};
use std::collections::BTreeMap;

use super::directory::{
    ExifDirectory, TagValue, TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER, TAG_INTEROP_IFD_POINTER,
    TAG_THUMBNAIL_LENGTH, TAG_THUMBNAIL_OFFSET,
};

/// Parse a raw TIFF block (the EXIF payload after `Exif\0\0`) into an
/// [`ExifDirectory`].
///
/// Accepts both byte orders. Errors mean the block is corrupt or foreign;
/// callers are expected to recover with a fresh directory rather than
/// propagate (metadata corruption must not block geotagging the pixels).
pub fn parse(tiff: &[u8]) -> Result<ExifDirectory> {
    if tiff.len() < 8 {
        bail!("TIFF data too short ({} bytes)", tiff.len());
    }

    let big_endian = match &tiff[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => bail!("invalid TIFF byte order marker"),
    };

    let read_u16 = |offset: usize| -> u16 {
        if big_endian {
            u16::from_be_bytes([tiff[offset], tiff[offset + 1]])
        } else {
            u16::from_le_bytes([tiff[offset], tiff[offset + 1]])
        }
    };
    let read_u32 = |offset: usize| -> u32 {
        let b = [tiff[offset], tiff[offset + 1], tiff[offset + 2], tiff[offset + 3]];
        if big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        }
    };

    if read_u16(2) != 42 {
        bail!("invalid TIFF magic number");
    }

    let ifd0_offset = read_u32(4) as usize;
    let (mut zeroth, first_offset) = read_ifd(tiff, ifd0_offset, big_endian)?;

    let mut dir = ExifDirectory::new();

    // Sub-IFD pointers are structural, not content: follow them, then drop
    // them from the maps (serialization rebuilds them).
    if let Some(offset) = zeroth
        .remove(&TAG_EXIF_IFD_POINTER)
        .as_ref()
        .and_then(pointer_value)
    {
        let (mut exif, _) = read_ifd(tiff, offset as usize, big_endian)?;
        // The interop pointer would dangle without its IFD; not carried.
        exif.remove(&TAG_INTEROP_IFD_POINTER);
        dir.exif = exif;
    }
    if let Some(offset) = zeroth
        .remove(&TAG_GPS_IFD_POINTER)
        .as_ref()
        .and_then(pointer_value)
    {
        let (gps, _) = read_ifd(tiff, offset as usize, big_endian)?;
        dir.gps = gps;
    }
    zeroth.remove(&TAG_INTEROP_IFD_POINTER);
    dir.zeroth = zeroth;

    if first_offset != 0 {
        let (mut first, _) = read_ifd(tiff, first_offset as usize, big_endian)?;

        // Resolve the compressed-thumbnail pointer pair into owned bytes so
        // the thumbnail survives re-serialization at a new offset.
        let offset = first
            .remove(&TAG_THUMBNAIL_OFFSET)
            .as_ref()
            .and_then(pointer_value);
        let length = first
            .remove(&TAG_THUMBNAIL_LENGTH)
            .as_ref()
            .and_then(pointer_value);
        if let (Some(offset), Some(length)) = (offset, length) {
            let start = offset as usize;
            let end = start + length as usize;
            if end <= tiff.len() {
                dir.thumbnail = Some(tiff[start..end].to_vec());
            } else {
                log::debug!("thumbnail pointer out of bounds ({start}..{end}), dropping");
            }
        }
        dir.first = first;
    }

    Ok(dir)
}

/// Read one IFD's entry table, returning its tag map and the next-IFD offset.
fn read_ifd(
    tiff: &[u8],
    offset: usize,
    big_endian: bool,
) -> Result<(BTreeMap<u16, TagValue>, u32)> {
    let read_u16 = |offset: usize| -> u16 {
        if big_endian {
            u16::from_be_bytes([tiff[offset], tiff[offset + 1]])
        } else {
            u16::from_le_bytes([tiff[offset], tiff[offset + 1]])
        }
    };
    let read_u32 = |offset: usize| -> u32 {
        let b = [tiff[offset], tiff[offset + 1], tiff[offset + 2], tiff[offset + 3]];
        if big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        }
    };

    if offset + 2 > tiff.len() {
        bail!("IFD offset {offset} out of bounds");
    }
    let entry_count = read_u16(offset) as usize;
    let entries_start = offset + 2;
    let entries_end = entries_start + entry_count * 12;
    if entries_end + 4 > tiff.len() {
        bail!("IFD at {offset} extends beyond TIFF data");
    }

    let mut tags = BTreeMap::new();
    for i in 0..entry_count {
        let entry = entries_start + i * 12;
        let tag_id = read_u16(entry);
        let format = read_u16(entry + 2);
        let count = read_u32(entry + 4) as usize;

        let component_size = match format {
            1 | 2 | 7 => 1,
            3 => 2,
            4 => 4,
            5 | 10 => 8,
            other => {
                log::debug!("skipping tag 0x{tag_id:04X} with unsupported format {other}");
                continue;
            }
        };
        let total = count
            .checked_mul(component_size)
            .ok_or_else(|| anyhow::anyhow!("tag 0x{tag_id:04X} count overflows"))?;

        let data_start = if total <= 4 {
            entry + 8
        } else {
            let data_offset = read_u32(entry + 8) as usize;
            if data_offset + total > tiff.len() {
                bail!("tag 0x{tag_id:04X} value out of bounds");
            }
            data_offset
        };
        let data = &tiff[data_start..data_start + total];

        let value = match format {
            1 => TagValue::Byte(data.to_vec()),
            2 => {
                let trimmed: &[u8] = match data.iter().position(|&b| b == 0) {
                    Some(nul) => &data[..nul],
                    None => data,
                };
                TagValue::Ascii(String::from_utf8_lossy(trimmed).into_owned())
            }
            3 => TagValue::Short((0..count).map(|n| read_u16(data_start + n * 2)).collect()),
            4 => TagValue::Long((0..count).map(|n| read_u32(data_start + n * 4)).collect()),
            5 => TagValue::Rational(
                (0..count)
                    .map(|n| (read_u32(data_start + n * 8), read_u32(data_start + n * 8 + 4)))
                    .collect(),
            ),
            7 => TagValue::Undefined(data.to_vec()),
            10 => TagValue::SRational(
                (0..count)
                    .map(|n| {
                        (
                            read_u32(data_start + n * 8) as i32,
                            read_u32(data_start + n * 8 + 4) as i32,
                        )
                    })
                    .collect(),
            ),
            _ => unreachable!(),
        };
        tags.insert(tag_id, value);
    }

    Ok((tags, read_u32(entries_end)))
}

/// Extract a sub-IFD or thumbnail offset from a pointer tag value.
fn pointer_value(value: &TagValue) -> Option<u32> {
    match value {
        TagValue::Long(v) => v.first().copied(),
        TagValue::Short(v) => v.first().copied().map(u32::from),
        _ => None,
    }
}
