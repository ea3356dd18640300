use crate::consts::*;
use zg_core::{Error, Result};

fn channels(format: u32) -> Option<u32> {
    let count = match format {
        RED | RED_INTEGER | ALPHA | LUMINANCE | DEPTH_COMPONENT => 1,
        RG | RG_INTEGER | LUMINANCE_ALPHA => 2,
        RGB | RGB_INTEGER => 3,
        RGBA | RGBA_INTEGER => 4,
        _ => return None,
    };
    Some(count)
}

/// Bytes per pixel for a `(format, type)` pair.
pub fn pixel_size(format: u32, ty: u32) -> Result<u32> {
    let unsupported = Error::UnsupportedFormat { format, ty };
    let size = match ty {
        UNSIGNED_SHORT_5_6_5 if format == RGB => 2,
        UNSIGNED_SHORT_4_4_4_4 | UNSIGNED_SHORT_5_5_5_1 if format == RGBA => 2,
        BYTE | UNSIGNED_BYTE => channels(format).ok_or(unsupported)?,
        SHORT | UNSIGNED_SHORT | HALF_FLOAT => channels(format).ok_or(unsupported)? * 2,
        INT | UNSIGNED_INT | FLOAT => channels(format).ok_or(unsupported)? * 4,
        _ => return Err(unsupported),
    };
    Ok(size)
}

/// Byte length of a `width` x `height` image whose rows start on multiples
/// of `alignment` bytes (`UNPACK_ALIGNMENT`). The last row is not padded.
///
/// Negative dimensions count as zero; the driver reports them.
pub fn image_len(width: i32, height: i32, format: u32, ty: u32, alignment: u32) -> Result<u32> {
    let pixel = u64::from(pixel_size(format, ty)?);
    let width = u64::from(width.max(0) as u32);
    let height = u64::from(height.max(0) as u32);
    if width == 0 || height == 0 {
        return Ok(0);
    }
    let row = width * pixel;
    let alignment = u64::from(alignment.max(1));
    let stride = row.div_ceil(alignment) * alignment;
    let len = stride * (height - 1) + row;
    u32::try_from(len).map_err(|_| Error::OutOfRange {
        offset: 0,
        len,
        size: u64::from(u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_byte_sizes_follow_channel_count() {
        assert_eq!(pixel_size(RGBA, UNSIGNED_BYTE).unwrap(), 4);
        assert_eq!(pixel_size(RGB, UNSIGNED_BYTE).unwrap(), 3);
        assert_eq!(pixel_size(LUMINANCE_ALPHA, UNSIGNED_BYTE).unwrap(), 2);
        assert_eq!(pixel_size(RED, UNSIGNED_BYTE).unwrap(), 1);
    }

    #[test]
    fn wide_component_types() {
        assert_eq!(pixel_size(RGBA, FLOAT).unwrap(), 16);
        assert_eq!(pixel_size(RG, HALF_FLOAT).unwrap(), 4);
    }

    #[test]
    fn packed_types_are_two_bytes() {
        assert_eq!(pixel_size(RGB, UNSIGNED_SHORT_5_6_5).unwrap(), 2);
        assert_eq!(pixel_size(RGBA, UNSIGNED_SHORT_4_4_4_4).unwrap(), 2);
        assert!(pixel_size(RGBA, UNSIGNED_SHORT_5_6_5).is_err());
    }

    #[test]
    fn unknown_pairs_are_rejected() {
        assert!(matches!(
            pixel_size(0x1234, UNSIGNED_BYTE),
            Err(Error::UnsupportedFormat {
                format: 0x1234,
                ty: UNSIGNED_BYTE
            })
        ));
        assert!(pixel_size(RGBA, 0x9999).is_err());
    }

    #[test]
    fn image_len_clamps_negative_dimensions() {
        assert_eq!(image_len(2, 3, RGBA, UNSIGNED_BYTE, 4).unwrap(), 24);
        assert_eq!(image_len(-4, 3, RGBA, UNSIGNED_BYTE, 4).unwrap(), 0);
        assert!(image_len(i32::MAX, i32::MAX, RGBA, FLOAT, 4).is_err());
    }

    #[test]
    fn rows_are_padded_to_the_unpack_alignment() {
        // 3 RGB pixels are 9 bytes per row; every row but the last is padded.
        assert_eq!(image_len(3, 2, RGB, UNSIGNED_BYTE, 4).unwrap(), 12 + 9);
        assert_eq!(image_len(3, 2, RGB, UNSIGNED_BYTE, 8).unwrap(), 16 + 9);
        assert_eq!(image_len(3, 2, RGB, UNSIGNED_BYTE, 1).unwrap(), 18);
        assert_eq!(image_len(3, 1, RGB, UNSIGNED_BYTE, 4).unwrap(), 9);
    }
}
