//! BMP decoder: uncompressed 24/32-bit bitmaps.
//!
//! Header fields are read at fixed offsets of the 54-byte file + info header.
//! Pixels keep the container's BGR(A) order and row order; normalization is
//! left to the upload stage.

use corelib::{DecodeError, DecodeResult};

use crate::texture::{ChannelOrder, RawImage, le_u16, le_u32, packed_len};

pub const MAGIC: &[u8; 2] = b"BM";
pub const HEADER_SIZE: usize = 54;

const DATA_OFFSET_AT: usize = 0x0A;
const WIDTH_AT: usize = 0x12;
const HEIGHT_AT: usize = 0x16;
const BITS_PER_PIXEL_AT: usize = 0x1C;
const IMAGE_SIZE_AT: usize = 0x22;

/// Decode an in-memory BMP file.
///
/// Zeroed size/offset fields are common in the wild and are patched rather
/// than rejected: a zero image size becomes `width * height * bpp`, a zero
/// data offset becomes [`HEADER_SIZE`].
pub fn decode_bitmap(bytes: &[u8]) -> DecodeResult<RawImage> {
    let header: &[u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(DecodeError::TruncatedHeader {
            needed: HEADER_SIZE,
            available: bytes.len(),
        })?;

    if &header[..2] != MAGIC {
        return Err(DecodeError::BadMagic);
    }

    let mut data_offset = le_u32(header, DATA_OFFSET_AT) as usize;
    let mut payload_size = le_u32(header, IMAGE_SIZE_AT) as usize;
    let width = le_u32(header, WIDTH_AT);
    let height = le_u32(header, HEIGHT_AT);

    let channel_order = match le_u16(header, BITS_PER_PIXEL_AT) {
        0 | 24 => ChannelOrder::Bgr,
        32 => ChannelOrder::Bgra,
        bits => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "{bits} bits per pixel"
            )));
        }
    };
    let bpp = channel_order.bytes_per_pixel();
    let packed = packed_len(width, height, bpp)
        .ok_or(DecodeError::InvalidDimensions { width, height })?;

    if payload_size == 0 {
        payload_size = packed;
    }
    if data_offset == 0 {
        data_offset = HEADER_SIZE;
    }

    let payload = match data_offset.checked_add(payload_size) {
        Some(end) if end <= bytes.len() => &bytes[data_offset..end],
        _ => {
            return Err(DecodeError::TruncatedPayload {
                needed: data_offset.saturating_add(payload_size),
                available: bytes.len(),
            });
        }
    };

    let row_bytes = width as usize * bpp;
    let stride = row_bytes.next_multiple_of(4);
    let padded = stride.checked_mul(height as usize);

    let pixels = match padded {
        Some(padded) if stride != row_bytes && payload.len() >= padded => {
            strip_row_padding(&payload[..padded], row_bytes, stride)
        }
        _ if payload.len() >= packed => payload[..packed].to_vec(),
        _ => {
            return Err(DecodeError::TruncatedPayload {
                needed: packed,
                available: payload.len(),
            });
        }
    };

    Ok(RawImage {
        width,
        height,
        channel_order,
        pixels,
    })
}

fn strip_row_padding(payload: &[u8], row_bytes: usize, stride: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(payload.len() / stride * row_bytes);
    for row in payload.chunks_exact(stride) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal BMP: header fields as given, `payload` appended at byte 54.
    fn bmp_bytes(
        offset: u32,
        size: u32,
        width: u32,
        height: u32,
        bits: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        out[0..2].copy_from_slice(MAGIC);
        out[DATA_OFFSET_AT..DATA_OFFSET_AT + 4].copy_from_slice(&offset.to_le_bytes());
        out[WIDTH_AT..WIDTH_AT + 4].copy_from_slice(&width.to_le_bytes());
        out[HEIGHT_AT..HEIGHT_AT + 4].copy_from_slice(&height.to_le_bytes());
        out[BITS_PER_PIXEL_AT..BITS_PER_PIXEL_AT + 2].copy_from_slice(&bits.to_le_bytes());
        out[IMAGE_SIZE_AT..IMAGE_SIZE_AT + 4].copy_from_slice(&size.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn decode_two_by_two() {
        let payload: Vec<u8> = (1..=12).collect();
        let img = decode_bitmap(&bmp_bytes(54, 12, 2, 2, 0, &payload)).unwrap();
        assert_eq!(img.width, 2);
        assert_eq!(img.height, 2);
        assert_eq!(img.channel_order, ChannelOrder::Bgr);
        assert_eq!(img.pixels, payload);
    }

    #[test]
    fn zeroed_size_and_offset_fall_back() {
        let payload: Vec<u8> = (0..3 * 4 * 3).map(|b| b as u8).collect();
        let img = decode_bitmap(&bmp_bytes(0, 0, 4, 3, 24, &payload)).unwrap();
        assert_eq!(img.pixels.len(), 4 * 3 * 3);
        assert_eq!(img.pixels, payload);
    }

    #[test]
    fn pixel_count_matches_dimensions() {
        for (w, h) in [(1, 1), (2, 3), (4, 4), (7, 5), (16, 9)] {
            let len = (w * h * 3) as usize;
            let payload = vec![0xAB; len];
            for (offset, size) in [(54, len as u32), (0, 0), (54, 0), (0, len as u32)] {
                let img = decode_bitmap(&bmp_bytes(offset, size, w, h, 24, &payload)).unwrap();
                assert_eq!(img.pixels.len(), len, "{w}x{h} offset={offset} size={size}");
                assert!(img.is_valid());
            }
        }
    }

    #[test]
    fn padded_rows_are_stripped() {
        // 3 px * 3 bytes = 9 per row, stored with a 12-byte stride.
        let mut payload = Vec::new();
        for row in 0..2u8 {
            payload.extend((0..9).map(|i| row * 10 + i));
            payload.extend([0xEE; 3]);
        }
        let img = decode_bitmap(&bmp_bytes(54, 24, 3, 2, 24, &payload)).unwrap();
        assert_eq!(img.pixels.len(), 18);
        assert!(!img.pixels.contains(&0xEE));
        assert_eq!(&img.pixels[9..12], &[10, 11, 12]);
    }

    #[test]
    fn data_offset_is_honoured() {
        let mut payload = vec![0xFF; 10]; // gap between header and pixels
        payload.extend([1, 2, 3, 4]);
        let img = decode_bitmap(&bmp_bytes(64, 4, 1, 1, 32, &payload)).unwrap();
        assert_eq!(img.channel_order, ChannelOrder::Bgra);
        assert_eq!(img.pixels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_header_is_truncated_header() {
        let bytes = bmp_bytes(54, 12, 2, 2, 24, &[0; 12]);
        assert_eq!(
            decode_bitmap(&bytes[..53]),
            Err(DecodeError::TruncatedHeader {
                needed: 54,
                available: 53
            })
        );
        assert!(matches!(
            decode_bitmap(&[]),
            Err(DecodeError::TruncatedHeader { .. })
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = bmp_bytes(54, 12, 2, 2, 24, &[0; 12]);
        bytes[1] = b'N';
        assert_eq!(decode_bitmap(&bytes), Err(DecodeError::BadMagic));
    }

    #[test]
    fn missing_pixels_are_truncated_payload() {
        let bytes = bmp_bytes(54, 12, 2, 2, 24, &[0; 8]);
        assert_eq!(
            decode_bitmap(&bytes),
            Err(DecodeError::TruncatedPayload {
                needed: 66,
                available: 62
            })
        );
        // Offset beyond the file.
        let bytes = bmp_bytes(4096, 12, 2, 2, 24, &[0; 12]);
        assert!(matches!(
            decode_bitmap(&bytes),
            Err(DecodeError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn declared_size_smaller_than_image_is_truncated_payload() {
        let bytes = bmp_bytes(54, 4, 2, 2, 24, &[0; 12]);
        assert_eq!(
            decode_bitmap(&bytes),
            Err(DecodeError::TruncatedPayload {
                needed: 12,
                available: 4
            })
        );
    }

    #[test]
    fn degenerate_headers() {
        let bytes = bmp_bytes(54, 0, 0, 2, 24, &[]);
        assert_eq!(
            decode_bitmap(&bytes),
            Err(DecodeError::InvalidDimensions {
                width: 0,
                height: 2
            })
        );
        let bytes = bmp_bytes(54, 4, 2, 2, 8, &[0; 4]);
        assert!(matches!(
            decode_bitmap(&bytes),
            Err(DecodeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn matches_reference_encoder() {
        use std::io::Cursor;

        let (w, h) = (4u32, 3u32);
        let src = image::RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([x as u8 * 40, y as u8 * 80, 7])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(src.clone())
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Bmp)
            .unwrap();

        let img = decode_bitmap(&bytes).unwrap();
        assert_eq!((img.width, img.height), (w, h));
        assert_eq!(img.channel_order, ChannelOrder::Bgr);

        // BMP rows are stored bottom-up.
        let rgba = img.to_rgba8();
        for y in 0..h {
            for x in 0..w {
                let at = ((y * w + x) * 4) as usize;
                let expected = src.get_pixel(x, h - 1 - y).0;
                assert_eq!(&rgba.pixels[at..at + 3], &expected, "pixel ({x},{y})");
            }
        }
    }
}
