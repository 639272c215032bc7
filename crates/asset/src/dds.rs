//! DDS decoder for DXT1/DXT3/DXT5 payloads with an embedded mip chain.

use corelib::{DecodeError, DecodeResult};

use crate::texture::{BlockFormat, CompressedImage, MipLevel, le_u32};

pub const MAGIC: &[u8; 4] = b"DDS ";
/// Size of the structured header that follows the magic.
pub const HEADER_SIZE: usize = 124;

// Offsets relative to the start of the header (after the magic).
const HEIGHT_AT: usize = 8;
const WIDTH_AT: usize = 12;
const LINEAR_SIZE_AT: usize = 16;
const MIP_COUNT_AT: usize = 24;
const FOURCC_AT: usize = 80;

/// Decode an in-memory DDS file.
///
/// The payload window is `linearSize * 2` bytes when the file declares more
/// than one mip level and `linearSize` otherwise. That window is an upper
/// bound: each level's exact size comes from the block formula, and every
/// level is bounds-checked before it is recorded.
pub fn decode_compressed(bytes: &[u8]) -> DecodeResult<CompressedImage> {
    if bytes.len() < MAGIC.len() {
        return Err(DecodeError::TruncatedHeader {
            needed: MAGIC.len(),
            available: bytes.len(),
        });
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::BadMagic);
    }

    let payload_start = MAGIC.len() + HEADER_SIZE;
    let header: &[u8; HEADER_SIZE] = bytes
        .get(MAGIC.len()..payload_start)
        .and_then(|h| h.try_into().ok())
        .ok_or(DecodeError::TruncatedHeader {
            needed: payload_start,
            available: bytes.len(),
        })?;

    let height = le_u32(header, HEIGHT_AT);
    let width = le_u32(header, WIDTH_AT);
    let fourcc = le_u32(header, FOURCC_AT);

    let block_format = BlockFormat::from_fourcc(fourcc)
        .ok_or_else(|| DecodeError::UnsupportedFormat(describe_fourcc(fourcc)))?;

    let base_size = match block_format.level_size(width, height) {
        Some(size) if width > 0 && height > 0 => size,
        _ => return Err(DecodeError::InvalidDimensions { width, height }),
    };

    // Writers that omit DDSD_MIPMAPCOUNT / DDSD_LINEARSIZE leave these zeroed.
    let mip_count = le_u32(header, MIP_COUNT_AT).max(1);
    let linear_size = match le_u32(header, LINEAR_SIZE_AT) {
        0 => base_size,
        n => n as usize,
    };

    let reserved = if mip_count > 1 {
        linear_size.saturating_mul(2)
    } else {
        linear_size
    };

    let body = &bytes[payload_start..];
    if body.len() < linear_size {
        return Err(DecodeError::TruncatedPayload {
            needed: linear_size,
            available: body.len(),
        });
    }
    let window = &body[..reserved.min(body.len())];
    let source_is_short = window.len() < reserved;

    let mut mip_levels = Vec::new();
    let (mut w, mut h) = (width, height);
    let mut offset = 0usize;

    for level in 0..mip_count {
        let size = block_format
            .level_size(w, h)
            .ok_or(DecodeError::InvalidDimensions { width, height })?;
        let end = offset.saturating_add(size);
        if end > window.len() {
            return Err(if source_is_short {
                DecodeError::TruncatedPayload {
                    needed: end,
                    available: window.len(),
                }
            } else {
                DecodeError::CorruptMipChain {
                    level,
                    end,
                    len: window.len(),
                }
            });
        }

        mip_levels.push(MipLevel {
            width: w,
            height: h,
            offset,
            size,
        });
        offset = end;

        if w == 1 && h == 1 {
            break;
        }
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }

    Ok(CompressedImage {
        width,
        height,
        block_format,
        mip_levels,
        data: window[..offset].to_vec(),
    })
}

fn describe_fourcc(code: u32) -> String {
    let raw = code.to_le_bytes();
    if raw.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        format!("FourCC '{}'", String::from_utf8_lossy(&raw))
    } else {
        format!("FourCC {code:#010x}")
    }
}
