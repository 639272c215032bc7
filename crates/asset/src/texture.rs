//! Texture data structures shared by the container decoders.
//! Decoded images are CPU-side only; `renderer` turns them into device textures.

use std::path::Path;

use anyhow::{Context, Result};
use corelib::{DecodeError, DecodeResult};

use crate::{bmp, dds};

/// Byte layout of one uncompressed pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Bgr,
    Bgra,
    Rgb,
    Rgba,
}

impl ChannelOrder {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ChannelOrder::Bgr | ChannelOrder::Rgb => 3,
            ChannelOrder::Bgra | ChannelOrder::Rgba => 4,
        }
    }

    pub const fn has_alpha(self) -> bool {
        matches!(self, ChannelOrder::Bgra | ChannelOrder::Rgba)
    }
}

/// Uncompressed pixels, tightly packed, rows in container order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub channel_order: ChannelOrder,
    pub pixels: Vec<u8>,
}

impl RawImage {
    /// Checked constructor: dimensions must be non-zero and `pixels` must hold
    /// exactly `width * height` pixels of `channel_order`.
    pub fn new(
        width: u32,
        height: u32,
        channel_order: ChannelOrder,
        pixels: Vec<u8>,
    ) -> DecodeResult<Self> {
        let expected = packed_len(width, height, channel_order.bytes_per_pixel())
            .ok_or(DecodeError::InvalidDimensions { width, height })?;
        if pixels.len() != expected {
            return Err(DecodeError::TruncatedPayload {
                needed: expected,
                available: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channel_order,
            pixels,
        })
    }

    /// Placeholder texture (checkerboard pattern), RGBA8.
    /// Callers fall back to it when a required asset fails to load.
    pub fn checkerboard(size: u32) -> Self {
        let size = size.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    pixels.extend_from_slice(&[255, 0, 255, 255]);
                } else {
                    pixels.extend_from_slice(&[32, 32, 32, 255]);
                }
            }
        }

        Self {
            width: size,
            height: size,
            channel_order: ChannelOrder::Rgba,
            pixels,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channel_order.bytes_per_pixel()
    }

    /// Check that the pixel buffer matches the declared dimensions.
    pub fn is_valid(&self) -> bool {
        packed_len(self.width, self.height, self.bytes_per_pixel())
            .is_some_and(|len| len == self.pixels.len())
    }

    /// Normalize to RGBA8. Missing alpha becomes opaque.
    pub fn to_rgba8(self) -> RawImage {
        let pixels = match self.channel_order {
            ChannelOrder::Rgba => self.pixels,
            ChannelOrder::Bgra => {
                let mut pixels = self.pixels;
                for px in pixels.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                pixels
            }
            ChannelOrder::Rgb | ChannelOrder::Bgr => {
                let swap = self.channel_order == ChannelOrder::Bgr;
                let mut out = Vec::with_capacity(self.pixels.len() / 3 * 4);
                for px in self.pixels.chunks_exact(3) {
                    let (r, b) = if swap { (px[2], px[0]) } else { (px[0], px[2]) };
                    out.extend_from_slice(&[r, px[1], b, 255]);
                }
                out
            }
        };

        RawImage {
            width: self.width,
            height: self.height,
            channel_order: ChannelOrder::Rgba,
            pixels,
        }
    }

    /// Write the image as PNG (RGBA8) for inspection.
    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let rgba = self.clone().to_rgba8();
        image::save_buffer(
            path,
            &rgba.pixels,
            rgba.width,
            rgba.height,
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("Failed to write PNG {}", path.display()))?;
        log::info!("Wrote {}x{} PNG to {}", rgba.width, rgba.height, path.display());
        Ok(())
    }
}

/// Block-compressed encodings (4x4 texel blocks).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    /// `DXT1`: 8 bytes per block, 1-bit alpha.
    Bc1,
    /// `DXT3`: 16 bytes per block, explicit alpha.
    Bc2,
    /// `DXT5`: 16 bytes per block, interpolated alpha.
    Bc3,
}

impl BlockFormat {
    pub const FOURCC_DXT1: u32 = u32::from_le_bytes(*b"DXT1");
    pub const FOURCC_DXT3: u32 = u32::from_le_bytes(*b"DXT3");
    pub const FOURCC_DXT5: u32 = u32::from_le_bytes(*b"DXT5");

    /// Exact FourCC match; anything else is unsupported.
    pub fn from_fourcc(code: u32) -> Option<Self> {
        match code {
            Self::FOURCC_DXT1 => Some(BlockFormat::Bc1),
            Self::FOURCC_DXT3 => Some(BlockFormat::Bc2),
            Self::FOURCC_DXT5 => Some(BlockFormat::Bc3),
            _ => None,
        }
    }

    pub const fn fourcc(self) -> u32 {
        match self {
            BlockFormat::Bc1 => Self::FOURCC_DXT1,
            BlockFormat::Bc2 => Self::FOURCC_DXT3,
            BlockFormat::Bc3 => Self::FOURCC_DXT5,
        }
    }

    pub const fn block_size(self) -> usize {
        match self {
            BlockFormat::Bc1 => 8,
            BlockFormat::Bc2 | BlockFormat::Bc3 => 16,
        }
    }

    /// Bytes of one level: `ceil(w/4) * ceil(h/4) * block_size`.
    /// `None` on overflow.
    pub fn level_size(self, width: u32, height: u32) -> Option<usize> {
        let blocks_w = width.div_ceil(4) as usize;
        let blocks_h = height.div_ceil(4) as usize;
        blocks_w
            .checked_mul(blocks_h)?
            .checked_mul(self.block_size())
    }
}

/// One level of a mip chain, addressed inside `CompressedImage::data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub offset: usize,
    pub size: usize,
}

impl MipLevel {
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// Block-compressed payload with its precomputed mip chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedImage {
    pub width: u32,
    pub height: u32,
    pub block_format: BlockFormat,
    /// Base level first, smallest last.
    pub mip_levels: Vec<MipLevel>,
    pub data: Vec<u8>,
}

impl CompressedImage {
    pub fn mip_count(&self) -> u32 {
        self.mip_levels.len() as u32
    }

    /// Bytes of the given level, if it exists.
    pub fn level_bytes(&self, level: usize) -> Option<&[u8]> {
        let mip = self.mip_levels.get(level)?;
        self.data.get(mip.byte_range())
    }
}

/// Output of either decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedImage {
    Raw(RawImage),
    Compressed(CompressedImage),
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DecodedImage::Raw(img) => (img.width, img.height),
            DecodedImage::Compressed(img) => (img.width, img.height),
        }
    }
}

impl From<RawImage> for DecodedImage {
    fn from(img: RawImage) -> Self {
        DecodedImage::Raw(img)
    }
}

impl From<CompressedImage> for DecodedImage {
    fn from(img: CompressedImage) -> Self {
        DecodedImage::Compressed(img)
    }
}

/// Decode a texture container, picking the decoder from its magic bytes.
pub fn decode_texture(bytes: &[u8]) -> DecodeResult<DecodedImage> {
    if bytes.starts_with(dds::MAGIC) {
        return dds::decode_compressed(bytes).map(DecodedImage::Compressed);
    }
    if bytes.starts_with(bmp::MAGIC) {
        return bmp::decode_bitmap(bytes).map(DecodedImage::Raw);
    }
    if bytes.len() < bmp::MAGIC.len() {
        return Err(DecodeError::TruncatedHeader {
            needed: bmp::MAGIC.len(),
            available: bytes.len(),
        });
    }
    Err(DecodeError::BadMagic)
}

/// Read a texture file and decode it.
pub fn load_texture_from_path(path: impl AsRef<Path>) -> Result<DecodedImage> {
    let path = path.as_ref();
    log::info!("Loading texture from {}", path.display());

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read texture file: {}", path.display()))?;
    let image = decode_texture(&bytes)
        .with_context(|| format!("Failed to decode texture: {}", path.display()))?;

    match &image {
        DecodedImage::Raw(img) => log::info!(
            "Decoded bitmap {}x{} {:?} ({} bytes)",
            img.width,
            img.height,
            img.channel_order,
            img.pixels.len()
        ),
        DecodedImage::Compressed(img) => log::info!(
            "Decoded {:?} {}x{} with {} mip levels ({} bytes)",
            img.block_format,
            img.width,
            img.height,
            img.mip_count(),
            img.data.len()
        ),
    }

    Ok(image)
}

/// `width * height * bpp`, or `None` for empty or overflowing dimensions.
pub(crate) fn packed_len(width: u32, height: u32, bpp: usize) -> Option<usize> {
    if width == 0 || height == 0 {
        return None;
    }
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(bpp)
}

pub(crate) fn le_u16<const N: usize>(header: &[u8; N], at: usize) -> u16 {
    u16::from_le_bytes([header[at], header[at + 1]])
}

pub(crate) fn le_u32<const N: usize>(header: &[u8; N], at: usize) -> u32 {
    u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_is_valid_rgba() {
        let tex = RawImage::checkerboard(16);
        assert!(tex.is_valid());
        assert_eq!(tex.channel_order, ChannelOrder::Rgba);
        assert_eq!(tex.pixels.len(), 16 * 16 * 4);
        // (0,0) and (8,0) land on different squares.
        assert_ne!(tex.pixels[0..4], tex.pixels[8 * 4..8 * 4 + 4]);
    }

    #[test]
    fn checked_constructor_rejects_short_buffers() {
        assert!(RawImage::new(2, 2, ChannelOrder::Bgr, vec![0; 12]).is_ok());
        assert_eq!(
            RawImage::new(2, 2, ChannelOrder::Bgr, vec![0; 11]),
            Err(DecodeError::TruncatedPayload {
                needed: 12,
                available: 11
            })
        );
        assert_eq!(
            RawImage::new(0, 2, ChannelOrder::Rgb, Vec::new()),
            Err(DecodeError::InvalidDimensions {
                width: 0,
                height: 2
            })
        );
    }

    #[test]
    fn bgr_normalizes_to_opaque_rgba() {
        let img = RawImage::new(2, 1, ChannelOrder::Bgr, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let rgba = img.to_rgba8();
        assert_eq!(rgba.channel_order, ChannelOrder::Rgba);
        assert_eq!(rgba.pixels, vec![3, 2, 1, 255, 6, 5, 4, 255]);
        assert!(rgba.is_valid());
    }

    #[test]
    fn bgra_normalization_keeps_alpha() {
        let img = RawImage::new(1, 1, ChannelOrder::Bgra, vec![10, 20, 30, 40]).unwrap();
        assert_eq!(img.to_rgba8().pixels, vec![30, 20, 10, 40]);
    }

    #[test]
    fn fourcc_codes_match_ascii() {
        assert_eq!(BlockFormat::FOURCC_DXT1, 0x3154_5844);
        assert_eq!(BlockFormat::FOURCC_DXT3, 0x3354_5844);
        assert_eq!(BlockFormat::FOURCC_DXT5, 0x3554_5844);
        assert_eq!(BlockFormat::from_fourcc(0x3154_5844), Some(BlockFormat::Bc1));
        assert_eq!(BlockFormat::from_fourcc(u32::from_le_bytes(*b"DXT2")), None);
        assert_eq!(BlockFormat::Bc3.fourcc(), BlockFormat::FOURCC_DXT5);
    }

    #[test]
    fn level_size_rounds_up_to_blocks() {
        assert_eq!(BlockFormat::Bc1.level_size(4, 4), Some(8));
        assert_eq!(BlockFormat::Bc1.level_size(1, 1), Some(8));
        assert_eq!(BlockFormat::Bc3.level_size(5, 4), Some(32));
        assert_eq!(BlockFormat::Bc2.level_size(256, 256), Some(64 * 64 * 16));
    }

    #[test]
    fn decode_texture_dispatches_on_magic() {
        assert_eq!(
            decode_texture(b"B"),
            Err(DecodeError::TruncatedHeader {
                needed: 2,
                available: 1
            })
        );
        assert_eq!(decode_texture(b"PNG\0\0\0"), Err(DecodeError::BadMagic));
        // Right magic, short header: the specific decoder reports it.
        assert!(matches!(
            decode_texture(b"BM\0\0"),
            Err(DecodeError::TruncatedHeader { needed: 54, .. })
        ));
        assert!(matches!(
            decode_texture(b"DDS \0\0"),
            Err(DecodeError::TruncatedHeader { needed: 128, .. })
        ));
    }

    #[test]
    fn load_and_dump_roundtrip_through_files() {
        let dir = std::env::temp_dir().join(format!("texkit-asset-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut bmp = vec![0u8; 54];
        bmp[0..2].copy_from_slice(b"BM");
        bmp[0x12..0x16].copy_from_slice(&1u32.to_le_bytes());
        bmp[0x16..0x1A].copy_from_slice(&1u32.to_le_bytes());
        bmp.extend_from_slice(&[0, 0, 255]); // red, stored BGR
        let src = dir.join("red.bmp");
        std::fs::write(&src, &bmp).unwrap();

        let DecodedImage::Raw(img) = load_texture_from_path(&src).unwrap() else {
            panic!("expected a raw image");
        };
        assert_eq!(img.pixels, vec![0, 0, 255]);

        let png = dir.join("red.png");
        img.write_png(&png).unwrap();
        let reread = image::open(&png).unwrap().to_rgba8();
        assert_eq!(reread.dimensions(), (1, 1));
        assert_eq!(reread.get_pixel(0, 0).0, [255, 0, 0, 255]);

        let missing = load_texture_from_path(dir.join("missing.dds"));
        assert!(missing.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
