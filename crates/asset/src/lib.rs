//! Asset loading/parsers for textures.
//! BMP (uncompressed) and DDS (DXT block-compressed) containers decode into
//! CPU-side images that the renderer uploads.

pub mod bmp;
pub mod dds;
pub mod texture;

pub use bmp::decode_bitmap;
pub use dds::decode_compressed;
pub use texture::{
    BlockFormat, ChannelOrder, CompressedImage, DecodedImage, MipLevel, RawImage, decode_texture,
    load_texture_from_path,
};
