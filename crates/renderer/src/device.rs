//! Device seam for texture creation.

use asset::BlockFormat;
use corelib::{SamplerConfig, TextureHandle, UploadResult};

/// Texel layout of a device texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexelFormat {
    /// Uncompressed RGBA, 8 bits per channel.
    Rgba8,
    Bc(BlockFormat),
}

/// Texture allocation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub format: TexelFormat,
}

/// Graphics device operations used by [`crate::create_texture`].
///
/// Calls must happen on the thread that owns the device context. `bind`
/// changes device-wide state: the bound texture after a call is whatever the
/// implementation bound last.
pub trait TextureDevice {
    /// Allocate storage for every mip level of `desc`.
    /// Fails with `DeviceResourceExhausted` when the device is out of memory.
    fn allocate(&mut self, desc: &TextureDesc) -> UploadResult<TextureHandle>;

    fn bind(&mut self, handle: TextureHandle) -> UploadResult<()>;

    /// Upload one level. `width`/`height` are the logical level dimensions.
    fn upload_level(
        &mut self,
        handle: TextureHandle,
        level: u32,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> UploadResult<()>;

    /// Fill levels `1..` from level 0.
    fn generate_mipmaps(&mut self, handle: TextureHandle) -> UploadResult<()>;

    fn apply_sampler(&mut self, handle: TextureHandle, config: &SamplerConfig) -> UploadResult<()>;

    /// Free a texture. Unknown handles are ignored.
    fn release(&mut self, handle: TextureHandle);
}

/// Number of levels in a complete chain down to 1x1.
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}
