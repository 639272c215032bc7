//! Resource creation: decoded images -> device textures.

use asset::{CompressedImage, DecodedImage, RawImage};
use corelib::{SamplerConfig, TextureHandle, UploadError, UploadResult};

use crate::device::{TexelFormat, TextureDesc, TextureDevice, full_mip_count};

/// Create a device texture from a decoded image.
///
/// Uncompressed images are normalized to RGBA8, uploaded as level 0 and get
/// their chain from the device. Compressed images upload their precomputed
/// chain level by level and never ask the device for mipmaps.
///
/// The new texture stays bound on `device` afterwards. On failure any
/// partially created texture is released; nothing is retried.
pub fn create_texture<D: TextureDevice + ?Sized>(
    device: &mut D,
    image: DecodedImage,
    config: &SamplerConfig,
) -> UploadResult<TextureHandle> {
    match image {
        DecodedImage::Raw(img) => create_from_raw(device, img, config),
        DecodedImage::Compressed(img) => create_from_compressed(device, img, config),
    }
}

fn create_from_raw<D: TextureDevice + ?Sized>(
    device: &mut D,
    img: RawImage,
    config: &SamplerConfig,
) -> UploadResult<TextureHandle> {
    let img = img.to_rgba8();
    let desc = TextureDesc {
        width: img.width,
        height: img.height,
        mip_level_count: full_mip_count(img.width, img.height),
        format: TexelFormat::Rgba8,
    };

    let handle = device.allocate(&desc)?;
    let filled = fill_raw(device, handle, &img, config);
    finish(device, handle, filled)
}

fn fill_raw<D: TextureDevice + ?Sized>(
    device: &mut D,
    handle: TextureHandle,
    img: &RawImage,
    config: &SamplerConfig,
) -> UploadResult<()> {
    device.bind(handle)?;
    device.upload_level(handle, 0, img.width, img.height, &img.pixels)?;
    device.generate_mipmaps(handle)?;
    device.apply_sampler(handle, config)
}

fn create_from_compressed<D: TextureDevice + ?Sized>(
    device: &mut D,
    img: CompressedImage,
    config: &SamplerConfig,
) -> UploadResult<TextureHandle> {
    let desc = TextureDesc {
        width: img.width,
        height: img.height,
        mip_level_count: img.mip_count(),
        format: TexelFormat::Bc(img.block_format),
    };

    let handle = device.allocate(&desc)?;
    let filled = fill_compressed(device, handle, &img, config);
    finish(device, handle, filled)
}

fn fill_compressed<D: TextureDevice + ?Sized>(
    device: &mut D,
    handle: TextureHandle,
    img: &CompressedImage,
    config: &SamplerConfig,
) -> UploadResult<()> {
    device.bind(handle)?;
    for (level, mip) in img.mip_levels.iter().enumerate() {
        let bytes = img.level_bytes(level).ok_or_else(|| {
            UploadError::Device(format!("mip level {level} lies outside the image data"))
        })?;
        device.upload_level(handle, level as u32, mip.width, mip.height, bytes)?;
    }
    device.apply_sampler(handle, config)
}

/// Hand out the handle, or release it if filling failed.
fn finish<D: TextureDevice + ?Sized>(
    device: &mut D,
    handle: TextureHandle,
    filled: UploadResult<()>,
) -> UploadResult<TextureHandle> {
    match filled {
        Ok(()) => Ok(handle),
        Err(err) => {
            device.release(handle);
            Err(err)
        }
    }
}
