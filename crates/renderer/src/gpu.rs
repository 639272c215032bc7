//! wgpu-backed texture device.
//! wgpu = 26.x

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use asset::BlockFormat;
use corelib::{FilterMode, SamplerConfig, TextureHandle, UploadError, UploadResult, WrapMode};
use wgpu::{
    Backends, Device, DeviceDescriptor, ErrorFilter, Extent3d, Features, Instance,
    InstanceDescriptor, Limits, Queue, TexelCopyBufferLayout, TexelCopyTextureInfo,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
};

use crate::device::{TexelFormat, TextureDesc, TextureDevice};
use crate::mipmap::MipmapGenerator;

/// A created texture: storage, default view and its sampler.
pub struct GpuTexture {
    pub desc: TextureDesc,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Texture device over a wgpu device/queue pair.
///
/// Textures live here until the caller destroys them; the handle is the only
/// thing the loader hands out.
pub struct WgpuDevice {
    device: Device,
    queue: Queue,
    textures: HashMap<TextureHandle, GpuTexture>,
    next_id: u32,
    bound: Option<TextureHandle>,
    mipmaps: Option<MipmapGenerator>,
}

impl WgpuDevice {
    /// Wrap an existing device (e.g. the one driving the window surface).
    pub fn from_parts(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
            next_id: 1,
            bound: None,
            mipmaps: None,
        }
    }

    /// Create a device without a surface. BC compression is requested when the
    /// adapter offers it.
    pub fn new_headless(backends: Backends) -> Result<Self> {
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| anyhow!("No suitable GPU adapter: {e}"))?;

        let info = adapter.get_info();
        let features = adapter.features() & Features::TEXTURE_COMPRESSION_BC;
        log::info!(
            "Adapter: {} ({:?}), BC compression: {}",
            info.name,
            info.backend,
            !features.is_empty()
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("Texkit Device"),
            required_features: features,
            required_limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
            ..Default::default()
        }))
        .context("request_device failed")?;

        Ok(Self::from_parts(device, queue))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    /// Currently bound texture, if any.
    pub fn bound(&self) -> Option<TextureHandle> {
        self.bound
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn supports(&self, format: TexelFormat) -> bool {
        match format {
            TexelFormat::Rgba8 => true,
            TexelFormat::Bc(_) => self
                .device
                .features()
                .contains(Features::TEXTURE_COMPRESSION_BC),
        }
    }

    /// Destroy a texture and forget its handle.
    pub fn destroy(&mut self, handle: TextureHandle) {
        if let Some(tex) = self.textures.remove(&handle) {
            tex.texture.destroy();
            log::debug!("Destroyed {handle}");
        }
        if self.bound == Some(handle) {
            self.bound = None;
        }
    }

    fn get(&self, handle: TextureHandle) -> UploadResult<&GpuTexture> {
        self.textures
            .get(&handle)
            .ok_or_else(|| UploadError::Device(format!("unknown texture {handle}")))
    }

    fn push_error_scopes(&self) {
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);
    }

    /// Pop the scopes pushed by [`Self::push_error_scopes`] (innermost first).
    fn pop_error_scopes(&self) -> UploadResult<()> {
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = out_of_memory {
            log::error!("GPU out of memory: {err}");
            return Err(UploadError::DeviceResourceExhausted);
        }
        if let Some(err) = validation {
            log::error!("GPU validation error: {err}");
            return Err(UploadError::Device(err.to_string()));
        }
        Ok(())
    }
}

impl TextureDevice for WgpuDevice {
    fn allocate(&mut self, desc: &TextureDesc) -> UploadResult<TextureHandle> {
        if !self.supports(desc.format) {
            return Err(UploadError::UnsupportedFormat(format!(
                "{:?} needs TEXTURE_COMPRESSION_BC",
                desc.format
            )));
        }

        // BC base levels must cover whole 4x4 blocks.
        let max = self.device.limits().max_texture_dimension_2d;
        let block_misaligned = matches!(desc.format, TexelFormat::Bc(_))
            && (desc.width % 4 != 0 || desc.height % 4 != 0);
        let out_of_range =
            desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max;
        if out_of_range || block_misaligned {
            return Err(UploadError::InvalidDimensions {
                width: desc.width,
                height: desc.height,
            });
        }

        let format = wgpu_format(desc.format);
        let mut usage = TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST;
        if desc.format == TexelFormat::Rgba8 && desc.mip_level_count > 1 {
            usage |= TextureUsages::RENDER_ATTACHMENT;
        }

        self.push_error_scopes();
        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some("Texkit Texture"),
            size: Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_level_count.max(1),
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self
            .device
            .create_sampler(&sampler_descriptor(&SamplerConfig::default()));
        self.pop_error_scopes()?;

        let handle = TextureHandle::new(self.next_id);
        self.next_id += 1;
        log::debug!(
            "Allocated {handle}: {}x{} {:?}, {} mips",
            desc.width,
            desc.height,
            format,
            desc.mip_level_count
        );

        self.textures.insert(
            handle,
            GpuTexture {
                desc: *desc,
                texture,
                view,
                sampler,
            },
        );
        Ok(handle)
    }

    fn bind(&mut self, handle: TextureHandle) -> UploadResult<()> {
        self.get(handle)?;
        self.bound = Some(handle);
        Ok(())
    }

    fn upload_level(
        &mut self,
        handle: TextureHandle,
        level: u32,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> UploadResult<()> {
        let tex = self.get(handle)?;
        if level >= tex.desc.mip_level_count {
            return Err(UploadError::Device(format!(
                "{handle} has no mip level {level}"
            )));
        }

        // Block formats copy whole blocks, so small mips use the rounded extent.
        let (copy_width, copy_height, bytes_per_row, rows) = match tex.desc.format {
            TexelFormat::Rgba8 => (width, height, width * 4, height),
            TexelFormat::Bc(format) => {
                let blocks_w = width.div_ceil(4);
                let blocks_h = height.div_ceil(4);
                (
                    blocks_w * 4,
                    blocks_h * 4,
                    blocks_w * format.block_size() as u32,
                    blocks_h,
                )
            }
        };

        let expected = bytes_per_row as usize * rows as usize;
        if bytes.len() < expected {
            return Err(UploadError::Device(format!(
                "level {level} of {handle}: {} bytes, need {expected}",
                bytes.len()
            )));
        }

        self.push_error_scopes();
        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes[..expected],
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(rows),
            },
            Extent3d {
                width: copy_width,
                height: copy_height,
                depth_or_array_layers: 1,
            },
        );
        self.pop_error_scopes()?;

        log::trace!("Uploaded level {level} of {handle} ({width}x{height}, {expected} bytes)");
        Ok(())
    }

    fn generate_mipmaps(&mut self, handle: TextureHandle) -> UploadResult<()> {
        let tex = self.get(handle)?;
        let format = match tex.desc.format {
            TexelFormat::Rgba8 => wgpu_format(TexelFormat::Rgba8),
            TexelFormat::Bc(block) => {
                return Err(UploadError::UnsupportedFormat(format!(
                    "mipmap generation for {block:?}"
                )));
            }
        };
        let mip_count = tex.desc.mip_level_count;

        if self.mipmaps.as_ref().is_none_or(|m| m.format() != format) {
            self.mipmaps = Some(MipmapGenerator::new(&self.device, format));
        }

        // Re-borrow after the generator cache may have been filled.
        let tex = self.get(handle)?;
        if let Some(generator) = &self.mipmaps {
            self.push_error_scopes();
            generator.generate(&self.device, &self.queue, &tex.texture, mip_count);
            self.pop_error_scopes()?;
        }

        log::debug!("Generated {} mips for {handle}", mip_count.saturating_sub(1));
        Ok(())
    }

    fn apply_sampler(&mut self, handle: TextureHandle, config: &SamplerConfig) -> UploadResult<()> {
        self.get(handle)?;
        let sampler = self.device.create_sampler(&sampler_descriptor(config));
        if let Some(tex) = self.textures.get_mut(&handle) {
            tex.sampler = sampler;
        }
        Ok(())
    }

    fn release(&mut self, handle: TextureHandle) {
        self.destroy(handle);
    }
}

fn wgpu_format(format: TexelFormat) -> TextureFormat {
    match format {
        TexelFormat::Rgba8 => TextureFormat::Rgba8Unorm,
        TexelFormat::Bc(BlockFormat::Bc1) => TextureFormat::Bc1RgbaUnorm,
        TexelFormat::Bc(BlockFormat::Bc2) => TextureFormat::Bc2RgbaUnorm,
        TexelFormat::Bc(BlockFormat::Bc3) => TextureFormat::Bc3RgbaUnorm,
    }
}

fn address_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
        WrapMode::Mirror => wgpu::AddressMode::MirrorRepeat,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear | FilterMode::LinearMipmapLinear => wgpu::FilterMode::Linear,
    }
}

/// Map the sampler knobs onto wgpu. Without a mipmapped min filter, sampling
/// is pinned to the base level.
fn sampler_descriptor(config: &SamplerConfig) -> wgpu::SamplerDescriptor<'static> {
    let (mipmap_filter, lod_max_clamp) = if config.uses_mipmaps() {
        (wgpu::FilterMode::Linear, 32.0)
    } else {
        (wgpu::FilterMode::Nearest, 0.0)
    };

    wgpu::SamplerDescriptor {
        label: Some("Texkit Sampler"),
        address_mode_u: address_mode(config.wrap_s),
        address_mode_v: address_mode(config.wrap_t),
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter_mode(config.mag_filter),
        min_filter: filter_mode(config.min_filter),
        mipmap_filter,
        lod_max_clamp,
        ..Default::default()
    }
}
