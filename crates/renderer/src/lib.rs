//! Renderer: texture resource creation on top of wgpu.
//! `create_texture` speaks to any `TextureDevice`; `WgpuDevice` is the real one.

pub mod device;
pub mod gpu;
pub mod mipmap;
pub mod upload;

pub use device::{TexelFormat, TextureDesc, TextureDevice, full_mip_count};
pub use gpu::{GpuTexture, WgpuDevice};
pub use upload::create_texture;
