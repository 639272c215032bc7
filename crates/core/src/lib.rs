//! Core shared types and errors (renderer-agnostic).
//! Decoders produce `DecodeError`, devices produce `UploadError`; both meet at
//! `TextureHandle` and `SamplerConfig`.

use thiserror::Error;

pub mod sampler;

pub use sampler::{FilterMode, SamplerConfig, WrapMode};

/// Structural failures while parsing a texture container.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bad magic signature")]
    BadMagic,
    #[error("truncated header: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },
    #[error("truncated payload: need {needed} bytes, have {available}")]
    TruncatedPayload { needed: usize, available: usize },
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("mip level {level} overruns the payload ({end} > {len})")]
    CorruptMipChain { level: u32, end: usize, len: usize },
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Failures while creating a device texture from decoded data.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("device could not allocate the texture")]
    DeviceResourceExhausted,
    #[error("format not supported by the device: {0}")]
    UnsupportedFormat(String),
    #[error("invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("device error: {0}")]
    Device(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type UploadResult<T> = Result<T, UploadError>;

/// Opaque device texture id. Unique per device; the caller owns its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_roundtrips_id() {
        let h = TextureHandle::new(7);
        assert_eq!(h.id(), 7);
        assert_eq!(h.to_string(), "tex#7");
    }

    #[test]
    fn errors_render_context() {
        let e = DecodeError::TruncatedPayload {
            needed: 12,
            available: 4,
        };
        assert_eq!(e.to_string(), "truncated payload: need 12 bytes, have 4");
        assert_eq!(
            UploadError::DeviceResourceExhausted.to_string(),
            "device could not allocate the texture"
        );
    }
}
