//! Filtering/wrap knobs applied when a texture is created.

use std::str::FromStr;

/// Texture coordinate wrapping along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
    Mirror,
}

/// Minification/magnification filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    /// Trilinear: linear within a level, linear between levels.
    LinearMipmapLinear,
}

/// Sampler configuration. Default is repeat wrap with trilinear minification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerConfig {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
        }
    }
}

impl SamplerConfig {
    /// Point sampling, clamped. Handy for pixel-art and lookup textures.
    pub fn nearest_clamped() -> Self {
        Self {
            wrap_s: WrapMode::Clamp,
            wrap_t: WrapMode::Clamp,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
        }
    }

    /// Returns `true` if minification reads across mip levels.
    pub fn uses_mipmaps(&self) -> bool {
        self.min_filter == FilterMode::LinearMipmapLinear
    }
}

impl FromStr for WrapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "repeat" => Ok(Self::Repeat),
            "clamp" | "clamp-to-edge" => Ok(Self::Clamp),
            "mirror" | "mirrored-repeat" => Ok(Self::Mirror),
            other => Err(format!("unknown wrap mode '{other}'")),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "point" => Ok(Self::Nearest),
            "linear" | "bilinear" => Ok(Self::Linear),
            "trilinear" | "linear-mipmap-linear" => Ok(Self::LinearMipmapLinear),
            other => Err(format!("unknown filter mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_repeat_trilinear() {
        let c = SamplerConfig::default();
        assert_eq!(c.wrap_s, WrapMode::Repeat);
        assert_eq!(c.wrap_t, WrapMode::Repeat);
        assert_eq!(c.min_filter, FilterMode::LinearMipmapLinear);
        assert_eq!(c.mag_filter, FilterMode::Linear);
        assert!(c.uses_mipmaps());
        assert!(!SamplerConfig::nearest_clamped().uses_mipmaps());
    }

    #[test]
    fn parse_modes() {
        assert_eq!("Clamp".parse::<WrapMode>(), Ok(WrapMode::Clamp));
        assert_eq!("mirror".parse::<WrapMode>(), Ok(WrapMode::Mirror));
        assert_eq!(
            "trilinear".parse::<FilterMode>(),
            Ok(FilterMode::LinearMipmapLinear)
        );
        assert!("cubic".parse::<FilterMode>().is_err());
    }
}
