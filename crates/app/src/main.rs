//! Entry point for texkit.
//! Decodes BMP/DDS textures, reports their layout and optionally uploads them
//! on a headless GPU device.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use asset::{DecodedImage, RawImage};
use corelib::{FilterMode, SamplerConfig, WrapMode};
use renderer::{WgpuDevice, create_texture};

const PLACEHOLDER_SIZE: u32 = 64;

fn parse_backend_arg() -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

/// `--name` or `--name=on|off`, default off.
fn parse_switch_arg(name: &str) -> bool {
    let bare = format!("--{name}");
    let prefix = format!("--{name}=");
    for arg in std::env::args() {
        if arg == bare {
            return true;
        }
        if let Some(val) = arg.strip_prefix(&prefix) {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

fn parse_value_arg(name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    std::env::args()
        .filter_map(|arg| arg.strip_prefix(&prefix).map(str::to_owned))
        .last()
}

fn parse_sampler_args() -> Result<SamplerConfig> {
    let mut config = SamplerConfig::default();

    if let Some(v) = parse_value_arg("wrap") {
        let mode: WrapMode = v.parse().map_err(|e: String| anyhow!(e))?;
        config.wrap_s = mode;
        config.wrap_t = mode;
    }
    if let Some(v) = parse_value_arg("wrap-s") {
        config.wrap_s = v.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(v) = parse_value_arg("wrap-t") {
        config.wrap_t = v.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(v) = parse_value_arg("min-filter") {
        config.min_filter = v.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(v) = parse_value_arg("mag-filter") {
        let mode: FilterMode = v.parse().map_err(|e: String| anyhow!(e))?;
        // Magnification never reads other levels.
        config.mag_filter = match mode {
            FilterMode::LinearMipmapLinear => FilterMode::Linear,
            other => other,
        };
    }

    Ok(config)
}

fn parse_paths() -> Vec<PathBuf> {
    std::env::args()
        .skip(1)
        .filter(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .collect()
}

fn report(path: &Path, image: &DecodedImage) {
    match image {
        DecodedImage::Raw(img) => log::info!(
            "{}: bitmap {}x{} {:?}, {} bytes",
            path.display(),
            img.width,
            img.height,
            img.channel_order,
            img.pixels.len()
        ),
        DecodedImage::Compressed(img) => {
            log::info!(
                "{}: {:?} {}x{}, {} mip levels",
                path.display(),
                img.block_format,
                img.width,
                img.height,
                img.mip_count()
            );
            for (i, mip) in img.mip_levels.iter().enumerate() {
                log::info!(
                    "  level {}: {}x{} bytes {:?}",
                    i,
                    mip.width,
                    mip.height,
                    mip.byte_range()
                );
            }
        }
    }
}

fn dump_png(dir: &Path, path: &Path, img: &RawImage) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "texture".to_owned());
    img.write_png(dir.join(format!("{stem}.png")))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let paths = parse_paths();
    if paths.is_empty() {
        anyhow::bail!(
            "usage: texkit [--upload] [--gpu-backend=auto] [--wrap=repeat] \
             [--min-filter=trilinear] [--mag-filter=linear] [--placeholder] \
             [--dump-png=DIR] <file.bmp|file.dds>..."
        );
    }

    let upload = parse_switch_arg("upload");
    let placeholder = parse_switch_arg("placeholder");
    let dump_dir = parse_value_arg("dump-png").map(PathBuf::from);
    let config = parse_sampler_args()?;
    log::info!(
        "Starting texkit. files={}, upload={}, placeholder={}, sampler={:?}",
        paths.len(),
        upload,
        placeholder,
        config
    );

    let mut device = if upload {
        Some(WgpuDevice::new_headless(parse_backend_arg())?)
    } else {
        None
    };

    let mut failures = 0usize;
    for path in &paths {
        let image = match asset::load_texture_from_path(path) {
            Ok(image) => image,
            Err(err) if placeholder => {
                log::warn!("{err:#}; using placeholder");
                DecodedImage::Raw(RawImage::checkerboard(PLACEHOLDER_SIZE))
            }
            Err(err) => {
                log::error!("{err:#}");
                failures += 1;
                continue;
            }
        };
        report(path, &image);

        if let (Some(dir), DecodedImage::Raw(img)) = (&dump_dir, &image) {
            if let Err(err) = dump_png(dir, path, img) {
                log::warn!("PNG dump failed: {err:#}");
            }
        }

        if let Some(device) = device.as_mut() {
            match create_texture(device, image, &config) {
                Ok(handle) => log::info!("{}: uploaded as {handle}", path.display()),
                Err(err) => {
                    log::error!("{}: upload failed: {err}", path.display());
                    failures += 1;
                }
            }
        }
    }

    if let Some(device) = &device {
        log::info!("{} textures resident on the device", device.texture_count());
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} textures failed", paths.len());
    }

    log::info!("Done.");
    Ok(())
}
