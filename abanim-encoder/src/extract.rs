//! Extraction pipeline: media → composited frame files + manifest

use crate::{composite_all, load_media_frames, Error, ExtractConfig, Result};
use abanim_core::{save_manifest, FrameEntry, Manifest};
use image::codecs::bmp::BmpEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the manifest written next to the frames by default
pub const DEFAULT_MANIFEST_NAME: &str = "sequence.anim.json";

/// On-disk storage for extracted frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    /// 24-bit uncompressed BMP, decoded by the firmware's BMP reader
    #[default]
    Bmp,
    /// Tightly packed BGRA pixels, blitted without decoding
    Raw,
}

impl FrameFormat {
    /// File extension, which also selects the container's pixel format
    pub fn extension(self) -> &'static str {
        match self {
            FrameFormat::Bmp => "bmp",
            FrameFormat::Raw => "raw",
        }
    }

    /// Encodes a composited (opaque) frame into payload bytes
    pub fn encode(self, image: &RgbaImage) -> Result<Vec<u8>> {
        match self {
            FrameFormat::Raw => Ok(rgba_to_bgra(image)),
            FrameFormat::Bmp => {
                let rgb = image::DynamicImage::ImageRgba8(image.clone()).into_rgb8();
                let mut buffer = Vec::new();
                BmpEncoder::new(&mut buffer).write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )?;
                Ok(buffer)
            }
        }
    }
}

/// Swaps RGBA pixels into the renderer's BGRA byte order
pub fn rgba_to_bgra(image: &RgbaImage) -> Vec<u8> {
    image
        .pixels()
        .flat_map(|p| [p[2], p[1], p[0], p[3]])
        .collect()
}

/// What an extraction produced
#[derive(Debug, Clone)]
pub struct ExtractSummary {
    pub frame_paths: Vec<PathBuf>,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

/// Decodes `input`, composites every frame onto the configured canvas,
/// writes the frames into `output_dir` and saves the sequence manifest.
///
/// Frame paths in the manifest are file names, relative to `output_dir`.
pub fn extract(
    input: &Path,
    output_dir: &Path,
    manifest_path: Option<&Path>,
    config: &ExtractConfig,
) -> Result<ExtractSummary> {
    if config.width == 0 || config.height == 0 {
        return Err(Error::InvalidCanvas {
            width: config.width,
            height: config.height,
        });
    }

    let frames = load_media_frames(input, config.fps)?;
    if frames.is_empty() {
        return Err(Error::NoFrames(input.to_path_buf()));
    }

    let composited = composite_all(frames, &config.canvas(), config.threads);

    fs::create_dir_all(output_dir)?;
    let mut frame_paths = Vec::with_capacity(composited.len());
    let mut entries = Vec::with_capacity(composited.len());
    for (index, frame) in composited.iter().enumerate() {
        let file_name = format!(
            "{}{:04}.{}",
            config.prefix,
            index + 1,
            config.format.extension()
        );
        let path = output_dir.join(&file_name);
        fs::write(&path, config.format.encode(&frame.image)?)?;

        // Non-positive durations become 0 and take the manifest default
        let duration_us = frame.duration_us.clamp(0, u32::MAX as i64) as u32;
        entries.push(FrameEntry::new(file_name, duration_us));
        frame_paths.push(path);
    }

    let manifest = Manifest::from_frames(
        entries,
        config.width,
        config.height,
        config.fps,
        config.scaling,
        config.background,
    );

    let manifest_path = manifest_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_dir.join(DEFAULT_MANIFEST_NAME));
    save_manifest(&manifest_path, &manifest)?;

    log::info!("Exported {} frames to {}", frame_paths.len(), output_dir.display());
    log::info!("Manifest written to {}", manifest_path.display());

    Ok(ExtractSummary {
        frame_paths,
        manifest_path,
        manifest,
    })
}
