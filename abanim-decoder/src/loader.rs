//! Container loading: parse, then decode every payload to RGBA

use crate::Result;
use abanim_core::{Error as CoreError, Manifest, Package, PixelFormat};
use image::RgbaImage;
use std::fs;
use std::path::Path;

/// One decoded frame with the duration stored in the frame table
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub image: RgbaImage,
    pub duration_us: u32,
}

/// A fully decoded container
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub manifest: Manifest,
    pub frames: Vec<DecodedFrame>,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl LoadedPackage {
    /// Frame at `index`, if any
    pub fn frame(&self, index: usize) -> Option<&DecodedFrame> {
        self.frames.get(index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Parses container bytes and decodes all frames.
///
/// Nothing is returned unless every frame decodes to the header's size.
pub fn load_package(bytes: &[u8]) -> Result<LoadedPackage> {
    let package = Package::parse(bytes)?;
    let (width, height) = (package.header.width, package.header.height);

    let mut frames = Vec::with_capacity(package.frame_count());
    for (index, (descriptor, payload)) in package.frames().enumerate() {
        let image = match package.pixel_format {
            PixelFormat::Bgra32 => decode_raw(index, payload, width, height)?,
            PixelFormat::Encoded => decode_encoded(index, payload, width, height)?,
        };
        log::debug!("Decoded frame {} ({} bytes)", index, payload.len());
        frames.push(DecodedFrame {
            image,
            duration_us: descriptor.duration_us,
        });
    }

    log::info!(
        "Loaded {} frames at {}x{} ({:?})",
        frames.len(),
        width,
        height,
        package.pixel_format
    );

    Ok(LoadedPackage {
        manifest: package.manifest,
        frames,
        width,
        height,
        pixel_format: package.pixel_format,
    })
}

/// Reads and loads a container file
pub fn load_package_file(path: &Path) -> Result<LoadedPackage> {
    let bytes = fs::read(path)?;
    load_package(&bytes)
}

fn decode_raw(index: usize, payload: &[u8], width: u32, height: u32) -> Result<RgbaImage> {
    let expected = width as u64 * height as u64 * 4;
    if payload.len() as u64 != expected {
        return Err(CoreError::PayloadSizeMismatch {
            index,
            expected,
            actual: payload.len() as u64,
        }
        .into());
    }

    let pixels = payload
        .chunks_exact(4)
        .flat_map(|p| [p[2], p[1], p[0], p[3]])
        .collect();
    RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        CoreError::PayloadSizeMismatch {
            index,
            expected,
            actual: payload.len() as u64,
        }
        .into()
    })
}

fn decode_encoded(index: usize, payload: &[u8], width: u32, height: u32) -> Result<RgbaImage> {
    let image = image::load_from_memory(payload)?.into_rgba8();
    if image.dimensions() != (width, height) {
        return Err(CoreError::DimensionMismatch {
            index,
            expected_width: width,
            expected_height: height,
            actual_width: image.width(),
            actual_height: image.height(),
        }
        .into());
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use abanim_core::{build, FrameEntry, FramePayload, Rgb, Scaling};
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn manifest(paths: &[&str], width: u32, height: u32) -> Manifest {
        let frames = paths.iter().map(|p| FrameEntry::new(*p, 0)).collect();
        Manifest::from_frames(frames, width, height, 10, Scaling::Letterbox, Rgb::BLACK)
    }

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_raw_frames_decode_to_rgba() {
        let manifest = manifest(&["a.raw"], 2, 1);
        let payload = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let bytes = build(&manifest, &[FramePayload::new("a.raw", payload)]).unwrap();

        let loaded = load_package(&bytes).unwrap();
        assert_eq!(loaded.pixel_format, PixelFormat::Bgra32);
        assert_eq!(loaded.frame_count(), 1);
        assert_eq!((loaded.width, loaded.height), (2, 1));

        let frame = loaded.frame(0).unwrap();
        assert_eq!(frame.duration_us, 100_000);
        assert_eq!(*frame.image.get_pixel(0, 0), Rgba([3, 2, 1, 4]));
        assert_eq!(*frame.image.get_pixel(1, 0), Rgba([7, 6, 5, 8]));
        assert!(loaded.frame(1).is_none());
    }

    #[test]
    fn test_encoded_frames_decode() {
        let first = RgbaImage::from_pixel(3, 2, Rgba([200, 10, 20, 255]));
        let second = RgbaImage::from_pixel(3, 2, Rgba([0, 90, 180, 255]));
        let manifest = manifest(&["one.png", "two.png"], 3, 2);
        let payloads = [
            FramePayload::new("one.png", png_bytes(&first)),
            FramePayload::new("two.png", png_bytes(&second)),
        ];
        let bytes = build(&manifest, &payloads).unwrap();

        let loaded = load_package(&bytes).unwrap();
        assert_eq!(loaded.pixel_format, PixelFormat::Encoded);
        assert_eq!(loaded.manifest, manifest);
        assert_eq!(loaded.frames[0].image, first);
        assert_eq!(loaded.frames[1].image, second);
    }

    #[test]
    fn test_wrong_encoded_size_is_rejected() {
        let image = RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255]));
        let manifest = manifest(&["big.png"], 4, 4);
        let bytes = build(&manifest, &[FramePayload::new("big.png", png_bytes(&image))]).unwrap();

        let result = load_package(&bytes);
        assert!(matches!(
            result,
            Err(Error::Core(CoreError::DimensionMismatch {
                index: 0,
                actual_width: 5,
                actual_height: 5,
                ..
            }))
        ));
    }

    #[test]
    fn test_wrong_raw_length_is_rejected() {
        let manifest = manifest(&["a.raw"], 4, 4);
        let bytes = build(&manifest, &[FramePayload::new("a.raw", vec![0; 60])]).unwrap();

        let result = load_package(&bytes);
        assert!(matches!(
            result,
            Err(Error::Core(CoreError::PayloadSizeMismatch {
                expected: 64,
                actual: 60,
                ..
            }))
        ));
    }

    #[test]
    fn test_undecodable_payload_is_image_error() {
        let manifest = manifest(&["broken.bmp"], 2, 2);
        let bytes = build(&manifest, &[FramePayload::new("broken.bmp", vec![0xAB; 10])]).unwrap();

        assert!(matches!(load_package(&bytes), Err(Error::Image(_))));
    }

    #[test]
    fn test_truncated_last_payload() {
        let manifest = manifest(&["a.raw"], 4, 4);
        let bytes = build(&manifest, &[FramePayload::new("a.raw", vec![0; 64])]).unwrap();

        let result = load_package(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            result,
            Err(Error::Core(CoreError::TruncatedPayload { index: 0, .. }))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot.abanim");
        let manifest = manifest(&["a.raw"], 1, 1);
        let bytes = build(&manifest, &[FramePayload::new("a.raw", vec![9, 8, 7, 255])]).unwrap();
        fs::write(&path, bytes).unwrap();

        let loaded = load_package_file(&path).unwrap();
        assert_eq!(*loaded.frames[0].image.get_pixel(0, 0), Rgba([7, 8, 9, 255]));

        let missing = load_package_file(&dir.path().join("missing.abanim"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
