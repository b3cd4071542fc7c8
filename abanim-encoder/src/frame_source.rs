//! Frame sources: media files decoded into RGBA frames with durations

use crate::{Error, Result};
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::{AnimationDecoder, Frame, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm"];

/// One decoded frame in playback order
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFrame {
    pub image: RgbaImage,
    /// Display duration; values <= 0 are replaced by the manifest default
    pub duration_us: i64,
}

impl SourceFrame {
    /// Creates a new source frame
    pub fn new(image: RgbaImage, duration_us: i64) -> Self {
        Self { image, duration_us }
    }
}

/// Anything that yields the ordered frames of one piece of media
pub trait FrameSource {
    /// Decodes every frame of the source
    fn read_frames(&mut self) -> Result<Vec<SourceFrame>>;
}

/// Still images and animated GIF/PNG decoded with the `image` crate
pub struct ImageSequenceReader {
    path: PathBuf,
    fallback_duration_us: i64,
}

impl ImageSequenceReader {
    /// Creates a reader; `fallback_fps` times frames without their own delay
    pub fn new(path: impl Into<PathBuf>, fallback_fps: u32) -> Self {
        Self {
            path: path.into(),
            fallback_duration_us: fallback_duration_us(fallback_fps),
        }
    }

    fn read_gif(&self) -> Result<Vec<SourceFrame>> {
        let decoder = GifDecoder::new(BufReader::new(File::open(&self.path)?))?;
        let frames = decoder.into_frames().collect_frames()?;
        Ok(self.convert_frames(frames))
    }

    fn read_png(&self) -> Result<Vec<SourceFrame>> {
        let decoder = PngDecoder::new(BufReader::new(File::open(&self.path)?))?;
        if decoder.is_apng()? {
            let frames = decoder.apng()?.into_frames().collect_frames()?;
            Ok(self.convert_frames(frames))
        } else {
            self.read_still()
        }
    }

    fn read_still(&self) -> Result<Vec<SourceFrame>> {
        let image = image::open(&self.path)?.into_rgba8();
        Ok(vec![SourceFrame::new(image, self.fallback_duration_us)])
    }

    fn convert_frames(&self, frames: Vec<Frame>) -> Vec<SourceFrame> {
        frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay_us = if denom == 0 {
                    0
                } else {
                    numer as i64 * 1000 / denom as i64
                };
                let duration_us = if delay_us > 0 {
                    delay_us
                } else {
                    self.fallback_duration_us
                };
                log::debug!("Loaded animation frame {} ({}us)", index, duration_us);
                SourceFrame::new(frame.into_buffer(), duration_us)
            })
            .collect()
    }
}

impl FrameSource for ImageSequenceReader {
    fn read_frames(&mut self) -> Result<Vec<SourceFrame>> {
        match extension(&self.path).as_deref() {
            Some("gif") => self.read_gif(),
            Some("png") | Some("apng") => self.read_png(),
            _ => self.read_still(),
        }
    }
}

/// Decodes every frame of a media file, picking the source by extension
pub fn load_media_frames(path: &Path, fallback_fps: u32) -> Result<Vec<SourceFrame>> {
    let is_video = extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);

    let frames = if is_video {
        read_video(path, fallback_fps)?
    } else {
        ImageSequenceReader::new(path, fallback_fps).read_frames()?
    };

    if frames.is_empty() {
        return Err(Error::NoFrames(path.to_path_buf()));
    }
    log::info!("Decoded {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

#[cfg(feature = "video")]
fn read_video(path: &Path, fallback_fps: u32) -> Result<Vec<SourceFrame>> {
    crate::VideoReader::open(path, fallback_fps)?.read_frames()
}

#[cfg(not(feature = "video"))]
fn read_video(path: &Path, _fallback_fps: u32) -> Result<Vec<SourceFrame>> {
    Err(Error::VideoSupportDisabled(path.to_path_buf()))
}

/// Frame duration for a frame rate, at least one frame per second
pub(crate) fn fallback_duration_us(fps: u32) -> i64 {
    1_000_000 / fps.max(1) as i64
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba};
    use tempfile::tempdir;

    #[test]
    fn test_still_image_is_one_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("still.bmp");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let frames = load_media_frames(&path, 25).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].image.dimensions(), (3, 2));
        assert_eq!(frames[0].duration_us, 40_000);
    }

    #[test]
    fn test_gif_frames_keep_order_and_delay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = GifEncoder::new(file);
            let frames = [
                (Rgba([255, 0, 0, 255]), 100),
                (Rgba([0, 255, 0, 255]), 0),
                (Rgba([0, 0, 255, 255]), 50),
            ];
            for (color, delay_ms) in frames {
                let image = RgbaImage::from_pixel(4, 4, color);
                encoder
                    .encode_frame(Frame::from_parts(
                        image,
                        0,
                        0,
                        Delay::from_numer_denom_ms(delay_ms, 1),
                    ))
                    .unwrap();
            }
        }

        let frames = load_media_frames(&path, 10).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].duration_us, 100_000);
        assert_eq!(frames[1].duration_us, 100_000);
        assert_eq!(frames[2].duration_us, 50_000);
        // GIF palettes are quantized, so only check the dominant channel
        assert!(frames[0].image.get_pixel(0, 0)[0] > 200);
        assert!(frames[2].image.get_pixel(0, 0)[2] > 200);
    }

    #[cfg(not(feature = "video"))]
    #[test]
    fn test_video_without_feature() {
        let result = load_media_frames(Path::new("intro.mp4"), 24);
        assert!(matches!(result, Err(Error::VideoSupportDisabled(_))));
    }

    #[test]
    fn test_fallback_duration() {
        assert_eq!(fallback_duration_us(24), 41_666);
        assert_eq!(fallback_duration_us(0), 1_000_000);
    }
}
