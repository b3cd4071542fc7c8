//! ABANIM Encoder Library
//!
//! This library turns media files into frame sequences normalized to a fixed
//! logical canvas, ready to be packed into an ABANIM container.

pub mod compositor;
pub mod extract;
pub mod frame_source;
pub mod progress_tracker;
#[cfg(feature = "video")]
pub mod video_reader;

pub use compositor::{composite_all, composite_frame, Canvas};
pub use extract::{extract, ExtractSummary, FrameFormat};
pub use frame_source::{load_media_frames, FrameSource, ImageSequenceReader, SourceFrame};
#[cfg(feature = "video")]
pub use video_reader::VideoReader;

use abanim_core::{Rgb, Scaling};
use std::path::PathBuf;

/// Result type for abanim-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for abanim-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ABANIM core error: {0}")]
    Core(#[from] abanim_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "video")]
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("Video input '{}' requires the `video` feature", .0.display())]
    VideoSupportDisabled(PathBuf),

    #[error("Invalid canvas {width}x{height}, both sides must be positive")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("No frames decoded from '{}'", .0.display())]
    NoFrames(PathBuf),

    #[error("Invalid video file")]
    InvalidVideo,

    #[error("No video stream found")]
    NoVideoStream,
}

/// Extraction configuration
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Logical canvas width
    pub width: u32,
    /// Logical canvas height
    pub height: u32,
    /// Frame rate used when the source carries no timing
    pub fps: u32,
    pub scaling: Scaling,
    pub background: Rgb,
    /// File name prefix of the written frames
    pub prefix: String,
    pub format: FrameFormat,
    /// Compositing threads (0 = one per CPU)
    pub threads: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            width: abanim_core::manifest::DEFAULT_WIDTH,
            height: abanim_core::manifest::DEFAULT_HEIGHT,
            fps: abanim_core::manifest::DEFAULT_FPS,
            scaling: Scaling::Letterbox,
            background: Rgb::BLACK,
            prefix: "frame".to_string(),
            format: FrameFormat::Bmp,
            threads: 0,
        }
    }
}

impl ExtractConfig {
    /// Canvas every extracted frame is composited onto
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height, self.scaling, self.background)
    }
}
