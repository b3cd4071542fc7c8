//! Video reading and frame extraction using FFmpeg

use crate::frame_source::fallback_duration_us;
use crate::{Error, FrameSource, Result, SourceFrame};
use ffmpeg_next as ffmpeg;
use image::RgbaImage;
use std::path::Path;
use std::sync::Once;

static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg (call once per application)
fn init_ffmpeg() -> Result<()> {
    let mut result = Ok(());
    FFMPEG_INIT.call_once(|| {
        result = ffmpeg::init();
    });
    Ok(result?)
}

/// Video reader that extracts frames from video files
pub struct VideoReader {
    input: ffmpeg::format::context::Input,
    video_stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    frame_duration_us: i64,
}

impl VideoReader {
    /// Opens a video file; `fallback_fps` is used when the stream has no rate
    pub fn open(path: &Path, fallback_fps: u32) -> Result<Self> {
        init_ffmpeg()?;

        let input = ffmpeg::format::input(&path)?;

        // Find the video stream
        let video_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;

        let video_stream_index = video_stream.index();
        let rate = video_stream.avg_frame_rate();
        let frame_duration_us = if rate.numerator() > 0 && rate.denominator() > 0 {
            1_000_000 * rate.denominator() as i64 / rate.numerator() as i64
        } else {
            fallback_duration_us(fallback_fps)
        };

        // Create decoder
        let context = ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context.decoder().video()?;

        Ok(Self {
            input,
            video_stream_index,
            decoder,
            frame_duration_us,
        })
    }

    /// Gets the video width
    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    /// Gets the video height
    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /// Duration assigned to every decoded frame
    pub fn frame_duration_us(&self) -> i64 {
        self.frame_duration_us
    }
}

impl FrameSource for VideoReader {
    fn read_frames(&mut self) -> Result<Vec<SourceFrame>> {
        let mut frames = Vec::new();
        let frame_duration_us = self.frame_duration_us;

        // Setup scaler for RGBA conversion
        let mut scaler = ffmpeg::software::scaling::Context::get(
            self.decoder.format(),
            self.decoder.width(),
            self.decoder.height(),
            ffmpeg::format::Pixel::RGBA,
            self.decoder.width(),
            self.decoder.height(),
            ffmpeg::software::scaling::Flags::BILINEAR,
        )?;

        let mut receive_and_process_decoded_frames =
            |decoder: &mut ffmpeg::decoder::Video| -> Result<()> {
                let mut decoded = ffmpeg::frame::Video::empty();
                while decoder.receive_frame(&mut decoded).is_ok() {
                    let mut rgba_frame = ffmpeg::frame::Video::empty();
                    scaler.run(&decoded, &mut rgba_frame)?;
                    let image = frame_to_image(&rgba_frame)?;
                    log::debug!("Loaded video frame {}", frames.len());
                    frames.push(SourceFrame::new(image, frame_duration_us));
                }
                Ok(())
            };

        // Read packets and decode
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.video_stream_index {
                self.decoder.send_packet(&packet)?;
                receive_and_process_decoded_frames(&mut self.decoder)?;
            }
        }

        // Flush decoder
        self.decoder.send_eof()?;
        receive_and_process_decoded_frames(&mut self.decoder)?;

        Ok(frames)
    }
}

/// Copies an RGBA frame into an image, dropping per-row stride padding
fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbaImage> {
    let width = frame.width();
    let height = frame.height();
    let stride = frame.stride(0);
    let row_len = width as usize * 4;
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let line = data.get(start..start + row_len).ok_or(Error::InvalidVideo)?;
        pixels.extend_from_slice(line);
    }

    RgbaImage::from_raw(width, height, pixels).ok_or(Error::InvalidVideo)
}
