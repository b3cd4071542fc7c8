//! Frame compositor: maps source frames onto the fixed logical canvas

use crate::progress_tracker::ProgressTracker;
use crate::SourceFrame;
use abanim_core::{Manifest, Rgb, Scaling};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::borrow::Cow;
use std::thread;

/// Smallest scale ratio applied to a source frame
const MIN_RATIO: f64 = 1e-6;

/// Target canvas and the policy used to fit frames onto it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub scaling: Scaling,
    pub background: Rgb,
}

impl Canvas {
    /// Creates a new canvas description
    pub fn new(width: u32, height: u32, scaling: Scaling, background: Rgb) -> Self {
        Self {
            width,
            height,
            scaling,
            background,
        }
    }

    /// Canvas described by a manifest
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::new(
            manifest.logical_width,
            manifest.logical_height,
            manifest.scaling,
            manifest.background,
        )
    }
}

/// Composites one source frame onto a canvas-sized, opaque image.
///
/// `Letterbox` fits the whole source inside the canvas, `Fill` covers the
/// canvas and crops the overflow, `Center` keeps the source unscaled. The
/// (scaled) source is alpha-blended over the background.
pub fn composite_frame(source: &RgbaImage, canvas: &Canvas) -> RgbaImage {
    let (tw, th) = (canvas.width, canvas.height);
    let mut target = RgbaImage::from_pixel(tw, th, Rgba(canvas.background.to_rgba()));

    let (sw, sh) = source.dimensions();
    if sw == 0 || sh == 0 || tw == 0 || th == 0 {
        return target;
    }

    let scaled: Cow<'_, RgbaImage> = match canvas.scaling {
        Scaling::Center => Cow::Borrowed(source),
        Scaling::Letterbox | Scaling::Fill => {
            let (nw, nh) = scaled_size(sw, sh, canvas);
            if (nw, nh) == (sw, sh) {
                Cow::Borrowed(source)
            } else {
                Cow::Owned(imageops::resize(source, nw, nh, FilterType::Lanczos3))
            }
        }
    };

    let (rw, rh) = scaled.dimensions();
    let crop_w = rw.min(tw);
    let crop_h = rh.min(th);
    let crop_left = (rw - crop_w) / 2;
    let crop_top = (rh - crop_h) / 2;
    let offset_x = (tw - crop_w) / 2;
    let offset_y = (th - crop_h) / 2;

    for y in 0..crop_h {
        for x in 0..crop_w {
            let src = scaled.get_pixel(crop_left + x, crop_top + y);
            let dst = target.get_pixel_mut(offset_x + x, offset_y + y);
            *dst = blend_over(src, dst);
        }
    }

    target
}

/// Size of the source after scaling for letterbox or fill
fn scaled_size(sw: u32, sh: u32, canvas: &Canvas) -> (u32, u32) {
    let rx = canvas.width as f64 / sw as f64;
    let ry = canvas.height as f64 / sh as f64;
    let ratio = match canvas.scaling {
        Scaling::Fill => rx.max(ry),
        _ => rx.min(ry),
    }
    .max(MIN_RATIO);

    let nw = ((sw as f64 * ratio).round() as u32).max(1);
    let nh = ((sh as f64 * ratio).round() as u32).max(1);

    // Rounding must never leave a gap under fill or overflow under letterbox
    match canvas.scaling {
        Scaling::Fill => (nw.max(canvas.width), nh.max(canvas.height)),
        _ => (nw.min(canvas.width), nh.min(canvas.height)),
    }
}

/// Straight-alpha "over" onto an opaque destination
fn blend_over(src: &Rgba<u8>, dst: &Rgba<u8>) -> Rgba<u8> {
    let alpha = src[3] as u32;
    let inv_alpha = 255 - alpha;
    let mix = |s: u8, d: u8| ((s as u32 * alpha + d as u32 * inv_alpha + 127) / 255) as u8;

    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}

/// Composites a batch of frames across worker threads.
///
/// Frames are split into contiguous chunks, one per thread; results keep the
/// input order and each frame is composited exactly as [`composite_frame`]
/// would sequentially.
pub fn composite_all(frames: Vec<SourceFrame>, canvas: &Canvas, threads: usize) -> Vec<SourceFrame> {
    if frames.is_empty() {
        return frames;
    }

    let threads = if threads == 0 { num_cpus::get() } else { threads };
    let chunk_size = frames.len().div_ceil(threads.max(1));
    let progress = ProgressTracker::new(frames.len() as u64, "Compositing");
    let report_interval = (frames.len() as u64 / 10).max(1);

    log::debug!(
        "Compositing {} frames onto {}x{} ({}) with {} threads",
        frames.len(),
        canvas.width,
        canvas.height,
        canvas.scaling.as_str(),
        frames.len().div_ceil(chunk_size)
    );

    thread::scope(|scope| {
        let handles: Vec<_> = frames
            .chunks(chunk_size)
            .map(|chunk| {
                let progress = &progress;
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|frame| {
                            let image = composite_frame(&frame.image, canvas);
                            progress.increment_and_report(report_interval);
                            SourceFrame::new(image, frame.duration_us)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(chunk) => chunk,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BG: Rgb = Rgb::new(0, 0, 255);

    fn canvas(width: u32, height: u32, scaling: Scaling) -> Canvas {
        Canvas::new(width, height, scaling, BG)
    }

    fn is_background(pixel: &Rgba<u8>) -> bool {
        pixel.0 == BG.to_rgba()
    }

    #[test]
    fn test_center_same_size_is_identity() {
        let source = RgbaImage::from_fn(8, 6, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 7, 255]));
        let output = composite_frame(&source, &canvas(8, 6, Scaling::Center));
        assert_eq!(output, source);
    }

    #[test]
    fn test_fill_covers_canvas() {
        for (sw, sh) in [(1, 1), (3, 7), (640, 10), (10, 640), (17, 13), (1000, 999)] {
            let source = RgbaImage::from_pixel(sw, sh, RED);
            let output = composite_frame(&source, &canvas(64, 36, Scaling::Fill));
            assert_eq!(output.dimensions(), (64, 36));
            assert!(
                output.pixels().all(|p| !is_background(p)),
                "background visible for {sw}x{sh}"
            );
        }
    }

    #[test]
    fn test_letterbox_leaves_bars() {
        let source = RgbaImage::from_pixel(20, 10, RED);
        let output = composite_frame(&source, &canvas(20, 20, Scaling::Letterbox));

        assert_eq!(output.dimensions(), (20, 20));
        assert!(is_background(output.get_pixel(10, 0)));
        assert!(is_background(output.get_pixel(10, 19)));
        assert_eq!(*output.get_pixel(10, 10), RED);
        // 20x10 centered vertically: rows 5..15
        assert!(!is_background(output.get_pixel(0, 5)));
        assert!(is_background(output.get_pixel(0, 4)));
    }

    #[test]
    fn test_one_pixel_source_under_every_policy() {
        let source = RgbaImage::from_pixel(1, 1, RED);
        for scaling in [Scaling::Letterbox, Scaling::Fill, Scaling::Center] {
            let output = composite_frame(&source, &canvas(5, 4, scaling));
            assert_eq!(output.dimensions(), (5, 4));
        }

        let output = composite_frame(&source, &canvas(5, 4, Scaling::Center));
        let foreground: Vec<_> = output
            .enumerate_pixels()
            .filter(|(_, _, p)| !is_background(p))
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(foreground, vec![(2, 1)]);
    }

    #[test]
    fn test_center_crops_large_source() {
        let source = RgbaImage::from_fn(6, 6, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let output = composite_frame(&source, &canvas(2, 2, Scaling::Center));
        assert_eq!(*output.get_pixel(0, 0), Rgba([2, 2, 0, 255]));
        assert_eq!(*output.get_pixel(1, 1), Rgba([3, 3, 0, 255]));
    }

    #[test]
    fn test_alpha_blends_over_background() {
        let source = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 0]));
        let output = composite_frame(&source, &canvas(2, 2, Scaling::Center));
        assert!(output.pixels().all(is_background));

        let half = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
        let output = composite_frame(&half, &canvas(1, 1, Scaling::Center));
        assert_eq!(*output.get_pixel(0, 0), Rgba([128, 0, 127, 255]));
    }

    #[test]
    fn test_degenerate_sizes() {
        let empty = RgbaImage::new(0, 5);
        let output = composite_frame(&empty, &canvas(3, 3, Scaling::Letterbox));
        assert!(output.pixels().all(is_background));

        let source = RgbaImage::from_pixel(4, 4, RED);
        let output = composite_frame(&source, &canvas(0, 3, Scaling::Fill));
        assert_eq!(output.dimensions(), (0, 3));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frames: Vec<_> = (0..9)
            .map(|i| {
                let image = RgbaImage::from_fn(7 + i, 5, |x, y| {
                    Rgba([(x * 20) as u8, (y * 30) as u8, i as u8, 200])
                });
                SourceFrame::new(image, i as i64 * 1000)
            })
            .collect();
        let target = canvas(16, 9, Scaling::Letterbox);

        let sequential: Vec<_> = frames
            .iter()
            .map(|f| composite_frame(&f.image, &target))
            .collect();
        let parallel = composite_all(frames, &target, 4);

        assert_eq!(parallel.len(), 9);
        for (i, (expected, actual)) in sequential.iter().zip(&parallel).enumerate() {
            assert_eq!(expected, &actual.image);
            assert_eq!(actual.duration_us, i as i64 * 1000);
        }
    }
}
