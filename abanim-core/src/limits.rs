//! Limits enforced by the boot-time renderer
//!
//! Containers outside these limits are still well-formed, but the firmware
//! refuses or clamps them, so the packer and `info` surface them as warnings.

use crate::container::{AnimHeader, FrameDescriptor};
use std::fmt;

pub const MAX_FRAME_DIMENSION: u32 = 1920;
pub const MAX_FRAME_COUNT: u32 = 4096;
pub const MAX_FRAME_SIZE_BYTES: u32 = 16 * 1024 * 1024;
pub const MAX_LOOP_COUNT: u32 = 100;
pub const MIN_FRAME_DURATION_US: u32 = 10_000;

/// A renderer limit the container exceeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitWarning {
    CanvasSize { width: u32, height: u32 },
    FrameCount(u32),
    FrameSize { index: usize, length: u32 },
    FrameDuration { index: usize, duration_us: u32 },
    LoopCount(u32),
}

impl fmt::Display for LimitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWarning::CanvasSize { width, height } => write!(
                f,
                "canvas {width}x{height} is outside 1..={MAX_FRAME_DIMENSION} per side"
            ),
            LimitWarning::FrameCount(count) => {
                write!(f, "{count} frames exceeds the renderer maximum of {MAX_FRAME_COUNT}")
            }
            LimitWarning::FrameSize { index, length } => write!(
                f,
                "frame {index} payload is {length} bytes, allowed 1..={MAX_FRAME_SIZE_BYTES}"
            ),
            LimitWarning::FrameDuration { index, duration_us } => write!(
                f,
                "frame {index} lasts {duration_us}us and will be shown for {MIN_FRAME_DURATION_US}us"
            ),
            LimitWarning::LoopCount(count) => {
                write!(f, "loop count {count} will be clamped to {MAX_LOOP_COUNT}")
            }
        }
    }
}

/// Lists every renderer limit the container exceeds
pub fn check_limits(header: &AnimHeader, descriptors: &[FrameDescriptor]) -> Vec<LimitWarning> {
    let mut warnings = Vec::new();

    let valid_side = |side: u32| (1..=MAX_FRAME_DIMENSION).contains(&side);
    if !valid_side(header.width) || !valid_side(header.height) {
        warnings.push(LimitWarning::CanvasSize {
            width: header.width,
            height: header.height,
        });
    }
    if header.frame_count > MAX_FRAME_COUNT {
        warnings.push(LimitWarning::FrameCount(header.frame_count));
    }
    for (index, descriptor) in descriptors.iter().enumerate() {
        if descriptor.length == 0 || descriptor.length > MAX_FRAME_SIZE_BYTES {
            warnings.push(LimitWarning::FrameSize {
                index,
                length: descriptor.length,
            });
        }
        if descriptor.duration_us < MIN_FRAME_DURATION_US {
            warnings.push(LimitWarning::FrameDuration {
                index,
                duration_us: descriptor.duration_us,
            });
        }
    }
    if header.loop_count > MAX_LOOP_COUNT {
        warnings.push(LimitWarning::LoopCount(header.loop_count));
    }

    warnings
}
