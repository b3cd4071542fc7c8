//! Payload storage kinds

use crate::{Error, Result};
use std::path::Path;

/// How frame payloads are stored in a container.
///
/// Decided once per build from the first frame and recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PixelFormat {
    /// Tightly packed BGRA, `width * height * 4` bytes
    Bgra32 = 0,
    /// A complete image file (BMP in practice) decoded by an image codec
    Encoded = 1,
}

impl PixelFormat {
    /// Resolves the storage kind from a frame file name: `.raw` is raw BGRA,
    /// everything else is treated as an encoded image
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("raw") => PixelFormat::Bgra32,
            _ => PixelFormat::Encoded,
        }
    }

    /// Maps a header code back to a format
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(PixelFormat::Bgra32),
            1 => Ok(PixelFormat::Encoded),
            other => Err(Error::UnsupportedPixelFormat(other)),
        }
    }

    /// Header code
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn is_raw(self) -> bool {
        self == PixelFormat::Bgra32
    }
}
