//! ABANIM Core Library
//!
//! This library provides the manifest model and the binary container format
//! for ABANIM boot animations: a fixed header, an embedded JSON manifest, a
//! frame table and the concatenated frame payloads.

pub mod color;
pub mod container;
pub mod limits;
pub mod manifest;
pub mod package;
pub mod pixel_format;
pub mod reader;
pub mod writer;

pub use color::Rgb;
pub use container::{align32, AnimHeader, FrameDescriptor};
pub use limits::{check_limits, LimitWarning};
pub use manifest::{load_manifest, save_manifest, FrameEntry, Manifest, Scaling};
pub use package::{load_payloads, write_package};
pub use pixel_format::PixelFormat;
pub use reader::Package;
pub use writer::{build, write_container, FramePayload, WrittenContainer};

use std::path::PathBuf;

/// Result type for abanim-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for abanim-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest does not contain any frames")]
    EmptySequence,

    #[error("Frame payload '{}' is missing or unreadable: {source}", path.display())]
    MissingPayload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid magic bytes, expected 'ABANIM\\0'")]
    InvalidMagic,

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    #[error("Truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Truncated manifest: declared {declared} bytes, {available} available")]
    TruncatedManifest { declared: u64, available: u64 },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Frame count mismatch: header declares {header}, manifest lists {manifest}")]
    FrameCountMismatch { header: u32, manifest: usize },

    #[error("Truncated frame table: needs bytes up to {end}, stream has {available}")]
    TruncatedFrameTable { end: u64, available: u64 },

    #[error("Truncated payload for frame {index}: needs bytes up to {end}, stream has {available}")]
    TruncatedPayload { index: usize, end: u64, available: u64 },

    #[error("Unsupported pixel format code: {0}")]
    UnsupportedPixelFormat(u32),

    #[error("Frame {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Raw payload for frame {index} is {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    #[error("Payload count mismatch: manifest lists {expected} frames, got {actual} payloads")]
    PayloadCountMismatch { expected: usize, actual: usize },

    #[error("Payload too large for the container: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("Container layout violation: {0}")]
    LayoutViolation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
