//! ABANIM Decoder Library
//!
//! This library decodes ABANIM containers back into RGBA frames and
//! schedules their playback the way the boot renderer does.

pub mod loader;
pub mod playback;

pub use loader::{load_package, load_package_file, DecodedFrame, LoadedPackage};
pub use playback::PlaybackSchedule;

/// Result type for abanim-decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for abanim-decoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ABANIM core error: {0}")]
    Core(#[from] abanim_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
