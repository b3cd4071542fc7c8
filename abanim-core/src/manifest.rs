//! Animation manifest: canvas, scaling policy, playback hints and frame list

use crate::{Error, Result, Rgb};
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

/// Default frame rate used when nothing else is known
pub const DEFAULT_FPS: u32 = 24;
/// Default logical canvas width
pub const DEFAULT_WIDTH: u32 = 640;
/// Default logical canvas height
pub const DEFAULT_HEIGHT: u32 = 360;
/// Default per-frame duration, 1_000_000 / 24 rounded
pub const DEFAULT_FRAME_DURATION_US: u32 = 41_667;
/// Default memory budget advertised to the renderer
pub const DEFAULT_MAX_MEMORY: u64 = 64 * 1024 * 1024;

/// How a source frame is mapped onto the logical canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Fit inside the canvas, keeping aspect ratio; bars use the background
    #[default]
    Letterbox,
    /// Cover the whole canvas, keeping aspect ratio; edges are cropped
    Fill,
    /// No scaling; crop or pad around the center
    Center,
}

impl Scaling {
    /// Name used in the manifest JSON
    pub fn as_str(self) -> &'static str {
        match self {
            Scaling::Letterbox => "letterbox",
            Scaling::Fill => "fill",
            Scaling::Center => "center",
        }
    }
}

/// One frame of the sequence, in playback order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEntry {
    /// Payload file, relative to the manifest's frame root
    #[serde(serialize_with = "serialize_forward_slash")]
    pub path: PathBuf,
    /// Display duration; 0 falls back to the manifest default
    #[serde(default)]
    pub duration_us: u32,
}

impl FrameEntry {
    /// Creates a new frame entry
    pub fn new(path: impl Into<PathBuf>, duration_us: u32) -> Self {
        Self {
            path: path.into(),
            duration_us,
        }
    }

    /// Path with `/` separators regardless of platform
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }
}

/// Validated description of an animation sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub logical_width: u32,
    pub logical_height: u32,
    pub scaling: Scaling,
    pub background: Rgb,
    pub max_memory: u64,
    pub loop_count: u32,
    pub frame_duration_us: u32,
    pub allow_key_skip: bool,
    pub max_total_duration_ms: u32,
    pub frames: Vec<FrameEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            logical_width: DEFAULT_WIDTH,
            logical_height: DEFAULT_HEIGHT,
            scaling: Scaling::Letterbox,
            background: Rgb::BLACK,
            max_memory: DEFAULT_MAX_MEMORY,
            loop_count: 1,
            frame_duration_us: DEFAULT_FRAME_DURATION_US,
            allow_key_skip: true,
            max_total_duration_ms: 0,
            frames: Vec::new(),
        }
    }
}

impl Manifest {
    /// Builds the manifest for a freshly extracted frame sequence.
    ///
    /// Entries without a duration get `1_000_000 / fps`, which also becomes
    /// the manifest's default duration.
    pub fn from_frames(
        frames: Vec<FrameEntry>,
        width: u32,
        height: u32,
        fps: u32,
        scaling: Scaling,
        background: Rgb,
    ) -> Self {
        let frame_duration_us = duration_for_fps(fps);
        let frames = frames
            .into_iter()
            .map(|mut entry| {
                if entry.duration_us == 0 {
                    entry.duration_us = frame_duration_us;
                }
                entry
            })
            .collect();

        Self {
            logical_width: width,
            logical_height: height,
            scaling,
            background,
            loop_count: 1,
            frame_duration_us,
            frames,
            ..Self::default()
        }
    }

    /// Checks the invariants required before packing or after loading
    pub fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::EmptySequence);
        }
        if self.logical_width == 0 || self.logical_height == 0 {
            return Err(Error::InvalidManifest(format!(
                "logical size must be positive, got {}x{}",
                self.logical_width, self.logical_height
            )));
        }
        Ok(())
    }

    /// Serializes to the compact JSON embedded in containers
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses manifest JSON, filling absent fields with their defaults.
    ///
    /// A malformed `background` is reported as [`Error::InvalidColor`];
    /// every other parse or schema failure is [`Error::InvalidManifest`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::InvalidManifest(e.to_string());
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(invalid)?;
        if let Some(background) = value.get("background").and_then(|v| v.as_str()) {
            Rgb::parse_hex(background)?;
        }
        serde_json::from_value(value).map_err(invalid)
    }

    /// Duration written to the frame table for the entry at `index`
    pub fn effective_duration_us(&self, index: usize) -> u32 {
        match self.frames.get(index) {
            Some(entry) if entry.duration_us > 0 => entry.duration_us,
            _ => self.frame_duration_us,
        }
    }

    /// Advisory frame rate derived from the default duration
    pub fn target_fps(&self) -> u32 {
        if self.frame_duration_us == 0 {
            return 0;
        }
        ((1_000_000.0 / self.frame_duration_us as f64).round()) as u32
    }

    /// Sum of the effective durations of one pass through the sequence
    pub fn total_duration_us(&self) -> u64 {
        (0..self.frames.len())
            .map(|i| self.effective_duration_us(i) as u64)
            .sum()
    }
}

/// Frame duration in microseconds for a frame rate, rounded
pub fn duration_for_fps(fps: u32) -> u32 {
    (1_000_000.0 / fps.max(1) as f64).round() as u32
}

/// Loads and validates a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let bytes = fs::read(path)?;
    let manifest = Manifest::deserialize(&bytes)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Writes a manifest as pretty-printed JSON
pub fn save_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)?;
    Ok(())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn serialize_forward_slash<S: Serializer>(
    path: &Path,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&normalize_path(path))
}
