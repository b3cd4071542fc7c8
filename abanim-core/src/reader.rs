//! Container parsing and structural validation

use crate::container::{align32, AnimHeader, FrameDescriptor, HEADER_SIZE, MAGIC};
use crate::{Error, Manifest, PixelFormat, Result};
use std::io::Cursor;

/// A parsed container borrowing its payloads from the input bytes.
///
/// Every check runs in [`Package::parse`]; a `Package` only exists for
/// streams whose payload ranges all lie inside the input.
#[derive(Debug, Clone)]
pub struct Package<'a> {
    pub header: AnimHeader,
    pub manifest: Manifest,
    pub descriptors: Vec<FrameDescriptor>,
    pub pixel_format: PixelFormat,
    bytes: &'a [u8],
}

impl<'a> Package<'a> {
    /// Parses and validates container bytes
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let available = bytes.len() as u64;

        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        if bytes.len() < HEADER_SIZE as usize {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE as usize,
                actual: bytes.len(),
            });
        }

        let header = AnimHeader::read(&mut Cursor::new(bytes))?;
        if header.header_size < HEADER_SIZE {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE as usize,
                actual: header.header_size as usize,
            });
        }

        // The manifest is parsed from exactly `manifest_size` bytes
        let manifest_start = header.header_size as u64;
        let manifest_end = manifest_start + header.manifest_size as u64;
        if manifest_end > available {
            return Err(Error::TruncatedManifest {
                declared: header.manifest_size as u64,
                available: available.saturating_sub(manifest_start),
            });
        }
        let manifest = Manifest::deserialize(&bytes[manifest_start as usize..manifest_end as usize])
            .map_err(|e| match e {
                Error::InvalidColor(text) => {
                    Error::InvalidManifest(format!("invalid background color '{text}'"))
                }
                other => other,
            })?;
        manifest.validate()?;

        if header.frame_count as usize != manifest.frames.len() {
            return Err(Error::FrameCountMismatch {
                header: header.frame_count,
                manifest: manifest.frames.len(),
            });
        }

        let table_start = header.frame_table_offset as u64;
        let table_end = table_start + header.frame_table_len();
        if table_end > available {
            return Err(Error::TruncatedFrameTable {
                end: table_end,
                available,
            });
        }

        let mut cursor = Cursor::new(&bytes[table_start as usize..table_end as usize]);
        let descriptors = (0..header.frame_count)
            .map(|_| FrameDescriptor::read(&mut cursor))
            .collect::<Result<Vec<_>>>()?;

        for (index, descriptor) in descriptors.iter().enumerate() {
            let end = (header.frame_data_offset as u64)
                .checked_add(descriptor.offset)
                .and_then(|start| start.checked_add(descriptor.length as u64))
                .unwrap_or(u64::MAX);
            if end > available {
                return Err(Error::TruncatedPayload {
                    index,
                    end,
                    available,
                });
            }
        }

        let pixel_format = header.format()?;

        log::debug!(
            "Parsed container: {} frames, {}x{}, format {:?}",
            header.frame_count,
            header.width,
            header.height,
            pixel_format
        );

        Ok(Self {
            header,
            manifest,
            descriptors,
            pixel_format,
            bytes,
        })
    }

    /// Number of frames in the container
    pub fn frame_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Payload bytes of the frame at `index`
    pub fn payload(&self, index: usize) -> Option<&'a [u8]> {
        let descriptor = self.descriptors.get(index)?;
        let start = self.header.frame_data_offset as usize + descriptor.offset as usize;
        Some(&self.bytes[start..start + descriptor.length as usize])
    }

    /// Iterates `(descriptor, payload)` pairs in frame order
    pub fn frames(&self) -> impl Iterator<Item = (&FrameDescriptor, &'a [u8])> + '_ {
        self.descriptors
            .iter()
            .enumerate()
            .filter_map(move |(index, descriptor)| Some((descriptor, self.payload(index)?)))
    }

    /// Total bytes in the frame data section
    pub fn total_payload_bytes(&self) -> u64 {
        self.descriptors.iter().map(|d| d.length as u64).sum()
    }

    /// Checks the alignment and tiling rules a well-formed writer follows.
    ///
    /// Not part of [`Package::parse`]: containers that violate them can still
    /// be played back.
    pub fn verify_layout(&self) -> Result<()> {
        let header = &self.header;
        let expected_table =
            align32(header.header_size as u64 + header.manifest_size as u64);
        if header.frame_table_offset as u64 != expected_table {
            return Err(Error::LayoutViolation(format!(
                "frame table at {}, expected {}",
                header.frame_table_offset, expected_table
            )));
        }

        let expected_data = align32(header.frame_table_offset as u64 + header.frame_table_len());
        if header.frame_data_offset as u64 != expected_data {
            return Err(Error::LayoutViolation(format!(
                "frame data at {}, expected {}",
                header.frame_data_offset, expected_data
            )));
        }

        let mut expected_offset = 0u64;
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.offset != expected_offset {
                return Err(Error::LayoutViolation(format!(
                    "frame {} starts at {}, expected {}",
                    index, descriptor.offset, expected_offset
                )));
            }
            expected_offset = descriptor.end();
        }

        Ok(())
    }
}
