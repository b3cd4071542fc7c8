//! Container serialization

use crate::container::{
    align32, AnimHeader, FrameDescriptor, DESCRIPTOR_SIZE, FLAG_HAS_MANIFEST, FLAG_RAW_PIXELS,
    HEADER_SIZE, VERSION_MAJOR, VERSION_MINOR,
};
use crate::limits::{check_limits, LimitWarning};
use crate::{Error, Manifest, PixelFormat, Result};
use std::io::{Read, Write};
use std::path::PathBuf;

/// A ready-to-store frame payload: raw BGRA pixels or an encoded image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePayload {
    /// Manifest path the bytes were loaded from
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl FramePayload {
    /// Creates a new payload
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

/// Header and frame table of a container that was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenContainer {
    pub header: AnimHeader,
    pub descriptors: Vec<FrameDescriptor>,
}

impl WrittenContainer {
    /// Renderer limits the written container exceeds
    pub fn limit_warnings(&self) -> Vec<LimitWarning> {
        check_limits(&self.header, &self.descriptors)
    }

    /// Total bytes in the frame data section
    pub fn total_payload_bytes(&self) -> u64 {
        self.descriptors.iter().map(|d| d.length as u64).sum()
    }
}

/// Serializes a manifest and its payloads into container bytes
pub fn build(manifest: &Manifest, payloads: &[FramePayload]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_container(manifest, payloads, &mut buffer)?;
    Ok(buffer)
}

/// Streams a container to `writer` and returns its header and frame table.
///
/// Payloads must already be composited to the manifest's logical canvas.
pub fn write_container<W: Write>(
    manifest: &Manifest,
    payloads: &[FramePayload],
    writer: &mut W,
) -> Result<WrittenContainer> {
    manifest.validate()?;
    if payloads.len() != manifest.frames.len() {
        return Err(Error::PayloadCountMismatch {
            expected: manifest.frames.len(),
            actual: payloads.len(),
        });
    }

    let pixel_format = PixelFormat::from_path(&manifest.frames[0].path);
    let manifest_bytes = manifest.serialize()?;
    let frame_count = manifest.frames.len() as u64;

    let frame_table_offset = align32(HEADER_SIZE as u64 + manifest_bytes.len() as u64);
    let frame_data_offset = align32(frame_table_offset + frame_count * DESCRIPTOR_SIZE);

    let mut descriptors = Vec::with_capacity(payloads.len());
    let mut cursor = 0u64;
    for (index, payload) in payloads.iter().enumerate() {
        let length = to_u32(payload.data.len() as u64, "frame payload length")?;
        descriptors.push(FrameDescriptor::new(
            cursor,
            length,
            manifest.effective_duration_us(index),
        ));
        cursor += length as u64;
    }

    let mut flags = 0;
    if !manifest_bytes.is_empty() {
        flags |= FLAG_HAS_MANIFEST;
    }
    if pixel_format.is_raw() {
        flags |= FLAG_RAW_PIXELS;
    }

    let header = AnimHeader {
        version_major: VERSION_MAJOR,
        version_minor: VERSION_MINOR,
        header_size: HEADER_SIZE,
        flags,
        manifest_size: to_u32(manifest_bytes.len() as u64, "manifest size")?,
        frame_count: to_u32(frame_count, "frame count")?,
        frame_table_offset: to_u32(frame_table_offset, "frame table offset")?,
        frame_data_offset: to_u32(frame_data_offset, "frame data offset")?,
        width: manifest.logical_width,
        height: manifest.logical_height,
        pixel_format: pixel_format.code(),
        target_fps: manifest.target_fps(),
        loop_count: manifest.loop_count,
        reserved: [0; 6],
    };

    log::debug!(
        "Writing container: {} frames, format {:?}, table at {}, data at {}",
        header.frame_count,
        pixel_format,
        frame_table_offset,
        frame_data_offset
    );

    header.write(writer)?;
    writer.write_all(&manifest_bytes)?;
    write_padding(writer, frame_table_offset - HEADER_SIZE as u64 - manifest_bytes.len() as u64)?;

    for descriptor in &descriptors {
        descriptor.write(writer)?;
    }
    write_padding(writer, frame_data_offset - frame_table_offset - frame_count * DESCRIPTOR_SIZE)?;

    for payload in payloads {
        writer.write_all(&payload.data)?;
    }

    Ok(WrittenContainer {
        header,
        descriptors,
    })
}

fn write_padding<W: Write>(writer: &mut W, len: u64) -> Result<()> {
    std::io::copy(&mut std::io::repeat(0).take(len), writer)?;
    Ok(())
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::PayloadTooLarge(format!("{what} {value} exceeds u32")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{AnimHeader, FrameDescriptor};
    use crate::{FrameEntry, Rgb, Scaling};
    use std::io::Cursor;

    fn manifest_with(paths: &[(&str, u32)]) -> Manifest {
        Manifest {
            logical_width: 4,
            logical_height: 4,
            scaling: Scaling::Letterbox,
            background: Rgb::BLACK,
            frames: paths
                .iter()
                .map(|(path, duration)| FrameEntry::new(*path, *duration))
                .collect(),
            ..Manifest::default()
        }
    }

    #[test]
    fn test_single_raw_frame_layout() {
        let manifest = manifest_with(&[("a.raw", 100_000)]);
        let payloads = vec![FramePayload::new("a.raw", vec![0u8; 64])];

        let bytes = build(&manifest, &payloads).unwrap();
        let mut cursor = Cursor::new(&bytes[..]);
        let header = AnimHeader::read(&mut cursor).unwrap();

        assert_eq!(header.frame_count, 1);
        assert_eq!(header.pixel_format, 0);
        assert_ne!(header.flags & FLAG_RAW_PIXELS, 0);
        assert_ne!(header.flags & FLAG_HAS_MANIFEST, 0);
        assert_eq!(header.width, 4);
        assert_eq!(header.height, 4);

        cursor.set_position(header.frame_table_offset as u64);
        let descriptor = FrameDescriptor::read(&mut cursor).unwrap();
        assert_eq!(descriptor, FrameDescriptor::new(0, 64, 100_000));

        assert_eq!(bytes.len() as u64, header.frame_data_offset as u64 + 64);
    }

    #[test]
    fn test_offsets_are_aligned_and_padding_is_zero() {
        let manifest = manifest_with(&[("f1.bmp", 1), ("f2.bmp", 2), ("f3.bmp", 3)]);
        let payloads = vec![
            FramePayload::new("f1.bmp", vec![1; 7]),
            FramePayload::new("f2.bmp", vec![2; 13]),
            FramePayload::new("f3.bmp", vec![3; 1]),
        ];

        let bytes = build(&manifest, &payloads).unwrap();
        let header = AnimHeader::read(&mut Cursor::new(&bytes[..])).unwrap();
        let table = header.frame_table_offset as usize;
        let data = header.frame_data_offset as usize;

        assert_eq!(table % 32, 0);
        assert_eq!(data % 32, 0);
        assert_eq!(header.pixel_format, PixelFormat::Encoded.code());
        assert_eq!(header.flags & FLAG_RAW_PIXELS, 0);

        let manifest_end = HEADER_SIZE as usize + header.manifest_size as usize;
        assert!(bytes[manifest_end..table].iter().all(|&b| b == 0));
        assert!(bytes[table + 3 * 16..data].iter().all(|&b| b == 0));
        let expected: Vec<u8> = [vec![1u8; 7], vec![2u8; 13], vec![3u8; 1]].concat();
        assert_eq!(&bytes[data..], &expected[..]);
    }

    #[test]
    fn test_descriptors_tile_data_region() {
        let manifest = manifest_with(&[("a.raw", 10), ("b.raw", 0), ("c.raw", 30)]);
        let payloads = vec![
            FramePayload::new("a.raw", vec![0; 64]),
            FramePayload::new("b.raw", vec![0; 64]),
            FramePayload::new("c.raw", vec![0; 64]),
        ];

        let bytes = build(&manifest, &payloads).unwrap();
        let mut cursor = Cursor::new(&bytes[..]);
        let header = AnimHeader::read(&mut cursor).unwrap();
        cursor.set_position(header.frame_table_offset as u64);

        let descriptors: Vec<_> = (0..3)
            .map(|_| FrameDescriptor::read(&mut cursor).unwrap())
            .collect();

        let mut expected_offset = 0;
        for descriptor in &descriptors {
            assert_eq!(descriptor.offset, expected_offset);
            expected_offset = descriptor.end();
        }
        assert_eq!(expected_offset, 192);
        assert_eq!(descriptors[1].duration_us, manifest.frame_duration_us);
    }

    #[test]
    fn test_rejects_empty_and_mismatched_payloads() {
        let empty = manifest_with(&[]);
        assert!(matches!(build(&empty, &[]), Err(Error::EmptySequence)));

        let manifest = manifest_with(&[("a.raw", 1), ("b.raw", 1)]);
        let payloads = vec![FramePayload::new("a.raw", vec![0; 64])];
        assert!(matches!(
            build(&manifest, &payloads),
            Err(Error::PayloadCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_returns_written_frame_table() {
        let manifest = manifest_with(&[("a.raw", 20_000), ("b.raw", 5_000)]);
        let payloads = vec![
            FramePayload::new("a.raw", vec![0; 64]),
            FramePayload::new("b.raw", vec![1; 64]),
        ];

        let mut bytes = Vec::new();
        let written = write_container(&manifest, &payloads, &mut bytes).unwrap();
        assert_eq!(
            written.descriptors,
            vec![
                FrameDescriptor::new(0, 64, 20_000),
                FrameDescriptor::new(64, 64, 5_000),
            ]
        );
        assert_eq!(written.total_payload_bytes(), 128);
        assert_eq!(
            written.header,
            AnimHeader::read(&mut Cursor::new(&bytes[..])).unwrap()
        );
        assert_eq!(
            written.limit_warnings(),
            vec![LimitWarning::FrameDuration {
                index: 1,
                duration_us: 5_000
            }]
        );
    }

    #[test]
    fn test_target_fps_is_derived() {
        let mut manifest = manifest_with(&[("a.bmp", 1)]);
        manifest.frame_duration_us = 40_000;
        let bytes = build(&manifest, &[FramePayload::new("a.bmp", vec![9])]).unwrap();
        let header = AnimHeader::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.target_fps, 25);
    }
}
