//! ABANIM container header and frame table records

use crate::{Error, PixelFormat, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Magic bytes for ABANIM format: "ABANIM\0" padded to 8 bytes
pub const MAGIC: [u8; 8] = *b"ABANIM\0\0";

/// Current container version
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

/// Size of the fixed header record in bytes
pub const HEADER_SIZE: u16 = 78;

/// Size of one frame table record in bytes
pub const DESCRIPTOR_SIZE: u64 = 16;

/// Alignment of the frame table and frame data sections
pub const ALIGNMENT: u64 = 32;

/// Header flag: the container embeds a manifest
pub const FLAG_HAS_MANIFEST: u32 = 0x1;
/// Header flag: payloads are raw BGRA pixels
pub const FLAG_RAW_PIXELS: u32 = 0x2;

/// Rounds `value` up to the next multiple of 32
pub fn align32(value: u64) -> u64 {
    value.div_ceil(ALIGNMENT) * ALIGNMENT
}

/// ABANIM file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimHeader {
    pub version_major: u16,
    pub version_minor: u16,
    /// Size of this record as written; the manifest starts right after it
    pub header_size: u16,
    /// Bit 0: manifest present, bit 1: raw pixel payloads
    pub flags: u32,
    /// Length of the embedded manifest JSON
    pub manifest_size: u32,
    pub frame_count: u32,
    /// Absolute offset of the frame table
    pub frame_table_offset: u32,
    /// Absolute offset of the first payload
    pub frame_data_offset: u32,
    /// Logical canvas width in pixels
    pub width: u32,
    /// Logical canvas height in pixels
    pub height: u32,
    pub pixel_format: u32,
    /// Advisory only; per-frame durations are authoritative
    pub target_fps: u32,
    pub loop_count: u32,
    pub reserved: [u32; 6],
}

impl AnimHeader {
    /// Reads a header from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        // Read and validate magic bytes
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version_major = reader.read_u16::<LittleEndian>()?;
        if version_major != VERSION_MAJOR {
            return Err(Error::UnsupportedVersion(version_major));
        }
        let version_minor = reader.read_u16::<LittleEndian>()?;
        let header_size = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u32::<LittleEndian>()?;
        let manifest_size = reader.read_u32::<LittleEndian>()?;
        let frame_count = reader.read_u32::<LittleEndian>()?;
        let frame_table_offset = reader.read_u32::<LittleEndian>()?;
        let frame_data_offset = reader.read_u32::<LittleEndian>()?;
        let width = reader.read_u32::<LittleEndian>()?;
        let height = reader.read_u32::<LittleEndian>()?;
        let pixel_format = reader.read_u32::<LittleEndian>()?;
        let target_fps = reader.read_u32::<LittleEndian>()?;
        let loop_count = reader.read_u32::<LittleEndian>()?;

        let mut reserved = [0u32; 6];
        reader.read_u32_into::<LittleEndian>(&mut reserved)?;

        Ok(Self {
            version_major,
            version_minor,
            header_size,
            flags,
            manifest_size,
            frame_count,
            frame_table_offset,
            frame_data_offset,
            width,
            height,
            pixel_format,
            target_fps,
            loop_count,
            reserved,
        })
    }

    /// Writes the header to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version_major)?;
        writer.write_u16::<LittleEndian>(self.version_minor)?;
        writer.write_u16::<LittleEndian>(self.header_size)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.manifest_size)?;
        writer.write_u32::<LittleEndian>(self.frame_count)?;
        writer.write_u32::<LittleEndian>(self.frame_table_offset)?;
        writer.write_u32::<LittleEndian>(self.frame_data_offset)?;
        writer.write_u32::<LittleEndian>(self.width)?;
        writer.write_u32::<LittleEndian>(self.height)?;
        writer.write_u32::<LittleEndian>(self.pixel_format)?;
        writer.write_u32::<LittleEndian>(self.target_fps)?;
        writer.write_u32::<LittleEndian>(self.loop_count)?;
        for value in self.reserved {
            writer.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    pub fn has_manifest(&self) -> bool {
        self.flags & FLAG_HAS_MANIFEST != 0
    }

    pub fn has_raw_pixels(&self) -> bool {
        self.flags & FLAG_RAW_PIXELS != 0
    }

    /// Decodes the pixel format code
    pub fn format(&self) -> Result<PixelFormat> {
        PixelFormat::from_code(self.pixel_format)
    }

    /// Bytes occupied by the frame table
    pub fn frame_table_len(&self) -> u64 {
        self.frame_count as u64 * DESCRIPTOR_SIZE
    }
}

/// Frame table record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Payload offset relative to the frame data section
    pub offset: u64,
    /// Payload length in bytes
    pub length: u32,
    pub duration_us: u32,
}

impl FrameDescriptor {
    /// Creates a new frame descriptor
    pub fn new(offset: u64, length: u32, duration_us: u32) -> Self {
        Self {
            offset,
            length,
            duration_us,
        }
    }

    /// Reads a descriptor from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let offset = reader.read_u64::<LittleEndian>()?;
        let length = reader.read_u32::<LittleEndian>()?;
        let duration_us = reader.read_u32::<LittleEndian>()?;
        Ok(Self::new(offset, length, duration_us))
    }

    /// Writes the descriptor to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.length)?;
        writer.write_u32::<LittleEndian>(self.duration_us)?;
        Ok(())
    }

    /// Offset one past the payload, relative to the frame data section
    pub fn end(&self) -> u64 {
        self.offset + self.length as u64
    }
}
