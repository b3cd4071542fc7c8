//! Packing frame files from disk into a container file

use crate::writer::write_container;
use crate::{AnimHeader, Error, FramePayload, Manifest, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads every frame file named by the manifest, relative to `root_dir`
pub fn load_payloads(manifest: &Manifest, root_dir: &Path) -> Result<Vec<FramePayload>> {
    manifest
        .frames
        .iter()
        .map(|entry| {
            let path = root_dir.join(&entry.path);
            let data = fs::read(&path).map_err(|source| Error::MissingPayload {
                path: path.clone(),
                source,
            })?;
            log::debug!("Loaded frame {} ({} bytes)", path.display(), data.len());
            Ok(FramePayload::new(entry.path.clone(), data))
        })
        .collect()
}

/// Packs a manifest and its frame files into `output`.
///
/// The container is written to a temporary file next to `output` and only
/// renamed into place once it is complete, so a failed build never leaves a
/// readable partial container behind.
pub fn write_package(manifest: &Manifest, root_dir: &Path, output: &Path) -> Result<AnimHeader> {
    manifest.validate()?;
    let payloads = load_payloads(manifest, root_dir)?;

    let directory = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(directory)?;

    let mut writer = BufWriter::new(temp);
    let written = write_container(manifest, &payloads, &mut writer)?;
    writer.flush()?;
    let temp = writer.into_inner().map_err(|e| e.into_error())?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| e.error)?;

    for warning in written.limit_warnings() {
        log::warn!("{}: {}", output.display(), warning);
    }

    log::info!(
        "Packed {} frames ({} payload bytes) into {}",
        written.header.frame_count,
        written.total_payload_bytes(),
        output.display()
    );

    Ok(written.header)
}
