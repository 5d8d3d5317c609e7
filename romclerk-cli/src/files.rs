//! File loading and storing for the batch operations.
//!
//! Whole files are read into memory, decoded by extension, and released
//! before the next file is touched. Output writes create parent
//! directories on demand.

use std::path::{Path, PathBuf};

use romclerk_core::record::RomRecord;
use romclerk_core::RomError;
use romclerk_formats::{decode_fds_archive, decode_nes_rom, decode_unif_rom, NesDecodeOptions};

/// Options threaded through every file load.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoadOptions {
    pub enable_ines: bool,
    pub preserve_trainer: bool,
    /// Compute FDS block CRCs during decode
    pub fds_generate_crcs: bool,
}

/// Read and decode one ROM file. `base` is the scan root used to derive
/// the record's relative path.
pub(crate) fn load_rom_file(
    path: &Path,
    base: Option<&Path>,
    options: &LoadOptions,
) -> Result<RomRecord, RomError> {
    let bytes = std::fs::read(path)?;

    let relative_path = base
        .and_then(|base| path.strip_prefix(base).ok())
        .map(path_to_relative)
        .unwrap_or_default();

    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
        .unwrap_or_default();

    let mut record = match extension.as_str() {
        "fds" => decode_fds_archive(&bytes, &relative_path, options.fds_generate_crcs)?,
        "unf" | "unif" => decode_unif_rom(&bytes, &relative_path)?,
        _ => {
            let nes_options = NesDecodeOptions::new()
                .enable_ines(options.enable_ines)
                .preserve_trainer(options.preserve_trainer);
            decode_nes_rom(&bytes, &nes_options, &relative_path)?
        }
    };

    record.filename = path.display().to_string();
    if record.name.is_empty() {
        record.name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
    }

    Ok(record)
}

/// Write encoded ROM bytes back out. With an output base the record's
/// relative path decides the destination (parents created as needed);
/// without one the original file is overwritten.
pub(crate) fn write_rom_file(
    record: &RomRecord,
    bytes: &[u8],
    output_base: Option<&Path>,
) -> std::io::Result<()> {
    let destination = match output_base {
        Some(base) => {
            let mut path = base.to_path_buf();
            for part in record.relative_path.split('/').filter(|part| !part.is_empty()) {
                path.push(part);
            }
            path
        }
        None => PathBuf::from(&record.filename),
    };

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(destination, bytes)
}

fn path_to_relative(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

#[cfg(test)]
#[path = "tests/files_tests.rs"]
mod tests;
