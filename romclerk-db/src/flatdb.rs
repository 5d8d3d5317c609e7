//! Flat reference database for cart-reader firmware lookups.
//!
//! Generates the fixed-stride database consumed by Sanni's cart reader
//! (<https://github.com/sanni/cartreader>): one 256-byte NUL-padded
//! record per ROM of the shape
//! `prgBytes^^chrBytes^^prgCrc32Hex^^chrCrc32Hex^^name^^headerHex`,
//! sorted by name, with no trailing newline. The CHR CRC field is empty
//! when there is no CHR ROM.

use romclerk_core::record::{RomHeader, RomRecord};
use romclerk_core::util::hex_upper;
use romclerk_formats::encode_nes_header;

use crate::error::DbError;
use crate::matcher::TemplateLibrary;

/// Stride of one record, final NUL included.
pub const FLAT_RECORD_SIZE: usize = 256;

/// Serialize the library as a flat reference database.
///
/// NES 2.0 records are limited to the plain console type; iNES records
/// (when enabled) to non-Vs.-Unisystem carts, since the reader hardware
/// only handles home-console boards.
pub fn marshal_flat_db(library: &TemplateLibrary, enable_ines: bool) -> Result<String, DbError> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for record in library.values() {
        let (prg_bytes, chr_bytes, header_hex) = match &record.header {
            RomHeader::Nes20(header) => {
                if header.console_type != 0 {
                    continue;
                }
                let header_bytes = encode_nes_header(record, false, false)?;
                (
                    header.prg_rom_bytes,
                    header.chr_rom_bytes,
                    hex_upper(&header_bytes),
                )
            }
            RomHeader::Ines(header) => {
                if !enable_ines || header.vs_unisystem {
                    continue;
                }
                let header_bytes = encode_nes_header(record, true, false)?;
                (
                    header.prg_rom_bytes,
                    header.chr_rom_bytes,
                    hex_upper(&header_bytes),
                )
            }
            RomHeader::Fds(_) => continue,
        };

        let name = flat_name(record);

        let chr_crc = if chr_bytes > 0 {
            record.chr_digests.crc32_hex()
        } else {
            String::new()
        };

        let mut entry = format!(
            "{prg_bytes}^^{chr_bytes}^^{}^^{chr_crc}^^{name}^^{header_hex}",
            record.prg_digests.crc32_hex(),
        );

        if entry.len() >= FLAT_RECORD_SIZE {
            log::warn!(
                "flat DB record for \"{name}\" is {} bytes, over the {FLAT_RECORD_SIZE}-byte stride; skipping",
                entry.len() + 1,
            );
            continue;
        }

        while entry.len() < FLAT_RECORD_SIZE - 1 {
            entry.push('\0');
        }
        entry.push('\0');

        entries.push((name, entry));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// The name written into a record: the display name, else the filename
/// stem of the relative path with XML entities folded back.
fn flat_name(record: &RomRecord) -> String {
    if !record.name.is_empty() {
        return record.name.clone();
    }

    if !record.relative_path.is_empty() {
        let stem = record
            .relative_path
            .rsplit('/')
            .next()
            .unwrap_or("")
            .trim_end_matches(".nes");
        return stem
            .replace("&amp;", "&")
            .replace("&gt;", ">")
            .replace("&lt;", "<");
    }

    String::new()
}

#[cfg(test)]
#[path = "tests/flatdb_tests.rs"]
mod tests;
