//! UNIF chunked-container codec.
//!
//! Follows the UNIF specification at
//! <https://raw.githubusercontent.com/eteran/libunif/master/UNIF_current.txt>.
//!
//! A container is a 32-byte prefix (magic, version, reserved) followed by
//! typed chunks. PRG and CHR ROMs arrive as up to sixteen fragments each
//! (`PRG0`..`PRGF`, `CHR0`..`CHRF`) that concatenate in hex order, with
//! optional sibling `PCKn`/`CCKn` CRC-32 chunks. The decoded pair is
//! lifted into a canonical NES 2.0 record, which is how every other part
//! of the toolset consumes it.

use std::collections::BTreeMap;

use romclerk_core::record::{Nes20Header, RomHeader, RomRecord, SizeSource};
use romclerk_core::RomError;

/// Container magic.
pub const UNIF_MAGIC: [u8; 4] = *b"UNIF";

/// Prefix length: magic, 32-bit version, 24 reserved bytes.
const UNIF_PREFIX_LEN: usize = 32;

/// The `DINF` chunk is always this long; some writers emit it with a
/// corrupt zero length field.
const DINF_LEN: usize = 204;

/// A parsed container before it is lifted into a record.
#[derive(Debug, Clone, Default)]
pub struct UnifImage {
    pub version: u32,
    /// Board identifier from `MAPR`, passed through uninterpreted
    pub board: Option<String>,
    /// Display name from `NAME`
    pub name: Option<String>,
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
    /// Every chunk in the file, keyed by id, including ones the declared
    /// version does not permit
    pub chunks: BTreeMap<String, Vec<u8>>,
}

/// Decode a UNIF container into a canonical NES 2.0 record.
pub fn decode_unif_rom(input: &[u8], relative_path: &str) -> Result<RomRecord, RomError> {
    let image = parse_unif(input)?;

    let mut payload = image.prg.clone();
    payload.extend_from_slice(&image.chr);

    let mut record = RomRecord::with_header(RomHeader::Nes20(Nes20Header::default()));
    record.relative_path = relative_path.to_string();
    record.prg = image.prg;
    record.chr = image.chr;
    record.payload = payload;
    if let Some(name) = image.name {
        record.name = name;
    }

    record.update_sizes(SizeSource::FromSegments, SizeSource::FromSegments);
    record.update_checksums();

    Ok(record)
}

/// Parse the container: header, chunk iteration, version gating, fragment
/// reassembly, and fragment CRC verification.
pub fn parse_unif(input: &[u8]) -> Result<UnifImage, RomError> {
    if input.len() < UNIF_PREFIX_LEN || input[0..4] != UNIF_MAGIC {
        return Err(RomError::bad_magic("UNIF"));
    }

    let version = u32::from_le_bytes([input[4], input[5], input[6], input[7]]);

    let mut chunks: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut position = UNIF_PREFIX_LEN;

    while position < input.len() {
        let (id, data, next) = next_chunk(input, position)?;
        chunks.insert(id, data);
        position = next;
    }

    let mut image = UnifImage {
        version,
        ..Default::default()
    };

    let permitted = |id: &str| chunk_min_version(id).is_some_and(|min| version >= min);

    if permitted("NAME") {
        if let Some(data) = chunks.get("NAME") {
            image.name = Some(nul_terminated_string(data));
        }
    }
    if permitted("MAPR") {
        if let Some(data) = chunks.get("MAPR") {
            image.board = Some(nul_terminated_string(data));
        }
    }

    image.prg = assemble_rom(&chunks, "PRG", "PCK", version)?;
    image.chr = assemble_rom(&chunks, "CHR", "CCK", version)?;
    image.chunks = chunks;

    Ok(image)
}

/// Read the chunk at `position`, returning `(id, data, next_position)`.
fn next_chunk(input: &[u8], position: usize) -> Result<(String, Vec<u8>, usize), RomError> {
    if position + 8 > input.len() {
        return Err(RomError::TruncatedPayload {
            declared: (position + 8) as u64,
            actual: input.len() as u64,
        });
    }

    let id_bytes = &input[position..position + 4];

    // Workaround for a known writer bug: a stray NUL before "DINF" and a
    // zero in the length field even though the 204 data bytes are there.
    if id_bytes == b"\0DIN" && input.get(position + 4) == Some(&b'F') {
        let data_start = position + 9;
        let data_end = data_start + DINF_LEN;
        if data_end > input.len() {
            return Err(RomError::TruncatedPayload {
                declared: data_end as u64,
                actual: input.len() as u64,
            });
        }
        log::debug!("tolerating corrupt DINF chunk with stray NUL and zero length");
        return Ok((
            "DINF".to_string(),
            input[data_start..data_end].to_vec(),
            data_end,
        ));
    }

    let id = String::from_utf8_lossy(id_bytes).into_owned();
    let length = u32::from_le_bytes([
        input[position + 4],
        input[position + 5],
        input[position + 6],
        input[position + 7],
    ]) as usize;

    let data_start = position + 8;
    let data_end = data_start + length;
    if data_end > input.len() {
        return Err(RomError::TruncatedPayload {
            declared: data_end as u64,
            actual: input.len() as u64,
        });
    }

    Ok((id, input[data_start..data_end].to_vec(), data_end))
}

/// Concatenate the `PRG0`..`PRGF` (or `CHR0`..`CHRF`) fragments in hex
/// order, verifying each against its `PCKn`/`CCKn` sibling when present.
/// Fragments the declared version does not permit are ignored.
fn assemble_rom(
    chunks: &BTreeMap<String, Vec<u8>>,
    rom_prefix: &str,
    crc_prefix: &str,
    version: u32,
) -> Result<Vec<u8>, RomError> {
    let mut out = Vec::new();

    for digit in "0123456789ABCDEF".chars() {
        let rom_id = format!("{rom_prefix}{digit}");
        if !chunk_min_version(&rom_id).is_some_and(|min| version >= min) {
            continue;
        }

        let Some(fragment) = chunks.get(&rom_id) else {
            continue;
        };

        let crc_id = format!("{crc_prefix}{digit}");
        if chunk_min_version(&crc_id).is_some_and(|min| version >= min) {
            if let Some(crc_chunk) = chunks.get(&crc_id) {
                if crc_chunk.len() != 4 {
                    return Err(RomError::UnifChecksumMismatch {
                        chunk: rom_id,
                        stored: 0,
                        computed: crc32fast::hash(fragment),
                    });
                }
                let stored =
                    u32::from_le_bytes([crc_chunk[0], crc_chunk[1], crc_chunk[2], crc_chunk[3]]);
                let computed = crc32fast::hash(fragment);
                if stored != computed {
                    return Err(RomError::UnifChecksumMismatch {
                        chunk: rom_id,
                        stored,
                        computed,
                    });
                }
            }
        }

        out.extend_from_slice(fragment);
    }

    Ok(out)
}

/// The UNIF revision that introduced each chunk id; ids are cumulative
/// across versions. Unknown ids return `None`.
fn chunk_min_version(id: &str) -> Option<u32> {
    match id {
        "MAPR" | "READ" | "NAME" => Some(1),
        "DINF" => Some(2),
        _ if id.len() == 4
            && (id.starts_with("PRG") || id.starts_with("CHR"))
            && is_hex_digit(id.as_bytes()[3]) =>
        {
            Some(4)
        }
        "BATR" | "VROR" | "MIRR" => Some(5),
        _ if id.len() == 4
            && (id.starts_with("PCK") || id.starts_with("CCK"))
            && is_hex_digit(id.as_bytes()[3]) =>
        {
            Some(5)
        }
        "CTRL" => Some(7),
        _ => None,
    }
}

fn is_hex_digit(byte: u8) -> bool {
    byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte)
}

/// UNIF strings are NUL-terminated ASCII inside the chunk.
fn nul_terminated_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
#[path = "tests/unif_tests.rs"]
mod tests;
