//! Famicom Disk System / QD disk image codec.
//!
//! References:
//! <https://wiki.nesdev.com/w/index.php/FDS_file_format> for the optional
//! 16-byte archive prefix, and
//! <https://wiki.nesdev.com/w/index.php/FDS_disk_format> for the block
//! chain on each side. The CRC algorithm comes from
//! <http://forums.nesdev.com/viewtopic.php?p=194867>.
//!
//! Real dumps come in two layouts: most have their per-block CRC fields
//! stripped, some retain them. The decoder detects which one it is looking
//! at from the block tags and records that on each side, so an unedited
//! archive re-encodes byte-identically either way.

use std::collections::BTreeMap;

use romclerk_core::checksum::DigestSet;
use romclerk_core::fds::{
    FdsArchive, FdsDisk, FdsFile, FdsFileData, FdsReserved, FdsSide, BLOCK_DISK_INFO,
    BLOCK_FILE_DATA, BLOCK_FILE_HEADER, BLOCK_FILE_LAYOUT, FDS_SIDE_SIZE, QD_SIDE_SIZE,
};
use romclerk_core::record::{RomHeader, RomRecord};
use romclerk_core::{fds_block_crc, RomError};

/// Optional archive prefix: `FDS<EOF>`, a side count, then 11 zero bytes.
pub const FDS_HEADER_MAGIC: [u8; 4] = *b"FDS\x1a";
const FDS_HEADER_SIZE: usize = 16;

/// Every side opens with this signature right after the info-block tag.
pub const FDS_SIDE_MAGIC: &[u8; 14] = b"*NINTENDO-HVC*";

/// Length of the disk-info block, tag included, CRC excluded.
const INFO_BLOCK_LEN: usize = 0x38;

/// Options controlling how an archive is re-encoded.
#[derive(Debug, Clone, Default)]
pub struct FdsEncodeOptions {
    /// Emit the 16-byte archive prefix. Most tools do not want one.
    pub write_header: bool,
    /// Emit per-block CRC fields
    pub write_checksums: bool,
    /// Recompute CRCs instead of writing the stored values
    pub generate_checksums: bool,
    /// Pad sides to the 65536-byte QD stride instead of 65500
    pub write_qd: bool,
}

impl FdsEncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_header(mut self, write: bool) -> Self {
        self.write_header = write;
        self
    }

    pub fn write_checksums(mut self, write: bool) -> Self {
        self.write_checksums = write;
        self
    }

    pub fn generate_checksums(mut self, generate: bool) -> Self {
        self.generate_checksums = generate;
        self
    }

    pub fn write_qd(mut self, qd: bool) -> Self {
        self.write_qd = qd;
        self
    }
}

/// Decode a `.fds` (or QD) image into a canonical record holding the full
/// archive hierarchy. The whole-image digests cover the input exactly as
/// given, archive prefix included, since FDS matching is whole-archive.
pub fn decode_fds_archive(
    input: &[u8],
    relative_path: &str,
    generate_checksums: bool,
) -> Result<RomRecord, RomError> {
    let side_slices = stripped_side_slices(input)?;

    let mut sides = Vec::with_capacity(side_slices.len());
    for slice in &side_slices {
        let mut side = decode_fds_side(slice, generate_checksums)?;
        side.digests = DigestSet::of(slice);
        side.size = slice.len() as u64;
        sides.push(side);
    }

    // Group sides into disks by their stored disk number, ascending;
    // sides keep their image order within each disk.
    let mut disks: BTreeMap<u8, Vec<FdsSide>> = BTreeMap::new();
    for side in sides {
        disks.entry(side.disk_number).or_default().push(side);
    }

    let archive = FdsArchive {
        disks: disks
            .into_iter()
            .map(|(disk_number, sides)| FdsDisk { disk_number, sides })
            .collect(),
    };

    let mut record = RomRecord::with_header(RomHeader::Fds(archive));
    record.relative_path = relative_path.to_string();
    record.size = input.len() as u64;
    record.digests = DigestSet::of(input);

    Ok(record)
}

/// Decode one side. `generate_checksums` computes every block CRC from the
/// data; otherwise CRCs are taken from the image when present and left
/// zero when stripped.
pub fn decode_fds_side(side: &[u8], generate_checksums: bool) -> Result<FdsSide, RomError> {
    if side.len() < FDS_SIDE_SIZE {
        return Err(RomError::BadArchiveLength {
            len: side.len() as u64,
        });
    }

    if side[0x00] != BLOCK_DISK_INFO {
        return Err(RomError::BadBlockTag {
            expected: BLOCK_DISK_INFO,
            found: side[0x00],
            offset: 0x00,
        });
    }

    let mut decoded = FdsSide {
        manufacturer_code: side[0x0f],
        game_name: [side[0x10], side[0x11], side[0x12]],
        game_type: side[0x13],
        revision_number: side[0x14],
        side_number: side[0x15],
        disk_number: side[0x16],
        disk_type: side[0x17],
        boot_file_id: side[0x19],
        manufacturing_date: [side[0x1f], side[0x20], side[0x21]],
        country_code: side[0x22],
        rewrite_date: [side[0x2c], side[0x2d], side[0x2e]],
        disk_writer_serial: u16::from_le_bytes([side[0x31], side[0x32]]),
        rewrite_count: side[0x34],
        actual_disk_side: side[0x35],
        price: side[0x37],
        ..Default::default()
    };

    decoded.reserved = FdsReserved([
        side[0x18],
        side[0x1a],
        side[0x1b],
        side[0x1c],
        side[0x1d],
        side[0x1e],
        side[0x23],
        side[0x24],
        side[0x25],
        side[0x26],
        side[0x27],
        side[0x28],
        side[0x29],
        side[0x2a],
        side[0x2b],
        side[0x2f],
        side[0x30],
        side[0x33],
        side[0x36],
    ]);

    // Layout detection: a CRC-stripped side has the file-layout tag right
    // at 0x38; a CRC-bearing side has two CRC bytes there and the tag at
    // 0x3A. When both offsets look like the tag (a stored CRC whose low
    // byte happens to be 0x02), prefer the stripped reading.
    let (crcs_stored, crc_offset): (bool, usize) =
        if side[INFO_BLOCK_LEN] == BLOCK_FILE_LAYOUT && side[INFO_BLOCK_LEN + 2] != BLOCK_FILE_LAYOUT
        {
            (false, 0)
        } else if side[INFO_BLOCK_LEN + 2] == BLOCK_FILE_LAYOUT {
            (true, 2)
        } else if side[INFO_BLOCK_LEN] == BLOCK_FILE_LAYOUT {
            (false, 0)
        } else {
            return Err(RomError::BadBlockTag {
                expected: BLOCK_FILE_LAYOUT,
                found: side[INFO_BLOCK_LEN],
                offset: INFO_BLOCK_LEN,
            });
        };

    decoded.crcs_stored = crcs_stored;

    if crcs_stored {
        decoded.disk_info_crc = u16::from_le_bytes([side[0x38], side[0x39]]);
    }
    if generate_checksums {
        let mut info_block = side[0..INFO_BLOCK_LEN].to_vec();
        info_block.extend_from_slice(&[0, 0]);
        decoded.disk_info_crc = fds_block_crc(&info_block)?;
    }

    let layout_at = INFO_BLOCK_LEN + crc_offset;
    if side[layout_at] != BLOCK_FILE_LAYOUT {
        return Err(RomError::BadBlockTag {
            expected: BLOCK_FILE_LAYOUT,
            found: side[layout_at],
            offset: layout_at,
        });
    }
    let file_count = side[layout_at + 1];

    if crcs_stored {
        decoded.file_table_crc = u16::from_le_bytes([side[layout_at + 2], side[layout_at + 3]]);
    }
    if generate_checksums {
        let layout_block = [BLOCK_FILE_LAYOUT, file_count, 0, 0];
        decoded.file_table_crc = fds_block_crc(&layout_block)?;
    }

    let mut cursor = layout_at + 2 + crc_offset;

    for _ in 0..file_count {
        if cursor + 17 + crc_offset > side.len() {
            return Err(RomError::TruncatedPayload {
                declared: (cursor + 17 + crc_offset) as u64,
                actual: side.len() as u64,
            });
        }

        if side[cursor] != BLOCK_FILE_HEADER {
            return Err(RomError::BadBlockTag {
                expected: BLOCK_FILE_HEADER,
                found: side[cursor],
                offset: cursor,
            });
        }

        let mut file = FdsFile {
            file_number: side[cursor + 1],
            file_identification_code: side[cursor + 2],
            file_address: u16::from_le_bytes([side[cursor + 11], side[cursor + 12]]),
            file_size: u16::from_le_bytes([side[cursor + 13], side[cursor + 14]]),
            file_type: side[cursor + 15],
            ..Default::default()
        };
        file.file_name
            .copy_from_slice(&side[cursor + 3..cursor + 11]);

        if crcs_stored {
            file.file_metadata_crc =
                u16::from_le_bytes([side[cursor + 16], side[cursor + 17]]);
        }
        if generate_checksums {
            let mut header_block = side[cursor..cursor + 16].to_vec();
            header_block.extend_from_slice(&[0, 0]);
            file.file_metadata_crc = fds_block_crc(&header_block)?;
        }

        let data_tag_at = cursor + 16 + crc_offset;
        let data_len = usize::from(file.file_size);
        let data_end = data_tag_at + 1 + data_len;
        if data_end + crc_offset > side.len() {
            return Err(RomError::TruncatedPayload {
                declared: (data_end + crc_offset) as u64,
                actual: side.len() as u64,
            });
        }

        if side[data_tag_at] != BLOCK_FILE_DATA {
            return Err(RomError::BadBlockTag {
                expected: BLOCK_FILE_DATA,
                found: side[data_tag_at],
                offset: data_tag_at,
            });
        }

        let bytes = side[data_tag_at + 1..data_end].to_vec();
        let mut data = FdsFileData {
            size: bytes.len() as u64,
            digests: DigestSet::of(&bytes),
            bytes,
            ..Default::default()
        };

        if crcs_stored {
            data.file_data_crc = u16::from_le_bytes([side[data_end], side[data_end + 1]]);
        }
        if generate_checksums {
            let mut data_block = Vec::with_capacity(data.bytes.len() + 3);
            data_block.push(BLOCK_FILE_DATA);
            data_block.extend_from_slice(&data.bytes);
            data_block.extend_from_slice(&[0, 0]);
            data.file_data_crc = fds_block_crc(&data_block)?;
        }

        file.data = data;
        decoded.files.push(file);

        cursor = cursor + 17 + data_len + 2 * crc_offset;
    }

    if cursor < side.len() {
        decoded.unallocated_space = side[cursor..].to_vec();
        decoded.unallocated_space_offset = cursor as u16;
    }

    Ok(decoded)
}

/// Re-encode an archive as raw image bytes.
pub fn encode_fds_archive(
    archive: &FdsArchive,
    options: &FdsEncodeOptions,
) -> Result<Vec<u8>, RomError> {
    let side_size = if options.write_qd {
        QD_SIDE_SIZE
    } else {
        FDS_SIDE_SIZE
    };

    let mut out = Vec::with_capacity(
        options.write_header as usize * FDS_HEADER_SIZE + archive.side_count() * side_size,
    );

    if options.write_header {
        out.extend_from_slice(&FDS_HEADER_MAGIC);
        out.push(archive.side_count() as u8);
        out.extend_from_slice(&[0u8; 11]);
    }

    for disk in &archive.disks {
        for side in &disk.sides {
            out.extend_from_slice(&encode_fds_side(side, options)?);
        }
    }

    Ok(out)
}

/// Re-encode one side, padded or truncated to exactly the side stride.
pub fn encode_fds_side(side: &FdsSide, options: &FdsEncodeOptions) -> Result<Vec<u8>, RomError> {
    let side_size = if options.write_qd {
        QD_SIDE_SIZE
    } else {
        FDS_SIDE_SIZE
    };

    let mut out: Vec<u8> = Vec::with_capacity(side_size);

    out.push(BLOCK_DISK_INFO);
    out.extend_from_slice(FDS_SIDE_MAGIC);
    out.push(side.manufacturer_code);
    out.extend_from_slice(&side.game_name);
    out.push(side.game_type);
    out.push(side.revision_number);
    out.push(side.side_number);
    out.push(side.disk_number);
    out.push(side.disk_type);
    out.push(side.reserved.byte_18());
    out.push(side.boot_file_id);
    out.extend_from_slice(side.reserved.bytes_1a_1e());
    out.extend_from_slice(&side.manufacturing_date);
    out.push(side.country_code);
    out.extend_from_slice(side.reserved.bytes_23_2b());
    out.extend_from_slice(&side.rewrite_date);
    out.extend_from_slice(side.reserved.bytes_2f_30());
    out.extend_from_slice(&side.disk_writer_serial.to_le_bytes());
    out.push(side.reserved.byte_33());
    out.push(side.rewrite_count);
    out.push(side.actual_disk_side);
    out.push(side.reserved.byte_36());
    out.push(side.price);

    if options.write_checksums {
        let crc = if options.generate_checksums {
            let mut block = out.clone();
            block.extend_from_slice(&[0, 0]);
            fds_block_crc(&block)?
        } else {
            side.disk_info_crc
        };
        out.extend_from_slice(&crc.to_le_bytes());
    }

    let layout_block = [BLOCK_FILE_LAYOUT, side.files.len() as u8];
    out.extend_from_slice(&layout_block);
    if options.write_checksums {
        let crc = if options.generate_checksums {
            fds_block_crc(&[layout_block[0], layout_block[1], 0, 0])?
        } else {
            side.file_table_crc
        };
        out.extend_from_slice(&crc.to_le_bytes());
    }

    for file in &side.files {
        let mut header_block: Vec<u8> = Vec::with_capacity(18);
        header_block.push(BLOCK_FILE_HEADER);
        header_block.push(file.file_number);
        header_block.push(file.file_identification_code);
        header_block.extend_from_slice(&file.file_name);
        header_block.extend_from_slice(&file.file_address.to_le_bytes());
        header_block.extend_from_slice(&file.file_size.to_le_bytes());
        header_block.push(file.file_type);

        if options.write_checksums {
            let crc = if options.generate_checksums {
                let mut block = header_block.clone();
                block.extend_from_slice(&[0, 0]);
                fds_block_crc(&block)?
            } else {
                file.file_metadata_crc
            };
            header_block.extend_from_slice(&crc.to_le_bytes());
        }
        out.extend_from_slice(&header_block);

        out.push(BLOCK_FILE_DATA);
        out.extend_from_slice(&file.data.bytes);
        if options.write_checksums {
            let crc = if options.generate_checksums {
                let mut block = Vec::with_capacity(file.data.bytes.len() + 3);
                block.push(BLOCK_FILE_DATA);
                block.extend_from_slice(&file.data.bytes);
                block.extend_from_slice(&[0, 0]);
                fds_block_crc(&block)?
            } else {
                file.data.file_data_crc
            };
            out.extend_from_slice(&crc.to_le_bytes());
        }
    }

    // Restore the unallocated tail at its captured offset: zero-fill any
    // file gap before it, or trim its head if the encoded blocks now run
    // past where it used to start.
    let written = out.len();
    let tail_offset = usize::from(side.unallocated_space_offset);
    let mut tail: &[u8] = &side.unallocated_space;

    if written < tail_offset {
        out.resize(tail_offset, 0x00);
    } else if written > tail_offset {
        let overlap = written - tail_offset;
        tail = if overlap < tail.len() { &tail[overlap..] } else { &[] };
    }
    out.extend_from_slice(tail);

    if out.len() < side_size {
        out.resize(side_size, 0x00);
    } else {
        out.truncate(side_size);
    }

    Ok(out)
}

/// Split the image into per-side slices, stripping the optional archive
/// prefix and inferring the FDS vs QD stride from the length.
fn stripped_side_slices(input: &[u8]) -> Result<Vec<&[u8]>, RomError> {
    if input.len() < FDS_HEADER_SIZE {
        return Err(RomError::BadArchiveLength {
            len: input.len() as u64,
        });
    }

    let body = if input[0..4] == FDS_HEADER_MAGIC {
        &input[FDS_HEADER_SIZE..]
    } else {
        input
    };

    let fds_fit = !body.is_empty() && body.len() % FDS_SIDE_SIZE == 0;
    let qd_fit = !body.is_empty() && body.len() % QD_SIDE_SIZE == 0;

    let side_size = match (fds_fit, qd_fit) {
        (true, false) => FDS_SIDE_SIZE,
        (false, true) => QD_SIDE_SIZE,
        _ => {
            return Err(RomError::BadArchiveLength {
                len: body.len() as u64,
            })
        }
    };

    let mut slices = Vec::with_capacity(body.len() / side_size);
    for (index, slice) in body.chunks_exact(side_size).enumerate() {
        if &slice[1..15] != FDS_SIDE_MAGIC {
            return Err(RomError::BadSideMagic { side: index });
        }
        slices.push(slice);
    }

    Ok(slices)
}

#[cfg(test)]
#[path = "tests/fds_tests.rs"]
mod tests;
