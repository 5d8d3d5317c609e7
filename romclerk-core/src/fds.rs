//! Famicom Disk System archive model.
//!
//! An archive is an ordered set of disks; each disk has one or two sides;
//! each side carries a fixed-offset metadata block, a file chain, and an
//! unallocated tail. Everything the medium stores is kept here byte-for-
//! byte so an unedited archive re-encodes identically, including the
//! reserved bytes nobody has ever assigned a meaning to.

use serde::{Deserialize, Serialize};

use crate::checksum::DigestSet;
use crate::error::RomError;
use crate::util::{decode_bcd, encode_bcd};

/// Bytes per side in a plain FDS dump.
pub const FDS_SIDE_SIZE: usize = 65500;
/// Bytes per side in a QD dump.
pub const QD_SIDE_SIZE: usize = 65536;

/// The Showa era began in 1925 CE; FDS dates count from there.
pub const FDS_EPOCH: u16 = 1925;

/// Disk-info block tag.
pub const BLOCK_DISK_INFO: u8 = 0x01;
/// File-layout (file count) block tag.
pub const BLOCK_FILE_LAYOUT: u8 = 0x02;
/// File-header block tag.
pub const BLOCK_FILE_HEADER: u8 = 0x03;
/// File-data block tag.
pub const BLOCK_FILE_DATA: u8 = 0x04;

/// A complete dump: every disk found in one `.fds` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdsArchive {
    pub disks: Vec<FdsDisk>,
}

impl FdsArchive {
    /// Total number of sides across all disks.
    pub fn side_count(&self) -> usize {
        self.disks.iter().map(|disk| disk.sides.len()).sum()
    }
}

/// One physical disk, identified by its disk number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdsDisk {
    pub disk_number: u8,
    pub sides: Vec<FdsSide>,
}

/// One disk side: the info block fields, the file chain, and the tail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdsSide {
    pub size: u64,
    pub digests: DigestSet,
    pub manufacturer_code: u8,
    /// Three ASCII bytes of game name, e.g. `b"ZEL"`
    pub game_name: [u8; 3],
    pub game_type: u8,
    pub revision_number: u8,
    pub side_number: u8,
    pub disk_number: u8,
    pub disk_type: u8,
    pub boot_file_id: u8,
    /// Raw BCD manufacture date; decode with [`FdsDate::from_bcd`]
    pub manufacturing_date: [u8; 3],
    pub country_code: u8,
    /// Raw BCD rewrite date
    pub rewrite_date: [u8; 3],
    pub disk_writer_serial: u16,
    pub rewrite_count: u8,
    pub actual_disk_side: u8,
    pub price: u8,
    pub reserved: FdsReserved,
    pub disk_info_crc: u16,
    pub file_table_crc: u16,
    /// Whether block CRCs were present in the source image, as opposed to
    /// synthesized (or zeroed) by the decoder
    pub crcs_stored: bool,
    pub files: Vec<FdsFile>,
    /// Bytes past the last file, preserved verbatim
    pub unallocated_space: Vec<u8>,
    /// Offset of the unallocated tail within the side
    pub unallocated_space_offset: u16,
}

/// One file on a side: the 16-byte header block plus its data block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdsFile {
    pub file_number: u8,
    pub file_identification_code: u8,
    /// Eight ASCII bytes, space padded
    pub file_name: [u8; 8],
    pub file_address: u16,
    pub file_size: u16,
    pub file_type: u8,
    pub file_metadata_crc: u16,
    pub data: FdsFileData,
}

impl FdsFile {
    /// Lossy printable form of the 8-byte name.
    pub fn name_string(&self) -> String {
        String::from_utf8_lossy(&self.file_name).into_owned()
    }
}

/// The payload of one file, with its digests and stored CRC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdsFileData {
    pub size: u64,
    pub digests: DigestSet,
    pub bytes: Vec<u8>,
    pub file_data_crc: u16,
}

/// The nineteen reserved bytes of the disk-info block, preserved verbatim.
/// Accessors are named for the side offsets they came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdsReserved(pub [u8; 19]);

impl FdsReserved {
    pub fn byte_18(&self) -> u8 {
        self.0[0]
    }

    /// Bytes 0x1A through 0x1E.
    pub fn bytes_1a_1e(&self) -> &[u8] {
        &self.0[1..6]
    }

    /// Bytes 0x23 through 0x2B.
    pub fn bytes_23_2b(&self) -> &[u8] {
        &self.0[6..15]
    }

    /// Bytes 0x2F and 0x30.
    pub fn bytes_2f_30(&self) -> &[u8] {
        &self.0[15..17]
    }

    pub fn byte_33(&self) -> u8 {
        self.0[17]
    }

    pub fn byte_36(&self) -> u8 {
        self.0[18]
    }
}

/// A calendar date recovered from the FDS BCD encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdsDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl FdsDate {
    /// Decode three packed-BCD bytes. Years count from the start of the
    /// Showa era; BCD years of 83 or more are Heisei-written dumps and
    /// fold back by 25.
    pub fn from_bcd(raw: [u8; 3]) -> Self {
        let bcd_year = decode_bcd(raw[0]);
        let year = if bcd_year < 83 {
            bcd_year + FDS_EPOCH
        } else {
            bcd_year + FDS_EPOCH - 25
        };

        Self {
            year,
            month: decode_bcd(raw[1]) as u8,
            day: decode_bcd(raw[2]) as u8,
        }
    }

    /// Encode back to three BCD bytes using the Showa epoch.
    pub fn to_bcd(&self) -> Result<[u8; 3], RomError> {
        let year_offset = self
            .year
            .checked_sub(FDS_EPOCH)
            .filter(|offset| *offset <= 99)
            .ok_or_else(|| RomError::field_out_of_range("fds-date-year", self.year.to_string()))?;

        let year = encode_bcd(year_offset as u8).ok_or_else(|| {
            RomError::field_out_of_range("fds-date-year", self.year.to_string())
        })?;
        let month = encode_bcd(self.month)
            .ok_or_else(|| RomError::field_out_of_range("fds-date-month", self.month.to_string()))?;
        let day = encode_bcd(self.day)
            .ok_or_else(|| RomError::field_out_of_range("fds-date-day", self.day.to_string()))?;

        Ok([year, month, day])
    }
}

#[cfg(test)]
#[path = "tests/fds_tests.rs"]
mod tests;
