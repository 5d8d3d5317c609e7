//! Core model and primitives for the romclerk toolset.
//!
//! This crate holds the canonical in-memory representation of NES cartridge
//! dumps and Famicom Disk System archives, the checksum primitives shared by
//! the format codecs, and the common error type. Byte-level parsing and
//! emission live in `romclerk-formats`; template matching and document
//! interchange live in `romclerk-db`.

pub mod checksum;
pub mod error;
pub mod fds;
pub mod record;
pub mod util;

pub use checksum::{fds_block_crc, sum16, DigestSet, SegmentDigests};
pub use error::RomError;
pub use fds::{FdsArchive, FdsDate, FdsDisk, FdsFile, FdsFileData, FdsReserved, FdsSide};
pub use record::{
    factor_rom_size, InesHeader, Nes20Header, RomHeader, RomRecord, SizeSource, CHR_BLOCK_SIZE,
    PRG_BLOCK_SIZE, TRAINER_SIZE,
};
