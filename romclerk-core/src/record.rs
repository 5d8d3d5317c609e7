//! Canonical cartridge record and header variants.
//!
//! A record pairs universal identity metadata (names, paths, whole-image
//! and per-segment digests) with exactly one header variant: NES 2.0,
//! iNES 1.0, or an FDS archive. The byte payload is the headerless,
//! trainerless image; PRG, CHR, and misc are owned copies of its three
//! slices, so `prg ∥ chr ∥ misc == payload` always holds for NES records.

use serde::{Deserialize, Serialize};

use crate::checksum::{DigestSet, SegmentDigests};
use crate::fds::FdsArchive;

/// Linear PRG size unit: 16 KiB.
pub const PRG_BLOCK_SIZE: u64 = 16 * 1024;
/// Linear CHR size unit: 8 KiB.
pub const CHR_BLOCK_SIZE: u64 = 8 * 1024;
/// Trainer blocks are exactly this long when present.
pub const TRAINER_SIZE: usize = 512;

/// Largest unit count representable in the 12-bit linear size field.
/// A high nibble of 0xF selects the exponential form instead.
const LINEAR_SIZE_MAX: u64 = 0x0EFF;

/// NES 2.0 header fields, as decoded from or destined for the 16-byte
/// descriptor. Sizes carry both representations: a nonzero `*_rom_units`
/// means the linear form is canonical, otherwise the exponent/multiplier
/// pair is. `*_rom_bytes` is always the calculated byte count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nes20Header {
    pub prg_rom_units: u16,
    pub prg_rom_bytes: u64,
    pub prg_exponent: u8,
    pub prg_multiplier: u8,
    pub chr_rom_units: u16,
    pub chr_rom_bytes: u64,
    pub chr_exponent: u8,
    pub chr_multiplier: u8,
    pub misc_rom_bytes: u64,
    pub trainer_bytes: u16,
    pub prg_ram_shift: u8,
    pub prg_nvram_shift: u8,
    pub chr_ram_shift: u8,
    pub chr_nvram_shift: u8,
    pub vertical_mirroring: bool,
    pub battery: bool,
    pub trainer: bool,
    pub four_screen: bool,
    pub console_type: u8,
    pub mapper: u16,
    pub submapper: u8,
    pub cpu_ppu_timing: u8,
    pub vs_hardware_type: u8,
    pub vs_ppu_type: u8,
    pub extended_console_type: u8,
    pub misc_rom_count: u8,
    pub default_expansion: u8,
}

/// iNES 1.0 header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InesHeader {
    pub prg_rom_units: u8,
    pub prg_rom_bytes: u64,
    pub chr_rom_units: u8,
    pub chr_rom_bytes: u64,
    pub trainer_bytes: u16,
    pub vertical_mirroring: bool,
    pub battery: bool,
    pub trainer: bool,
    pub four_screen: bool,
    pub mapper: u8,
    pub vs_unisystem: bool,
    pub playchoice_10: bool,
    pub prg_ram_units: u8,
    pub pal_tv: bool,
}

/// The three mutually exclusive header variants a record can hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RomHeader {
    Nes20(Nes20Header),
    Ines(InesHeader),
    Fds(FdsArchive),
}

impl RomHeader {
    pub fn nes20(&self) -> Option<&Nes20Header> {
        match self {
            RomHeader::Nes20(header) => Some(header),
            _ => None,
        }
    }

    pub fn ines(&self) -> Option<&InesHeader> {
        match self {
            RomHeader::Ines(header) => Some(header),
            _ => None,
        }
    }

    pub fn fds(&self) -> Option<&FdsArchive> {
        match self {
            RomHeader::Fds(archive) => Some(archive),
            _ => None,
        }
    }

    /// Declared PRG byte count, zero for FDS archives.
    pub fn prg_rom_bytes(&self) -> u64 {
        match self {
            RomHeader::Nes20(header) => header.prg_rom_bytes,
            RomHeader::Ines(header) => header.prg_rom_bytes,
            RomHeader::Fds(_) => 0,
        }
    }

    /// Declared CHR byte count, zero for FDS archives.
    pub fn chr_rom_bytes(&self) -> u64 {
        match self {
            RomHeader::Nes20(header) => header.chr_rom_bytes,
            RomHeader::Ines(header) => header.chr_rom_bytes,
            RomHeader::Fds(_) => 0,
        }
    }
}

/// One cartridge dump or disk archive plus everything known about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RomRecord {
    /// Display name (usually the filename stem, or the template name)
    pub name: String,
    /// Full path the record was loaded from, empty for template records
    pub filename: String,
    /// Path relative to the scan root, with `/` separators
    pub relative_path: String,
    /// Byte length of the hashed payload
    pub size: u64,
    /// Whole-image digests over `prg ∥ chr ∥ misc` (descriptor and trainer
    /// excluded), or over the entire file for FDS archives
    pub digests: DigestSet,
    /// Per-segment digests; default (all-zero) when a segment is absent
    pub prg_digests: SegmentDigests,
    pub chr_digests: SegmentDigests,
    pub misc_digests: SegmentDigests,
    pub trainer_digests: SegmentDigests,
    pub header: RomHeader,
    /// Headerless, trainerless image bytes; empty for template records
    pub payload: Vec<u8>,
    /// Captured trainer bytes, empty or exactly 512 long
    pub trainer: Vec<u8>,
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
    pub misc: Vec<u8>,
    /// The original 16 descriptor bytes as read from disk, for display
    pub source_header: Vec<u8>,
}

impl RomRecord {
    /// A record with the given header variant and no payload or metadata.
    pub fn with_header(header: RomHeader) -> Self {
        Self {
            name: String::new(),
            filename: String::new(),
            relative_path: String::new(),
            size: 0,
            digests: DigestSet::default(),
            prg_digests: SegmentDigests::default(),
            chr_digests: SegmentDigests::default(),
            misc_digests: SegmentDigests::default(),
            trainer_digests: SegmentDigests::default(),
            header,
            payload: Vec::new(),
            trainer: Vec::new(),
            prg: Vec::new(),
            chr: Vec::new(),
            misc: Vec::new(),
            source_header: Vec::new(),
        }
    }

    /// Recompute the whole-image digest quartet and every per-segment
    /// digest set from the owned byte blobs. Segments that are empty keep
    /// all-zero digests.
    pub fn update_checksums(&mut self) {
        if !self.payload.is_empty() {
            self.digests = DigestSet::of(&self.payload);
            self.size = self.payload.len() as u64;
        }

        if !self.prg.is_empty() {
            self.prg_digests = SegmentDigests::of(&self.prg);
        }
        if !self.chr.is_empty() {
            self.chr_digests = SegmentDigests::of(&self.chr);
        }
        if !self.misc.is_empty() {
            self.misc_digests = SegmentDigests::of(&self.misc);
        }
        if !self.trainer.is_empty() {
            self.trainer_digests = SegmentDigests::of(&self.trainer);
        }
    }

    /// Bring the header size fields in line with the chosen canonical
    /// source for each of PRG and CHR. See [`SizeSource`].
    pub fn update_sizes(&mut self, prg_source: SizeSource, chr_source: SizeSource) {
        if !self.payload.is_empty() {
            self.size = self.payload.len() as u64;
        }

        let prg_len = self.prg.len() as u64;
        let chr_len = self.chr.len() as u64;
        let misc_len = self.misc.len() as u64;
        let has_prg = !self.prg.is_empty();
        let has_chr = !self.chr.is_empty();
        let has_misc = !self.misc.is_empty();
        let trainer_ok = self.trainer.len() == TRAINER_SIZE;

        match &mut self.header {
            RomHeader::Nes20(header) => {
                if prg_source == SizeSource::FromSegments && has_prg {
                    header.prg_rom_bytes = prg_len;
                }
                if (prg_source == SizeSource::FromSegments && has_prg)
                    || prg_source == SizeSource::FromByteCount
                {
                    let (units, exponent, multiplier) =
                        factor_rom_size(header.prg_rom_bytes, PRG_BLOCK_SIZE);
                    header.prg_rom_units = units;
                    header.prg_exponent = exponent;
                    header.prg_multiplier = multiplier;
                }
                if prg_source == SizeSource::FromFactoredFields {
                    header.prg_rom_bytes = if header.prg_rom_units > 0 {
                        u64::from(header.prg_rom_units) * PRG_BLOCK_SIZE
                    } else if header.prg_exponent > 0 || header.prg_multiplier > 0 {
                        (1u64 << header.prg_exponent) * u64::from(header.prg_multiplier * 2 + 1)
                    } else {
                        0
                    };
                }

                if chr_source == SizeSource::FromSegments && has_chr {
                    header.chr_rom_bytes = chr_len;
                }
                if (chr_source == SizeSource::FromSegments && has_chr)
                    || chr_source == SizeSource::FromByteCount
                {
                    let (units, exponent, multiplier) =
                        factor_rom_size(header.chr_rom_bytes, CHR_BLOCK_SIZE);
                    header.chr_rom_units = units;
                    header.chr_exponent = exponent;
                    header.chr_multiplier = multiplier;
                }
                if chr_source == SizeSource::FromFactoredFields {
                    header.chr_rom_bytes = if header.chr_rom_units > 0 {
                        u64::from(header.chr_rom_units) * CHR_BLOCK_SIZE
                    } else if header.chr_exponent > 0 || header.chr_multiplier > 0 {
                        (1u64 << header.chr_exponent) * u64::from(header.chr_multiplier * 2 + 1)
                    } else {
                        0
                    };
                }

                // Payload-less template records keep their declared misc
                // and trainer sizes; only records that carry data have
                // anything to reconcile against.
                if !self.payload.is_empty() {
                    header.misc_rom_bytes = if header.misc_rom_count > 0 && has_misc {
                        misc_len
                    } else {
                        0
                    };
                }

                if !self.payload.is_empty() || !self.trainer.is_empty() {
                    header.trainer_bytes = if header.trainer && trainer_ok {
                        TRAINER_SIZE as u16
                    } else {
                        0
                    };
                }
            }
            RomHeader::Ines(header) => {
                if prg_source == SizeSource::FromSegments && has_prg {
                    header.prg_rom_bytes = prg_len;
                }
                if (prg_source == SizeSource::FromSegments && has_prg)
                    || prg_source == SizeSource::FromByteCount
                {
                    header.prg_rom_units = (header.prg_rom_bytes / PRG_BLOCK_SIZE) as u8;
                }
                if prg_source == SizeSource::FromFactoredFields {
                    header.prg_rom_bytes = u64::from(header.prg_rom_units) * PRG_BLOCK_SIZE;
                }

                if chr_source == SizeSource::FromSegments && has_chr {
                    header.chr_rom_bytes = chr_len;
                }
                if (chr_source == SizeSource::FromSegments && has_chr)
                    || chr_source == SizeSource::FromByteCount
                {
                    header.chr_rom_units = (header.chr_rom_bytes / CHR_BLOCK_SIZE) as u8;
                }
                if chr_source == SizeSource::FromFactoredFields {
                    header.chr_rom_bytes = u64::from(header.chr_rom_units) * CHR_BLOCK_SIZE;
                }

                if !self.payload.is_empty() || !self.trainer.is_empty() {
                    header.trainer_bytes = if header.trainer && trainer_ok {
                        TRAINER_SIZE as u16
                    } else {
                        0
                    };
                }
            }
            RomHeader::Fds(_) => {}
        }
    }

    /// Drop any bytes past the header-declared PRG and CHR sizes and
    /// rebuild the payload as `prg ∥ chr`. Data beyond the CHR ROM is
    /// usually overdump garbage when there are no misc ROMs.
    pub fn truncate_to_declared(&mut self) {
        let (prg_bytes, chr_bytes) = match &self.header {
            RomHeader::Nes20(header) => (header.prg_rom_bytes, header.chr_rom_bytes),
            RomHeader::Ines(header) => (header.prg_rom_bytes, header.chr_rom_bytes),
            RomHeader::Fds(_) => return,
        };

        if self.prg.len() as u64 > prg_bytes {
            self.prg.truncate(prg_bytes as usize);
        }
        if self.chr.len() as u64 > chr_bytes {
            self.chr.truncate(chr_bytes as usize);
        }

        self.misc.clear();
        self.payload = self.prg.clone();
        self.payload.extend_from_slice(&self.chr);
        self.size = self.payload.len() as u64;
    }
}

/// Which representation is authoritative when reconciling size fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSource {
    /// The owned segment byte blobs
    FromSegments,
    /// The calculated byte counts already in the header
    FromByteCount,
    /// The linear or exponent/multiplier fields already in the header
    FromFactoredFields,
}

/// Factor a PRG or CHR byte count into its NES 2.0 size notation,
/// preferring the linear form. Returns `(units, exponent, multiplier)`;
/// a nonzero `units` means the linear form applies.
///
/// The multiplier preference is pinned: the smallest of {3, 5, 7} that
/// divides the size, else 1. The result is exact only for sizes of the
/// shape 2^e * {1, 3, 5, 7}; anything else rounds down, which matches
/// what the on-disk format can express.
pub fn factor_rom_size(rom_size: u64, block_size: u64) -> (u16, u8, u8) {
    if rom_size == 0 {
        return (0, 0, 0);
    }

    if rom_size % block_size == 0 {
        let units = rom_size / block_size;
        if units <= LINEAR_SIZE_MAX {
            return (units as u16, 0, 0);
        }
    }

    let multiplier: u64 = if rom_size % 3 == 0 {
        3
    } else if rom_size % 5 == 0 {
        5
    } else if rom_size % 7 == 0 {
        7
    } else {
        1
    };

    let mut remaining = rom_size / multiplier;
    let mut exponent: u8 = 0;
    while remaining > 1 {
        remaining >>= 1;
        exponent += 1;
    }

    (0, exponent, ((multiplier - 1) >> 1) as u8)
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
