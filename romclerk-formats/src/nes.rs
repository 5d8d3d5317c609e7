//! iNES / NES 2.0 header codec.
//!
//! Implements the 16-byte descriptor as documented on the nesdev wiki:
//! <https://wiki.nesdev.com/w/index.php/NES_2.0> and
//! <https://wiki.nesdev.com/w/index.php/INES>.
//!
//! The NES 2.0 size fields are the subtle part: each of PRG and CHR is
//! either a 12-bit linear unit count (low byte + one nibble of byte 9) or,
//! when that nibble reads 0xF, an exponent/multiplier pair packed into the
//! low size byte. Both forms decode to a calculated byte count, and the
//! encoder prefers the linear form whenever it can express the size.

use romclerk_core::checksum::DigestSet;
use romclerk_core::record::{
    InesHeader, Nes20Header, RomHeader, RomRecord, SizeSource, CHR_BLOCK_SIZE, PRG_BLOCK_SIZE,
    TRAINER_SIZE,
};
use romclerk_core::RomError;

/// The descriptor starts with `NES<EOF>`.
pub const NES_MAGIC: [u8; 4] = *b"NES\x1a";

/// Descriptor length.
pub const NES_HEADER_SIZE: usize = 16;

/// Byte 7 bits 2-3 read `10` on an NES 2.0 descriptor.
const NES_20_SIGNATURE_MASK: u8 = 0x0C;
const NES_20_SIGNATURE: u8 = 0x08;

/// Options controlling how a `.nes` file is decoded.
#[derive(Debug, Clone, Default)]
pub struct NesDecodeOptions {
    /// Accept iNES 1.0 files instead of failing with `NotNes20`
    pub enable_ines: bool,
    /// Capture trainer bytes; when off, the trainer flag is dropped
    pub preserve_trainer: bool,
}

impl NesDecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_ines(mut self, enable: bool) -> Self {
        self.enable_ines = enable;
        self
    }

    pub fn preserve_trainer(mut self, preserve: bool) -> Self {
        self.preserve_trainer = preserve;
        self
    }
}

/// Options controlling how a record is re-encoded to `.nes` bytes.
#[derive(Debug, Clone, Default)]
pub struct NesEncodeOptions {
    /// Allow emitting iNES 1.0 records
    pub enable_ines: bool,
    /// Emit only the declared PRG + CHR bytes, discarding misc residue
    pub truncate: bool,
    /// Emit the captured trainer and keep its flag
    pub preserve_trainer: bool,
}

impl NesEncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_ines(mut self, enable: bool) -> Self {
        self.enable_ines = enable;
        self
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn preserve_trainer(mut self, preserve: bool) -> Self {
        self.preserve_trainer = preserve;
        self
    }
}

/// Decode a headered `.nes` file into a canonical record.
///
/// Whole-image digests cover the payload exclusive of the descriptor and
/// exclusive of any trainer; that scope is what lets the matching engine
/// identify a ROM regardless of its current header.
pub fn decode_nes_rom(
    input: &[u8],
    options: &NesDecodeOptions,
    relative_path: &str,
) -> Result<RomRecord, RomError> {
    let (payload, header_bytes, trainer_bytes) = strip_descriptor(input)?;

    let is_nes20 = (input[7] & NES_20_SIGNATURE_MASK) == NES_20_SIGNATURE;
    if !is_nes20 && !options.enable_ines {
        return Err(RomError::NotNes20);
    }

    let header = if is_nes20 {
        RomHeader::Nes20(decode_nes20_fields(input, options))
    } else {
        RomHeader::Ines(decode_ines_fields(input, options))
    };

    let (prg_bytes, chr_bytes) = (header.prg_rom_bytes(), header.chr_rom_bytes());
    let (prg, chr, misc) = split_payload(payload, prg_bytes, chr_bytes)?;

    let mut record = RomRecord::with_header(header);
    record.relative_path = relative_path.to_string();
    record.size = payload.len() as u64;
    record.payload = payload.to_vec();
    record.prg = prg.to_vec();
    record.chr = chr.to_vec();
    record.misc = misc.to_vec();
    record.source_header = header_bytes.to_vec();

    if options.preserve_trainer {
        record.trainer = trainer_bytes.to_vec();
    }

    if let RomHeader::Nes20(header) = &mut record.header {
        header.misc_rom_bytes = misc.len() as u64;
    }

    record.update_checksums();

    Ok(record)
}

/// Re-encode a record as `.nes` bytes: descriptor, optional trainer, then
/// the payload (possibly truncated to the declared PRG + CHR sizes).
pub fn encode_nes_rom(record: &RomRecord, options: &NesEncodeOptions) -> Result<Vec<u8>, RomError> {
    let header_bytes = encode_nes_header(record, options.enable_ines, options.preserve_trainer)?;

    let declared = record.header.prg_rom_bytes() + record.header.chr_rom_bytes();
    let payload: &[u8] = if options.truncate && record.payload.len() as u64 >= declared {
        &record.payload[..declared as usize]
    } else {
        &record.payload
    };

    let write_trainer = options.preserve_trainer
        && record.trainer.len() == TRAINER_SIZE
        && match &record.header {
            RomHeader::Nes20(header) => header.trainer,
            RomHeader::Ines(header) => header.trainer,
            RomHeader::Fds(_) => false,
        };

    let mut out = Vec::with_capacity(NES_HEADER_SIZE + record.trainer.len() + payload.len());
    out.extend_from_slice(&header_bytes);
    if write_trainer {
        out.extend_from_slice(&record.trainer);
    }
    out.extend_from_slice(payload);

    Ok(out)
}

/// Encode just the 16-byte descriptor for a record.
pub fn encode_nes_header(
    record: &RomRecord,
    enable_ines: bool,
    preserve_trainer: bool,
) -> Result<[u8; 16], RomError> {
    match &record.header {
        RomHeader::Nes20(header) => {
            Ok(encode_nes20_header(header, record.trainer.len(), preserve_trainer))
        }
        RomHeader::Ines(header) if enable_ines => {
            Ok(encode_ines_header(header, record.trainer.len(), preserve_trainer))
        }
        _ => Err(RomError::other("unable to find valid header on ROM model")),
    }
}

/// Split a headerless payload into `(PRG, CHR, misc)` at the declared
/// sizes. Fails with `TruncatedPayload` when the payload cannot hold them.
pub fn split_payload(
    payload: &[u8],
    prg_bytes: u64,
    chr_bytes: u64,
) -> Result<(&[u8], &[u8], &[u8]), RomError> {
    let declared = prg_bytes + chr_bytes;
    if (payload.len() as u64) < declared {
        return Err(RomError::TruncatedPayload {
            declared,
            actual: payload.len() as u64,
        });
    }

    let prg_end = prg_bytes as usize;
    let chr_end = (prg_bytes + chr_bytes) as usize;
    Ok((
        &payload[..prg_end],
        &payload[prg_end..chr_end],
        &payload[chr_end..],
    ))
}

/// Validate the descriptor and return `(payload, descriptor, trainer)`.
fn strip_descriptor(input: &[u8]) -> Result<(&[u8], &[u8], &[u8]), RomError> {
    if input.len() < NES_HEADER_SIZE {
        return Err(RomError::bad_magic("NES"));
    }

    if input[0..4] != NES_MAGIC {
        return Err(RomError::bad_magic("NES"));
    }

    let has_trainer = (input[6] & 0b0000_0100) != 0;
    if has_trainer {
        if input.len() < NES_HEADER_SIZE + TRAINER_SIZE {
            return Err(RomError::TruncatedTrainer);
        }
        Ok((
            &input[NES_HEADER_SIZE + TRAINER_SIZE..],
            &input[..NES_HEADER_SIZE],
            &input[NES_HEADER_SIZE..NES_HEADER_SIZE + TRAINER_SIZE],
        ))
    } else {
        Ok((&input[NES_HEADER_SIZE..], &input[..NES_HEADER_SIZE], &[]))
    }
}

fn decode_nes20_fields(input: &[u8], options: &NesDecodeOptions) -> Nes20Header {
    let mut header = Nes20Header::default();

    // PRG size: linear unless byte 9's low nibble is all ones
    if input[9] & 0x0F != 0x0F {
        header.prg_rom_units = u16::from_le_bytes([input[4], input[9] & 0x0F]);
        header.prg_rom_bytes = PRG_BLOCK_SIZE * u64::from(header.prg_rom_units);
    } else {
        header.prg_exponent = (input[4] & 0b1111_1100) >> 2;
        header.prg_multiplier = input[4] & 0b0000_0011;
        header.prg_rom_bytes =
            (1u64 << header.prg_exponent) * u64::from(header.prg_multiplier * 2 + 1);
    }

    // CHR size: same rule against the high nibble
    if input[9] & 0xF0 != 0xF0 {
        header.chr_rom_units = u16::from_le_bytes([input[5], (input[9] & 0xF0) >> 4]);
        header.chr_rom_bytes = CHR_BLOCK_SIZE * u64::from(header.chr_rom_units);
    } else {
        header.chr_exponent = (input[5] & 0b1111_1100) >> 2;
        header.chr_multiplier = input[5] & 0b0000_0011;
        header.chr_rom_bytes =
            (1u64 << header.chr_exponent) * u64::from(header.chr_multiplier * 2 + 1);
    }

    header.prg_ram_shift = input[10] & 0x0F;
    header.prg_nvram_shift = (input[10] & 0xF0) >> 4;
    header.chr_ram_shift = input[11] & 0x0F;
    header.chr_nvram_shift = (input[11] & 0xF0) >> 4;

    header.vertical_mirroring = (input[6] & 0b0000_0001) != 0;
    header.battery = (input[6] & 0b0000_0010) != 0;

    if options.preserve_trainer {
        header.trainer = (input[6] & 0b0000_0100) != 0;
        header.trainer_bytes = if header.trainer { TRAINER_SIZE as u16 } else { 0 };
    }

    header.four_screen = (input[6] & 0b0000_1000) != 0;
    header.console_type = input[7] & 0b0000_0011;

    header.mapper = u16::from_le_bytes([
        ((input[6] & 0xF0) >> 4) | (input[7] & 0xF0),
        input[8] & 0x0F,
    ]);
    header.submapper = (input[8] & 0xF0) >> 4;
    header.cpu_ppu_timing = input[12] & 0b0000_0011;

    // Byte 13 is meaningful for Vs. hardware (console type 1) and for
    // extended console types (console type 3); it stays zero otherwise.
    match header.console_type {
        1 => {
            header.vs_hardware_type = (input[13] & 0xF0) >> 4;
            header.vs_ppu_type = input[13] & 0x0F;
        }
        3 => {
            header.extended_console_type = input[13] & 0x0F;
        }
        _ => {}
    }

    header.misc_rom_count = input[14] & 0b0000_0011;
    header.default_expansion = input[15] & 0b0011_1111;

    header
}

fn decode_ines_fields(input: &[u8], options: &NesDecodeOptions) -> InesHeader {
    let mut header = InesHeader {
        prg_rom_units: input[4],
        prg_rom_bytes: PRG_BLOCK_SIZE * u64::from(input[4]),
        chr_rom_units: input[5],
        chr_rom_bytes: CHR_BLOCK_SIZE * u64::from(input[5]),
        ..Default::default()
    };

    header.vertical_mirroring = (input[6] & 0b0000_0001) != 0;
    header.battery = (input[6] & 0b0000_0010) != 0;

    if options.preserve_trainer {
        header.trainer = (input[6] & 0b0000_0100) != 0;
        header.trainer_bytes = if header.trainer { TRAINER_SIZE as u16 } else { 0 };
    }

    header.four_screen = (input[6] & 0b0000_1000) != 0;
    header.mapper = ((input[6] & 0xF0) >> 4) | (input[7] & 0xF0);
    header.vs_unisystem = (input[7] & 0b0000_0001) != 0;
    header.playchoice_10 = (input[7] & 0b0000_0010) != 0;
    header.prg_ram_units = input[8];
    header.pal_tv = (input[9] & 0b0000_0001) != 0;

    header
}

fn encode_nes20_header(header: &Nes20Header, trainer_len: usize, preserve_trainer: bool) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&NES_MAGIC);

    if header.prg_rom_units > 0 {
        let units = header.prg_rom_units.to_le_bytes();
        bytes[4] = units[0];
        bytes[9] |= units[1] & 0x0F;
    } else if header.prg_exponent > 0 || header.prg_multiplier > 0 {
        bytes[4] = (header.prg_exponent << 2) | header.prg_multiplier;
        bytes[9] |= 0x0F;
    }

    if header.chr_rom_units > 0 {
        let units = header.chr_rom_units.to_le_bytes();
        bytes[5] = units[0];
        bytes[9] |= (units[1] & 0x0F) << 4;
    } else if header.chr_exponent > 0 || header.chr_multiplier > 0 {
        bytes[5] = (header.chr_exponent << 2) | header.chr_multiplier;
        bytes[9] |= 0xF0;
    }

    let mapper = header.mapper.to_le_bytes();

    let mut flags6: u8 = 0;
    if header.vertical_mirroring {
        flags6 |= 0b0000_0001;
    }
    if header.battery {
        flags6 |= 0b0000_0010;
    }
    if preserve_trainer && header.trainer && trainer_len == TRAINER_SIZE {
        flags6 |= 0b0000_0100;
    }
    if header.four_screen {
        flags6 |= 0b0000_1000;
    }
    flags6 |= (mapper[0] & 0x0F) << 4;
    bytes[6] = flags6;

    bytes[7] = (mapper[0] & 0xF0) | (header.console_type & 0b0000_0011) | NES_20_SIGNATURE;
    bytes[8] = (mapper[1] & 0x0F) | ((header.submapper & 0x0F) << 4);

    bytes[10] = (header.prg_ram_shift & 0x0F) | ((header.prg_nvram_shift & 0x0F) << 4);
    bytes[11] = (header.chr_ram_shift & 0x0F) | ((header.chr_nvram_shift & 0x0F) << 4);
    bytes[12] = header.cpu_ppu_timing & 0b0000_0011;

    match header.console_type {
        1 => {
            bytes[13] = ((header.vs_hardware_type & 0x0F) << 4) | (header.vs_ppu_type & 0x0F);
        }
        3 => {
            bytes[13] = header.extended_console_type & 0x0F;
        }
        _ => {}
    }

    bytes[14] = header.misc_rom_count & 0b0000_0011;
    bytes[15] = header.default_expansion & 0b0011_1111;

    bytes
}

fn encode_ines_header(header: &InesHeader, trainer_len: usize, preserve_trainer: bool) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&NES_MAGIC);

    bytes[4] = header.prg_rom_units;
    bytes[5] = header.chr_rom_units;

    let mut flags6: u8 = 0;
    if header.vertical_mirroring {
        flags6 |= 0b0000_0001;
    }
    if header.battery {
        flags6 |= 0b0000_0010;
    }
    if preserve_trainer && header.trainer && trainer_len == TRAINER_SIZE {
        flags6 |= 0b0000_0100;
    }
    if header.four_screen {
        flags6 |= 0b0000_1000;
    }
    flags6 |= (header.mapper & 0x0F) << 4;
    bytes[6] = flags6;

    let mut flags7: u8 = 0;
    if header.vs_unisystem {
        flags7 |= 0b0000_0001;
    }
    if header.playchoice_10 {
        flags7 |= 0b0000_0010;
    }
    flags7 |= header.mapper & 0xF0;
    bytes[7] = flags7;

    bytes[8] = header.prg_ram_units;
    bytes[9] = if header.pal_tv { 1 } else { 0 };
    // Bytes 10-15 are zero-filled on iNES output

    bytes
}

#[cfg(test)]
#[path = "tests/nes_tests.rs"]
mod tests;
