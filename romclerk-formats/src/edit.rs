//! Single-field header editor.
//!
//! Applies one `(field-name, string-value)` mutation to a record with
//! bounds checking. Fields that only exist on one header variant fail
//! with `FieldNotApplicable` against the other; values outside a field's
//! documented range fail with `FieldOutOfRange` and leave the record
//! untouched.

use romclerk_core::record::{
    RomHeader, RomRecord, SizeSource, CHR_BLOCK_SIZE, PRG_BLOCK_SIZE,
};
use romclerk_core::RomError;

/// Apply one field edit to the record's header.
pub fn edit_header_field(record: &mut RomRecord, field: &str, value: &str) -> Result<(), RomError> {
    match field {
        "prg-rom-byte-size" => set_prg_rom_size(record, field, value),
        "chr-rom-byte-size" => set_chr_rom_size(record, field, value),
        "prg-ram-size" => set_prg_ram_size(record, field, value),
        "prg-nvram-size" => {
            let shift = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.prg_nvram_shift = shift;
            Ok(())
        }
        "chr-ram-size" => {
            let shift = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.chr_ram_shift = shift;
            Ok(())
        }
        "chr-nvram-size" => {
            let shift = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.chr_nvram_shift = shift;
            Ok(())
        }
        "number-of-misc-roms" => {
            let count = parse_bounded(field, value, 3)? as u8;
            nes20_mut(record, field)?.misc_rom_count = count;
            Ok(())
        }
        "has-trainer" => {
            let flag = parse_bool(field, value)?;
            match &mut record.header {
                RomHeader::Nes20(header) => header.trainer = flag,
                RomHeader::Ines(header) => header.trainer = flag,
                RomHeader::Fds(_) => return Err(RomError::field_not_applicable(field)),
            }
            Ok(())
        }
        "mirroring-type" => {
            let vertical = parse_bool(field, value)?;
            match &mut record.header {
                RomHeader::Nes20(header) => header.vertical_mirroring = vertical,
                RomHeader::Ines(header) => header.vertical_mirroring = vertical,
                RomHeader::Fds(_) => return Err(RomError::field_not_applicable(field)),
            }
            Ok(())
        }
        "four-screen" => {
            let flag = parse_bool(field, value)?;
            match &mut record.header {
                RomHeader::Nes20(header) => header.four_screen = flag,
                RomHeader::Ines(header) => header.four_screen = flag,
                RomHeader::Fds(_) => return Err(RomError::field_not_applicable(field)),
            }
            Ok(())
        }
        "has-battery" => {
            let flag = parse_bool(field, value)?;
            match &mut record.header {
                RomHeader::Nes20(header) => header.battery = flag,
                RomHeader::Ines(header) => header.battery = flag,
                RomHeader::Fds(_) => return Err(RomError::field_not_applicable(field)),
            }
            Ok(())
        }
        "console-type" => {
            let console = parse_bounded(field, value, 3)? as u8;
            nes20_mut(record, field)?.console_type = console;
            Ok(())
        }
        "extended-console-type" => {
            let extended = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.extended_console_type = extended;
            Ok(())
        }
        "mapper-number" => set_mapper(record, field, value),
        "submapper-number" => {
            let submapper = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.submapper = submapper;
            Ok(())
        }
        "cpu-ppu-timing" => {
            let timing = parse_bounded(field, value, 3)? as u8;
            nes20_mut(record, field)?.cpu_ppu_timing = timing;
            Ok(())
        }
        "vs-hardware-type" => {
            let hardware = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.vs_hardware_type = hardware;
            Ok(())
        }
        "vs-ppu-type" => {
            let ppu = parse_bounded(field, value, 15)? as u8;
            nes20_mut(record, field)?.vs_ppu_type = ppu;
            Ok(())
        }
        "default-expansion" => {
            let expansion = parse_bounded(field, value, 63)? as u8;
            nes20_mut(record, field)?.default_expansion = expansion;
            Ok(())
        }
        "vs-unisystem" => {
            let flag = parse_bool(field, value)?;
            ines_mut(record, field)?.vs_unisystem = flag;
            Ok(())
        }
        "playchoice-10" => {
            let flag = parse_bool(field, value)?;
            ines_mut(record, field)?.playchoice_10 = flag;
            Ok(())
        }
        "tv-system" => set_tv_system(record, field, value),
        _ => Err(RomError::field_not_applicable(field)),
    }
}

fn nes20_mut<'a>(
    record: &'a mut RomRecord,
    field: &str,
) -> Result<&'a mut romclerk_core::record::Nes20Header, RomError> {
    match &mut record.header {
        RomHeader::Nes20(header) => Ok(header),
        _ => Err(RomError::field_not_applicable(field)),
    }
}

fn ines_mut<'a>(
    record: &'a mut RomRecord,
    field: &str,
) -> Result<&'a mut romclerk_core::record::InesHeader, RomError> {
    match &mut record.header {
        RomHeader::Ines(header) => Ok(header),
        _ => Err(RomError::field_not_applicable(field)),
    }
}

fn parse_bounded(field: &str, value: &str, max: u64) -> Result<u64, RomError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed <= max)
        .ok_or_else(|| RomError::field_out_of_range(field, value))
}

fn parse_bool(field: &str, value: &str) -> Result<bool, RomError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(RomError::field_out_of_range(field, value)),
    }
}

/// PRG sizes must be expressible by the header: a 16 KiB unit count for
/// iNES, and either the linear or the exponential notation for NES 2.0.
fn set_prg_rom_size(record: &mut RomRecord, field: &str, value: &str) -> Result<(), RomError> {
    let bytes = value
        .parse::<u64>()
        .map_err(|_| RomError::field_out_of_range(field, value))?;

    match &mut record.header {
        RomHeader::Nes20(header) => {
            let (units, exponent, multiplier) =
                romclerk_core::factor_rom_size(bytes, PRG_BLOCK_SIZE);
            let expressible = if units > 0 {
                u64::from(units) * PRG_BLOCK_SIZE == bytes
            } else {
                (1u64 << exponent) * u64::from(multiplier * 2 + 1) == bytes
            };
            if bytes > 0 && !expressible {
                return Err(RomError::field_out_of_range(field, value));
            }
            header.prg_rom_bytes = bytes;
        }
        RomHeader::Ines(header) => {
            if bytes % PRG_BLOCK_SIZE != 0 || bytes / PRG_BLOCK_SIZE > 255 {
                return Err(RomError::field_out_of_range(field, value));
            }
            header.prg_rom_bytes = bytes;
        }
        RomHeader::Fds(_) => return Err(RomError::field_not_applicable(field)),
    }

    record.update_sizes(SizeSource::FromByteCount, SizeSource::FromFactoredFields);
    Ok(())
}

fn set_chr_rom_size(record: &mut RomRecord, field: &str, value: &str) -> Result<(), RomError> {
    let bytes = value
        .parse::<u64>()
        .map_err(|_| RomError::field_out_of_range(field, value))?;

    match &mut record.header {
        RomHeader::Nes20(header) => {
            let (units, exponent, multiplier) =
                romclerk_core::factor_rom_size(bytes, CHR_BLOCK_SIZE);
            let expressible = if units > 0 {
                u64::from(units) * CHR_BLOCK_SIZE == bytes
            } else {
                (1u64 << exponent) * u64::from(multiplier * 2 + 1) == bytes
            };
            if bytes > 0 && !expressible {
                return Err(RomError::field_out_of_range(field, value));
            }
            header.chr_rom_bytes = bytes;
        }
        RomHeader::Ines(header) => {
            if bytes % CHR_BLOCK_SIZE != 0 || bytes / CHR_BLOCK_SIZE > 255 {
                return Err(RomError::field_out_of_range(field, value));
            }
            header.chr_rom_bytes = bytes;
        }
        RomHeader::Fds(_) => return Err(RomError::field_not_applicable(field)),
    }

    record.update_sizes(SizeSource::FromFactoredFields, SizeSource::FromByteCount);
    Ok(())
}

/// NES 2.0 stores PRG-RAM as a shift exponent (0-15); iNES stores an
/// 8 KiB unit count (0-255).
fn set_prg_ram_size(record: &mut RomRecord, field: &str, value: &str) -> Result<(), RomError> {
    match &mut record.header {
        RomHeader::Nes20(header) => {
            let shift = parse_bounded(field, value, 15)? as u8;
            header.prg_ram_shift = shift;
            Ok(())
        }
        RomHeader::Ines(header) => {
            let units = parse_bounded(field, value, 255)? as u8;
            header.prg_ram_units = units;
            Ok(())
        }
        RomHeader::Fds(_) => Err(RomError::field_not_applicable(field)),
    }
}

/// Mappers are 12 bits in NES 2.0 and 8 bits in iNES 1.0.
fn set_mapper(record: &mut RomRecord, field: &str, value: &str) -> Result<(), RomError> {
    match &mut record.header {
        RomHeader::Nes20(header) => {
            let mapper = parse_bounded(field, value, 4095)? as u16;
            header.mapper = mapper;
            Ok(())
        }
        RomHeader::Ines(header) => {
            let mapper = parse_bounded(field, value, 255)? as u8;
            header.mapper = mapper;
            Ok(())
        }
        RomHeader::Fds(_) => Err(RomError::field_not_applicable(field)),
    }
}

/// iNES TV system: 0/ntsc or 1/pal.
fn set_tv_system(record: &mut RomRecord, field: &str, value: &str) -> Result<(), RomError> {
    let pal = match value {
        "0" | "ntsc" => false,
        "1" | "pal" => true,
        _ => return Err(RomError::field_out_of_range(field, value)),
    };
    ines_mut(record, field)?.pal_tv = pal;
    Ok(())
}

#[cfg(test)]
#[path = "tests/edit_tests.rs"]
mod tests;
