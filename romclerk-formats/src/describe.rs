//! Human-readable descriptions for the `rominfo` operation.

use romclerk_core::fds::FdsDate;
use romclerk_core::record::{InesHeader, Nes20Header, RomHeader, RomRecord};
use romclerk_core::util::hex_upper;
use romclerk_core::{FdsArchive, SegmentDigests};

use crate::nes::encode_nes_header;

/// Render everything known about a record as display text.
pub fn describe_rom(record: &RomRecord) -> String {
    let mut out = String::new();

    match &record.header {
        RomHeader::Nes20(_) => out.push_str("ROM Header Version: NES 2.0\n"),
        RomHeader::Ines(_) => out.push_str("ROM Header Version: iNES\n"),
        RomHeader::Fds(_) => out.push_str("ROM Header Version: FDS\n"),
    }

    if !record.name.is_empty() {
        out.push_str(&format!("ROM Name: {}\n", record.name));
    } else if !record.filename.is_empty() {
        out.push_str(&format!("ROM Filename: {}\n", record.filename));
    } else if !record.relative_path.is_empty() {
        out.push_str(&format!("ROM Relative Path: {}\n", record.relative_path));
    }

    out.push_str(&format!("ROM Size: {} bytes\n", record.size));
    out.push_str(&format!("ROM CRC32: {}\n", record.digests.crc32_hex()));
    out.push_str(&format!("ROM MD5: {}\n", record.digests.md5_hex()));
    out.push_str(&format!("ROM SHA1: {}\n", record.digests.sha1_hex()));
    out.push_str(&format!("ROM SHA256: {}\n", record.digests.sha256_hex()));

    match &record.header {
        RomHeader::Nes20(header) => describe_nes20(record, header, &mut out),
        RomHeader::Ines(header) => describe_ines(record, header, &mut out),
        RomHeader::Fds(archive) => describe_fds(archive, &mut out),
    }

    out
}

fn push_segment(out: &mut String, label: &str, digests: &SegmentDigests) {
    out.push_str(&format!("{label} Sum16: {}\n", digests.sum16_hex()));
    out.push_str(&format!("{label} CRC32: {}\n", digests.crc32_hex()));
    out.push_str(&format!("{label} MD5: {}\n", digests.md5_hex()));
    out.push_str(&format!("{label} SHA1: {}\n", digests.sha1_hex()));
    out.push_str(&format!("{label} SHA256: {}\n", digests.sha256_hex()));
}

fn shift_size_bytes(shift: u8) -> u64 {
    if shift == 0 {
        0
    } else {
        64u64 << shift
    }
}

fn describe_nes20(record: &RomRecord, header: &Nes20Header, out: &mut String) {
    out.push_str(&format!("PRG ROM Size: {} bytes\n", header.prg_rom_bytes));
    push_segment(out, "PRG ROM", &record.prg_digests);

    out.push_str(&format!("CHR ROM Size: {} bytes\n", header.chr_rom_bytes));
    if header.chr_rom_bytes > 0 {
        push_segment(out, "CHR ROM", &record.chr_digests);
    }

    out.push_str(&format!("Trainer Size: {} bytes\n", header.trainer_bytes));
    if header.trainer_bytes > 0 {
        push_segment(out, "Trainer", &record.trainer_digests);
    }

    out.push_str(&format!("Misc ROM Size: {} bytes\n", header.misc_rom_bytes));
    if header.misc_rom_bytes > 0 {
        out.push_str(&format!("Number of misc ROMs: {}\n", header.misc_rom_count));
        push_segment(out, "Misc ROM", &record.misc_digests);
    }

    out.push_str(&format!(
        "PRG RAM Size: {} bytes\n",
        shift_size_bytes(header.prg_ram_shift)
    ));
    out.push_str(&format!(
        "PRG NVRAM Size: {} bytes\n",
        shift_size_bytes(header.prg_nvram_shift)
    ));
    out.push_str(&format!(
        "CHR RAM Size: {} bytes\n",
        shift_size_bytes(header.chr_ram_shift)
    ));
    out.push_str(&format!(
        "CHR NVRAM Size: {} bytes\n",
        shift_size_bytes(header.chr_nvram_shift)
    ));

    if header.vertical_mirroring {
        out.push_str("Mirroring Type: Vertical\n");
    } else {
        out.push_str("Mirroring Type: Horizontal or mapper-controlled\n");
    }
    out.push_str(&format!(
        "Battery Backup: {}\n",
        if header.battery { "Yes" } else { "No" }
    ));
    out.push_str(&format!(
        "Hard-wired Four Screen Mode: {}\n",
        if header.four_screen { "Yes" } else { "No" }
    ));

    match header.console_type {
        0 => out.push_str("Console Type: Regular NES/Famicom/Dendy\n"),
        1 => {
            out.push_str("Console Type: Nintendo Vs. System\n");
            out.push_str(&format!(
                "Vs. PPU Type: {}\n",
                vs_ppu_type_name(header.vs_ppu_type)
            ));
            out.push_str(&format!(
                "Vs. System Type: {}\n",
                vs_system_type_name(header.vs_hardware_type)
            ));
        }
        2 => out.push_str("Console Type: Playchoice 10\n"),
        _ => out.push_str(&format!(
            "Console Type: {}\n",
            extended_console_type_name(header.extended_console_type)
        )),
    }

    out.push_str(&format!("Mapper: {}\n", header.mapper));
    out.push_str(&format!("Submapper: {}\n", header.submapper));
    out.push_str(&format!(
        "CPU/PPU Timing: {}\n",
        cpu_ppu_timing_name(header.cpu_ppu_timing)
    ));
    out.push_str(&format!(
        "Default Expansion Device: {}\n",
        default_expansion_name(header.default_expansion)
    ));

    if !record.source_header.is_empty() {
        out.push_str(&format!(
            "ROM Header (Existing):   {}\n",
            hex_upper(&record.source_header)
        ));
    }
    if let Ok(calculated) = encode_nes_header(record, false, true) {
        out.push_str(&format!("ROM Header (Calculated): {}", hex_upper(&calculated)));
    }
}

fn describe_ines(record: &RomRecord, header: &InesHeader, out: &mut String) {
    out.push_str(&format!("PRG ROM Size: {} bytes\n", header.prg_rom_bytes));
    push_segment(out, "PRG ROM", &record.prg_digests);

    out.push_str(&format!("CHR ROM Size: {} bytes\n", header.chr_rom_bytes));
    if header.chr_rom_bytes > 0 {
        push_segment(out, "CHR ROM", &record.chr_digests);
    }

    out.push_str(&format!("Trainer Size: {} bytes\n", header.trainer_bytes));
    if header.trainer_bytes > 0 {
        push_segment(out, "Trainer", &record.trainer_digests);
    }

    out.push_str(&format!(
        "PRG RAM Size: {} bytes\n",
        8192 * u64::from(header.prg_ram_units)
    ));

    if header.four_screen {
        out.push_str("Mirroring Type: N/A (Four-Screen VRAM)\n");
    } else if header.vertical_mirroring {
        out.push_str("Mirroring Type: Vertical (horizontal arrangement) (CIRAM A10 = PPU A10)\n");
    } else {
        out.push_str("Mirroring Type: Horizontal (vertical arrangement) (CIRAM A10 = PPU A11)\n");
    }

    out.push_str(&format!(
        "Battery Backup: {}\n",
        if header.battery { "Yes" } else { "No" }
    ));
    out.push_str(&format!(
        "Vs. Unisystem: {}\n",
        if header.vs_unisystem { "Yes" } else { "No" }
    ));
    out.push_str(&format!(
        "Playchoice 10: {}\n",
        if header.playchoice_10 { "Yes" } else { "No" }
    ));
    out.push_str(&format!("Mapper: {}\n", header.mapper));
    out.push_str(&format!(
        "TV System: {}\n",
        if header.pal_tv { "PAL" } else { "NTSC" }
    ));

    if !record.source_header.is_empty() {
        out.push_str(&format!(
            "ROM Header (Existing):   {}\n",
            hex_upper(&record.source_header)
        ));
    }
    if let Ok(calculated) = encode_nes_header(record, true, true) {
        out.push_str(&format!("ROM Header (Calculated): {}", hex_upper(&calculated)));
    }
}

fn describe_fds(archive: &FdsArchive, out: &mut String) {
    out.push_str(&format!("Disks: {}\n", archive.disks.len()));
    out.push_str(&format!("Sides: {}\n", archive.side_count()));

    for disk in &archive.disks {
        out.push_str(&format!("Disk {}:\n", disk.disk_number));
        for side in &disk.sides {
            out.push_str(&format!("  Side {}:\n", side.side_number));
            out.push_str(&format!(
                "    Game Name: {}\n",
                String::from_utf8_lossy(&side.game_name)
            ));
            out.push_str(&format!(
                "    Manufacturer Code: 0x{:02X}\n",
                side.manufacturer_code
            ));
            out.push_str(&format!("    Revision: {}\n", side.revision_number));

            let manufactured = FdsDate::from_bcd(side.manufacturing_date);
            out.push_str(&format!(
                "    Manufacturing Date: {:04}-{:02}-{:02}\n",
                manufactured.year, manufactured.month, manufactured.day
            ));
            let rewritten = FdsDate::from_bcd(side.rewrite_date);
            out.push_str(&format!(
                "    Rewrite Date: {:04}-{:02}-{:02}\n",
                rewritten.year, rewritten.month, rewritten.day
            ));
            out.push_str(&format!(
                "    Disk Writer Serial: 0x{:04X}\n",
                side.disk_writer_serial
            ));
            out.push_str(&format!(
                "    Block CRCs Stored: {}\n",
                if side.crcs_stored { "Yes" } else { "No" }
            ));

            out.push_str(&format!("    Files: {}\n", side.files.len()));
            for file in &side.files {
                out.push_str(&format!(
                    "      [{}] \"{}\" id 0x{:02X} type {} load 0x{:04X} size {}\n",
                    file.file_number,
                    file.name_string(),
                    file.file_identification_code,
                    file.file_type,
                    file.file_address,
                    file.file_size
                ));
            }
        }
    }
}

fn cpu_ppu_timing_name(timing: u8) -> &'static str {
    match timing {
        0 => "RP2C02 (\"NTSC NES\")",
        1 => "RP2C07 (\"Licensed PAL NES\")",
        2 => "Multiple-region",
        3 => "UMC 6527P (\"Dendy\")",
        _ => "Unknown/Undefined",
    }
}

fn extended_console_type_name(console_type: u8) -> &'static str {
    match console_type {
        3 => "Regular Famiclone, but with CPU that supports Decimal Mode (e.g. Bit Corporation Creator)",
        4 => "V.R. Technology VT01 with monochrome palette",
        5 => "V.R. Technology VT01 with red/cyan STN palette",
        6 => "V.R. Technology VT02",
        7 => "V.R. Technology VT03",
        8 => "V.R. Technology VT09",
        9 => "V.R. Technology VT32",
        10 => "V.R. Technology VT369",
        11 => "UMC UM6578",
        _ => "Unknown/Undefined",
    }
}

fn vs_ppu_type_name(ppu_type: u8) -> &'static str {
    match ppu_type {
        0 => "RP2C03B",
        1 => "RP2C03G",
        2 => "RP2C04-0001",
        3 => "RP2C04-0002",
        4 => "RP2C04-0003",
        5 => "RP2C04-0004",
        6 => "RC2C03B",
        7 => "RC2C03C",
        8 => "RC2C05-01 ($2002 AND $?? =$1B)",
        9 => "RC2C05-02 ($2002 AND $3F =$3D)",
        10 => "RC2C05-03 ($2002 AND $1F =$1C)",
        11 => "RC2C05-04 ($2002 AND $1F =$1B)",
        12 => "RC2C05-05 ($2002 AND $1F =unknown)",
        _ => "Unknown/Undefined",
    }
}

fn vs_system_type_name(system_type: u8) -> &'static str {
    match system_type {
        0 => "Vs. Unisystem (normal)",
        1 => "Vs. Unisystem (RBI Baseball protection)",
        2 => "Vs. Unisystem (TKO Boxing protection)",
        3 => "Vs. Unisystem (Super Xevious protection)",
        4 => "Vs. Unisystem (Vs. Ice Climber Japan protection)",
        5 => "Vs. Dual System (normal)",
        6 => "Vs. Dual System (Raid on Bungeling Bay protection)",
        _ => "Unknown/Undefined",
    }
}

fn default_expansion_name(expansion: u8) -> &'static str {
    match expansion {
        0 => "Unspecified",
        1 => "Standard NES/Famicom controllers",
        2 => "NES Four Score/Satellite with two additional standard controllers",
        3 => "Famicom Four Players Adapter with two additional standard controllers",
        4 => "Vs. System",
        5 => "Vs. System with reversed inputs",
        6 => "Vs. Pinball (Japan)",
        7 => "Vs. Zapper",
        8 => "Zapper ($4017)",
        9 => "Two Zappers",
        10 => "Bandai Hyper Shot Lightgun",
        11 => "Power Pad Side A",
        12 => "Power Pad Side B",
        13 => "Family Trainer Side A",
        14 => "Family Trainer Side B",
        15 => "Arkanoid Vaus Controller (NES)",
        16 => "Arkanoid Vaus Controller (Famicom)",
        17 => "Two Vaus Controllers plus Famicom Data Recorder",
        18 => "Konami Hyper Shot Controller",
        19 => "Coconuts Pachinko Controller",
        20 => "Exciting Boxing Punching Bag (Blowup Doll)",
        21 => "Jissen Mahjong Controller",
        22 => "Party Tap",
        23 => "Oeka Kids Tablet",
        24 => "Sunsoft Barcode Battler",
        25 => "Miracle Piano Keyboard",
        26 => "Pokkun Moguraa (Whack-a-Mole Mat and Mallet)",
        27 => "Top Rider (Inflatable Bicycle)",
        28 => "Double-Fisted (Requires or allows use of two controllers by one player)",
        29 => "Famicom 3D System",
        30 => "Doremikko Keyboard",
        31 => "R.O.B. Gyro Set",
        32 => "Famicom Data Recorder (don't emulate keyboard)",
        33 => "ASCII Turbo File",
        34 => "IGS Storage Battle Box",
        35 => "Family BASIC Keyboard plus Famicom Data Recorder",
        36 => "Dongda PEC-586 Keyboard",
        37 => "Bit Corp. Bit-79 Keyboard",
        38 => "Subor Keyboard",
        39 => "Subor Keyboard plus mouse (3x8-bit protocol)",
        40 => "Subor Keyboard plus mouse (24-bit protocol)",
        41 => "SNES Mouse ($4017.d0)",
        42 => "Multicart",
        43 => "Two SNES controllers replacing the two standard NES controllers",
        44 => "RacerMate Bicycle",
        45 => "U-Force",
        46 => "R.O.B. Stack-Up",
        47 => "City Patrolman Lightgun",
        48 => "Sharp C1 Cassette Interface",
        49 => "Standard Controller with swapped Left-Right/Up-Down/B-A",
        50 => "Excalibor Sudoku Pad",
        51 => "ABL Pinball",
        52 => "Golden Nugget Casino extra buttons",
        _ => "Unknown/Undefined",
    }
}
