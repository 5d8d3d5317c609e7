use super::*;

use romclerk_core::record::{InesHeader, Nes20Header};
use romclerk_core::RomRecord;

fn nes20_record(name: &str, console_type: u8) -> RomRecord {
    let prg = vec![0xC3; 32768];
    let chr = vec![0x3C; 8192];
    let mut payload = prg.clone();
    payload.extend_from_slice(&chr);

    let mut record = RomRecord::with_header(RomHeader::Nes20(Nes20Header {
        prg_rom_units: 2,
        prg_rom_bytes: 32768,
        chr_rom_units: 1,
        chr_rom_bytes: 8192,
        mapper: 1,
        console_type,
        ..Default::default()
    }));
    record.name = name.to_string();
    record.prg = prg;
    record.chr = chr;
    record.payload = payload;
    record.update_checksums();
    record
}

fn library_of(records: Vec<RomRecord>) -> TemplateLibrary {
    let mut library = TemplateLibrary::new();
    for record in records {
        let key = format!("SHA256:{}", record.digests.sha256_hex());
        library.insert(key, record);
    }
    library
}

#[test]
fn test_record_stride_and_layout() {
    let library = library_of(vec![nes20_record("Solo", 0)]);
    let db = marshal_flat_db(&library, false).unwrap();

    assert_eq!(db.len(), FLAT_RECORD_SIZE);
    assert!(db.ends_with('\0'));
    assert!(!db.ends_with('\n'));

    let body = db.trim_end_matches('\0');
    let fields: Vec<&str> = body.split("^^").collect();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0], "32768");
    assert_eq!(fields[1], "8192");
    assert_eq!(fields[2].len(), 8); // PRG CRC32, uppercase hex
    assert_eq!(fields[3].len(), 8); // CHR CRC32
    assert_eq!(fields[4], "Solo");
    assert_eq!(fields[5].len(), 32); // 16 header bytes as hex
    assert!(fields[5].starts_with("4E45531A"));
}

#[test]
fn test_records_sorted_by_name() {
    let library = library_of(vec![
        nes20_record("Zebra", 0),
        nes20_record("Apple", 0),
        nes20_record("Mango", 0),
    ]);
    let db = marshal_flat_db(&library, false).unwrap();

    assert_eq!(db.len(), 3 * FLAT_RECORD_SIZE);

    let names: Vec<&str> = db
        .as_bytes()
        .chunks(FLAT_RECORD_SIZE)
        .map(|chunk| {
            let text = std::str::from_utf8(chunk).unwrap();
            text.split("^^").nth(4).unwrap()
        })
        .collect();
    assert_eq!(names, ["Apple", "Mango", "Zebra"]);
}

#[test]
fn test_empty_chr_crc_field() {
    let mut record = nes20_record("No CHR", 0);
    {
        let RomHeader::Nes20(header) = &mut record.header else {
            unreachable!()
        };
        header.chr_rom_units = 0;
        header.chr_rom_bytes = 0;
    }
    record.chr.clear();
    record.payload = record.prg.clone();
    record.update_checksums();

    let library = library_of(vec![record]);
    let db = marshal_flat_db(&library, false).unwrap();

    let body = db.trim_end_matches('\0');
    let fields: Vec<&str> = body.split("^^").collect();
    assert_eq!(fields[1], "0");
    assert_eq!(fields[3], "");
}

#[test]
fn test_non_home_console_types_excluded() {
    let library = library_of(vec![
        nes20_record("Home", 0),
        nes20_record("Vs Machine", 1),
        nes20_record("Playchoice", 2),
    ]);
    let db = marshal_flat_db(&library, false).unwrap();
    assert_eq!(db.len(), FLAT_RECORD_SIZE);
    assert!(db.contains("Home"));
}

#[test]
fn test_ines_gating() {
    let prg = vec![0x71; 16384];
    let mut ines = RomRecord::with_header(RomHeader::Ines(InesHeader {
        prg_rom_units: 1,
        prg_rom_bytes: 16384,
        ..Default::default()
    }));
    ines.name = "Legacy".to_string();
    ines.prg = prg.clone();
    ines.payload = prg;
    ines.update_checksums();

    let mut vs_unisystem = ines.clone();
    vs_unisystem.name = "Arcade".to_string();
    if let RomHeader::Ines(header) = &mut vs_unisystem.header {
        header.vs_unisystem = true;
    }
    // Distinct payload so the two records get distinct library keys
    vs_unisystem.payload.push(0);
    vs_unisystem.update_checksums();

    let library = library_of(vec![ines, vs_unisystem]);

    assert!(marshal_flat_db(&library, false).unwrap().is_empty());

    let db = marshal_flat_db(&library, true).unwrap();
    assert_eq!(db.len(), FLAT_RECORD_SIZE);
    assert!(db.contains("Legacy"));
    assert!(!db.contains("Arcade"));
}
