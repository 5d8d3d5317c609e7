use super::*;

use romclerk_core::record::InesHeader;

fn nes20_record(mapper: u16, four_screen: bool, vertical: bool) -> RomRecord {
    let prg = vec![0xA1; 32768];
    let chr = vec![0xB2; 8192];
    let mut payload = prg.clone();
    payload.extend_from_slice(&chr);

    let mut record = RomRecord::with_header(RomHeader::Nes20(Nes20Header {
        prg_rom_units: 2,
        prg_rom_bytes: 32768,
        chr_rom_units: 1,
        chr_rom_bytes: 8192,
        mapper,
        submapper: 2,
        four_screen,
        vertical_mirroring: vertical,
        battery: true,
        cpu_ppu_timing: 1,
        console_type: 0,
        default_expansion: 1,
        prg_ram_shift: 7,
        chr_nvram_shift: 4,
        ..Default::default()
    }));
    record.name = format!("Game M{mapper}");
    record.prg = prg;
    record.chr = chr;
    record.payload = payload;
    record.update_checksums();
    record
}

fn library_of(records: Vec<RomRecord>) -> TemplateLibrary {
    let mut library = TemplateLibrary::new();
    for record in records {
        let key = format!("SHA1:{}", record.digests.sha1_hex());
        library.insert(key, record);
    }
    library
}

#[test]
fn test_round_trip_declared_fields() {
    let record = nes20_record(4, false, true);
    let library = library_of(vec![record.clone()]);

    let xml = marshal_nes20db_xml(&library, "2021-05-04").unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("date=\"2021-05-04\""));

    let parsed = unmarshal_nes20db_xml(&xml).unwrap();
    assert_eq!(parsed.len(), 1);

    let key = format!("SHA1:{}", record.digests.sha1_hex());
    let round_tripped = parsed.get(&key).expect("record is keyed by SHA-1");
    let original = record.header.nes20().unwrap();
    let recovered = round_tripped.header.nes20().unwrap();

    assert_eq!(recovered.prg_rom_bytes, original.prg_rom_bytes);
    assert_eq!(recovered.chr_rom_bytes, original.chr_rom_bytes);
    assert_eq!(recovered.mapper, original.mapper);
    assert_eq!(recovered.submapper, original.submapper);
    assert_eq!(recovered.battery, original.battery);
    assert_eq!(recovered.vertical_mirroring, original.vertical_mirroring);
    assert_eq!(recovered.four_screen, original.four_screen);
    assert_eq!(recovered.cpu_ppu_timing, original.cpu_ppu_timing);
    assert_eq!(recovered.default_expansion, original.default_expansion);
    assert_eq!(recovered.prg_ram_shift, original.prg_ram_shift);
    assert_eq!(recovered.chr_nvram_shift, original.chr_nvram_shift);

    assert_eq!(round_tripped.size, record.size);
    assert_eq!(round_tripped.digests.crc32, record.digests.crc32);
    assert_eq!(round_tripped.digests.sha1, record.digests.sha1);
    assert_eq!(round_tripped.prg_digests.crc32, record.prg_digests.crc32);
    assert_eq!(round_tripped.prg_digests.sha1, record.prg_digests.sha1);
    assert_eq!(round_tripped.prg_digests.sum16, record.prg_digests.sum16);
    assert_eq!(round_tripped.chr_digests.sha1, record.chr_digests.sha1);

    // Linear size fields are recovered from the byte counts
    assert_eq!(recovered.prg_rom_units, 2);
    assert_eq!(recovered.chr_rom_units, 1);
}

#[test]
fn test_mirroring_codes_standard_mapper() {
    for (four_screen, vertical, expected) in
        [(false, false, "H"), (false, true, "V"), (true, false, "4")]
    {
        let record = nes20_record(1, four_screen, vertical);
        let library = library_of(vec![record.clone()]);
        let xml = marshal_nes20db_xml(&library, "2021-01-01").unwrap();
        assert!(
            xml.contains(&format!("mirroring=\"{expected}\"")),
            "mapper 1 four_screen={four_screen} vertical={vertical}"
        );

        let parsed = unmarshal_nes20db_xml(&xml).unwrap();
        let recovered = parsed.values().next().unwrap().header.nes20().unwrap();
        assert_eq!(recovered.four_screen, four_screen);
        assert_eq!(recovered.vertical_mirroring, vertical);
    }
}

#[test]
fn test_mirroring_rejects_invalid_combination() {
    let record = nes20_record(1, true, true);
    let library = library_of(vec![record]);
    assert!(marshal_nes20db_xml(&library, "2021-01-01").is_err());
}

#[test]
fn test_mirroring_codes_mapper_30_and_218() {
    // Mappers 30 and 218 fold four-screen + mirroring into a 4-way code.
    for (mapper, four_screen, vertical, expected) in [
        (30u16, true, false, "1"),
        (30, true, true, "4"),
        (218, true, false, "0"),
        (218, true, true, "1"),
    ] {
        let record = nes20_record(mapper, four_screen, vertical);
        let library = library_of(vec![record.clone()]);
        let xml = marshal_nes20db_xml(&library, "2021-01-01").unwrap();
        assert!(
            xml.contains(&format!("mirroring=\"{expected}\"")),
            "mapper {mapper} four_screen={four_screen} vertical={vertical}"
        );

        let parsed = unmarshal_nes20db_xml(&xml).unwrap();
        let recovered = parsed.values().next().unwrap().header.nes20().unwrap();
        assert_eq!(recovered.four_screen, four_screen, "mapper {mapper}");
        assert_eq!(recovered.vertical_mirroring, vertical, "mapper {mapper}");
    }
}

#[test]
fn test_extended_console_type_round_trip() {
    let mut record = nes20_record(0, false, false);
    {
        let RomHeader::Nes20(header) = &mut record.header else {
            unreachable!()
        };
        header.console_type = 3;
        header.extended_console_type = 7; // VT03 famiclone
    }
    let library = library_of(vec![record]);

    let xml = marshal_nes20db_xml(&library, "2021-01-01").unwrap();
    assert!(xml.contains("type=\"7\""));

    let parsed = unmarshal_nes20db_xml(&xml).unwrap();
    let recovered = parsed.values().next().unwrap().header.nes20().unwrap();
    assert_eq!(recovered.console_type, 3);
    assert_eq!(recovered.extended_console_type, 7);
}

#[test]
fn test_empty_chr_uses_zero_sum_sha1() {
    let mut record = nes20_record(0, false, false);
    {
        let RomHeader::Nes20(header) = &mut record.header else {
            unreachable!()
        };
        header.chr_rom_units = 0;
        header.chr_rom_bytes = 0;
    }
    record.chr.clear();
    record.chr_digests = Default::default();
    record.payload = record.prg.clone();
    record.update_checksums();

    let library = library_of(vec![record]);
    let xml = marshal_nes20db_xml(&library, "2021-01-01").unwrap();

    let parsed = unmarshal_nes20db_xml(&xml).unwrap();
    let recovered = parsed.values().next().unwrap();
    assert_eq!(recovered.header.nes20().unwrap().chr_rom_bytes, 0);
    assert_eq!(
        romclerk_core::util::hex_upper(&recovered.chr_digests.sha1),
        SHA1_ZERO_SUM
    );
}

#[test]
fn test_ines_records_are_excluded() {
    let mut record = nes20_record(0, false, false);
    record.header = RomHeader::Ines(InesHeader::default());
    let library = library_of(vec![record]);

    let xml = marshal_nes20db_xml(&library, "2021-01-01").unwrap();
    let parsed = unmarshal_nes20db_xml(&xml).unwrap();
    assert!(parsed.is_empty());
}

#[test]
fn test_ram_sizes_stored_as_byte_counts() {
    let record = nes20_record(4, false, false);
    let library = library_of(vec![record]);
    let xml = marshal_nes20db_xml(&library, "2021-01-01").unwrap();

    // prg_ram_shift 7 → 64 << 7 = 8192 bytes
    assert!(xml.contains("<prgram size=\"8192\"/>"));
    // chr_nvram_shift 4 → 64 << 4 = 1024 bytes
    assert!(xml.contains("<chrnvram size=\"1024\"/>"));
}
