use super::*;

use romclerk_core::fds::{FdsDate, FDS_SIDE_SIZE};

fn full_options() -> XmlOptions {
    XmlOptions {
        enable_ines: true,
        preserve_trainer: true,
        enable_organization: true,
    }
}

fn nes20_record() -> RomRecord {
    let prg = vec![0xAA; 32768];
    let chr = vec![0x55; 8192];
    let mut payload = prg.clone();
    payload.extend_from_slice(&chr);

    let mut record = RomRecord::with_header(RomHeader::Nes20(Nes20Header {
        prg_rom_units: 2,
        prg_rom_bytes: 32768,
        chr_rom_units: 1,
        chr_rom_bytes: 8192,
        mapper: 4,
        submapper: 1,
        battery: true,
        vertical_mirroring: true,
        trainer: true,
        trainer_bytes: 512,
        prg_ram_shift: 7,
        chr_nvram_shift: 3,
        console_type: 1,
        vs_hardware_type: 2,
        vs_ppu_type: 3,
        cpu_ppu_timing: 1,
        misc_rom_count: 0,
        default_expansion: 1,
        ..Default::default()
    }));
    record.name = "Example Cart".to_string();
    record.relative_path = "USA/Example Cart.nes".to_string();
    record.prg = prg;
    record.chr = chr;
    record.payload = payload;
    record.trainer = (0..512).map(|index| (index % 256) as u8).collect();
    record.update_checksums();
    record
}

fn ines_record() -> RomRecord {
    let prg = vec![0x13; 16384];
    let mut record = RomRecord::with_header(RomHeader::Ines(InesHeader {
        prg_rom_units: 1,
        prg_rom_bytes: 16384,
        mapper: 66,
        battery: true,
        playchoice_10: true,
        prg_ram_units: 2,
        pal_tv: true,
        ..Default::default()
    }));
    record.name = "Old Dump".to_string();
    record.relative_path = "World/Old Dump.nes".to_string();
    record.prg = prg.clone();
    record.payload = prg;
    record.update_checksums();
    record
}

fn fds_record() -> RomRecord {
    let mut side = FdsSide {
        size: FDS_SIDE_SIZE as u64,
        manufacturer_code: 0x01,
        game_name: *b"ZEL",
        game_type: 0x20,
        revision_number: 1,
        side_number: 0,
        disk_number: 0,
        boot_file_id: 1,
        manufacturing_date: FdsDate {
            year: 1986,
            month: 2,
            day: 21,
        }
        .to_bcd()
        .unwrap(),
        country_code: 0x49,
        rewrite_date: [0x62, 0x01, 0x07],
        disk_writer_serial: 0x1234,
        rewrite_count: 3,
        price: 2,
        crcs_stored: true,
        disk_info_crc: 0x4321,
        file_table_crc: 0x8765,
        unallocated_space: vec![0x00, 0xFF, 0x00, 0xFF],
        unallocated_space_offset: 1000,
        ..Default::default()
    };
    side.reserved.0 = [0x18; 19];
    side.files.push(FdsFile {
        file_number: 0,
        file_identification_code: 0,
        file_name: *b"KYOTSU  ",
        file_address: 0x6000,
        file_size: 4,
        file_type: 0,
        file_metadata_crc: 0x9ABC,
        data: FdsFileData {
            size: 4,
            digests: DigestSet::of(&[1, 2, 3, 4]),
            bytes: vec![1, 2, 3, 4],
            file_data_crc: 0xDEF0,
        },
    });

    let archive = FdsArchive {
        disks: vec![FdsDisk {
            disk_number: 0,
            sides: vec![side],
        }],
    };

    let mut record = RomRecord::with_header(RomHeader::Fds(archive));
    record.name = "Disk Title".to_string();
    record.relative_path = "FDS/Disk Title.fds".to_string();
    record.size = FDS_SIDE_SIZE as u64;
    record.digests = DigestSet::of(b"stand-in archive bytes");
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
fn test_nes20_round_trip() {
    let record = nes20_record();
    let library = library_of(vec![record.clone()]);

    let xml = marshal_default_xml(&library, &full_options()).unwrap();
    let parsed = unmarshal_default_xml(&xml, &full_options()).unwrap();

    assert_eq!(parsed.len(), 1);
    let key = format!("SHA256:{}", record.digests.sha256_hex());
    let round_tripped = parsed.get(&key).expect("record is keyed by SHA-256");

    assert_eq!(round_tripped.name, record.name);
    assert_eq!(round_tripped.relative_path, record.relative_path);
    assert_eq!(round_tripped.size, record.size);
    assert_eq!(round_tripped.digests, record.digests);
    assert_eq!(round_tripped.prg_digests, record.prg_digests);
    assert_eq!(round_tripped.chr_digests, record.chr_digests);
    assert_eq!(round_tripped.trainer_digests, record.trainer_digests);
    assert_eq!(round_tripped.trainer, record.trainer);
    assert_eq!(
        round_tripped.header.nes20().unwrap(),
        record.header.nes20().unwrap()
    );
    // Templates carry metadata only, never payload bytes
    assert!(round_tripped.payload.is_empty());
}

#[test]
fn test_exponential_size_round_trip() {
    let mut record = nes20_record();
    {
        let RomHeader::Nes20(header) = &mut record.header else {
            unreachable!()
        };
        header.prg_rom_units = 0;
        header.prg_exponent = 15;
        header.prg_multiplier = 0;
        header.prg_rom_bytes = 32768;
    }
    let library = library_of(vec![record.clone()]);

    let xml = marshal_default_xml(&library, &full_options()).unwrap();
    let parsed = unmarshal_default_xml(&xml, &full_options()).unwrap();
    let round_tripped = parsed.values().next().unwrap();
    let header = round_tripped.header.nes20().unwrap();

    assert_eq!(header.prg_rom_units, 0);
    assert_eq!(header.prg_exponent, 15);
    assert_eq!(header.prg_multiplier, 0);
    assert_eq!(header.prg_rom_bytes, 32768);
}

#[test]
fn test_ines_round_trip() {
    let record = ines_record();
    let library = library_of(vec![record.clone()]);

    let xml = marshal_default_xml(&library, &full_options()).unwrap();
    let parsed = unmarshal_default_xml(&xml, &full_options()).unwrap();

    let round_tripped = parsed.values().next().unwrap();
    assert_eq!(
        round_tripped.header.ines().unwrap(),
        record.header.ines().unwrap()
    );
    assert_eq!(round_tripped.prg_digests, record.prg_digests);
}

#[test]
fn test_ines_records_dropped_when_disabled() {
    let library = library_of(vec![ines_record()]);

    let options = XmlOptions {
        enable_ines: false,
        preserve_trainer: true,
        enable_organization: true,
    };
    let xml = marshal_default_xml(&library, &options).unwrap();
    let parsed = unmarshal_default_xml(&xml, &options).unwrap();
    assert!(parsed.is_empty());

    // Even a document written with iNES enabled is filtered on read.
    let xml = marshal_default_xml(&library, &full_options()).unwrap();
    let parsed = unmarshal_default_xml(&xml, &options).unwrap();
    assert!(parsed.is_empty());
}

#[test]
fn test_fds_round_trip() {
    let record = fds_record();
    let library = library_of(vec![record.clone()]);

    let xml = marshal_default_xml(&library, &full_options()).unwrap();
    let parsed = unmarshal_default_xml(&xml, &full_options()).unwrap();

    let round_tripped = parsed.values().next().unwrap();
    let original = record.header.fds().unwrap();
    let recovered = round_tripped.header.fds().unwrap();

    assert_eq!(recovered.disks.len(), 1);
    let original_side = &original.disks[0].sides[0];
    let recovered_side = &recovered.disks[0].sides[0];

    assert_eq!(recovered_side.game_name, original_side.game_name);
    assert_eq!(recovered_side.manufacturing_date, original_side.manufacturing_date);
    assert_eq!(recovered_side.rewrite_date, original_side.rewrite_date);
    assert_eq!(recovered_side.disk_writer_serial, original_side.disk_writer_serial);
    assert_eq!(recovered_side.reserved, original_side.reserved);
    assert_eq!(recovered_side.crcs_stored, original_side.crcs_stored);
    assert_eq!(recovered_side.disk_info_crc, original_side.disk_info_crc);
    assert_eq!(recovered_side.file_table_crc, original_side.file_table_crc);
    assert_eq!(
        recovered_side.unallocated_space,
        original_side.unallocated_space
    );
    assert_eq!(
        recovered_side.unallocated_space_offset,
        original_side.unallocated_space_offset
    );

    let original_file = &original_side.files[0];
    let recovered_file = &recovered_side.files[0];
    assert_eq!(recovered_file.file_name, original_file.file_name);
    assert_eq!(recovered_file.file_address, original_file.file_address);
    assert_eq!(recovered_file.data.bytes, original_file.data.bytes);
    assert_eq!(recovered_file.data.file_data_crc, original_file.data.file_data_crc);
    assert_eq!(recovered_file.file_metadata_crc, original_file.file_metadata_crc);
}

#[test]
fn test_organization_gates_relative_path() {
    let record = nes20_record();
    let library = library_of(vec![record.clone()]);

    let options = XmlOptions {
        enable_ines: true,
        preserve_trainer: true,
        enable_organization: false,
    };
    let xml = marshal_default_xml(&library, &options).unwrap();
    assert!(!xml.contains("relativePath"));

    let parsed = unmarshal_default_xml(&xml, &options).unwrap();
    assert!(parsed.values().next().unwrap().relative_path.is_empty());
}

#[test]
fn test_xml_escaping_of_names() {
    let mut record = nes20_record();
    record.name = "Fish & Chips <Rev A>".to_string();
    let library = library_of(vec![record.clone()]);

    let xml = marshal_default_xml(&library, &full_options()).unwrap();
    let parsed = unmarshal_default_xml(&xml, &full_options()).unwrap();
    assert_eq!(parsed.values().next().unwrap().name, record.name);
}
