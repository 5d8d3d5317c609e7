use super::*;
use romclerk_core::checksum::DigestSet;

/// Build a 16-byte descriptor with the given size and flag bytes.
fn make_header(bytes: &[(usize, u8)]) -> Vec<u8> {
    let mut header = vec![0u8; 16];
    header[0..4].copy_from_slice(&NES_MAGIC);
    for &(index, value) in bytes {
        header[index] = value;
    }
    header
}

fn make_rom(header_bytes: &[(usize, u8)], payload: &[u8]) -> Vec<u8> {
    let mut rom = make_header(header_bytes);
    rom.extend_from_slice(payload);
    rom
}

fn nes20_options() -> NesDecodeOptions {
    NesDecodeOptions::new().preserve_trainer(true)
}

#[test]
fn test_decode_minimal_nes20() {
    // 2 x 16 KiB PRG, 1 x 8 KiB CHR, mapper 0, NES 2.0 signature
    let payload = vec![0u8; 32768 + 8192];
    let rom = make_rom(&[(4, 0x02), (5, 0x01), (7, 0x08)], &payload);

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    let header = record.header.nes20().unwrap();

    assert_eq!(header.prg_rom_units, 2);
    assert_eq!(header.prg_rom_bytes, 32768);
    assert_eq!(header.chr_rom_units, 1);
    assert_eq!(header.chr_rom_bytes, 8192);
    assert_eq!(header.mapper, 0);
    assert_eq!(record.size, 40960);
    assert_eq!(record.digests.sha256, DigestSet::of(&payload).sha256);
    assert_eq!(record.prg.len(), 32768);
    assert_eq!(record.chr.len(), 8192);
    assert!(record.misc.is_empty());
}

#[test]
fn test_decode_exponential_prg_size() {
    // Byte 4 = 0x3C: exponent 15, multiplier 0; byte 9 low nibble = 0xF
    let payload = vec![0u8; 32768];
    let rom = make_rom(&[(4, 0x3C), (7, 0x08), (9, 0x0F)], &payload);

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    let header = record.header.nes20().unwrap();

    assert_eq!(header.prg_rom_units, 0);
    assert_eq!(header.prg_exponent, 15);
    assert_eq!(header.prg_multiplier, 0);
    assert_eq!(header.prg_rom_bytes, 32768);
}

#[test]
fn test_decode_whole_hash_excludes_trainer() {
    let payload = vec![0x5Au8; 16384];
    let trainer = vec![0xA5u8; 512];

    let mut with_trainer = make_header(&[(4, 0x01), (6, 0x04), (7, 0x08)]);
    with_trainer.extend_from_slice(&trainer);
    with_trainer.extend_from_slice(&payload);

    let without_trainer = make_rom(&[(4, 0x01), (7, 0x08)], &payload);

    let decoded_with = decode_nes_rom(&with_trainer, &nes20_options(), "").unwrap();
    let decoded_without = decode_nes_rom(&without_trainer, &nes20_options(), "").unwrap();

    assert_eq!(decoded_with.digests, decoded_without.digests);
    assert_eq!(decoded_with.trainer, trainer);
}

#[test]
fn test_decode_bad_magic() {
    let mut rom = make_rom(&[(4, 0x01), (7, 0x08)], &vec![0u8; 16384]);
    rom[0] = b'X';
    assert!(matches!(
        decode_nes_rom(&rom, &nes20_options(), ""),
        Err(RomError::BadMagic { .. })
    ));
}

#[test]
fn test_decode_truncated_payload() {
    // Declares 32 KiB of PRG but carries only 16
    let rom = make_rom(&[(4, 0x02), (7, 0x08)], &vec![0u8; 16384]);
    assert!(matches!(
        decode_nes_rom(&rom, &nes20_options(), ""),
        Err(RomError::TruncatedPayload { declared: 32768, actual: 16384 })
    ));
}

#[test]
fn test_decode_truncated_trainer() {
    // Trainer flag set on a file with 100 payload bytes
    let rom = make_rom(&[(4, 0x01), (6, 0x04), (7, 0x08)], &vec![0u8; 100]);
    assert!(matches!(
        decode_nes_rom(&rom, &nes20_options(), ""),
        Err(RomError::TruncatedTrainer)
    ));
}

#[test]
fn test_decode_ines_requires_fallback() {
    let rom = make_rom(&[(4, 0x01)], &vec![0u8; 16384]);
    assert!(matches!(
        decode_nes_rom(&rom, &nes20_options(), ""),
        Err(RomError::NotNes20)
    ));

    let options = NesDecodeOptions::new().enable_ines(true).preserve_trainer(true);
    let record = decode_nes_rom(&rom, &options, "").unwrap();
    assert!(record.header.ines().is_some());
}

#[test]
fn test_decode_ines_fields() {
    // Mapper 66 = 0x42: low nibble in flags6, high nibble in flags7.
    // Battery + vertical mirroring, PAL, 1 x 8 KiB PRG RAM.
    let rom = make_rom(
        &[(4, 0x02), (5, 0x01), (6, 0x23), (7, 0x40), (8, 0x01), (9, 0x01)],
        &vec![0u8; 32768 + 8192],
    );
    let options = NesDecodeOptions::new().enable_ines(true).preserve_trainer(true);
    let record = decode_nes_rom(&rom, &options, "").unwrap();
    let header = record.header.ines().unwrap();

    assert_eq!(header.mapper, 0x42);
    assert!(header.vertical_mirroring);
    assert!(header.battery);
    assert!(!header.trainer);
    assert_eq!(header.prg_ram_units, 1);
    assert!(header.pal_tv);
}

#[test]
fn test_decode_nes20_packed_fields() {
    // Mapper 0x123 across three nibbles, submapper 5, console type 1 with
    // Vs. PPU 2 / hardware 3, timing 1, 2 misc ROMs, expansion 0x2A
    let rom = make_rom(
        &[
            (4, 0x01),
            (6, 0x30),
            (7, 0x29), // mapper bits 4-7 = 2, signature, console type 1
            (8, 0x51), // mapper bits 8-11 = 1, submapper 5
            (10, 0x87),
            (11, 0x79),
            (12, 0x01),
            (13, 0x32),
            (14, 0x02),
            (15, 0x2A),
        ],
        &vec![0u8; 16384],
    );

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    let header = record.header.nes20().unwrap();

    assert_eq!(header.mapper, 0x123);
    assert_eq!(header.submapper, 5);
    assert_eq!(header.console_type, 1);
    assert_eq!(header.vs_ppu_type, 2);
    assert_eq!(header.vs_hardware_type, 3);
    assert_eq!(header.extended_console_type, 0);
    assert_eq!(header.prg_ram_shift, 7);
    assert_eq!(header.prg_nvram_shift, 8);
    assert_eq!(header.chr_ram_shift, 9);
    assert_eq!(header.chr_nvram_shift, 7);
    assert_eq!(header.cpu_ppu_timing, 1);
    assert_eq!(header.misc_rom_count, 2);
    assert_eq!(header.default_expansion, 0x2A);
}

#[test]
fn test_round_trip_nes20_without_trainer() {
    let mut payload = Vec::new();
    for index in 0..(32768 + 8192) {
        payload.push((index % 251) as u8);
    }
    let rom = make_rom(
        &[(4, 0x02), (5, 0x01), (6, 0x31), (7, 0x48), (12, 0x01), (15, 0x01)],
        &payload,
    );

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    let encoded = encode_nes_rom(&record, &NesEncodeOptions::new().preserve_trainer(true)).unwrap();
    assert_eq!(encoded, rom);
}

#[test]
fn test_round_trip_nes20_with_trainer() {
    let payload = vec![0x11u8; 16384];
    let trainer: Vec<u8> = (0..512).map(|index| (index % 256) as u8).collect();

    let mut rom = make_header(&[(4, 0x01), (6, 0x04), (7, 0x08)]);
    rom.extend_from_slice(&trainer);
    rom.extend_from_slice(&payload);

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    let encoded = encode_nes_rom(&record, &NesEncodeOptions::new().preserve_trainer(true)).unwrap();
    assert_eq!(encoded, rom);
}

#[test]
fn test_round_trip_exponential_size() {
    let payload = vec![0x22u8; 32768];
    let rom = make_rom(&[(4, 0x3C), (7, 0x08), (9, 0x0F)], &payload);

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    let encoded = encode_nes_rom(&record, &NesEncodeOptions::new().preserve_trainer(true)).unwrap();
    assert_eq!(encoded, rom);
}

#[test]
fn test_round_trip_ines() {
    let payload = vec![0x33u8; 16384 + 8192];
    let rom = make_rom(&[(4, 0x01), (5, 0x01), (6, 0x12), (7, 0x01), (8, 0x02)], &payload);

    let options = NesDecodeOptions::new().enable_ines(true).preserve_trainer(true);
    let record = decode_nes_rom(&rom, &options, "").unwrap();
    let encoded = encode_nes_rom(
        &record,
        &NesEncodeOptions::new().enable_ines(true).preserve_trainer(true),
    )
    .unwrap();
    assert_eq!(encoded, rom);
}

#[test]
fn test_encode_drops_unpreserved_trainer() {
    let payload = vec![0x44u8; 16384];
    let mut rom = make_header(&[(4, 0x01), (6, 0x04), (7, 0x08)]);
    rom.extend_from_slice(&[0xEE; 512]);
    rom.extend_from_slice(&payload);

    // Decoded without trainer preservation: flag is dropped and the 512
    // bytes are omitted from the output.
    let record = decode_nes_rom(&rom, &NesDecodeOptions::new(), "").unwrap();
    let encoded = encode_nes_rom(&record, &NesEncodeOptions::new()).unwrap();

    assert_eq!(encoded.len(), 16 + 16384);
    assert_eq!(encoded[6] & 0x04, 0);
}

#[test]
fn test_encode_truncate_discards_misc() {
    let mut payload = vec![0x55u8; 16384];
    payload.extend_from_slice(&[0xBB; 100]); // misc residue
    let rom = make_rom(&[(4, 0x01), (7, 0x08)], &payload);

    let record = decode_nes_rom(&rom, &nes20_options(), "").unwrap();
    assert_eq!(record.misc.len(), 100);

    let encoded = encode_nes_rom(&record, &NesEncodeOptions::new().truncate(true)).unwrap();
    assert_eq!(encoded.len(), 16 + 16384);
}

#[test]
fn test_split_payload() {
    let payload: Vec<u8> = (0..100).collect();
    let (prg, chr, misc) = split_payload(&payload, 60, 30).unwrap();
    assert_eq!(prg, &payload[..60]);
    assert_eq!(chr, &payload[60..90]);
    assert_eq!(misc, &payload[90..]);

    assert!(split_payload(&payload, 80, 30).is_err());
}

#[test]
fn test_encode_ines_zero_fills_tail() {
    let payload = vec![0u8; 16384];
    let rom = make_rom(&[(4, 0x01), (8, 0x02), (9, 0x01)], &payload);
    let options = NesDecodeOptions::new().enable_ines(true).preserve_trainer(true);
    let record = decode_nes_rom(&rom, &options, "").unwrap();

    let header = encode_nes_header(&record, true, true).unwrap();
    assert_eq!(&header[10..16], &[0u8; 6]);
    assert_eq!(header[8], 0x02);
    assert_eq!(header[9], 0x01);
}
