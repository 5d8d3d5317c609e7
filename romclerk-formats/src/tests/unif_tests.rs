use super::*;
use romclerk_core::RomError;

fn make_prefix(version: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(&UNIF_MAGIC);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&[0u8; 24]);
    out
}

fn push_chunk(out: &mut Vec<u8>, id: &str, data: &[u8]) {
    out.extend_from_slice(id.as_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

fn push_crc_chunk(out: &mut Vec<u8>, id: &str, data: &[u8]) {
    push_chunk(out, id, &crc32fast::hash(data).to_le_bytes());
}

#[test]
fn test_reassemble_fragments_in_hex_order() {
    let first = vec![0xAAu8; 16384];
    let second = vec![0x55u8; 16384];

    let mut image = make_prefix(4);
    // Out of file order on purpose: PRG1 before PRG0
    push_chunk(&mut image, "PRG1", &second);
    push_chunk(&mut image, "PRG0", &first);

    let record = decode_unif_rom(&image, "").unwrap();
    assert_eq!(record.prg.len(), 32768);
    assert!(record.prg[..16384].iter().all(|&b| b == 0xAA));
    assert!(record.prg[16384..].iter().all(|&b| b == 0x55));
    assert!(record.chr.is_empty());

    let header = record.header.nes20().unwrap();
    assert_eq!(header.prg_rom_bytes, 32768);
    assert_eq!(header.chr_rom_bytes, 0);
}

#[test]
fn test_fragment_crcs_verify() {
    let first = vec![0xAAu8; 16384];
    let second = vec![0x55u8; 16384];

    let mut image = make_prefix(5);
    push_chunk(&mut image, "PRG0", &first);
    push_crc_chunk(&mut image, "PCK0", &first);
    push_chunk(&mut image, "PRG1", &second);
    push_crc_chunk(&mut image, "PCK1", &second);

    let record = decode_unif_rom(&image, "").unwrap();
    assert_eq!(record.prg.len(), 32768);
}

#[test]
fn test_fragment_crc_mismatch() {
    let fragment = vec![0xAAu8; 1024];

    let mut image = make_prefix(5);
    push_chunk(&mut image, "PRG0", &fragment);
    push_chunk(&mut image, "PCK0", &0xDEADBEEFu32.to_le_bytes());

    assert!(matches!(
        decode_unif_rom(&image, ""),
        Err(RomError::UnifChecksumMismatch { .. })
    ));
}

#[test]
fn test_version_gating_ignores_future_chunks() {
    // PRG0 was introduced in v4; a v1 container may not use it.
    let mut image = make_prefix(1);
    push_chunk(&mut image, "PRG0", &[0xAA; 512]);

    let record = decode_unif_rom(&image, "").unwrap();
    assert!(record.prg.is_empty());
}

#[test]
fn test_name_chunk_sets_display_name() {
    let mut image = make_prefix(7);
    push_chunk(&mut image, "NAME", b"Boot Hill\0garbage");
    push_chunk(&mut image, "MAPR", b"NES-NROM-128\0");
    push_chunk(&mut image, "PRG0", &[0x12; 1024]);

    let parsed = parse_unif(&image).unwrap();
    assert_eq!(parsed.name.as_deref(), Some("Boot Hill"));
    assert_eq!(parsed.board.as_deref(), Some("NES-NROM-128"));

    let record = decode_unif_rom(&image, "").unwrap();
    assert_eq!(record.name, "Boot Hill");
}

#[test]
fn test_unknown_chunks_are_retained_but_ignored() {
    let mut image = make_prefix(7);
    push_chunk(&mut image, "XYZW", &[1, 2, 3]);
    push_chunk(&mut image, "PRG0", &[0xAA; 256]);

    let parsed = parse_unif(&image).unwrap();
    assert_eq!(parsed.chunks.get("XYZW").unwrap(), &vec![1u8, 2, 3]);
    assert_eq!(parsed.prg.len(), 256);
}

#[test]
fn test_corrupt_dinf_is_tolerated() {
    let mut image = make_prefix(7);

    // A stray NUL before "DINF" and a zero length field, with the 204
    // data bytes present anyway.
    image.push(0);
    image.extend_from_slice(b"DINF");
    image.extend_from_slice(&0u32.to_le_bytes());
    image.extend_from_slice(&[0x5A; 204]);
    push_chunk(&mut image, "PRG0", &[0x77; 128]);

    let parsed = parse_unif(&image).unwrap();
    assert_eq!(parsed.chunks.get("DINF").unwrap().len(), 204);
    assert_eq!(parsed.prg.len(), 128);
}

#[test]
fn test_bad_magic() {
    let image = vec![0xFFu8; 64];
    assert!(matches!(
        decode_unif_rom(&image, ""),
        Err(RomError::BadMagic { .. })
    ));
}

#[test]
fn test_truncated_chunk() {
    let mut image = make_prefix(4);
    image.extend_from_slice(b"PRG0");
    image.extend_from_slice(&1000u32.to_le_bytes());
    image.extend_from_slice(&[0u8; 10]); // far fewer than declared

    assert!(matches!(
        decode_unif_rom(&image, ""),
        Err(RomError::TruncatedPayload { .. })
    ));
}

#[test]
fn test_record_hashes_cover_reassembled_pair() {
    let prg = vec![0x0Fu8; 16384];
    let chr = vec![0xF0u8; 8192];

    let mut image = make_prefix(4);
    push_chunk(&mut image, "PRG0", &prg);
    push_chunk(&mut image, "CHR0", &chr);

    let record = decode_unif_rom(&image, "").unwrap();

    let mut pair = prg.clone();
    pair.extend_from_slice(&chr);
    assert_eq!(record.digests, romclerk_core::DigestSet::of(&pair));
    assert_eq!(record.prg_digests, romclerk_core::SegmentDigests::of(&prg));
    assert_eq!(record.chr_digests, romclerk_core::SegmentDigests::of(&chr));
}
