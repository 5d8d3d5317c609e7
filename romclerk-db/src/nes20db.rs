//! Compact reference form: the nes20db XML format.
//!
//! Implements the community database format described at
//! <https://forums.nesdev.com/viewtopic.php?f=3&t=19940> for interchange
//! with tools that support it. Only NES 2.0 records appear; the document
//! stores byte sizes, CRC-32/SHA-1/sum-16 per segment, and the PCB
//! fields, organized under a dated root.
//!
//! Mirroring is a single letter with two mapper-specific exceptions:
//! mapper 30 uses H/V/1/4 and mapper 218 uses H/V/0/1 to fold the
//! four-screen flag into the code; everything else is H/V/4.
//!
//! On decode, records are keyed `"SHA1:UPPERHEX"`.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use romclerk_core::checksum::{DigestSet, SegmentDigests};
use romclerk_core::record::{Nes20Header, RomHeader, RomRecord, SizeSource};
use romclerk_core::util::hex_decode;

use crate::error::DbError;
use crate::matcher::TemplateLibrary;

/// SHA-1 of the empty string; the database uses it for absent CHR ROMs.
pub const SHA1_ZERO_SUM: &str = "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709";

// ---------------------------------------------------------------------------
// Marshal
// ---------------------------------------------------------------------------

/// Serialize the NES 2.0 records of a library in nes20db form. `date` is
/// the root attribute, conventionally `YYYY-MM-DD`.
pub fn marshal_nes20db_xml(library: &TemplateLibrary, date: &str) -> Result<String, DbError> {
    let mut records: Vec<&RomRecord> = library
        .values()
        .filter(|record| record.header.nes20().is_some())
        .collect();
    records.sort_by(|a, b| {
        a.digests
            .sha1
            .cmp(&b.digests.sha1)
            .then(a.name.cmp(&b.name))
    });

    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

    let mut root = BytesStart::new("nes20db");
    root.push_attribute(("date", date));
    writer.write_event(Event::Start(root))?;

    for record in records {
        let header = record.header.nes20().expect("filtered to NES 2.0 above");
        write_game(&mut writer, record, header)?;
    }

    writer.write_event(Event::End(BytesEnd::new("nes20db")))?;

    let body = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

fn write_game(
    writer: &mut Writer<Vec<u8>>,
    record: &RomRecord,
    header: &Nes20Header,
) -> Result<(), DbError> {
    writer.write_event(Event::Start(BytesStart::new("game")))?;

    let mut prgrom = BytesStart::new("prgrom");
    prgrom.push_attribute(("size", header.prg_rom_bytes.to_string().as_str()));
    prgrom.push_attribute(("crc32", record.prg_digests.crc32_hex().as_str()));
    prgrom.push_attribute(("sha1", record.prg_digests.sha1_hex().as_str()));
    prgrom.push_attribute(("sum16", record.prg_digests.sum16_hex().as_str()));
    writer.write_event(Event::Empty(prgrom))?;

    let mut chrrom = BytesStart::new("chrrom");
    chrrom.push_attribute(("size", header.chr_rom_bytes.to_string().as_str()));
    chrrom.push_attribute(("crc32", record.chr_digests.crc32_hex().as_str()));
    chrrom.push_attribute(("sha1", record.chr_digests.sha1_hex().as_str()));
    chrrom.push_attribute(("sum16", record.chr_digests.sum16_hex().as_str()));
    writer.write_event(Event::Empty(chrrom))?;

    let mut rom = BytesStart::new("rom");
    rom.push_attribute(("size", record.size.to_string().as_str()));
    rom.push_attribute(("crc32", record.digests.crc32_hex().as_str()));
    rom.push_attribute(("sha1", record.digests.sha1_hex().as_str()));
    writer.write_event(Event::Empty(rom))?;

    let mut pcb = BytesStart::new("pcb");
    pcb.push_attribute(("mapper", header.mapper.to_string().as_str()));
    pcb.push_attribute(("submapper", header.submapper.to_string().as_str()));
    pcb.push_attribute((
        "mirroring",
        encode_mirroring(header, &record.name)?.as_str(),
    ));
    pcb.push_attribute(("battery", if header.battery { "1" } else { "0" }));
    writer.write_event(Event::Empty(pcb))?;

    let mut console = BytesStart::new("console");
    let console_code = if header.console_type < 3 {
        header.console_type
    } else {
        header.extended_console_type
    };
    console.push_attribute(("type", console_code.to_string().as_str()));
    console.push_attribute(("region", header.cpu_ppu_timing.to_string().as_str()));
    writer.write_event(Event::Empty(console))?;

    let mut expansion = BytesStart::new("expansion");
    expansion.push_attribute(("type", header.default_expansion.to_string().as_str()));
    writer.write_event(Event::Empty(expansion))?;

    write_ram_element(writer, "chrram", header.chr_ram_shift)?;
    write_ram_element(writer, "prgnvram", header.prg_nvram_shift)?;
    write_ram_element(writer, "prgram", header.prg_ram_shift)?;

    let mut miscrom = BytesStart::new("miscrom");
    miscrom.push_attribute(("size", header.misc_rom_bytes.to_string().as_str()));
    miscrom.push_attribute(("crc32", record.misc_digests.crc32_hex().as_str()));
    miscrom.push_attribute(("sha1", record.misc_digests.sha1_hex().as_str()));
    miscrom.push_attribute(("number", header.misc_rom_count.to_string().as_str()));
    writer.write_event(Event::Empty(miscrom))?;

    let mut vs = BytesStart::new("vs");
    vs.push_attribute(("hardware", header.vs_hardware_type.to_string().as_str()));
    vs.push_attribute(("ppu", header.vs_ppu_type.to_string().as_str()));
    writer.write_event(Event::Empty(vs))?;

    write_ram_element(writer, "chrnvram", header.chr_nvram_shift)?;

    let mut trainer = BytesStart::new("trainer");
    trainer.push_attribute(("size", header.trainer_bytes.to_string().as_str()));
    trainer.push_attribute(("crc32", record.trainer_digests.crc32_hex().as_str()));
    trainer.push_attribute(("sha1", record.trainer_digests.sha1_hex().as_str()));
    writer.write_event(Event::Empty(trainer))?;

    writer.write_event(Event::End(BytesEnd::new("game")))?;
    Ok(())
}

/// RAM sizes are stored as byte counts: 64 << shift, zero when unused.
fn write_ram_element(writer: &mut Writer<Vec<u8>>, name: &str, shift: u8) -> Result<(), DbError> {
    let size: u64 = if shift > 0 { 64u64 << shift } else { 0 };
    let mut element = BytesStart::new(name);
    element.push_attribute(("size", size.to_string().as_str()));
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn encode_mirroring(header: &Nes20Header, name: &str) -> Result<String, DbError> {
    let code = match (header.mapper, header.four_screen, header.vertical_mirroring) {
        (_, false, false) => "H",
        (_, false, true) => "V",
        (30, true, false) => "1",
        (30, true, true) => "4",
        (218, true, false) => "0",
        (218, true, true) => "1",
        (_, true, false) => "4",
        (_, true, true) => {
            return Err(DbError::invalid_document(format!(
                "invalid mirroring type and four screen setting for mapper {} in ROM: {}",
                header.mapper, name
            )))
        }
    };
    Ok(code.to_string())
}

// ---------------------------------------------------------------------------
// Unmarshal
// ---------------------------------------------------------------------------

/// Parse an nes20db document into a library keyed `"SHA1:UPPERHEX"`.
pub fn unmarshal_nes20db_xml(payload: &str) -> Result<TemplateLibrary, DbError> {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    let mut library = TemplateLibrary::new();
    let mut game: Option<GameFields> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref element) | Event::Empty(ref element) => {
                let name = element.name().as_ref().to_vec();
                let attrs = attributes_map(element)?;

                match name.as_slice() {
                    b"game" => game = Some(GameFields::default()),
                    b"prgrom" => {
                        if let Some(game) = &mut game {
                            game.prgrom = Some(attrs);
                        }
                    }
                    b"chrrom" => {
                        if let Some(game) = &mut game {
                            game.chrrom = Some(attrs);
                        }
                    }
                    b"rom" => {
                        if let Some(game) = &mut game {
                            game.rom = Some(attrs);
                        }
                    }
                    b"pcb" => {
                        if let Some(game) = &mut game {
                            game.pcb = Some(attrs);
                        }
                    }
                    b"console" => {
                        if let Some(game) = &mut game {
                            game.console = Some(attrs);
                        }
                    }
                    b"expansion" => {
                        if let Some(game) = &mut game {
                            game.expansion = Some(attrs);
                        }
                    }
                    b"chrram" => {
                        if let Some(game) = &mut game {
                            game.chrram = Some(attrs);
                        }
                    }
                    b"prgnvram" => {
                        if let Some(game) = &mut game {
                            game.prgnvram = Some(attrs);
                        }
                    }
                    b"prgram" => {
                        if let Some(game) = &mut game {
                            game.prgram = Some(attrs);
                        }
                    }
                    b"miscrom" => {
                        if let Some(game) = &mut game {
                            game.miscrom = Some(attrs);
                        }
                    }
                    b"vs" => {
                        if let Some(game) = &mut game {
                            game.vs = Some(attrs);
                        }
                    }
                    b"chrnvram" => {
                        if let Some(game) = &mut game {
                            game.chrnvram = Some(attrs);
                        }
                    }
                    b"trainer" => {
                        if let Some(game) = &mut game {
                            game.trainer = Some(attrs);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref element) => {
                if element.name().as_ref() == b"game" {
                    if let Some(fields) = game.take() {
                        let record = fields.into_record();
                        let key = format!("SHA1:{}", record.digests.sha1_hex());
                        library.entry(key).or_insert(record);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(library)
}

#[derive(Default)]
struct GameFields {
    prgrom: Option<HashMap<String, String>>,
    chrrom: Option<HashMap<String, String>>,
    rom: Option<HashMap<String, String>>,
    pcb: Option<HashMap<String, String>>,
    console: Option<HashMap<String, String>>,
    expansion: Option<HashMap<String, String>>,
    chrram: Option<HashMap<String, String>>,
    prgnvram: Option<HashMap<String, String>>,
    prgram: Option<HashMap<String, String>>,
    miscrom: Option<HashMap<String, String>>,
    vs: Option<HashMap<String, String>>,
    chrnvram: Option<HashMap<String, String>>,
    trainer: Option<HashMap<String, String>>,
}

impl GameFields {
    fn into_record(self) -> RomRecord {
        let mut header = Nes20Header::default();
        let mut record_digests = DigestSet::default();
        let mut prg_digests = SegmentDigests::default();
        let mut chr_digests = SegmentDigests::default();
        let mut misc_digests = SegmentDigests::default();
        let mut trainer_digests = SegmentDigests::default();
        let mut size: u64 = 0;

        if let Some(attrs) = &self.prgrom {
            header.prg_rom_bytes = number(attrs, "size");
            prg_digests = segment_digests(attrs);
        }

        if let Some(attrs) = &self.chrrom {
            header.chr_rom_bytes = number(attrs, "size");
            if header.chr_rom_bytes > 0 {
                chr_digests = segment_digests(attrs);
            } else {
                // The database stores the empty-string SHA-1 for absent
                // CHR; normalize back to the all-zero digests the model
                // uses for empty segments.
                chr_digests.sha1 = hex_decode(SHA1_ZERO_SUM)
                    .expect("static hex")
                    .try_into()
                    .expect("static length");
            }
        }

        if let Some(attrs) = &self.rom {
            size = number(attrs, "size");
            if let Some(bytes) = attrs.get("crc32").and_then(|value| hex_decode(value)) {
                if bytes.len() == 4 {
                    record_digests.crc32 =
                        u32::from_be_bytes(bytes.try_into().expect("length checked"));
                }
            }
            if let Some(bytes) = attrs.get("sha1").and_then(|value| hex_decode(value)) {
                if bytes.len() == 20 {
                    record_digests.sha1 = bytes.try_into().expect("length checked");
                }
            }
        }

        if let Some(attrs) = &self.pcb {
            header.mapper = number(attrs, "mapper") as u16;
            header.submapper = number(attrs, "submapper") as u8;
            header.battery = attrs.get("battery").map(String::as_str) == Some("1");
            if let Some(mirroring) = attrs.get("mirroring") {
                decode_mirroring(&mut header, mirroring);
            }
        }

        if let Some(attrs) = &self.console {
            header.cpu_ppu_timing = number(attrs, "region") as u8;
            let console_code = number(attrs, "type") as u8;
            if console_code < 3 {
                header.console_type = console_code;
            } else {
                header.console_type = 3;
                header.extended_console_type = console_code;
            }
        }

        if let Some(attrs) = &self.expansion {
            header.default_expansion = number(attrs, "type") as u8;
        }

        header.chr_ram_shift = ram_shift(self.chrram.as_ref());
        header.prg_nvram_shift = ram_shift(self.prgnvram.as_ref());
        header.prg_ram_shift = ram_shift(self.prgram.as_ref());
        header.chr_nvram_shift = ram_shift(self.chrnvram.as_ref());

        if let Some(attrs) = &self.miscrom {
            header.misc_rom_count = number(attrs, "number") as u8;
            if header.misc_rom_count > 0 {
                header.misc_rom_bytes = number(attrs, "size");
                misc_digests = segment_digests(attrs);
            }
        }

        if let Some(attrs) = &self.vs {
            header.vs_hardware_type = number(attrs, "hardware") as u8;
            header.vs_ppu_type = number(attrs, "ppu") as u8;
        }

        if let Some(attrs) = &self.trainer {
            let trainer_size = number(attrs, "size") as u16;
            if trainer_size > 0 {
                header.trainer = true;
                header.trainer_bytes = 512;
                trainer_digests = segment_digests(attrs);
            }
        }

        let mut record = RomRecord::with_header(RomHeader::Nes20(header));
        record.size = size;
        record.digests = record_digests;
        record.prg_digests = prg_digests;
        record.chr_digests = chr_digests;
        record.misc_digests = misc_digests;
        record.trainer_digests = trainer_digests;
        record.update_sizes(SizeSource::FromByteCount, SizeSource::FromByteCount);

        record
    }
}

fn decode_mirroring(header: &mut Nes20Header, code: &str) {
    let (four_screen, vertical) = match (header.mapper, code) {
        (_, "H") => (false, false),
        (_, "V") => (false, true),
        (30, "1") => (true, false),
        (30, "4") => (true, true),
        (218, "0") => (true, false),
        (218, "1") => (true, true),
        (_, "4") => (true, false),
        _ => return,
    };
    header.four_screen = four_screen;
    header.vertical_mirroring = vertical;
}

fn ram_shift(attrs: Option<&HashMap<String, String>>) -> u8 {
    let mut size = attrs.map(|attrs| number(attrs, "size")).unwrap_or(0);
    if size == 0 {
        return 0;
    }

    let mut shift: u8 = 0;
    while size > 64 {
        size >>= 1;
        shift += 1;
    }
    shift
}

fn attributes_map(element: &BytesStart) -> Result<HashMap<String, String>, DbError> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr?;
        map.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        );
    }
    Ok(map)
}

fn number(attrs: &HashMap<String, String>, key: &str) -> u64 {
    attrs
        .get(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn segment_digests(attrs: &HashMap<String, String>) -> SegmentDigests {
    let mut digests = SegmentDigests::default();
    if let Some(bytes) = attrs.get("crc32").and_then(|value| hex_decode(value)) {
        if bytes.len() == 4 {
            digests.crc32 = u32::from_be_bytes(bytes.try_into().expect("length checked"));
        }
    }
    if let Some(bytes) = attrs.get("sha1").and_then(|value| hex_decode(value)) {
        if bytes.len() == 20 {
            digests.sha1 = bytes.try_into().expect("length checked");
        }
    }
    if let Some(bytes) = attrs.get("sum16").and_then(|value| hex_decode(value)) {
        if bytes.len() == 2 {
            digests.sum16 = u16::from_be_bytes(bytes.try_into().expect("length checked"));
        }
    }
    digests
}

#[cfg(test)]
#[path = "tests/nes20db_tests.rs"]
mod tests;
