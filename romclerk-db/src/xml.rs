//! Default interchange document: the lossless `<nesroms>` XML form.
//!
//! Every header field, every digest, and (for FDS archives) the full
//! filesystem snapshot survives a round trip through this form. Binary
//! payloads (trainers, FDS file data, reserved bytes, unallocated space)
//! are hex-encoded text; the in-memory model always carries raw bytes.
//!
//! On decode, records are keyed `"SHA256:UPPERHEX"`, which selects the
//! SHA-256-first matching cascade downstream.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use romclerk_core::checksum::{DigestSet, SegmentDigests};
use romclerk_core::fds::{FdsArchive, FdsDisk, FdsFile, FdsFileData, FdsReserved, FdsSide};
use romclerk_core::record::{InesHeader, Nes20Header, RomHeader, RomRecord, SizeSource};
use romclerk_core::util::{hex_decode, hex_lower};

use crate::error::DbError;
use crate::matcher::TemplateLibrary;

/// Options shared by marshal and unmarshal.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlOptions {
    /// Include iNES 1.0 records
    pub enable_ines: bool,
    /// Include captured trainer bytes
    pub preserve_trainer: bool,
    /// Include relative paths for organized output trees
    pub enable_organization: bool,
}

// ---------------------------------------------------------------------------
// Marshal
// ---------------------------------------------------------------------------

/// Serialize a library to the default document form. Records are emitted
/// sorted by name so the output is reproducible.
pub fn marshal_default_xml(
    library: &TemplateLibrary,
    options: &XmlOptions,
) -> Result<String, DbError> {
    let mut records: Vec<&RomRecord> = library.values().collect();
    records.sort_by(|a, b| a.name.cmp(&b.name).then(a.relative_path.cmp(&b.relative_path)));

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Start(BytesStart::new("nesroms")))?;

    for record in records {
        match &record.header {
            RomHeader::Nes20(_) | RomHeader::Fds(_) => {}
            RomHeader::Ines(_) if options.enable_ines => {}
            RomHeader::Ines(_) => continue,
        }
        write_rom(&mut writer, record, options)?;
    }

    writer.write_event(Event::End(BytesEnd::new("nesroms")))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn write_rom(
    writer: &mut Writer<Vec<u8>>,
    record: &RomRecord,
    options: &XmlOptions,
) -> Result<(), DbError> {
    let mut rom = BytesStart::new("rom");
    rom.push_attribute(("name", record.name.as_str()));
    rom.push_attribute(("size", record.size.to_string().as_str()));
    if options.enable_organization {
        let path = record.relative_path.trim_start_matches('/');
        rom.push_attribute(("relativePath", path));
    }
    rom.push_attribute(("crc32", hex_lower(&record.digests.crc32.to_be_bytes()).as_str()));
    rom.push_attribute(("md5", hex_lower(&record.digests.md5).as_str()));
    rom.push_attribute(("sha1", hex_lower(&record.digests.sha1).as_str()));
    rom.push_attribute(("sha256", hex_lower(&record.digests.sha256).as_str()));
    writer.write_event(Event::Start(rom))?;

    if options.preserve_trainer && !record.trainer.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("trainerData")))?;
        writer.write_event(Event::Text(BytesText::new(&hex_lower(&record.trainer))))?;
        writer.write_event(Event::End(BytesEnd::new("trainerData")))?;
    }

    match &record.header {
        RomHeader::Nes20(header) => write_nes20(writer, record, header)?,
        RomHeader::Ines(header) => write_ines(writer, record, header)?,
        RomHeader::Fds(archive) => write_fds(writer, archive)?,
    }

    writer.write_event(Event::End(BytesEnd::new("rom")))?;
    Ok(())
}

fn push_segment_attributes(element: &mut BytesStart, digests: &SegmentDigests) {
    element.push_attribute(("sum16", hex_lower(&digests.sum16.to_be_bytes()).as_str()));
    element.push_attribute(("crc32", hex_lower(&digests.crc32.to_be_bytes()).as_str()));
    element.push_attribute(("md5", hex_lower(&digests.md5).as_str()));
    element.push_attribute(("sha1", hex_lower(&digests.sha1).as_str()));
    element.push_attribute(("sha256", hex_lower(&digests.sha256).as_str()));
}

fn write_value_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: String,
) -> Result<(), DbError> {
    let mut element = BytesStart::new(name);
    element.push_attribute(("value", value.as_str()));
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn write_size_element(writer: &mut Writer<Vec<u8>>, name: &str, size: String) -> Result<(), DbError> {
    let mut element = BytesStart::new(name);
    element.push_attribute(("size", size.as_str()));
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn write_nes20(
    writer: &mut Writer<Vec<u8>>,
    record: &RomRecord,
    header: &Nes20Header,
) -> Result<(), DbError> {
    writer.write_event(Event::Start(BytesStart::new("nes20")))?;

    let mut prgrom = BytesStart::new("prgrom");
    if header.prg_rom_units > 0 {
        prgrom.push_attribute(("size", header.prg_rom_units.to_string().as_str()));
    } else {
        prgrom.push_attribute(("sizeExponent", header.prg_exponent.to_string().as_str()));
        prgrom.push_attribute(("sizeMultiplier", header.prg_multiplier.to_string().as_str()));
    }
    push_segment_attributes(&mut prgrom, &record.prg_digests);
    writer.write_event(Event::Empty(prgrom))?;

    let mut chrrom = BytesStart::new("chrrom");
    if header.chr_rom_units > 0 {
        chrrom.push_attribute(("size", header.chr_rom_units.to_string().as_str()));
    } else {
        chrrom.push_attribute(("sizeExponent", header.chr_exponent.to_string().as_str()));
        chrrom.push_attribute(("sizeMultiplier", header.chr_multiplier.to_string().as_str()));
    }
    push_segment_attributes(&mut chrrom, &record.chr_digests);
    writer.write_event(Event::Empty(chrrom))?;

    let mut miscrom = BytesStart::new("miscrom");
    miscrom.push_attribute(("size", header.misc_rom_bytes.to_string().as_str()));
    miscrom.push_attribute(("number", header.misc_rom_count.to_string().as_str()));
    push_segment_attributes(&mut miscrom, &record.misc_digests);
    writer.write_event(Event::Empty(miscrom))?;

    let mut trainer = BytesStart::new("trainer");
    trainer.push_attribute(("value", bool_str(header.trainer)));
    push_segment_attributes(&mut trainer, &record.trainer_digests);
    writer.write_event(Event::Empty(trainer))?;

    write_size_element(writer, "prgram", header.prg_ram_shift.to_string())?;
    write_size_element(writer, "prgnvram", header.prg_nvram_shift.to_string())?;
    write_size_element(writer, "chrram", header.chr_ram_shift.to_string())?;
    write_size_element(writer, "chrnvram", header.chr_nvram_shift.to_string())?;
    write_value_element(writer, "mirroringType", bool_str(header.vertical_mirroring).to_string())?;
    write_value_element(writer, "battery", bool_str(header.battery).to_string())?;
    write_value_element(writer, "fourScreen", bool_str(header.four_screen).to_string())?;
    write_value_element(writer, "consoleType", header.console_type.to_string())?;
    write_value_element(writer, "mapper", header.mapper.to_string())?;
    write_value_element(writer, "subMapper", header.submapper.to_string())?;
    write_value_element(writer, "cpuPpuTiming", header.cpu_ppu_timing.to_string())?;
    write_value_element(writer, "vsHardwareType", header.vs_hardware_type.to_string())?;
    write_value_element(writer, "vsPpuType", header.vs_ppu_type.to_string())?;
    write_value_element(
        writer,
        "extendedConsoleType",
        header.extended_console_type.to_string(),
    )?;
    write_value_element(writer, "miscRoms", header.misc_rom_count.to_string())?;
    write_value_element(writer, "defaultExpansion", header.default_expansion.to_string())?;

    writer.write_event(Event::End(BytesEnd::new("nes20")))?;
    Ok(())
}

fn write_ines(
    writer: &mut Writer<Vec<u8>>,
    record: &RomRecord,
    header: &InesHeader,
) -> Result<(), DbError> {
    writer.write_event(Event::Start(BytesStart::new("ines")))?;

    let mut prgrom = BytesStart::new("prgrom");
    prgrom.push_attribute(("size", header.prg_rom_units.to_string().as_str()));
    push_segment_attributes(&mut prgrom, &record.prg_digests);
    writer.write_event(Event::Empty(prgrom))?;

    let mut chrrom = BytesStart::new("chrrom");
    chrrom.push_attribute(("size", header.chr_rom_units.to_string().as_str()));
    push_segment_attributes(&mut chrrom, &record.chr_digests);
    writer.write_event(Event::Empty(chrrom))?;

    let mut trainer = BytesStart::new("trainer");
    trainer.push_attribute(("value", bool_str(header.trainer)));
    push_segment_attributes(&mut trainer, &record.trainer_digests);
    writer.write_event(Event::Empty(trainer))?;

    write_value_element(writer, "mirroringType", bool_str(header.vertical_mirroring).to_string())?;
    write_value_element(writer, "battery", bool_str(header.battery).to_string())?;
    write_value_element(writer, "fourScreen", bool_str(header.four_screen).to_string())?;
    write_value_element(writer, "mapper", header.mapper.to_string())?;
    write_value_element(writer, "vsUnisystem", bool_str(header.vs_unisystem).to_string())?;
    write_value_element(writer, "playChoice10", bool_str(header.playchoice_10).to_string())?;
    write_size_element(writer, "prgram", header.prg_ram_units.to_string())?;
    write_value_element(writer, "tvSystem", bool_str(header.pal_tv).to_string())?;

    writer.write_event(Event::End(BytesEnd::new("ines")))?;
    Ok(())
}

fn write_fds(writer: &mut Writer<Vec<u8>>, archive: &FdsArchive) -> Result<(), DbError> {
    let mut fds = BytesStart::new("fds");
    fds.push_attribute(("sides", archive.side_count().to_string().as_str()));
    writer.write_event(Event::Start(fds))?;

    for disk in &archive.disks {
        let mut disk_element = BytesStart::new("disk");
        disk_element.push_attribute(("number", disk.disk_number.to_string().as_str()));
        writer.write_event(Event::Start(disk_element))?;

        for side in &disk.sides {
            write_fds_side(writer, side)?;
        }

        writer.write_event(Event::End(BytesEnd::new("disk")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("fds")))?;
    Ok(())
}

fn write_fds_side(writer: &mut Writer<Vec<u8>>, side: &FdsSide) -> Result<(), DbError> {
    let mut element = BytesStart::new("side");
    element.push_attribute(("size", side.size.to_string().as_str()));
    element.push_attribute(("crcsStored", bool_str(side.crcs_stored)));
    element.push_attribute(("manufacturerCode", side.manufacturer_code.to_string().as_str()));
    element.push_attribute(("gameName", hex_lower(&side.game_name).as_str()));
    element.push_attribute(("gameType", side.game_type.to_string().as_str()));
    element.push_attribute(("revisionNumber", side.revision_number.to_string().as_str()));
    element.push_attribute(("sideNumber", side.side_number.to_string().as_str()));
    element.push_attribute(("diskNumber", side.disk_number.to_string().as_str()));
    element.push_attribute(("diskType", side.disk_type.to_string().as_str()));
    element.push_attribute(("bootFileId", side.boot_file_id.to_string().as_str()));
    element.push_attribute(("manufacturingDate", hex_lower(&side.manufacturing_date).as_str()));
    element.push_attribute(("countryCode", side.country_code.to_string().as_str()));
    element.push_attribute(("rewriteDate", hex_lower(&side.rewrite_date).as_str()));
    element.push_attribute((
        "diskWriterSerialNumber",
        side.disk_writer_serial.to_string().as_str(),
    ));
    element.push_attribute(("rewriteCount", side.rewrite_count.to_string().as_str()));
    element.push_attribute(("actualDiskSide", side.actual_disk_side.to_string().as_str()));
    element.push_attribute(("price", side.price.to_string().as_str()));
    element.push_attribute(("diskInfoCrc", side.disk_info_crc.to_string().as_str()));
    element.push_attribute(("fileTableCrc", side.file_table_crc.to_string().as_str()));
    element.push_attribute(("crc32", hex_lower(&side.digests.crc32.to_be_bytes()).as_str()));
    element.push_attribute(("md5", hex_lower(&side.digests.md5).as_str()));
    element.push_attribute(("sha1", hex_lower(&side.digests.sha1).as_str()));
    element.push_attribute(("sha256", hex_lower(&side.digests.sha256).as_str()));
    writer.write_event(Event::Start(element))?;

    writer.write_event(Event::Start(BytesStart::new("reserved")))?;
    writer.write_event(Event::Text(BytesText::new(&hex_lower(&side.reserved.0))))?;
    writer.write_event(Event::End(BytesEnd::new("reserved")))?;

    for file in &side.files {
        let mut file_element = BytesStart::new("file");
        file_element.push_attribute(("number", file.file_number.to_string().as_str()));
        file_element.push_attribute(("idCode", file.file_identification_code.to_string().as_str()));
        file_element.push_attribute(("name", hex_lower(&file.file_name).as_str()));
        file_element.push_attribute(("address", file.file_address.to_string().as_str()));
        file_element.push_attribute(("size", file.file_size.to_string().as_str()));
        file_element.push_attribute(("type", file.file_type.to_string().as_str()));
        file_element.push_attribute(("metadataCrc", file.file_metadata_crc.to_string().as_str()));
        file_element.push_attribute(("dataCrc", file.data.file_data_crc.to_string().as_str()));
        file_element.push_attribute(("crc32", hex_lower(&file.data.digests.crc32.to_be_bytes()).as_str()));
        file_element.push_attribute(("md5", hex_lower(&file.data.digests.md5).as_str()));
        file_element.push_attribute(("sha1", hex_lower(&file.data.digests.sha1).as_str()));
        file_element.push_attribute(("sha256", hex_lower(&file.data.digests.sha256).as_str()));
        writer.write_event(Event::Start(file_element))?;
        writer.write_event(Event::Text(BytesText::new(&hex_lower(&file.data.bytes))))?;
        writer.write_event(Event::End(BytesEnd::new("file")))?;
    }

    let mut unallocated = BytesStart::new("unallocated");
    unallocated.push_attribute((
        "offset",
        side.unallocated_space_offset.to_string().as_str(),
    ));
    writer.write_event(Event::Start(unallocated))?;
    writer.write_event(Event::Text(BytesText::new(&hex_lower(
        &side.unallocated_space,
    ))))?;
    writer.write_event(Event::End(BytesEnd::new("unallocated")))?;

    writer.write_event(Event::End(BytesEnd::new("side")))?;
    Ok(())
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ---------------------------------------------------------------------------
// Unmarshal
// ---------------------------------------------------------------------------

/// Parse a default-form document into a library keyed `"SHA256:UPPERHEX"`.
pub fn unmarshal_default_xml(
    payload: &str,
    options: &XmlOptions,
) -> Result<TemplateLibrary, DbError> {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    let mut library = TemplateLibrary::new();
    let mut parser = RomParser::default();

    loop {
        match reader.read_event()? {
            Event::Start(ref element) => {
                parser.open(element, options)?;
            }
            Event::Empty(ref element) => {
                parser.open(element, options)?;
                parser.close(element.name().as_ref(), &mut library);
            }
            Event::Text(ref text) => {
                parser.text(&text.unescape()?);
            }
            Event::End(ref element) => {
                parser.close(element.name().as_ref(), &mut library);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(library)
}

/// Streaming parser state for the default form.
#[derive(Default)]
struct RomParser {
    record: Option<RomRecord>,
    nes20: Option<Nes20Header>,
    ines: Option<InesHeader>,
    archive: Option<FdsArchive>,
    disk: Option<FdsDisk>,
    side: Option<FdsSide>,
    file: Option<FdsFile>,
    current_tag: String,
    saw_header: bool,
}

impl RomParser {
    fn open(&mut self, element: &BytesStart, options: &XmlOptions) -> Result<(), DbError> {
        let name = element.name().as_ref().to_vec();
        let attrs = attributes_map(element)?;

        match name.as_slice() {
            b"rom" => {
                let mut record = RomRecord::with_header(RomHeader::Nes20(Nes20Header::default()));
                record.name = attrs.get("name").cloned().unwrap_or_default();
                record.size = parse_number(&attrs, "size");
                if options.enable_organization {
                    record.relative_path = attrs.get("relativePath").cloned().unwrap_or_default();
                }
                record.digests = parse_digest_attrs(&attrs);
                self.record = Some(record);
                self.saw_header = false;
            }
            b"nes20" if self.record.is_some() => {
                self.nes20 = Some(Nes20Header::default());
            }
            b"ines" if self.record.is_some() => {
                if options.enable_ines {
                    self.ines = Some(InesHeader::default());
                }
            }
            b"fds" if self.record.is_some() => {
                self.archive = Some(FdsArchive::default());
            }
            b"disk" if self.archive.is_some() => {
                self.disk = Some(FdsDisk {
                    disk_number: parse_number(&attrs, "number") as u8,
                    sides: Vec::new(),
                });
            }
            b"side" if self.disk.is_some() => {
                self.side = Some(parse_side_attrs(&attrs));
            }
            b"file" if self.side.is_some() => {
                self.file = Some(parse_file_attrs(&attrs));
            }
            b"unallocated" if self.side.is_some() => {
                if let Some(side) = &mut self.side {
                    side.unallocated_space_offset = parse_number(&attrs, "offset") as u16;
                }
                self.current_tag = "unallocated".to_string();
            }
            b"prgrom" => self.apply_prgrom(&attrs),
            b"chrrom" => self.apply_chrrom(&attrs),
            b"miscrom" => self.apply_miscrom(&attrs),
            b"trainer" => self.apply_trainer(&attrs),
            b"prgram" => {
                let size = parse_number(&attrs, "size") as u8;
                if let Some(header) = &mut self.nes20 {
                    header.prg_ram_shift = size;
                } else if let Some(header) = &mut self.ines {
                    header.prg_ram_units = size;
                }
            }
            b"prgnvram" => {
                if let Some(header) = &mut self.nes20 {
                    header.prg_nvram_shift = parse_number(&attrs, "size") as u8;
                }
            }
            b"chrram" => {
                if let Some(header) = &mut self.nes20 {
                    header.chr_ram_shift = parse_number(&attrs, "size") as u8;
                }
            }
            b"chrnvram" => {
                if let Some(header) = &mut self.nes20 {
                    header.chr_nvram_shift = parse_number(&attrs, "size") as u8;
                }
            }
            b"mirroringType" => {
                let value = parse_bool(&attrs);
                if let Some(header) = &mut self.nes20 {
                    header.vertical_mirroring = value;
                } else if let Some(header) = &mut self.ines {
                    header.vertical_mirroring = value;
                }
            }
            b"battery" => {
                let value = parse_bool(&attrs);
                if let Some(header) = &mut self.nes20 {
                    header.battery = value;
                } else if let Some(header) = &mut self.ines {
                    header.battery = value;
                }
            }
            b"fourScreen" => {
                let value = parse_bool(&attrs);
                if let Some(header) = &mut self.nes20 {
                    header.four_screen = value;
                } else if let Some(header) = &mut self.ines {
                    header.four_screen = value;
                }
            }
            b"consoleType" => {
                if let Some(header) = &mut self.nes20 {
                    header.console_type = parse_value(&attrs) as u8;
                }
            }
            b"mapper" => {
                let value = parse_value(&attrs);
                if let Some(header) = &mut self.nes20 {
                    header.mapper = value as u16;
                } else if let Some(header) = &mut self.ines {
                    header.mapper = value as u8;
                }
            }
            b"subMapper" => {
                if let Some(header) = &mut self.nes20 {
                    header.submapper = parse_value(&attrs) as u8;
                }
            }
            b"cpuPpuTiming" => {
                if let Some(header) = &mut self.nes20 {
                    header.cpu_ppu_timing = parse_value(&attrs) as u8;
                }
            }
            b"vsHardwareType" => {
                if let Some(header) = &mut self.nes20 {
                    header.vs_hardware_type = parse_value(&attrs) as u8;
                }
            }
            b"vsPpuType" => {
                if let Some(header) = &mut self.nes20 {
                    header.vs_ppu_type = parse_value(&attrs) as u8;
                }
            }
            b"extendedConsoleType" => {
                if let Some(header) = &mut self.nes20 {
                    header.extended_console_type = parse_value(&attrs) as u8;
                }
            }
            b"miscRoms" => {
                if let Some(header) = &mut self.nes20 {
                    header.misc_rom_count = parse_value(&attrs) as u8;
                }
            }
            b"defaultExpansion" => {
                if let Some(header) = &mut self.nes20 {
                    header.default_expansion = parse_value(&attrs) as u8;
                }
            }
            b"vsUnisystem" => {
                if let Some(header) = &mut self.ines {
                    header.vs_unisystem = parse_bool(&attrs);
                }
            }
            b"playChoice10" => {
                if let Some(header) = &mut self.ines {
                    header.playchoice_10 = parse_bool(&attrs);
                }
            }
            b"tvSystem" => {
                if let Some(header) = &mut self.ines {
                    header.pal_tv = parse_bool(&attrs);
                }
            }
            b"trainerData" => {
                self.current_tag = "trainerData".to_string();
            }
            b"reserved" => {
                self.current_tag = "reserved".to_string();
            }
            _ => {}
        }

        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.file.is_some() {
            if let Some(bytes) = hex_decode(text) {
                if let Some(file) = &mut self.file {
                    file.data.size = bytes.len() as u64;
                    file.data.digests = DigestSet::of(&bytes);
                    file.data.bytes = bytes;
                }
            }
            return;
        }

        match self.current_tag.as_str() {
            "trainerData" => {
                if let (Some(record), Some(bytes)) = (&mut self.record, hex_decode(text)) {
                    record.trainer = bytes;
                }
            }
            "reserved" => {
                if let (Some(side), Some(bytes)) = (&mut self.side, hex_decode(text)) {
                    if bytes.len() == side.reserved.0.len() {
                        side.reserved = FdsReserved(bytes.try_into().expect("length checked"));
                    }
                }
            }
            "unallocated" => {
                if let (Some(side), Some(bytes)) = (&mut self.side, hex_decode(text)) {
                    side.unallocated_space = bytes;
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8], library: &mut TemplateLibrary) {
        match name {
            b"trainerData" | b"reserved" | b"unallocated" => {
                self.current_tag.clear();
            }
            b"file" => {
                if let (Some(side), Some(file)) = (&mut self.side, self.file.take()) {
                    side.files.push(file);
                }
            }
            b"side" => {
                if let (Some(disk), Some(side)) = (&mut self.disk, self.side.take()) {
                    disk.sides.push(side);
                }
            }
            b"disk" => {
                if let (Some(archive), Some(disk)) = (&mut self.archive, self.disk.take()) {
                    archive.disks.push(disk);
                }
            }
            b"nes20" => {
                if let (Some(record), Some(header)) = (&mut self.record, self.nes20.take()) {
                    record.header = RomHeader::Nes20(header);
                    record.update_sizes(
                        SizeSource::FromFactoredFields,
                        SizeSource::FromFactoredFields,
                    );
                    self.saw_header = true;
                }
            }
            b"ines" => {
                if let (Some(record), Some(header)) = (&mut self.record, self.ines.take()) {
                    record.header = RomHeader::Ines(header);
                    record.update_sizes(
                        SizeSource::FromFactoredFields,
                        SizeSource::FromFactoredFields,
                    );
                    self.saw_header = true;
                }
            }
            b"fds" => {
                if let (Some(record), Some(archive)) = (&mut self.record, self.archive.take()) {
                    record.header = RomHeader::Fds(archive);
                    self.saw_header = true;
                }
            }
            b"rom" => {
                // Records whose header element was filtered out (an iNES
                // record with the fallback disabled) are dropped.
                if let Some(record) = self.record.take() {
                    if self.saw_header {
                        let key = format!("SHA256:{}", record.digests.sha256_hex());
                        library.entry(key).or_insert(record);
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_prgrom(&mut self, attrs: &HashMap<String, String>) {
        if let Some(header) = &mut self.nes20 {
            if let Some(size) = attrs.get("size") {
                header.prg_rom_units = size.parse().unwrap_or(0);
            } else {
                header.prg_exponent = parse_number(attrs, "sizeExponent") as u8;
                header.prg_multiplier = parse_number(attrs, "sizeMultiplier") as u8;
            }
        } else if let Some(header) = &mut self.ines {
            header.prg_rom_units = parse_number(attrs, "size") as u8;
        }
        if let Some(record) = &mut self.record {
            record.prg_digests = parse_segment_attrs(attrs);
        }
    }

    fn apply_chrrom(&mut self, attrs: &HashMap<String, String>) {
        if let Some(header) = &mut self.nes20 {
            if let Some(size) = attrs.get("size") {
                header.chr_rom_units = size.parse().unwrap_or(0);
            } else {
                header.chr_exponent = parse_number(attrs, "sizeExponent") as u8;
                header.chr_multiplier = parse_number(attrs, "sizeMultiplier") as u8;
            }
        } else if let Some(header) = &mut self.ines {
            header.chr_rom_units = parse_number(attrs, "size") as u8;
        }
        if let Some(record) = &mut self.record {
            record.chr_digests = parse_segment_attrs(attrs);
        }
    }

    fn apply_miscrom(&mut self, attrs: &HashMap<String, String>) {
        if let Some(header) = &mut self.nes20 {
            header.misc_rom_bytes = parse_number(attrs, "size");
            header.misc_rom_count = parse_number(attrs, "number") as u8;
        }
        if let Some(record) = &mut self.record {
            record.misc_digests = parse_segment_attrs(attrs);
        }
    }

    fn apply_trainer(&mut self, attrs: &HashMap<String, String>) {
        let value = parse_bool(attrs);
        if let Some(header) = &mut self.nes20 {
            header.trainer = value;
            header.trainer_bytes = if value { 512 } else { 0 };
        } else if let Some(header) = &mut self.ines {
            header.trainer = value;
            header.trainer_bytes = if value { 512 } else { 0 };
        }
        if let Some(record) = &mut self.record {
            record.trainer_digests = parse_segment_attrs(attrs);
        }
    }
}

fn attributes_map(element: &BytesStart) -> Result<HashMap<String, String>, DbError> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn parse_number(attrs: &HashMap<String, String>, key: &str) -> u64 {
    attrs
        .get(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn parse_value(attrs: &HashMap<String, String>) -> u64 {
    parse_number(attrs, "value")
}

fn parse_bool(attrs: &HashMap<String, String>) -> bool {
    attrs.get("value").map(|value| value == "true").unwrap_or(false)
}

fn parse_digest_attrs(attrs: &HashMap<String, String>) -> DigestSet {
    let mut digests = DigestSet::default();
    if let Some(bytes) = attrs.get("crc32").and_then(|value| hex_decode(value)) {
        if bytes.len() == 4 {
            digests.crc32 = u32::from_be_bytes(bytes.try_into().expect("length checked"));
        }
    }
    if let Some(bytes) = attrs.get("md5").and_then(|value| hex_decode(value)) {
        if bytes.len() == 16 {
            digests.md5 = bytes.try_into().expect("length checked");
        }
    }
    if let Some(bytes) = attrs.get("sha1").and_then(|value| hex_decode(value)) {
        if bytes.len() == 20 {
            digests.sha1 = bytes.try_into().expect("length checked");
        }
    }
    if let Some(bytes) = attrs.get("sha256").and_then(|value| hex_decode(value)) {
        if bytes.len() == 32 {
            digests.sha256 = bytes.try_into().expect("length checked");
        }
    }
    digests
}

fn parse_segment_attrs(attrs: &HashMap<String, String>) -> SegmentDigests {
    let whole = parse_digest_attrs(attrs);
    let mut digests = SegmentDigests {
        crc32: whole.crc32,
        md5: whole.md5,
        sha1: whole.sha1,
        sha256: whole.sha256,
        ..Default::default()
    };
    if let Some(bytes) = attrs.get("sum16").and_then(|value| hex_decode(value)) {
        if bytes.len() == 2 {
            digests.sum16 = u16::from_be_bytes(bytes.try_into().expect("length checked"));
        }
    }
    digests
}

fn parse_side_attrs(attrs: &HashMap<String, String>) -> FdsSide {
    let mut side = FdsSide {
        size: parse_number(attrs, "size"),
        crcs_stored: attrs.get("crcsStored").map(|value| value == "true").unwrap_or(false),
        manufacturer_code: parse_number(attrs, "manufacturerCode") as u8,
        game_type: parse_number(attrs, "gameType") as u8,
        revision_number: parse_number(attrs, "revisionNumber") as u8,
        side_number: parse_number(attrs, "sideNumber") as u8,
        disk_number: parse_number(attrs, "diskNumber") as u8,
        disk_type: parse_number(attrs, "diskType") as u8,
        boot_file_id: parse_number(attrs, "bootFileId") as u8,
        country_code: parse_number(attrs, "countryCode") as u8,
        disk_writer_serial: parse_number(attrs, "diskWriterSerialNumber") as u16,
        rewrite_count: parse_number(attrs, "rewriteCount") as u8,
        actual_disk_side: parse_number(attrs, "actualDiskSide") as u8,
        price: parse_number(attrs, "price") as u8,
        disk_info_crc: parse_number(attrs, "diskInfoCrc") as u16,
        file_table_crc: parse_number(attrs, "fileTableCrc") as u16,
        ..Default::default()
    };

    if let Some(bytes) = attrs.get("gameName").and_then(|value| hex_decode(value)) {
        if bytes.len() == 3 {
            side.game_name = bytes.try_into().expect("length checked");
        }
    }
    if let Some(bytes) = attrs.get("manufacturingDate").and_then(|value| hex_decode(value)) {
        if bytes.len() == 3 {
            side.manufacturing_date = bytes.try_into().expect("length checked");
        }
    }
    if let Some(bytes) = attrs.get("rewriteDate").and_then(|value| hex_decode(value)) {
        if bytes.len() == 3 {
            side.rewrite_date = bytes.try_into().expect("length checked");
        }
    }
    side.digests = parse_digest_attrs(attrs);

    side
}

fn parse_file_attrs(attrs: &HashMap<String, String>) -> FdsFile {
    let mut file = FdsFile {
        file_number: parse_number(attrs, "number") as u8,
        file_identification_code: parse_number(attrs, "idCode") as u8,
        file_address: parse_number(attrs, "address") as u16,
        file_size: parse_number(attrs, "size") as u16,
        file_type: parse_number(attrs, "type") as u8,
        file_metadata_crc: parse_number(attrs, "metadataCrc") as u16,
        data: FdsFileData {
            file_data_crc: parse_number(attrs, "dataCrc") as u16,
            ..Default::default()
        },
        ..Default::default()
    };

    if let Some(bytes) = attrs.get("name").and_then(|value| hex_decode(value)) {
        if bytes.len() == 8 {
            file.file_name = bytes.try_into().expect("length checked");
        }
    }

    file
}

#[cfg(test)]
#[path = "tests/xml_tests.rs"]
mod tests;
