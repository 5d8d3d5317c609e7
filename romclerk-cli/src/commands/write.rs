use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romclerk_core::record::RomHeader;
use romclerk_core::RomError;
use romclerk_db::xml::XmlOptions;
use romclerk_db::{
    match_fds_archive, match_nes_rom, nes20db, transplant, xml, MatchAlgorithms, TemplateLibrary,
    TransplantOptions,
};
use romclerk_formats::{encode_fds_archive, encode_nes_rom, FdsEncodeOptions, NesEncodeOptions};

use crate::error::CliError;
use crate::files::{load_rom_file, write_rom_file, LoadOptions};
use crate::scanner::scan_rom_files;
use crate::{CommonFlags, DocumentFormat, HashType};

pub(crate) struct WriteArgs {
    pub rom_path: PathBuf,
    pub input: PathBuf,
    pub format: DocumentFormat,
    pub truncate: bool,
    pub output_path: Option<PathBuf>,
    pub hash_types: Option<Vec<HashType>>,
    pub qd: bool,
    pub fds_header: bool,
    pub fds_write_crcs: bool,
    pub fds_generate_crcs: bool,
    pub common: CommonFlags,
}

/// Match every ROM under a directory against a template document and
/// rewrite the headers of the ones that hit.
pub(crate) fn run(args: WriteArgs) -> Result<(), CliError> {
    if args.common.organize && args.output_path.is_none() {
        return Err(CliError::usage(
            "--organize requires --output-path to place the organized tree",
        ));
    }

    println!("Loading document from: {}", args.input.display());
    let payload = std::fs::read_to_string(&args.input)?;
    let library: TemplateLibrary = match args.format {
        DocumentFormat::Default => xml::unmarshal_default_xml(
            &payload,
            &XmlOptions {
                enable_ines: args.common.enable_ines,
                preserve_trainer: args.common.preserve_trainers,
                enable_organization: args.common.organize,
            },
        )?,
        DocumentFormat::Nes20db => nes20db::unmarshal_nes20db_xml(&payload)?,
    };
    println!("Loaded {} templates", library.len());

    let algorithms = match &args.hash_types {
        Some(types) => algorithms_from(types),
        None => MatchAlgorithms::default(),
    };

    let load_options = LoadOptions {
        enable_ines: args.common.enable_ines,
        preserve_trainer: args.common.preserve_trainers,
        fds_generate_crcs: args.fds_generate_crcs,
    };

    let transplant_options = TransplantOptions {
        enable_ines: args.common.enable_ines,
        truncate: args.truncate,
        organize: args.common.organize,
    };

    let mut patched = 0usize;
    let mut unmatched = 0usize;
    let mut failed = 0usize;

    for file in scan_rom_files(&args.rom_path)? {
        let mut record = match load_rom_file(&file, Some(&args.rom_path), &load_options) {
            Ok(record) => record,
            Err(error) => {
                failed += 1;
                eprintln!(
                    "  {} {}: {}",
                    "\u{26A0}".if_supports_color(Stdout, |text| text.yellow()),
                    file.display(),
                    error,
                );
                continue;
            }
        };

        let matched = match &record.header {
            RomHeader::Fds(_) => match_fds_archive(&record, &library, &algorithms),
            _ => match_nes_rom(&record, &library, &algorithms, args.common.enable_ines),
        };

        let template = match matched {
            Ok(template) => template.clone(),
            Err(error @ RomError::NoMatch { .. }) => {
                unmatched += 1;
                eprintln!("{error}");
                continue;
            }
            Err(error) => {
                failed += 1;
                eprintln!("  {}: {}", file.display(), error);
                continue;
            }
        };

        if let Err(error) = transplant(&mut record, &template, &transplant_options) {
            failed += 1;
            eprintln!("  {}: {}", file.display(), error);
            continue;
        }

        let encoded = match &record.header {
            RomHeader::Fds(archive) => encode_fds_archive(
                archive,
                &FdsEncodeOptions::new()
                    .write_header(args.fds_header)
                    .write_checksums(args.fds_write_crcs)
                    .generate_checksums(args.fds_generate_crcs)
                    .write_qd(args.qd),
            ),
            _ => encode_nes_rom(
                &record,
                &NesEncodeOptions::new()
                    .enable_ines(args.common.enable_ines)
                    .truncate(args.truncate)
                    .preserve_trainer(args.common.preserve_trainers),
            ),
        };

        let encoded = match encoded {
            Ok(bytes) => bytes,
            Err(error) => {
                failed += 1;
                eprintln!("  {}: {}", file.display(), error);
                continue;
            }
        };

        let destination_base = if args.common.organize {
            args.output_path.as_deref()
        } else {
            None
        };

        match write_rom_file(&record, &encoded, destination_base) {
            Ok(()) => {
                patched += 1;
                println!(
                    "  {} {}",
                    "Patched".if_supports_color(Stdout, |text| text.green()),
                    record.name,
                );
            }
            Err(error) => {
                failed += 1;
                eprintln!("  {}: {}", file.display(), error);
            }
        }
    }

    println!("Patched {patched}, unmatched {unmatched}, failed {failed}");
    Ok(())
}

fn algorithms_from(types: &[HashType]) -> MatchAlgorithms {
    let mut algorithms = MatchAlgorithms {
        sha256: false,
        sha1: false,
        md5: false,
        crc32: false,
        sum16: false,
    };
    for hash_type in types {
        match hash_type {
            HashType::Sha256 => algorithms.sha256 = true,
            HashType::Sha1 => algorithms.sha1 = true,
            HashType::Md5 => algorithms.md5 = true,
            HashType::Crc32 => algorithms.crc32 = true,
            HashType::Sum16 => algorithms.sum16 = true,
        }
    }
    algorithms
}
