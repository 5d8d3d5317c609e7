use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romclerk_db::xml::XmlOptions;
use romclerk_db::{nes20db, xml, TemplateLibrary};

use crate::error::CliError;
use crate::files::{load_rom_file, LoadOptions};
use crate::scanner::scan_rom_files;
use crate::util::today_string;
use crate::{CommonFlags, DocumentFormat};

/// Scan a directory tree and write an interchange document describing
/// every decodable ROM in it.
pub(crate) fn run(
    rom_path: PathBuf,
    output: PathBuf,
    format: DocumentFormat,
    fds_generate_crcs: bool,
    common: CommonFlags,
) -> Result<(), CliError> {
    println!(
        "Scanning ROMs in: {}",
        rom_path
            .display()
            .if_supports_color(Stdout, |text| text.cyan()),
    );

    let files = scan_rom_files(&rom_path)?;
    let load_options = LoadOptions {
        enable_ines: common.enable_ines,
        preserve_trainer: common.preserve_trainers,
        fds_generate_crcs,
    };

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("  {pos}/{len} {msg}").expect("static pattern"),
    );

    let mut library = TemplateLibrary::new();
    let mut failed = 0usize;

    for file in &files {
        progress.set_message(
            file.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        progress.inc(1);

        match load_rom_file(file, Some(&rom_path), &load_options) {
            Ok(record) => {
                let key = format!("SHA256:{}", record.digests.sha256_hex());
                library.entry(key).or_insert(record);
            }
            Err(error) => {
                failed += 1;
                progress.suspend(|| {
                    eprintln!(
                        "  {} {}: {}",
                        "\u{26A0}".if_supports_color(Stdout, |text| text.yellow()),
                        file.display(),
                        error,
                    );
                });
            }
        }
    }
    progress.finish_and_clear();

    println!("Decoded {} ROMs ({} skipped)", library.len(), failed);

    let document = match format {
        DocumentFormat::Default => xml::marshal_default_xml(
            &library,
            &XmlOptions {
                enable_ines: common.enable_ines,
                preserve_trainer: common.preserve_trainers,
                enable_organization: common.organize,
            },
        )?,
        DocumentFormat::Nes20db => nes20db::marshal_nes20db_xml(&library, &today_string())?,
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, document)?;

    println!("Wrote document to: {}", output.display());
    Ok(())
}
