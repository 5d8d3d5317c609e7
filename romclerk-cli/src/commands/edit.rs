use std::path::PathBuf;

use romclerk_formats::{edit_header_field, encode_nes_rom, NesEncodeOptions};

use crate::error::CliError;
use crate::files::{load_rom_file, write_rom_file, LoadOptions};

/// Apply one bounds-checked field edit to a single file and rewrite it
/// in place. Any failure aborts before the file is touched.
pub(crate) fn run(
    file: PathBuf,
    field: &str,
    value: &str,
    enable_ines: bool,
) -> Result<(), CliError> {
    let options = LoadOptions {
        enable_ines,
        preserve_trainer: true,
        fds_generate_crcs: false,
    };

    let mut record = load_rom_file(&file, None, &options)?;
    edit_header_field(&mut record, field, value)?;

    let encoded = encode_nes_rom(
        &record,
        &NesEncodeOptions::new()
            .enable_ines(enable_ines)
            .preserve_trainer(true),
    )?;
    write_rom_file(&record, &encoded, None)?;

    println!("Updated {field} in {}", file.display());
    Ok(())
}
