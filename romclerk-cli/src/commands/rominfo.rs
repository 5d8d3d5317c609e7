use std::path::PathBuf;

use romclerk_formats::describe_rom;

use crate::error::CliError;
use crate::files::{load_rom_file, LoadOptions};
use crate::CommonFlags;

/// Decode one file and print its description.
pub(crate) fn run(file: PathBuf, common: CommonFlags) -> Result<(), CliError> {
    let options = LoadOptions {
        enable_ines: common.enable_ines,
        preserve_trainer: common.preserve_trainers,
        fds_generate_crcs: true,
    };

    let record = load_rom_file(&file, None, &options)?;
    println!("{}", describe_rom(&record));
    Ok(())
}
