use std::path::PathBuf;

use romclerk_db::xml::XmlOptions;
use romclerk_db::{flatdb, nes20db, xml};

use crate::error::CliError;
use crate::util::today_string;
use crate::{CommonFlags, DocumentFormat, TransformTarget};

/// Convert an interchange document to another form.
pub(crate) fn run(
    input: PathBuf,
    from: DocumentFormat,
    to: TransformTarget,
    output: PathBuf,
    common: CommonFlags,
) -> Result<(), CliError> {
    let options = XmlOptions {
        enable_ines: common.enable_ines,
        preserve_trainer: common.preserve_trainers,
        enable_organization: common.organize,
    };

    let payload = std::fs::read_to_string(&input)?;
    let library = match from {
        DocumentFormat::Default => xml::unmarshal_default_xml(&payload, &options)?,
        DocumentFormat::Nes20db => nes20db::unmarshal_nes20db_xml(&payload)?,
    };
    println!("Loaded {} records from {}", library.len(), input.display());

    let converted = match to {
        TransformTarget::Default => xml::marshal_default_xml(&library, &options)?,
        TransformTarget::Nes20db => nes20db::marshal_nes20db_xml(&library, &today_string())?,
        TransformTarget::Flat => flatdb::marshal_flat_db(&library, common.enable_ines)?,
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, converted)?;

    println!("Wrote {}", output.display());
    Ok(())
}
