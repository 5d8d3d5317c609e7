//! Template database, content-addressed matching, and document interchange.
//!
//! A template library maps `"ALGO:UPPERHEX"` keys to canonical records.
//! Libraries are built from one of the interchange documents (the default
//! lossless XML form or the compact nes20db form) and consumed by the
//! matching cascade, which identifies observed ROM images by content hash
//! and transplants the matched template's header onto them.

pub mod error;
pub mod flatdb;
pub mod matcher;
pub mod nes20db;
pub mod xml;

pub use error::DbError;
pub use matcher::{
    match_fds_archive, match_nes_rom, transplant, MatchAlgorithms, TemplateLibrary,
    TransplantOptions,
};
