//! Binary codecs for the formats romclerk curates.
//!
//! - iNES / NES 2.0 headered cartridge dumps (.nes)
//! - Famicom Disk System and QD disk images (.fds)
//! - UNIF chunked containers (.unf, .unif)
//!
//! plus the header field editor and human-readable ROM descriptions.

pub mod describe;
pub mod edit;
pub mod fds;
pub mod nes;
pub mod unif;

pub use describe::describe_rom;
pub use edit::edit_header_field;
pub use fds::{decode_fds_archive, encode_fds_archive, FdsEncodeOptions};
pub use nes::{
    decode_nes_rom, encode_nes_header, encode_nes_rom, split_payload, NesDecodeOptions,
    NesEncodeOptions,
};
pub use unif::decode_unif_rom;
