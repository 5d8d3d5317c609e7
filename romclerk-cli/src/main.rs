//! romclerk CLI
//!
//! Curates NES cartridge dumps and Famicom Disk System images: scans ROM
//! trees into interchange documents, applies template headers back onto
//! dumps by content hash, converts between document forms, and inspects
//! or edits individual files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

mod commands;
mod error;
mod files;
mod scanner;
mod util;

use error::CliError;

#[derive(Parser)]
#[command(name = "romclerk")]
#[command(about = "Curate NES, FDS, and UNIF ROM libraries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which interchange document form a command reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum DocumentFormat {
    /// Lossless form: every header field, digest, and FDS snapshot
    #[default]
    Default,
    /// Compact nes20db reference form (NES 2.0 only)
    Nes20db,
}

/// Output forms for `transform`; documents plus the flat reference DB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransformTarget {
    Default,
    Nes20db,
    /// 256-byte-stride flat database for cart-reader firmware
    Flat,
}

/// Hash algorithms selectable for the matching cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HashType {
    Sha256,
    Sha1,
    Md5,
    Crc32,
    Sum16,
}

/// Flags shared by the batch commands.
#[derive(Debug, Clone, Args)]
struct CommonFlags {
    /// Accept and emit iNES 1.0 ROMs, not just NES 2.0
    #[arg(long)]
    enable_ines: bool,

    /// Keep 512-byte trainers instead of dropping them
    #[arg(long)]
    preserve_trainers: bool,

    /// Overwrite names and relative paths from the template library
    #[arg(long)]
    organize: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a ROM directory and write an interchange document
    Read {
        /// Directory to scan recursively for .nes/.unf/.unif/.fds files
        #[arg(long)]
        rom_path: PathBuf,

        /// Document file to write
        #[arg(long)]
        output: PathBuf,

        /// Document form to emit
        #[arg(long, value_enum, default_value_t)]
        format: DocumentFormat,

        /// Compute FDS per-block CRCs while decoding
        #[arg(long)]
        fds_generate_crcs: bool,

        #[command(flatten)]
        common: CommonFlags,
    },

    /// Match ROMs against a document and rewrite their headers
    Write {
        /// Directory of ROMs to patch
        #[arg(long)]
        rom_path: PathBuf,

        /// Document file holding the template library
        #[arg(long)]
        input: PathBuf,

        /// Document form to read
        #[arg(long, value_enum, default_value_t)]
        format: DocumentFormat,

        /// Drop bytes past the declared PRG + CHR sizes when writing
        #[arg(long)]
        truncate: bool,

        /// Base directory for organized output (required with --organize)
        #[arg(long)]
        output_path: Option<PathBuf>,

        /// Hash algorithms for the matching cascade, strongest first
        #[arg(long, value_enum, value_delimiter = ',')]
        hash_types: Option<Vec<HashType>>,

        /// Pad FDS sides to the 65536-byte QD stride
        #[arg(long)]
        qd: bool,

        /// Emit the 16-byte FDS archive prefix
        #[arg(long)]
        fds_header: bool,

        /// Write FDS per-block CRC fields
        #[arg(long)]
        fds_write_crcs: bool,

        /// Recompute FDS CRCs instead of reusing stored values
        #[arg(long)]
        fds_generate_crcs: bool,

        #[command(flatten)]
        common: CommonFlags,
    },

    /// Convert a document from one form to another
    Transform {
        /// Source document
        #[arg(long)]
        input: PathBuf,

        /// Source document form
        #[arg(long, value_enum, default_value_t)]
        from: DocumentFormat,

        /// Target form
        #[arg(long, value_enum)]
        to: TransformTarget,

        /// File to write
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        common: CommonFlags,
    },

    /// Print everything known about one ROM file
    Rominfo {
        /// The .nes/.unf/.unif/.fds file to inspect
        file: PathBuf,

        #[command(flatten)]
        common: CommonFlags,
    },

    /// Edit one header field of one ROM file in place
    #[command(name = "editheaderfield")]
    EditHeaderField {
        /// The .nes file to patch
        file: PathBuf,

        /// Field name, e.g. mapper-number or prg-rom-byte-size
        field: String,

        /// New value for the field
        value: String,

        /// Accept iNES 1.0 files
        #[arg(long)]
        enable_ines: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Read {
            rom_path,
            output,
            format,
            fds_generate_crcs,
            common,
        } => commands::read::run(rom_path, output, format, fds_generate_crcs, common),
        Commands::Write {
            rom_path,
            input,
            format,
            truncate,
            output_path,
            hash_types,
            qd,
            fds_header,
            fds_write_crcs,
            fds_generate_crcs,
            common,
        } => commands::write::run(commands::write::WriteArgs {
            rom_path,
            input,
            format,
            truncate,
            output_path,
            hash_types,
            qd,
            fds_header,
            fds_write_crcs,
            fds_generate_crcs,
            common,
        }),
        Commands::Transform {
            input,
            from,
            to,
            output,
            common,
        } => commands::transform::run(input, from, to, output, common),
        Commands::Rominfo { file, common } => commands::rominfo::run(file, common),
        Commands::EditHeaderField {
            file,
            field,
            value,
            enable_ines,
        } => commands::edit::run(file, &field, &value, enable_ines),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!(
                "{} {}",
                "error:".if_supports_color(Stderr, |text| text.red()),
                error,
            );
            ExitCode::FAILURE
        }
    }
}
