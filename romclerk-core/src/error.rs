use thiserror::Error;

/// Errors produced while decoding, encoding, editing, or matching dumps.
#[derive(Debug, Error)]
pub enum RomError {
    /// I/O error from the underlying filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the expected magic bytes
    #[error("unable to find {format} magic")]
    BadMagic { format: &'static str },

    /// A disk side is missing the `*NINTENDO-HVC*` signature
    #[error("side {side} is not a valid FDS or QD disk side")]
    BadSideMagic { side: usize },

    /// The archive length is not a whole number of FDS or QD sides
    #[error("{len} bytes is not a whole number of FDS (65500) or QD (65536) sides")]
    BadArchiveLength { len: u64 },

    /// The payload is shorter than the header-declared structure requires
    #[error("payload holds {actual} bytes but the header declares {declared}")]
    TruncatedPayload { declared: u64, actual: u64 },

    /// The trainer flag is set but the file cannot hold a 512-byte trainer
    #[error("header indicates trainer data, but file too small for one")]
    TruncatedTrainer,

    /// An FDS block is too small to carry a CRC
    #[error("data too small to be a valid FDS block")]
    CrcDataTooSmall,

    /// An FDS block tag byte is not the expected value
    #[error("expected block tag {expected:#04x} at offset {offset:#06x}, found {found:#04x}")]
    BadBlockTag {
        expected: u8,
        found: u8,
        offset: usize,
    },

    /// The caller required NES 2.0 but the file signals iNES 1.0
    #[error("not an NES 2.0 ROM")]
    NotNes20,

    /// A UNIF fragment's stored CRC-32 disagrees with its computed value
    #[error("{chunk} checksum mismatch: stored {stored:08X}, computed {computed:08X}")]
    UnifChecksumMismatch {
        chunk: String,
        stored: u32,
        computed: u32,
    },

    /// The matching cascade was exhausted without a hit
    #[error("no match found for ROM: {name}\nCRC32: {crc32}\nSHA1: {sha1}\nSHA256: {sha256}")]
    NoMatch {
        name: String,
        crc32: String,
        sha1: String,
        sha256: String,
    },

    /// An editor value is outside the documented range for its field
    #[error("value \"{value}\" is out of range for field {field}")]
    FieldOutOfRange { field: String, value: String },

    /// An editor field does not exist on the target header variant
    #[error("field {field} does not apply to this header version")]
    FieldNotApplicable { field: String },

    /// Catch-all with message
    #[error("{0}")]
    Other(String),
}

impl RomError {
    pub fn bad_magic(format: &'static str) -> Self {
        Self::BadMagic { format }
    }

    pub fn field_out_of_range(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FieldOutOfRange {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_not_applicable(field: impl Into<String>) -> Self {
        Self::FieldNotApplicable {
            field: field.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
