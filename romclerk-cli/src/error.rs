use thiserror::Error;

/// Errors that abort a CLI command (as opposed to per-file failures,
/// which are printed and skipped).
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Document read/write failure
    #[error("Document error: {0}")]
    Document(#[from] romclerk_db::DbError),

    /// ROM decode/encode/edit failure on a single-file operation
    #[error("{0}")]
    Rom(#[from] romclerk_core::RomError),

    /// Invalid flag combination or argument
    #[error("Usage error: {0}")]
    Usage(String),
}

impl CliError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}
