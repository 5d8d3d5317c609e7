use thiserror::Error;

use romclerk_core::RomError;

/// Errors raised while reading or writing interchange documents.
#[derive(Debug, Error)]
pub enum DbError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML syntax error from the underlying parser
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error from the underlying parser
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Structurally valid XML that is not a valid document of this form
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A record-level failure while rebuilding a template
    #[error(transparent)]
    Rom(#[from] RomError),
}

impl DbError {
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }
}
