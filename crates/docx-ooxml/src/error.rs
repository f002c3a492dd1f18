use thiserror::Error;

/// Errors raised while reading or rewriting an OOXML package.
///
/// Mirrors the error kinds named in §7; `MalformedPackage` and
/// `SerializationError` are fatal, `UnsupportedContent` is recovered locally
/// by the caller (the rewriter falls back to a coarse block-level
/// replace and records a warning).
#[derive(Debug, Error)]
pub enum OoxmlError {
    #[error("malformed package part {0}: not a valid zip archive or missing required entry")]
    MalformedPackage(String),

    #[error("malformed xml: {0}")]
    MalformedXml(String),

    #[error("unsupported content at {path}: {reason}")]
    UnsupportedContent { path: String, reason: String },

    #[error("failed to serialize package: {0}")]
    SerializationError(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OoxmlError> for docx_core::CompareError {
    fn from(e: OoxmlError) -> Self {
        match e {
            OoxmlError::MalformedPackage(part) => docx_core::CompareError::MalformedPackage {
                part,
                reason: "invalid OOXML package".to_string(),
            },
            OoxmlError::MalformedXml(reason) => docx_core::CompareError::MalformedPackage {
                part: "word/document.xml".to_string(),
                reason,
            },
            OoxmlError::UnsupportedContent { path, reason } => {
                docx_core::CompareError::UnsupportedContent { path, reason }
            }
            OoxmlError::SerializationError(reason) => docx_core::CompareError::SerializationError(reason),
            OoxmlError::Zip(e) => docx_core::CompareError::MalformedPackage {
                part: "<archive>".to_string(),
                reason: e.to_string(),
            },
            OoxmlError::Io(e) => docx_core::CompareError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, OoxmlError>;
