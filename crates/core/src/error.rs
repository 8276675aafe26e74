//! Error types for the conversion pipeline.

use crate::format::{InputFormat, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the conversion library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input extension is unknown or the content failed the magic-byte check.
    #[error("unsupported input file '{path}': {reason}")]
    UnsupportedInput { path: PathBuf, reason: String },

    /// Output format string was not recognised.
    #[error("unsupported output format '{format}'. Supported: pdf, html, png, jpeg, webp")]
    UnsupportedOutput { format: String },

    /// No engine handles this input/output pair.
    #[error("no conversion path from {input} to {output}")]
    UnsupportedConversion {
        input: InputFormat,
        output: OutputFormat,
    },

    /// Input file missing or unreadable.
    #[error("cannot read '{path}': {source}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output destination unwritable or the encoder failed.
    #[error("cannot write '{path}': {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed XLSX/DOCX/image payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// The HTML-to-PDF collaborator failed.
    #[error("PDF rendering failed: {0}")]
    PdfRender(String),

    /// No local Chromium/Chrome/Edge installation was found.
    #[error(
        "no local browser found: {0}\n\nPlease install Chrome, Chromium, or Edge locally. \
         The converter only uses locally installed browsers and never downloads one."
    )]
    BrowserUnavailable(String),

    /// The cancellation signal was observed at a checkpoint.
    #[error("conversion cancelled")]
    Cancelled,

    /// A logic invariant was violated. Should only appear as a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// The closed set of failure kinds, for programmatic matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UnsupportedInput,
    UnsupportedOutput,
    UnsupportedConversion,
    IoRead,
    IoWrite,
    Parse,
    PdfRender,
    BrowserUnavailable,
    Cancelled,
    Internal,
}

impl ConvertError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::UnsupportedInput { .. } => ErrorKind::UnsupportedInput,
            ConvertError::UnsupportedOutput { .. } => ErrorKind::UnsupportedOutput,
            ConvertError::UnsupportedConversion { .. } => ErrorKind::UnsupportedConversion,
            ConvertError::IoRead { .. } => ErrorKind::IoRead,
            ConvertError::IoWrite { .. } => ErrorKind::IoWrite,
            ConvertError::Parse(_) => ErrorKind::Parse,
            ConvertError::PdfRender(_) => ErrorKind::PdfRender,
            ConvertError::BrowserUnavailable(_) => ErrorKind::BrowserUnavailable,
            ConvertError::Cancelled => ErrorKind::Cancelled,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a read failure on `path`.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a write failure on `path`.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a parse failure.
    pub fn parse(message: impl Into<String>) -> Self {
        ConvertError::Parse(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unsupported_input() {
        let err = ConvertError::UnsupportedInput {
            path: PathBuf::from("/tmp/notes.txt"),
            reason: "unknown extension 'txt'".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("unknown extension"));
    }

    #[test]
    fn test_display_unsupported_output() {
        let err = ConvertError::UnsupportedOutput {
            format: "tiff".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("tiff"));
        assert!(msg.contains("Supported"));
    }

    #[test]
    fn test_display_unsupported_conversion() {
        let err = ConvertError::UnsupportedConversion {
            input: InputFormat::Jpeg,
            output: OutputFormat::Pdf,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("jpeg"));
        assert!(msg.contains("pdf"));
    }

    #[test]
    fn test_display_browser_unavailable_includes_guidance() {
        let err = ConvertError::BrowserUnavailable("not found in common locations".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Chromium"));
        assert!(msg.contains("never downloads"));
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ConvertError::parse("bad xml").kind(), ErrorKind::Parse);
        assert_eq!(ConvertError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            ConvertError::io_read(
                "/missing",
                std::io::Error::new(std::io::ErrorKind::NotFound, "gone")
            )
            .kind(),
            ErrorKind::IoRead
        );
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
