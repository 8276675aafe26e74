//! Input and output format tags, extension mapping, and content sanity checks.
//!
//! Detection uses only the lowercased file extension; a separate magic-byte
//! check guards against mislabelled files before an engine ever parses them.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// ZIP local-file-header signature; XLSX and DOCX are both OPC packages.
const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Supported input file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputFormat {
    Xlsx,
    Docx,
    Jpeg,
    Png,
    Webp,
}

/// Supported output format kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Pdf,
    Png,
    Jpeg,
    Webp,
    Html,
}

impl InputFormat {
    /// Map a path to its input format from the lowercased extension.
    ///
    /// Total over all paths; anything unknown returns `None`. Both `.jpg` and
    /// `.jpeg` map to [`InputFormat::Jpeg`].
    pub fn detect(path: &Path) -> Option<InputFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(InputFormat::Xlsx),
            "docx" => Some(InputFormat::Docx),
            "jpeg" | "jpg" => Some(InputFormat::Jpeg),
            "png" => Some(InputFormat::Png),
            "webp" => Some(InputFormat::Webp),
            _ => None,
        }
    }

    /// Check the file content against the format's known magic bytes.
    ///
    /// XLSX and DOCX must start with the ZIP signature, JPEG with `FF D8 FF`,
    /// PNG with its eight-byte signature. WebP is validated by checking the
    /// RIFF container header.
    pub fn validate_magic(self, path: &Path) -> Result<()> {
        let mut file = File::open(path).map_err(|e| ConvertError::io_read(path, e))?;
        let mut header = [0u8; 12];
        let read = file
            .read(&mut header)
            .map_err(|e| ConvertError::io_read(path, e))?;
        let header = &header[..read];

        let ok = match self {
            InputFormat::Xlsx | InputFormat::Docx => header.starts_with(&ZIP_SIGNATURE),
            InputFormat::Jpeg => header.starts_with(&[0xFF, 0xD8, 0xFF]),
            InputFormat::Png => header.starts_with(&PNG_SIGNATURE),
            InputFormat::Webp => {
                header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP"
            }
        };

        if ok {
            Ok(())
        } else {
            Err(ConvertError::UnsupportedInput {
                path: path.to_path_buf(),
                reason: format!("content does not look like a {} file", self),
            })
        }
    }
}

impl OutputFormat {
    /// Parse an output format string, case-insensitively.
    ///
    /// `"jpg"` is folded to [`OutputFormat::Jpeg`].
    pub fn parse(s: &str) -> Result<OutputFormat> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            "html" => Ok(OutputFormat::Html),
            _ => Err(ConvertError::UnsupportedOutput {
                format: s.to_string(),
            }),
        }
    }

    /// The canonical file extension for this format (`jpeg`, not `jpg`).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputFormat::Xlsx => "xlsx",
            InputFormat::Docx => "docx",
            InputFormat::Jpeg => "jpeg",
            InputFormat::Png => "png",
            InputFormat::Webp => "webp",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}
