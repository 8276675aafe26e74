//! # fileconv-core
//!
//! Local office-document and image conversion pipeline. Converts
//! spreadsheets (.xlsx) and word-processing documents (.docx) to PDF or
//! HTML, and raster images (.jpeg, .png, .webp) between codecs, without any
//! network egress of user data:
//!
//! - **Streaming DOCX parsing** over the OPC package's `word/document.xml`
//! - **XLSX modelling** with styles, merges, and sheet geometry
//! - **Deterministic HTML rendering** feeding a local headless-browser PDF
//!   stage (no browser is ever downloaded)
//! - **Parallel batches** through per-engine worker pools with
//!   per-request result ordering preserved
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fileconv_core::{ConversionRequest, ConverterConfig, ConverterService, OutputFormat};
//!
//! fn main() -> fileconv_core::Result<()> {
//!     let converter = ConverterService::new(ConverterConfig::default())?;
//!
//!     let request = ConversionRequest::new("report.xlsx", "report.pdf", OutputFormat::Pdf);
//!     let result = converter.convert(&request);
//!     println!("success: {}", result.is_success());
//!
//!     converter.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Batch conversion
//!
//! ```rust,no_run
//! use fileconv_core::{ConverterConfig, ConverterService};
//! use std::path::PathBuf;
//!
//! fn main() -> fileconv_core::Result<()> {
//!     let converter = ConverterService::new(ConverterConfig::default())?;
//!
//!     let inputs: Vec<PathBuf> = vec!["a.jpeg".into(), "b.jpeg".into()];
//!     let results = converter.batch_convert_to(&inputs, "png")?;
//!     for (input, result) in inputs.iter().zip(&results) {
//!         println!("{}: {}", input.display(), result.is_success());
//!     }
//!
//!     converter.shutdown();
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod browser;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod converter;
pub mod docx;
pub mod engine;
pub mod error;
pub mod format;
pub mod pool;
pub mod progress;
pub mod staging;
pub mod xlsx;

mod escape;

// Re-export main types for convenience.
pub use browser::{ChromiumPdfRenderer, HtmlToPdf};
pub use cancel::CancelToken;
pub use codec::ImageCodec;
pub use config::{BrowserConfig, ConverterConfig, ImageConfig, PoolConfig};
pub use converter::{derive_output_path, ConversionRequest, ConversionResult, ConverterService};
pub use engine::EngineDispatcher;
pub use error::{ConvertError, ErrorKind, Result};
pub use format::{InputFormat, OutputFormat};
pub use pool::WorkerPool;
pub use progress::{ConversionStage, NullNotifier, ProgressEvent, ProgressNotifier};

/// Supported input file extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "docx", "jpeg", "jpg", "png", "webp"];

/// Check if a file extension is supported as conversion input.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|&e| e.eq_ignore_ascii_case(ext))
}

/// Initialize the library's logging.
/// Call this once at application startup if you want to see logs.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
