//! Conversion engines and the statically-typed dispatcher.
//!
//! Each engine is a three-stage pipeline (parse -> intermediate -> encode)
//! exposing only single-file conversion; batch fan-out lives in the
//! scheduler. Engines own their worker pools, started at construction and
//! drained at shutdown.

use crate::browser::HtmlToPdf;
use crate::cancel::CancelToken;
use crate::codec::ImageCodec;
use crate::config::ConverterConfig;
use crate::docx::{self, DocxParser};
use crate::error::{ConvertError, Result};
use crate::format::{InputFormat, OutputFormat};
use crate::pool::WorkerPool;
use crate::xlsx::{self, XlsxParser};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// XLSX -> HTML -> PDF/HTML.
pub struct SpreadsheetEngine {
    parser: XlsxParser,
    pdf: Arc<dyn HtmlToPdf>,
    pool: WorkerPool,
}

impl SpreadsheetEngine {
    fn new(workers: usize, pdf: Arc<dyn HtmlToPdf>) -> Result<Self> {
        Ok(Self {
            parser: XlsxParser::new(),
            pdf,
            pool: WorkerPool::new(workers)?,
        })
    }

    pub fn convert(
        &self,
        input: &Path,
        output: &Path,
        target: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        let workbook = self.parser.parse_path(input)?;
        cancel.check()?;
        let html = xlsx::render_html(&workbook);
        cancel.check()?;
        write_rendered(&html, output, target, self.pdf.as_ref(), cancel)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

/// DOCX -> HTML -> PDF/HTML.
pub struct DocumentEngine {
    parser: DocxParser,
    pdf: Arc<dyn HtmlToPdf>,
    pool: WorkerPool,
}

impl DocumentEngine {
    fn new(workers: usize, pdf: Arc<dyn HtmlToPdf>) -> Result<Self> {
        Ok(Self {
            parser: DocxParser::new(),
            pdf,
            pool: WorkerPool::new(workers)?,
        })
    }

    pub fn convert(
        &self,
        input: &Path,
        output: &Path,
        target: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        let data = fs::read(input).map_err(|e| ConvertError::io_read(input, e))?;
        let tree = self.parser.parse(&data)?;
        cancel.check()?;
        let html = docx::render_html(&tree);
        cancel.check()?;
        write_rendered(&html, output, target, self.pdf.as_ref(), cancel)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

/// Image -> codec -> image.
pub struct ImageEngine {
    codec: ImageCodec,
    pool: WorkerPool,
}

impl ImageEngine {
    fn new(workers: usize, codec: ImageCodec) -> Result<Self> {
        Ok(Self {
            codec,
            pool: WorkerPool::new(workers)?,
        })
    }

    pub fn convert(
        &self,
        input: &Path,
        output: &Path,
        target: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        let image = self.codec.decode(input)?;
        // Re-encoding is both the encode stage and the final write.
        cancel.check()?;
        self.codec.encode(&image, output, target)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

/// Encode the rendered HTML to the requested document-family target.
fn write_rendered(
    html: &str,
    output: &Path,
    target: OutputFormat,
    pdf: &dyn HtmlToPdf,
    cancel: &CancelToken,
) -> Result<()> {
    cancel.check()?;
    match target {
        OutputFormat::Html => {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| ConvertError::io_write(parent, e))?;
                }
            }
            fs::write(output, html).map_err(|e| ConvertError::io_write(output, e))
        }
        OutputFormat::Pdf => pdf.render_to_pdf(html, output),
        other => Err(ConvertError::Internal(format!(
            "document engine asked to encode {other}"
        ))),
    }
}

/// Routes each input format to its engine. The closed match over
/// [`InputFormat`] makes a missing engine unrepresentable.
pub struct EngineDispatcher {
    spreadsheet: SpreadsheetEngine,
    document: DocumentEngine,
    image: ImageEngine,
}

impl EngineDispatcher {
    /// Construct all three engines.
    pub fn new(config: &ConverterConfig, pdf: Arc<dyn HtmlToPdf>) -> Result<Self> {
        let workers = config.pool.workers;
        Ok(Self {
            spreadsheet: SpreadsheetEngine::new(workers, Arc::clone(&pdf))?,
            document: DocumentEngine::new(workers, Arc::clone(&pdf))?,
            image: ImageEngine::new(workers, ImageCodec::new(&config.image))?,
        })
    }

    /// Whether an engine path exists for this input/output pair.
    pub fn supports(input: InputFormat, output: OutputFormat) -> bool {
        matches!(
            (input, output),
            (
                InputFormat::Xlsx | InputFormat::Docx,
                OutputFormat::Pdf | OutputFormat::Html
            ) | (
                InputFormat::Jpeg | InputFormat::Png | InputFormat::Webp,
                OutputFormat::Png | OutputFormat::Jpeg | OutputFormat::Webp
            )
        )
    }

    /// Output formats for which at least one engine is registered.
    pub fn supported_outputs() -> Vec<OutputFormat> {
        vec![
            OutputFormat::Pdf,
            OutputFormat::Html,
            OutputFormat::Png,
            OutputFormat::Jpeg,
            OutputFormat::Webp,
        ]
    }

    /// Run the engine for `input_format`. Fails with `UnsupportedConversion`
    /// before any file I/O when the pair has no engine path.
    pub fn convert(
        &self,
        input_format: InputFormat,
        input: &Path,
        output: &Path,
        target: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        if !Self::supports(input_format, target) {
            return Err(ConvertError::UnsupportedConversion {
                input: input_format,
                output: target,
            });
        }

        debug!("dispatching {} -> {} for {:?}", input_format, target, input);
        match input_format {
            InputFormat::Xlsx => self.spreadsheet.convert(input, output, target, cancel),
            InputFormat::Docx => self.document.convert(input, output, target, cancel),
            InputFormat::Jpeg | InputFormat::Png | InputFormat::Webp => {
                self.image.convert(input, output, target, cancel)
            }
        }
    }

    /// The worker pool backing batches of this input format.
    pub fn pool_for(&self, input_format: InputFormat) -> &WorkerPool {
        match input_format {
            InputFormat::Xlsx => self.spreadsheet.pool(),
            InputFormat::Docx => self.document.pool(),
            InputFormat::Jpeg | InputFormat::Png | InputFormat::Webp => self.image.pool(),
        }
    }

    /// Drain every engine's worker pool.
    pub fn shutdown(&self) {
        self.spreadsheet.pool.close();
        self.document.pool.close();
        self.image.pool.close();
    }
}
