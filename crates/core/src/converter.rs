//! The converter service: the public `Convert`/`BatchConvert` operations.

use crate::batch::{self, Task};
use crate::browser::{ChromiumPdfRenderer, HtmlToPdf};
use crate::cancel::CancelToken;
use crate::config::ConverterConfig;
use crate::engine::EngineDispatcher;
use crate::error::{ConvertError, ErrorKind, Result};
use crate::format::{InputFormat, OutputFormat};
use crate::progress::{ConversionStage, NullNotifier, ProgressEvent, ProgressNotifier};
use crate::staging;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A single conversion request.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Path to an existing regular file.
    pub input_path: PathBuf,
    /// Destination path; missing parent directories are created.
    pub output_path: PathBuf,
    /// Target format.
    pub output_format: OutputFormat,
}

impl ConversionRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            output_format,
        }
    }
}

/// Outcome of one conversion. Batch results are index-aligned with their
/// requests; partial success is the norm.
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Success {
        output_path: PathBuf,
        duration: Duration,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    /// The failure kind, when this is a failure.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionResult::Success { .. } => None,
            ConversionResult::Failure { kind, .. } => Some(*kind),
        }
    }

    fn from_error(error: &ConvertError) -> Self {
        ConversionResult::Failure {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Replace the input's extension with the target format's canonical
/// extension (`jpg` requests produce `.jpeg` files).
pub fn derive_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}

struct ServiceInner {
    dispatcher: EngineDispatcher,
    renderer: Arc<dyn HtmlToPdf>,
    notifier: Arc<dyn ProgressNotifier>,
    cancel: CancelToken,
}

/// Orchestrates validation, dispatch, progress emission, and cancellation for
/// the conversion pipeline.
#[derive(Clone)]
pub struct ConverterService {
    inner: Arc<ServiceInner>,
}

impl ConverterService {
    /// Create a service with the default local-browser PDF renderer and no
    /// progress reporting.
    pub fn new(config: ConverterConfig) -> Result<Self> {
        let renderer: Arc<dyn HtmlToPdf> =
            Arc::new(ChromiumPdfRenderer::new(config.browser.clone()));
        Self::with_parts(config, renderer, Arc::new(NullNotifier))
    }

    /// Create a service with explicit collaborators. The UI shell passes its
    /// own notifier here; tests may substitute the PDF renderer.
    pub fn with_parts(
        config: ConverterConfig,
        renderer: Arc<dyn HtmlToPdf>,
        notifier: Arc<dyn ProgressNotifier>,
    ) -> Result<Self> {
        config.validate()?;
        let dispatcher = EngineDispatcher::new(&config, Arc::clone(&renderer))?;
        info!("converter service ready with {} workers", config.pool.workers);
        Ok(Self {
            inner: Arc::new(ServiceInner {
                dispatcher,
                renderer,
                notifier,
                cancel: CancelToken::new(),
            }),
        })
    }

    /// Handle for signalling cancellation to running conversions.
    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    /// Convert a single file.
    pub fn convert(&self, request: &ConversionRequest) -> ConversionResult {
        self.inner.convert_one(request, 0, 1)
    }

    /// Convert a list of files; the result at position `i` pertains to
    /// `requests[i]` regardless of execution order. A homogeneous batch fans
    /// out through the owning engine's worker pool; mixed batches degrade to
    /// sequential processing.
    pub fn batch_convert(&self, requests: Vec<ConversionRequest>) -> Vec<ConversionResult> {
        if requests.is_empty() {
            return Vec::new();
        }
        let total = requests.len();

        let first = InputFormat::detect(&requests[0].input_path);
        let homogeneous = match first {
            Some(format) => requests[1..]
                .iter()
                .all(|r| InputFormat::detect(&r.input_path) == Some(format)),
            None => false,
        };

        match (homogeneous, first) {
            (true, Some(format)) => {
                debug!("homogeneous {} batch of {}", format, total);
                let requests = Arc::new(requests);
                let tasks: Vec<Task> = requests
                    .iter()
                    .enumerate()
                    .map(|(index, r)| Task {
                        input_path: r.input_path.clone(),
                        output_path: r.output_path.clone(),
                        index,
                    })
                    .collect();

                let inner = Arc::clone(&self.inner);
                let batch_requests = Arc::clone(&requests);
                let completed = Arc::new(AtomicUsize::new(0));
                let convert = Arc::new(move |task: Task| {
                    let request = &batch_requests[task.index];
                    let result = inner.convert_one(request, task.index, total);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    inner.notify_batch_progress(task.index, total, request, done, &result);
                    result
                });

                let pool = self.inner.dispatcher.pool_for(format);
                batch::run_batch(pool, tasks, convert)
            }
            _ => {
                debug!("mixed batch of {}, processing sequentially", total);
                let mut results = Vec::with_capacity(total);
                for (index, request) in requests.iter().enumerate() {
                    if self.inner.cancel.is_cancelled() {
                        results.push(ConversionResult::from_error(&ConvertError::Cancelled));
                        continue;
                    }
                    let result = self.inner.convert_one(request, index, total);
                    self.inner
                        .notify_batch_progress(index, total, request, index + 1, &result);
                    results.push(result);
                }
                results
            }
        }
    }

    /// Convert a list of input paths to `format_string`, deriving each
    /// output path next to its input.
    pub fn batch_convert_to(
        &self,
        inputs: &[PathBuf],
        format_string: &str,
    ) -> Result<Vec<ConversionResult>> {
        let target = OutputFormat::parse(format_string)?;
        let requests = inputs
            .iter()
            .map(|input| {
                ConversionRequest::new(input.clone(), derive_output_path(input, target), target)
            })
            .collect();
        Ok(self.batch_convert(requests))
    }

    /// Output formats for which an engine is registered.
    pub fn supported_formats(&self) -> Vec<OutputFormat> {
        EngineDispatcher::supported_outputs()
    }

    /// Format detection plus magic-byte check, without converting. Never
    /// opens the file when the extension is already unsupported.
    pub fn validate(&self, path: &Path) -> Result<InputFormat> {
        let format = InputFormat::detect(path).ok_or_else(|| unsupported_input(path))?;
        format.validate_magic(path)?;
        Ok(format)
    }

    /// Drain worker pools, close the browser handle, and clear staged files.
    pub fn shutdown(&self) {
        info!("shutting down converter service");
        self.inner.dispatcher.shutdown();
        self.inner.renderer.close();
        if let Err(e) = staging::cleanup_all() {
            warn!("failed to clean staging directory: {}", e);
        }
    }
}

impl ServiceInner {
    fn convert_one(
        &self,
        request: &ConversionRequest,
        file_index: usize,
        total_files: usize,
    ) -> ConversionResult {
        let started = Instant::now();
        let current_file = file_name(&request.input_path);

        match self.convert_inner(request, file_index, total_files, &current_file) {
            Ok(()) => {
                self.notify(
                    file_index,
                    total_files,
                    &current_file,
                    100,
                    ConversionStage::Completed,
                    "Conversion complete",
                );
                info!(
                    "converted {:?} -> {:?} in {:?}",
                    request.input_path,
                    request.output_path,
                    started.elapsed()
                );
                ConversionResult::Success {
                    output_path: request.output_path.clone(),
                    duration: started.elapsed(),
                }
            }
            Err(e) => {
                let stage = if matches!(e, ConvertError::Cancelled) {
                    ConversionStage::Cancelled
                } else {
                    error!("failed to convert {:?}: {}", request.input_path, e);
                    ConversionStage::Failed
                };
                self.notify(
                    file_index,
                    total_files,
                    &current_file,
                    100,
                    stage,
                    &e.to_string(),
                );
                // Never leave partial output behind.
                let _ = fs::remove_file(&request.output_path);
                ConversionResult::from_error(&e)
            }
        }
    }

    fn convert_inner(
        &self,
        request: &ConversionRequest,
        file_index: usize,
        total_files: usize,
        current_file: &str,
    ) -> Result<()> {
        self.cancel.check()?;
        self.notify(
            file_index,
            total_files,
            current_file,
            0,
            ConversionStage::Validating,
            "Starting conversion",
        );

        // Extension and conversion-path checks happen before any file I/O.
        let input_format =
            InputFormat::detect(&request.input_path).ok_or_else(|| unsupported_input(&request.input_path))?;
        if !EngineDispatcher::supports(input_format, request.output_format) {
            return Err(ConvertError::UnsupportedConversion {
                input: input_format,
                output: request.output_format,
            });
        }

        let metadata = fs::metadata(&request.input_path)
            .map_err(|e| ConvertError::io_read(&request.input_path, e))?;
        if !metadata.is_file() {
            return Err(ConvertError::io_read(
                &request.input_path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a regular file",
                ),
            ));
        }
        input_format.validate_magic(&request.input_path)?;

        self.cancel.check()?;
        self.notify(
            file_index,
            total_files,
            current_file,
            50,
            ConversionStage::Parsing,
            "Converting",
        );

        if let Some(parent) = request.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConvertError::io_write(parent, e))?;
            }
        }

        self.dispatcher.convert(
            input_format,
            &request.input_path,
            &request.output_path,
            request.output_format,
            &self.cancel,
        )
    }

    fn notify(
        &self,
        file_index: usize,
        total_files: usize,
        current_file: &str,
        percent: u8,
        stage: ConversionStage,
        message: &str,
    ) {
        self.notifier.notify(ProgressEvent {
            file_index,
            total_files,
            current_file: current_file.to_string(),
            percent,
            stage,
            message: message.to_string(),
        });
    }

    /// Batch-level k/N completion event. The completed count never
    /// decreases.
    fn notify_batch_progress(
        &self,
        file_index: usize,
        total_files: usize,
        request: &ConversionRequest,
        completed: usize,
        result: &ConversionResult,
    ) {
        let stage = match result {
            ConversionResult::Success { .. } => ConversionStage::Completed,
            ConversionResult::Failure { kind, .. } => {
                if *kind == ErrorKind::Cancelled {
                    ConversionStage::Cancelled
                } else {
                    ConversionStage::Failed
                }
            }
        };
        self.notify(
            file_index,
            total_files,
            &file_name(&request.input_path),
            ((completed * 100) / total_files.max(1)) as u8,
            stage,
            &format!("{completed}/{total_files} files processed"),
        );
    }
}

fn unsupported_input(path: &Path) -> ConvertError {
    let reason = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("unknown extension '{ext}'"),
        None => "file has no extension".to_string(),
    };
    ConvertError::UnsupportedInput {
        path: path.to_path_buf(),
        reason,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path_replaces_extension() {
        assert_eq!(
            derive_output_path(Path::new("/data/report.xlsx"), OutputFormat::Pdf),
            PathBuf::from("/data/report.pdf")
        );
    }

    #[test]
    fn test_derive_output_path_normalises_jpg() {
        assert_eq!(
            derive_output_path(Path::new("photo.png"), OutputFormat::parse("jpg").unwrap()),
            PathBuf::from("photo.jpeg")
        );
    }

    #[test]
    fn test_conversion_result_accessors() {
        let ok = ConversionResult::Success {
            output_path: PathBuf::from("out.pdf"),
            duration: Duration::from_millis(3),
        };
        assert!(ok.is_success());
        assert_eq!(ok.failure_kind(), None);

        let failed = ConversionResult::Failure {
            kind: ErrorKind::Parse,
            message: "bad".to_string(),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.failure_kind(), Some(ErrorKind::Parse));
    }

    #[test]
    fn test_unsupported_input_reason() {
        let err = unsupported_input(Path::new("a.txt"));
        assert!(format!("{err}").contains("unknown extension 'txt'"));
        let err = unsupported_input(Path::new("README"));
        assert!(format!("{err}").contains("no extension"));
    }

    #[test]
    fn test_file_name_fallback() {
        assert_eq!(file_name(Path::new("/a/b/c.docx")), "c.docx");
        assert_eq!(file_name(Path::new("/")), "unknown");
    }
}
