//! HTML-to-PDF rendering through a locally installed headless browser.
//!
//! The locator only inspects platform-standard install locations and `PATH`.
//! It never downloads a browser binary; when none is found, construction of
//! the render path fails with installation guidance so no user data can leave
//! the machine through a bootstrap fetch.

use crate::config::BrowserConfig;
use crate::error::{ConvertError, Result};
use crate::staging;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Contract consumed by the PDF stage of the document-family engines.
///
/// Implementations must be safe to call from multiple threads and must not
/// fetch any asset referenced by the HTML; all styling produced by the
/// renderers in this crate is inline.
pub trait HtmlToPdf: Send + Sync {
    /// Render a self-contained HTML document to a PDF file at `output_path`.
    fn render_to_pdf(&self, html: &str, output_path: &Path) -> Result<()>;

    /// Release the underlying browser handle. Terminal for implementations
    /// that hold one; the default is a no-op.
    fn close(&self) {}
}

/// Browser handle lifecycle: located lazily on first render, reused across
/// conversions, terminal once closed.
#[derive(Debug, Clone)]
enum BrowserState {
    Absent,
    Launching,
    Ready(PathBuf),
    Closed,
}

/// [`HtmlToPdf`] implementation driving a local Chromium-family browser in
/// headless print-to-PDF mode. Each render runs its own browser process over
/// a uniquely named staged HTML file, so concurrent renders do not contend.
pub struct ChromiumPdfRenderer {
    state: Mutex<BrowserState>,
    config: BrowserConfig,
}

impl ChromiumPdfRenderer {
    /// Create a renderer. The browser binary is located lazily on the first
    /// PDF render, so construction succeeds on machines without a browser.
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            state: Mutex::new(BrowserState::Absent),
            config,
        }
    }

    /// Find a local Chrome/Chromium/Edge binary.
    pub fn locate(config: &BrowserConfig) -> Result<PathBuf> {
        if let Some(ref path) = config.binary_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(ConvertError::BrowserUnavailable(format!(
                "configured browser path '{}' does not exist",
                path.display()
            )));
        }

        for candidate in browser_candidates() {
            let path = PathBuf::from(candidate);
            if path.is_file() {
                return Ok(path);
            }
        }

        for name in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "msedge",
        ] {
            if let Ok(path) = which::which(name) {
                return Ok(path);
            }
        }

        Err(ConvertError::BrowserUnavailable(
            "Chrome/Chromium/Edge not found in common locations or PATH".to_string(),
        ))
    }

    /// Resolve the browser binary, transitioning Absent -> Launching ->
    /// Ready. A failed launch falls back to Absent so a later render may
    /// retry after the user installs a browser.
    fn ensure_ready(&self) -> Result<PathBuf> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ConvertError::Internal("browser state lock poisoned".to_string()))?;
        match &*state {
            BrowserState::Ready(path) => Ok(path.clone()),
            BrowserState::Closed => Err(ConvertError::PdfRender(
                "browser renderer has been closed".to_string(),
            )),
            BrowserState::Absent | BrowserState::Launching => {
                *state = BrowserState::Launching;
                match Self::locate(&self.config) {
                    Ok(path) => {
                        debug!("using local browser at {:?}", path);
                        *state = BrowserState::Ready(path.clone());
                        Ok(path)
                    }
                    Err(e) => {
                        *state = BrowserState::Absent;
                        Err(e)
                    }
                }
            }
        }
    }

}

impl HtmlToPdf for ChromiumPdfRenderer {
    /// Shut the renderer down. Terminal; subsequent renders fail.
    fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = BrowserState::Closed;
        }
    }

    fn render_to_pdf(&self, html: &str, output_path: &Path) -> Result<()> {
        let binary = self.ensure_ready()?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConvertError::io_write(parent, e))?;
            }
        }

        let stem = output_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("render");
        let staged = staging::stage_text(stem, "html", html)?;

        let result = run_print_to_pdf(&binary, &staged, output_path);

        if let Err(e) = staging::remove(&staged) {
            warn!("failed to remove staged HTML {:?}: {}", staged, e);
        }

        if result.is_err() {
            // Never leave a partial PDF behind.
            let _ = std::fs::remove_file(output_path);
        }
        result
    }
}

fn run_print_to_pdf(binary: &Path, staged_html: &Path, output_path: &Path) -> Result<()> {
    let output = Command::new(binary)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--no-pdf-header-footer")
        .arg(format!("--print-to-pdf={}", output_path.display()))
        .arg(file_url(staged_html))
        .output()
        .map_err(|e| ConvertError::PdfRender(format!("failed to run browser: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConvertError::PdfRender(format!(
            "browser exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    match std::fs::metadata(output_path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(ConvertError::PdfRender(
            "browser produced an empty PDF".to_string(),
        )),
        Err(_) => Err(ConvertError::PdfRender(
            "browser produced no PDF output".to_string(),
        )),
    }
}

/// Platform-standard browser install locations, most common first.
fn browser_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "linux")]
    {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    }
    #[cfg(target_os = "macos")]
    {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ]
    }
    #[cfg(target_os = "windows")]
    {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ]
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        &[]
    }
}

fn file_url(path: &Path) -> String {
    let display = path.display().to_string().replace('\\', "/");
    if display.starts_with('/') {
        format!("file://{display}")
    } else {
        format!("file:///{display}")
    }
}
