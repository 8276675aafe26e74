//! Configuration types for the converter.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the per-engine worker pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads per pool.
    /// Default: number of CPU cores (minimum 1).
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
        }
    }
}

impl PoolConfig {
    /// Create a pool config with the given worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConvertError::Internal(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the headless-browser PDF renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit path to a Chrome/Chromium/Edge binary. If `None`, the
    /// platform-standard install locations and `PATH` are searched. The
    /// renderer never downloads a browser.
    pub binary_path: Option<PathBuf>,
}

impl BrowserConfig {
    /// Set an explicit browser binary path.
    pub fn binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = Some(path);
        self
    }
}

/// Configuration for image re-encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG output quality (1-100).
    /// Default: 90.
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

impl ImageConfig {
    /// Set the JPEG output quality.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConvertError::Internal(
                "jpeg_quality must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Combined configuration for the converter service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Worker pool configuration.
    pub pool: PoolConfig,

    /// Headless-browser configuration.
    pub browser: BrowserConfig,

    /// Image encoder configuration.
    pub image: ImageConfig,
}

impl ConverterConfig {
    /// Create a config with the given pool size.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            pool: PoolConfig::with_workers(workers),
            ..Default::default()
        }
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.image.validate()?;
        Ok(())
    }
}
