//! Raster-image decoding and re-encoding.
//!
//! No scaling, rotation, or color-space conversion is performed; alpha is
//! preserved where the target format supports it. WebP output uses the
//! lossless encoder, so the configured quality does not apply to it.

use crate::config::ImageConfig;
use crate::error::{ConvertError, Result};
use crate::format::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::{WebPDecoder, WebPEncoder};
use image::DynamicImage;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Codec for the image engine: decode any supported input, re-encode to the
/// target format.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    jpeg_quality: u8,
}

impl ImageCodec {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Decode an image file. WebP goes through the dedicated container-aware
    /// decoder; everything else through the general reader.
    pub fn decode(&self, path: &Path) -> Result<DynamicImage> {
        let is_webp = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("webp"))
            .unwrap_or(false);

        if is_webp {
            let file = File::open(path).map_err(|e| ConvertError::io_read(path, e))?;
            let decoder = WebPDecoder::new(BufReader::new(file))
                .map_err(|e| ConvertError::parse(format!("decoding webp: {e}")))?;
            DynamicImage::from_decoder(decoder)
                .map_err(|e| ConvertError::parse(format!("decoding webp: {e}")))
        } else {
            image::ImageReader::open(path)
                .map_err(|e| ConvertError::io_read(path, e))?
                .decode()
                .map_err(|e| ConvertError::parse(format!("decoding image: {e}")))
        }
    }

    /// Encode to a fresh file at `output_path`. A failed encode removes the
    /// partial output.
    pub fn encode(
        &self,
        image: &DynamicImage,
        output_path: &Path,
        target: OutputFormat,
    ) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConvertError::io_write(parent, e))?;
            }
        }

        let file = File::create(output_path).map_err(|e| ConvertError::io_write(output_path, e))?;
        let mut writer = BufWriter::new(file);

        let encoded = match target {
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut writer)),
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel; flatten to RGB first.
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut writer,
                    self.jpeg_quality,
                ))
            }
            OutputFormat::Webp => {
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut writer))
            }
            OutputFormat::Pdf | OutputFormat::Html => {
                drop(writer);
                let _ = std::fs::remove_file(output_path);
                return Err(ConvertError::Internal(format!(
                    "image codec cannot encode {target}"
                )));
            }
        };

        let flushed = match encoded {
            Ok(()) => writer
                .flush()
                .map_err(|e| ConvertError::io_write(output_path, e)),
            Err(e) => Err(ConvertError::io_write(
                output_path,
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )),
        };

        if let Err(e) = flushed {
            drop(writer);
            let _ = std::fs::remove_file(output_path);
            return Err(e);
        }

        debug!("encoded {:?} as {}", output_path, target);
        Ok(())
    }
}
