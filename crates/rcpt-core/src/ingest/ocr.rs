//! OCR through an external engine.

use std::io::{Cursor, ErrorKind, Write};
use std::process::{Command, Stdio};
use std::time::Instant;

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Result of OCR processing on an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized text.
    pub text: String,

    /// Engine that produced the text.
    pub engine: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Image dimensions (width, height) as passed to the engine.
    pub image_size: (u32, u32),
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Short engine name for logs and metadata.
    fn name(&self) -> &str;

    /// Recognize text in an image.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError>;
}

/// Runs the `tesseract` command line tool over stdin/stdout.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// Executable name or path.
    command: String,
    /// `+`-separated language codes.
    languages: String,
    /// Longer image side is downsized to this.
    max_image_size: u32,
}

impl TesseractOcr {
    /// Create a backend with default settings.
    pub fn new() -> Self {
        Self {
            command: "tesseract".to_string(),
            languages: "eng".to_string(),
            max_image_size: 2048,
        }
    }

    /// Build a backend from configuration; `None` when OCR is disabled.
    pub fn from_config(config: &OcrConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Some(
            Self::new()
                .with_command(&config.command)
                .with_languages(&config.languages)
                .with_max_image_size(config.max_image_size),
        )
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = languages.into();
        self
    }

    pub fn with_max_image_size(mut self, size: u32) -> Self {
        self.max_image_size = size;
        self
    }

    /// Grayscale and downsize the image, then encode it as PNG.
    fn prepare(&self, image: &DynamicImage) -> Result<(Vec<u8>, (u32, u32)), OcrError> {
        let gray = preprocess(image, self.max_image_size);
        let size = gray.dimensions();

        let mut png = Vec::new();
        gray.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        Ok((png, size))
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let (png, image_size) = self.prepare(image)?;

        debug!(
            "Running {} on {}x{} image ({} bytes), languages {}",
            self.command, image_size.0, image_size.1, png.len(), self.languages
        );

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.languages])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::Unavailable(format!(
                    "{} not found; install tesseract-ocr and add it to PATH",
                    self.command
                )),
                _ => OcrError::Unavailable(e.to_string()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| OcrError::Recognition(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{} exited with {}: {}", self.command, output.status, stderr);
            return Err(OcrError::Recognition(if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            }));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        let processing_time_ms = start.elapsed().as_millis() as u64;
        debug!("OCR produced {} characters in {}ms", text.len(), processing_time_ms);

        Ok(OcrResult {
            text,
            engine: self.name().to_string(),
            processing_time_ms,
            image_size,
        })
    }
}

/// Convert to grayscale and fit the longer side into `max_size`.
pub fn preprocess(image: &DynamicImage, max_size: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let gray = image.grayscale();

    if max_size == 0 || (width <= max_size && height <= max_size) {
        return gray;
    }

    debug!("Downsizing {}x{} image to fit {}", width, height, max_size);
    gray.resize(max_size, max_size, image::imageops::FilterType::Lanczos3)
}

/// Decode image bytes, guessing the format from content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, OcrError> {
    image::load_from_memory(data).map_err(|e| OcrError::InvalidImage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn test_preprocess_grayscale_and_resize() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 100, image::Rgb([200, 10, 10])));
        let prepared = preprocess(&image, 200);

        assert_eq!(prepared.dimensions(), (200, 50));
        assert!(matches!(prepared, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_preprocess_keeps_small_images() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 20, Luma([255])));
        assert_eq!(preprocess(&image, 2048).dimensions(), (30, 20));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let ocr = TesseractOcr::new().with_command("rcpt-no-such-ocr-binary");
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255])));

        let err = ocr.recognize(&image).unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn test_disabled_config() {
        let config = OcrConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(TesseractOcr::from_config(&config).is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(OcrError::InvalidImage(_))
        ));
    }
}
