//! Turning uploaded files into receipt text.
//!
//! Ingestion never fails: problems are reported as a notice that ends up in
//! the stored raw text, so the user can still edit the receipt by hand.

pub mod ocr;
pub mod pdf;

pub use ocr::{OcrBackend, OcrResult, TesseractOcr};

use std::path::Path;

use tracing::{debug, info, warn};

use crate::export::{import_csv, is_export_csv};
use crate::extract::ReceiptParser;
use crate::models::receipt::{ReceiptDraft, SourceType};

const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp",
];

/// Text pulled out of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Extracted text, possibly empty.
    pub text: String,
    /// Kind of file the text came from.
    pub source: SourceType,
    /// Problem the user should know about.
    pub notice: Option<String>,
}

impl IngestOutcome {
    fn text(text: String, source: SourceType) -> Self {
        Self {
            text,
            source,
            notice: None,
        }
    }

    fn notice(source: SourceType, notice: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            source,
            notice: Some(notice.into()),
        }
    }
}

fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Whether the file extension names a kind of file ingestion understands.
pub fn is_supported(filename: &str) -> bool {
    let ext = extension(filename);
    matches!(ext.as_str(), "csv" | "pdf")
        || TEXT_EXTENSIONS.contains(&ext.as_str())
        || IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Decode bytes as UTF-8, dropping a byte order mark.
fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    String::from_utf8_lossy(data).into_owned()
}

/// Extract text from an uploaded file.
///
/// The kind of file is chosen by extension; unknown extensions are sniffed
/// for image content.
pub fn extract_text(filename: &str, data: &[u8], ocr: Option<&dyn OcrBackend>) -> IngestOutcome {
    let ext = extension(filename);
    debug!("Ingesting {} ({} bytes)", filename, data.len());

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return IngestOutcome::text(decode_text(data), SourceType::Text);
    }
    if ext == "csv" {
        return IngestOutcome::text(decode_text(data), SourceType::Csv);
    }
    if ext == "pdf" {
        return from_pdf(data);
    }
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) || image::guess_format(data).is_ok() {
        return from_image(data, ocr);
    }

    warn!("Unsupported file type: {}", filename);
    IngestOutcome::notice(
        SourceType::Unknown,
        "This file type is not supported for text recognition.",
    )
}

fn from_pdf(data: &[u8]) -> IngestOutcome {
    match pdf::extract_pdf_text(data) {
        Ok(content) if content.text.is_empty() => {
            warn!("PDF with {} pages has no text layer", content.page_count);
            IngestOutcome::notice(
                SourceType::Pdf,
                "The PDF has no text layer; upload a photo of the receipt instead.",
            )
        }
        Ok(content) => IngestOutcome::text(content.text, SourceType::Pdf),
        Err(e) => {
            warn!("PDF extraction failed: {}", e);
            IngestOutcome::notice(SourceType::Pdf, format!("Could not read the PDF: {}", e))
        }
    }
}

fn from_image(data: &[u8], ocr: Option<&dyn OcrBackend>) -> IngestOutcome {
    let Some(ocr) = ocr else {
        return IngestOutcome::notice(
            SourceType::Image,
            "OCR is disabled; enter the receipt fields by hand.",
        );
    };

    let result = ocr::decode_image(data).and_then(|image| ocr.recognize(&image));
    match result {
        Ok(result) if result.text.trim().is_empty() => IngestOutcome::notice(
            SourceType::Image,
            "OCR found no text in the uploaded image.",
        ),
        Ok(result) => {
            info!(
                "{} recognized {} characters in {}ms",
                result.engine,
                result.text.len(),
                result.processing_time_ms
            );
            IngestOutcome::text(result.text, SourceType::Image)
        }
        Err(e) => {
            warn!("OCR failed: {}", e);
            IngestOutcome::notice(SourceType::Image, format!("OCR failed: {}", e))
        }
    }
}

/// Turn an uploaded file into one or more receipt drafts.
///
/// Exported CSV files are imported as they are; everything else is reduced
/// to text and parsed. Always yields at least one draft.
pub fn process_upload(
    filename: &str,
    data: &[u8],
    ocr: Option<&dyn OcrBackend>,
    parser: &dyn ReceiptParser,
) -> Vec<ReceiptDraft> {
    if extension(filename) == "csv" && is_export_csv(data) {
        match import_csv(data) {
            Ok(drafts) if !drafts.is_empty() => {
                info!("Imported {} receipts from {}", drafts.len(), filename);
                return drafts;
            }
            Ok(_) => {}
            Err(e) => warn!("{} looks like an export but failed to import: {}", filename, e),
        }
    }

    let outcome = extract_text(filename, data, ocr);
    let mut draft = if outcome.text.trim().is_empty() {
        ReceiptDraft::empty("")
    } else {
        parser.parse(&outcome.text)
    };
    draft.metadata.source_type = outcome.source;

    if let Some(notice) = &outcome.notice {
        draft.append_notice(notice);
    } else if outcome.text.trim().is_empty() {
        draft.append_notice("No text could be recognized in the file.");
    }

    vec![draft]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::extract::HeuristicReceiptParser;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    struct FixedOcr(&'static str);

    impl OcrBackend for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
            Ok(OcrResult {
                text: self.0.to_string(),
                engine: self.name().to_string(),
                processing_time_ms: 0,
                image_size: (image.width(), image.height()),
            })
        }
    }

    struct BrokenOcr;

    impl OcrBackend for BrokenOcr {
        fn name(&self) -> &str {
            "broken"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<OcrResult, OcrError> {
            Err(OcrError::Unavailable("tesseract not found".to_string()))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let mut out = Vec::new();
        image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_text_file() {
        let outcome = extract_text("receipt.TXT", b"\xEF\xBB\xBFShop\nMilk 3.50", None);
        assert_eq!(outcome, IngestOutcome::text("Shop\nMilk 3.50".to_string(), SourceType::Text));
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported("a.txt"));
        assert!(is_supported("scan.JPEG"));
        assert!(is_supported("export.csv"));
        assert!(is_supported("bill.pdf"));
        assert!(!is_supported("notes.docx"));
        assert!(!is_supported("README"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let outcome = extract_text("r.csv", b"Caf\xE9 3.50", None);
        assert_eq!(outcome.source, SourceType::Csv);
        assert!(outcome.text.ends_with("3.50"));
        assert_eq!(outcome.notice, None);
    }

    #[test]
    fn test_image_through_ocr() {
        let ocr = FixedOcr("Kiosk\nTea 1.20\nTotal 1.20");
        let outcome = extract_text("photo.png", &png_bytes(), Some(&ocr));
        assert_eq!(outcome.source, SourceType::Image);
        assert_eq!(outcome.text, "Kiosk\nTea 1.20\nTotal 1.20");
    }

    #[test]
    fn test_image_sniffed_without_extension() {
        let ocr = FixedOcr("Kiosk");
        let outcome = extract_text("upload", &png_bytes(), Some(&ocr));
        assert_eq!(outcome.source, SourceType::Image);
    }

    #[test]
    fn test_image_without_ocr() {
        let outcome = extract_text("photo.jpg", &png_bytes(), None);
        assert!(outcome.text.is_empty());
        assert!(outcome.notice.unwrap().contains("OCR is disabled"));
    }

    #[test]
    fn test_unsupported_file() {
        let outcome = extract_text("notes.docx", b"PK\x03\x04", None);
        assert_eq!(outcome.source, SourceType::Unknown);
        assert!(outcome.notice.is_some());
    }

    #[test]
    fn test_upload_is_parsed() {
        let parser = HeuristicReceiptParser::new();
        let drafts = process_upload(
            "r.txt",
            b"Corner Store\n2024-01-15\nMilk 3.50\nBread 2.00\nTotal 5.50",
            None,
            &parser,
        );

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].store_name.as_deref(), Some("Corner Store"));
        assert_eq!(drafts[0].items.len(), 2);
        assert_eq!(drafts[0].metadata.source_type, SourceType::Text);
    }

    #[test]
    fn test_failed_ocr_keeps_notice() {
        let parser = HeuristicReceiptParser::new();
        let drafts = process_upload("photo.png", &png_bytes(), Some(&BrokenOcr), &parser);

        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].is_empty());
        assert!(drafts[0].raw_text.contains("tesseract not found"));
        assert_eq!(drafts[0].metadata.warnings.len(), 1);
    }

    #[test]
    fn test_export_csv_is_imported() {
        let parser = HeuristicReceiptParser::new();
        let csv = "receipt_id,store_name,purchase_date,total,item_description,quantity,unit_price,line_total\n\
                   1,Kiosk,,1.20,Tea,1,1.20,1.20\n\
                   2,Bakery,,2.00,Bread,1,2.00,2.00\n";
        let drafts = process_upload("export.csv", csv.as_bytes(), None, &parser);

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].store_name.as_deref(), Some("Bakery"));
        assert_eq!(drafts[1].metadata.source_type, SourceType::CsvImport);
    }
}
