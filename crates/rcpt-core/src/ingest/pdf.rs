//! Text extraction from PDF receipts using lopdf and pdf-extract.

use crate::error::PdfError;

/// Text layer of a PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    /// Number of pages in the document.
    pub page_count: usize,
    /// Extracted text, empty for scanned documents.
    pub text: String,
}

/// Extract the text layer of a PDF.
///
/// Documents encrypted with an empty password are decrypted first.
#[cfg(feature = "pdf")]
pub fn extract_pdf_text(data: &[u8]) -> Result<PdfText, PdfError> {
    use lopdf::Document;
    use tracing::debug;

    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(PdfError::NoPages);
    }

    let text = if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
        catch_extraction_panic(|| pdf_extract::extract_text_from_mem(&decrypted))?
    } else {
        catch_extraction_panic(|| pdf_extract::extract_text_from_mem(data))?
    };

    debug!("PDF with {} pages, {} chars of text", page_count, text.len());

    Ok(PdfText {
        page_count,
        text: text.trim().to_string(),
    })
}

/// Run a text extraction, turning both errors and panics into `PdfError`.
///
/// pdf-extract panics on some malformed documents that lopdf loads fine.
#[cfg(feature = "pdf")]
fn catch_extraction_panic<F, E>(extract: F) -> Result<String, PdfError>
where
    F: FnOnce() -> Result<String, E> + std::panic::UnwindSafe,
    E: std::fmt::Display,
{
    match std::panic::catch_unwind(extract) {
        Ok(result) => result.map_err(|e| PdfError::TextExtraction(e.to_string())),
        Err(_) => {
            tracing::warn!("PDF text extraction panicked");
            Err(PdfError::TextExtraction(
                "the document could not be decoded".to_string(),
            ))
        }
    }
}

#[cfg(not(feature = "pdf"))]
pub fn extract_pdf_text(_data: &[u8]) -> Result<PdfText, PdfError> {
    Err(PdfError::Unsupported)
}

#[cfg(all(test, feature = "pdf"))]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(
            extract_pdf_text(b"Corner Store\nMilk 3.50"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_extraction_panic_becomes_error() {
        let result = catch_extraction_panic(|| -> Result<String, PdfError> {
            panic!("malformed content stream")
        });
        assert!(matches!(result, Err(PdfError::TextExtraction(_))));
    }

    #[test]
    fn test_extraction_error_is_mapped() {
        let result = catch_extraction_panic(|| Err::<String, _>("bad font"));
        assert!(matches!(result, Err(PdfError::TextExtraction(msg)) if msg == "bad font"));
    }
}
