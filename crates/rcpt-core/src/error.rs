//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// CSV export or import error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A user supplied value could not be interpreted.
    #[error("invalid {field}: {value:?}")]
    InvalidInput { field: String, value: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RcptError {
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the error means the addressed receipt or item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RcptError::Store(StoreError::ReceiptNotFound(_) | StoreError::ItemNotFound { .. })
        )
    }
}

/// Errors related to the receipt database.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// No receipt with the given id.
    #[error("receipt {0} not found")]
    ReceiptNotFound(i64),

    /// No item with the given id on the given receipt.
    #[error("item {item_id} not found on receipt {receipt_id}")]
    ItemNotFound { receipt_id: i64, item_id: i64 },

    /// A stored value could not be decoded.
    #[error("corrupt value in column {column}: {value:?}")]
    Corrupt { column: &'static str, value: String },
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// OCR is switched off in the configuration.
    #[error("OCR is disabled")]
    Disabled,

    /// The OCR engine is not installed or not on PATH.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    /// The OCR engine ran but failed.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Image could not be decoded or encoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// PDF support was not compiled in.
    #[error("PDF support is not enabled")]
    Unsupported,
}

/// Errors related to CSV export and import.
#[derive(Error, Debug)]
pub enum CsvError {
    /// Reader or writer failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The header does not contain a required column.
    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    /// A cell could not be parsed.
    #[error("row {row}: invalid {field} {value:?}")]
    InvalidValue {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
