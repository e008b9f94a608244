//! Core library for receipt recognition.
//!
//! This crate provides:
//! - Ingestion of uploaded receipts (plain text, CSV, text-layer PDF, images)
//! - OCR integration through an external engine (tesseract)
//! - Heuristic receipt field extraction (store, date, total, line items)
//! - SQLite storage for receipts and their line items
//! - Round-trippable CSV export and import

pub mod error;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod store;

pub use error::{RcptError, Result};
pub use export::{export_csv, import_csv};
pub use extract::{HeuristicReceiptParser, ReceiptParser};
pub use ingest::{IngestOutcome, OcrBackend, TesseractOcr};
pub use models::config::RcptConfig;
pub use models::receipt::{
    ExtractionMetadata, LineItem, LineItemDraft, LineItemInput, Receipt, ReceiptDraft,
    ReceiptSummary, ReceiptUpdate, SourceType,
};
pub use store::ReceiptStore;
