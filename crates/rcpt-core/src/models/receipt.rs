//! Receipt data models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored receipt with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Database identifier.
    pub id: i64,

    /// Store or merchant name, if known.
    pub store_name: Option<String>,

    /// Date of purchase, if known.
    pub purchase_date: Option<NaiveDate>,

    /// Total amount paid, if known.
    pub total: Option<Decimal>,

    /// Text the receipt was extracted from.
    pub raw_text: String,

    /// When the receipt was stored.
    pub created_at: DateTime<Utc>,

    /// Purchased items, ordered by id.
    pub items: Vec<LineItem>,
}

impl Receipt {
    /// Sum of all line totals.
    ///
    /// Informational only: it is not required to match `total`.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Convert back into a draft (for export and re-import).
    pub fn to_draft(&self) -> ReceiptDraft {
        ReceiptDraft {
            store_name: self.store_name.clone(),
            purchase_date: self.purchase_date,
            total: self.total,
            items: self
                .items
                .iter()
                .map(|i| LineItemDraft {
                    description: i.description.clone(),
                    unit_price: i.unit_price,
                    quantity: i.quantity,
                })
                .collect(),
            raw_text: self.raw_text.clone(),
            metadata: ExtractionMetadata {
                confidence: 1.0,
                source_type: SourceType::Manual,
                ..Default::default()
            },
        }
    }
}

/// A stored line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub receipt_id: i64,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// Unit price times quantity.
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Summary row used for receipt listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub id: i64,
    pub store_name: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub total: Option<Decimal>,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Best-effort extraction result, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,

    #[serde(default)]
    pub items: Vec<LineItemDraft>,

    pub raw_text: String,

    #[serde(default)]
    pub metadata: ExtractionMetadata,
}

impl ReceiptDraft {
    /// Create an empty draft holding only the source text.
    pub fn empty(raw_text: impl Into<String>) -> Self {
        Self {
            store_name: None,
            purchase_date: None,
            total: None,
            items: Vec::new(),
            raw_text: raw_text.into(),
            metadata: ExtractionMetadata::default(),
        }
    }

    /// Sum of all line totals.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(LineItemDraft::line_total).sum()
    }

    /// Whether nothing at all was recognized.
    pub fn is_empty(&self) -> bool {
        self.store_name.is_none()
            && self.purchase_date.is_none()
            && self.total.is_none()
            && self.items.is_empty()
    }

    /// Append a human-readable notice to the stored raw text.
    pub fn append_notice(&mut self, notice: &str) {
        if self.raw_text.is_empty() {
            self.raw_text = notice.to_string();
        } else {
            self.raw_text = format!("{}\n\n{}", self.raw_text, notice);
        }
        self.metadata.warnings.push(notice.to_string());
    }
}

/// An extracted or user-entered line item before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDraft {
    pub description: String,
    pub unit_price: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl LineItemDraft {
    pub fn new(description: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            unit_price,
            quantity: 1,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Metadata about the extraction process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Overall extraction confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Where the text came from.
    pub source_type: SourceType,

    /// Issues encountered during ingestion or extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Fields that could not be extracted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

/// Source document type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Plain text file or pasted text.
    Text,
    /// CSV file parsed as text.
    Csv,
    /// Structured import of a previous export.
    CsvImport,
    /// PDF with a text layer.
    Pdf,
    /// Image passed through OCR.
    Image,
    /// Entered or corrected by a user.
    Manual,
    #[default]
    Unknown,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Text => "text",
            SourceType::Csv => "csv",
            SourceType::CsvImport => "csv_import",
            SourceType::Pdf => "pdf",
            SourceType::Image => "image",
            SourceType::Manual => "manual",
            SourceType::Unknown => "unknown",
        }
    }
}

/// Header fields a user can edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptUpdate {
    pub store_name: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub total: Option<Decimal>,
}

/// A line item as entered by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl From<&LineItemDraft> for LineItemInput {
    fn from(d: &LineItemDraft) -> Self {
        Self {
            description: d.description.clone(),
            unit_price: d.unit_price,
            quantity: d.quantity,
        }
    }
}
