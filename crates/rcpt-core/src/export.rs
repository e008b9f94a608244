//! CSV export and import of receipts.
//!
//! One row per line item. A receipt without items is written as a single row
//! with empty item columns, so every receipt survives a round trip.

use std::io::{Read, Write};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{CsvError, Result};
use crate::extract::rules::parse_amount;
use crate::models::receipt::{
    ExtractionMetadata, LineItemDraft, Receipt, ReceiptDraft, SourceType,
};

/// Column names, in export order.
pub const CSV_HEADER: [&str; 8] = [
    "receipt_id",
    "store_name",
    "purchase_date",
    "total",
    "item_description",
    "quantity",
    "unit_price",
    "line_total",
];

/// Write stored receipts as CSV.
pub fn export_csv<W: Write>(receipts: &[Receipt], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER).map_err(CsvError::from)?;

    for receipt in receipts {
        write_receipt(&mut wtr, receipt.id, &receipt.to_draft())?;
    }

    wtr.flush()?;
    debug!("Exported {} receipts", receipts.len());
    Ok(())
}

/// Write unsaved drafts as CSV, numbering them from 1.
pub fn export_drafts<W: Write>(drafts: &[ReceiptDraft], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER).map_err(CsvError::from)?;

    for (i, draft) in drafts.iter().enumerate() {
        write_receipt(&mut wtr, i as i64 + 1, draft)?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_receipt<W: Write>(wtr: &mut csv::Writer<W>, id: i64, draft: &ReceiptDraft) -> Result<()> {
    let id = id.to_string();
    let store = draft.store_name.clone().unwrap_or_default();
    let date = draft.purchase_date.map(|d| d.to_string()).unwrap_or_default();
    let total = draft.total.map(|t| t.to_string()).unwrap_or_default();

    if draft.items.is_empty() {
        wtr.write_record([id.as_str(), &store, &date, &total, "", "", "", ""])
            .map_err(CsvError::from)?;
        return Ok(());
    }

    for item in &draft.items {
        wtr.write_record([
            id.as_str(),
            &store,
            &date,
            &total,
            &item.description,
            &item.quantity.to_string(),
            &item.unit_price.to_string(),
            &item.line_total().to_string(),
        ])
        .map_err(CsvError::from)?;
    }
    Ok(())
}

/// Whether the first line of `data` is the export header.
pub fn is_export_csv(data: &[u8]) -> bool {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let first_line = data.split(|&b| b == b'\n').next().unwrap_or_default();
    let first_line = String::from_utf8_lossy(first_line);

    let columns: Vec<&str> = first_line.trim_end().split(',').map(str::trim).collect();
    CSV_HEADER.iter().all(|c| columns.contains(c))
}

/// Column positions looked up by header name.
struct Columns {
    receipt_id: usize,
    store_name: usize,
    purchase_date: usize,
    total: usize,
    item_description: usize,
    quantity: usize,
    unit_price: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> std::result::Result<Self, CsvError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
                .ok_or(CsvError::MissingColumn(name))
        };

        Ok(Self {
            receipt_id: find("receipt_id")?,
            store_name: find("store_name")?,
            purchase_date: find("purchase_date")?,
            total: find("total")?,
            item_description: find("item_description")?,
            quantity: find("quantity")?,
            unit_price: find("unit_price")?,
        })
    }
}

/// Read CSV written by [`export_csv`] back into drafts.
///
/// Consecutive rows with the same `receipt_id` form one receipt;
/// `line_total` is derived and ignored.
pub fn import_csv<R: Read>(reader: R) -> Result<Vec<ReceiptDraft>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::from_headers(rdr.headers().map_err(CsvError::from)?)?;

    let mut drafts: Vec<ReceiptDraft> = Vec::new();
    let mut current_id: Option<String> = None;

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(CsvError::from)?;
        let row = i + 2;
        let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();

        let id = cell(columns.receipt_id).to_string();
        if current_id.as_deref() != Some(id.as_str()) || drafts.is_empty() {
            drafts.push(ReceiptDraft {
                store_name: non_empty(cell(columns.store_name)),
                purchase_date: optional_date(cell(columns.purchase_date), row)?,
                total: optional_amount(cell(columns.total), "total", row)?,
                items: Vec::new(),
                raw_text: String::new(),
                metadata: ExtractionMetadata {
                    confidence: 1.0,
                    source_type: SourceType::CsvImport,
                    ..Default::default()
                },
            });
            current_id = Some(id);
        }

        let description = cell(columns.item_description);
        let unit_price = cell(columns.unit_price);
        if description.is_empty() && unit_price.is_empty() {
            continue;
        }

        let unit_price = optional_amount(unit_price, "unit_price", row)?.unwrap_or(Decimal::ZERO);
        let quantity = match cell(columns.quantity) {
            "" => 1,
            q => q
                .parse::<u32>()
                .ok()
                .filter(|&q| q > 0)
                .ok_or_else(|| invalid(row, "quantity", q))?,
        };

        if let Some(draft) = drafts.last_mut() {
            draft
                .items
                .push(LineItemDraft::new(description, unit_price).with_quantity(quantity));
        }
    }

    for draft in &mut drafts {
        draft.raw_text = render_text(draft);
    }

    debug!("Imported {} receipts from CSV", drafts.len());
    Ok(drafts)
}

/// Plain-text rendering of a draft that parses back to the same fields.
pub fn render_text(draft: &ReceiptDraft) -> String {
    let mut lines = Vec::new();

    if let Some(store) = &draft.store_name {
        lines.push(store.clone());
    }
    if let Some(date) = draft.purchase_date {
        lines.push(date.to_string());
    }
    for item in &draft.items {
        if item.quantity > 1 {
            lines.push(format!(
                "{} {} x {} {}",
                item.description,
                item.quantity,
                item.unit_price,
                item.line_total()
            ));
        } else {
            lines.push(format!("{} {}", item.description, item.unit_price));
        }
    }
    if let Some(total) = draft.total {
        lines.push(format!("Total {}", total));
    }

    lines.join("\n")
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn optional_date(s: &str, row: usize) -> std::result::Result<Option<NaiveDate>, CsvError> {
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| invalid(row, "purchase_date", s))
}

fn optional_amount(
    s: &str,
    field: &'static str,
    row: usize,
) -> std::result::Result<Option<Decimal>, CsvError> {
    if s.is_empty() {
        return Ok(None);
    }
    parse_amount(s).map(Some).ok_or_else(|| invalid(row, field, s))
}

fn invalid(row: usize, field: &'static str, value: &str) -> CsvError {
    CsvError::InvalidValue {
        row,
        field,
        value: value.to_string(),
    }
}
