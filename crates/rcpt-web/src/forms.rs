//! Form bodies posted by the edit page.

use rcpt_core::extract::rules::{parse_amount, parse_date};
use rcpt_core::{LineItemInput, RcptError, ReceiptUpdate};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Placeholder used when an item is added without a description.
pub const DEFAULT_ITEM_DESCRIPTION: &str = "New item";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReceiptForm {
    pub store_name: String,
    pub purchase_date: String,
    pub total: String,
}

impl ReceiptForm {
    /// Blank fields clear the value; unreadable ones are rejected.
    pub fn into_update(self, day_first: bool) -> Result<ReceiptUpdate, RcptError> {
        let store_name = Some(self.store_name.trim().to_string()).filter(|s| !s.is_empty());

        let date = self.purchase_date.trim();
        let purchase_date = if date.is_empty() {
            None
        } else {
            Some(parse_date(date, day_first).ok_or_else(|| RcptError::invalid_input("purchase date", date))?)
        };

        Ok(ReceiptUpdate {
            store_name,
            purchase_date,
            total: optional_amount("total", &self.total)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
}

impl ItemForm {
    pub fn into_input(self) -> Result<LineItemInput, RcptError> {
        let description = match self.description.trim() {
            "" => DEFAULT_ITEM_DESCRIPTION.to_string(),
            d => d.to_string(),
        };

        let quantity = match self.quantity.trim() {
            "" => 1,
            q => q
                .parse::<u32>()
                .ok()
                .filter(|&q| q > 0)
                .ok_or_else(|| RcptError::invalid_input("quantity", q))?,
        };

        Ok(LineItemInput {
            description,
            unit_price: optional_amount("unit price", &self.unit_price)?.unwrap_or(Decimal::ZERO),
            quantity,
        })
    }
}

fn optional_amount(field: &str, value: &str) -> Result<Option<Decimal>, RcptError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    parse_amount(value)
        .map(Some)
        .ok_or_else(|| RcptError::invalid_input(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_receipt_form() {
        let form = ReceiptForm {
            store_name: "  Corner Shop ".to_string(),
            purchase_date: "2024-02-01".to_string(),
            total: "6,00".to_string(),
        };
        let update = form.into_update(true).unwrap();

        assert_eq!(update.store_name.as_deref(), Some("Corner Shop"));
        assert_eq!(update.purchase_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(update.total, Some(Decimal::from_str("6.00").unwrap()));
    }

    #[test]
    fn test_blank_fields_clear() {
        let update = ReceiptForm::default().into_update(true).unwrap();
        assert_eq!(update, ReceiptUpdate::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let form = ReceiptForm {
            total: "lots".to_string(),
            ..Default::default()
        };
        assert!(form.into_update(true).is_err());

        let item = ItemForm {
            quantity: "0".to_string(),
            ..Default::default()
        };
        assert!(item.into_input().is_err());
    }

    #[test]
    fn test_item_defaults() {
        let input = ItemForm::default().into_input().unwrap();
        assert_eq!(input.description, DEFAULT_ITEM_DESCRIPTION);
        assert_eq!(input.quantity, 1);
        assert_eq!(input.unit_price, Decimal::ZERO);
    }
}
