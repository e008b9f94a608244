//! Line item extraction.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::amounts::{parse_amount, AmountExtractor};
use super::patterns::{CURRENCY_TOKEN, QTY_PREFIX, QTY_SUFFIX, QTY_TIMES, WHITESPACE_RUN};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::receipt::LineItemDraft;

const MAX_INFERRED_QUANTITY: u32 = 999;

/// Parse a single `description ... price` line.
///
/// Returns `None` when the line has no amount or no usable description.
pub fn parse_item_line(line: &str) -> Option<LineItemDraft> {
    let amounts = AmountExtractor::new().extract_all(line);
    let last = amounts.last()?;

    let (quantity, unit_price) = quantity_and_price(line, &amounts, last.value);
    let description = describe(line, &amounts)?;

    Some(LineItemDraft {
        description,
        unit_price,
        quantity,
    })
}

fn quantity_and_price(
    line: &str,
    amounts: &[ExtractionMatch<Decimal>],
    last: Decimal,
) -> (u32, Decimal) {
    // "Milk 2 x 1.50 3.00"
    if let Some(caps) = QTY_TIMES.captures(line) {
        let quantity = caps[1].parse::<u32>().unwrap_or(0);
        let price = parse_amount(&caps[2]);
        if let (true, Some(price)) = (quantity > 0, price) {
            return (quantity, price);
        }
    }

    // "2 x Milk 7.00": the amount is the line total
    if let Some(caps) = QTY_PREFIX.captures(line) {
        let quantity = caps[1].parse::<u32>().unwrap_or(0);
        if quantity > 0 {
            return match split_line_total(last, quantity) {
                Some(unit) => (quantity, unit),
                None => (1, last),
            };
        }
    }

    // "Eggs 0.40 2.40" where the last amount is a whole multiple of the previous
    if amounts.len() >= 2 {
        let previous = amounts[amounts.len() - 2].value;
        if previous > Decimal::ZERO && last > previous {
            let ratio = last / previous;
            if let Some(n) = ratio.fract().is_zero().then(|| ratio.to_u32()).flatten() {
                if (2..=MAX_INFERRED_QUANTITY).contains(&n) {
                    return (n, previous);
                }
            }
        }
    }

    (1, last)
}

/// Unit price when `total` divides evenly by `quantity` at its own scale.
fn split_line_total(total: Decimal, quantity: u32) -> Option<Decimal> {
    let quantity = Decimal::from(quantity);
    let mut unit = (total / quantity).round_dp(total.scale());
    if unit * quantity != total {
        return None;
    }
    unit.rescale(total.scale());
    Some(unit)
}

fn describe(line: &str, amounts: &[ExtractionMatch<Decimal>]) -> Option<String> {
    let first = amounts.first()?;
    let last = amounts.last()?;

    let mut text = line[..first.start()].to_string();
    if !text.chars().any(char::is_alphabetic) {
        text = line[last.end()..].to_string();
    }

    if let Some(caps) = QTY_PREFIX.captures(&text) {
        text = caps[2].to_string();
    }
    let text = QTY_SUFFIX.replace(&text, "");
    let text = CURRENCY_TOKEN.replace_all(&text, " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = text
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | ':' | '.' | '*' | '=' | '_' | '|' | '#')
        })
        .to_string();

    if text.chars().any(char::is_alphabetic) {
        Some(text)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(description: &str, price: &str, quantity: u32) -> LineItemDraft {
        LineItemDraft::new(description, dec(price)).with_quantity(quantity)
    }

    #[test]
    fn test_description_and_price() {
        assert_eq!(parse_item_line("Milk 3.50"), Some(item("Milk", "3.50", 1)));
        assert_eq!(parse_item_line("Bread 2.00"), Some(item("Bread", "2.00", 1)));
    }

    #[test]
    fn test_filler_and_currency_removed() {
        assert_eq!(
            parse_item_line("Orange juice ........ $4.25"),
            Some(item("Orange juice", "4.25", 1))
        );
        assert_eq!(parse_item_line("Хлеб   45,90 руб"), Some(item("Хлеб", "45.90", 1)));
        assert_eq!(parse_item_line("Mleko 3,49 A"), Some(item("Mleko", "3.49", 1)));
    }

    #[test]
    fn test_quantity_times_price() {
        assert_eq!(
            parse_item_line("Apples 3 x 0.50 1.50"),
            Some(item("Apples", "0.50", 3))
        );
        assert_eq!(parse_item_line("Cola 2*1,20 2,40"), Some(item("Cola", "1.20", 2)));
    }

    #[test]
    fn test_leading_quantity() {
        assert_eq!(parse_item_line("2 x Croissant 3.00"), Some(item("Croissant", "1.50", 2)));
    }

    #[test]
    fn test_leading_quantity_keeps_line_total() {
        let soda = parse_item_line("3 x Soda 1.00").unwrap();
        assert_eq!(soda, item("Soda", "1.00", 1));
        assert_eq!(soda.line_total(), dec("1.00"));

        let gum = parse_item_line("4 x Gum 1.00").unwrap();
        assert_eq!(gum, item("Gum", "0.25", 4));
        assert_eq!(gum.line_total(), dec("1.00"));
    }

    #[test]
    fn test_inferred_quantity_from_multiple() {
        assert_eq!(parse_item_line("Eggs 0.40 2.40"), Some(item("Eggs", "0.40", 6)));
        assert_eq!(parse_item_line("Soap 1.30 2.00"), Some(item("Soap", "2.00", 1)));
    }

    #[test]
    fn test_price_first() {
        assert_eq!(parse_item_line("4.99 Cheddar"), Some(item("Cheddar", "4.99", 1)));
    }

    #[test]
    fn test_discount_line() {
        assert_eq!(parse_item_line("Coupon -0.99"), Some(item("Coupon", "-0.99", 1)));
    }

    #[test]
    fn test_rejects_lines_without_item() {
        assert_eq!(parse_item_line("random text"), None);
        assert_eq!(parse_item_line("12345 3.50"), None);
        assert_eq!(parse_item_line("3.50"), None);
    }
}
