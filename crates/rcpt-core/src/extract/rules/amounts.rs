//! Money amount extraction.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT_PATTERN;
use super::{ExtractionMatch, FieldExtractor};

/// Amount field extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();
        let mut pos = 0;

        while let Some(caps) = AMOUNT_PATTERN.captures_at(text, pos) {
            let Some(full_match) = caps.get(0) else {
                break;
            };
            if !is_isolated(text, full_match.start(), full_match.end()) {
                // Retry from the next character: "2024 100,00" must still yield 100,00
                let skip = text[full_match.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                pos = full_match.start() + skip;
                continue;
            }
            pos = full_match.end();

            let sign = if caps.get(1).is_some() { "-" } else { "" };
            let integer_part = caps[2].replace([',', '.', ' ', '\u{00a0}'], "");
            let amount_str = format!("{}{}.{}", sign, integer_part, &caps[3]);

            if let Ok(amount) = Decimal::from_str(&amount_str) {
                results.push(
                    ExtractionMatch::new(amount, 0.8, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        results
    }
}

/// Reject candidates glued to more digits, e.g. `15.01` in `15.01.2024`.
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    if matches!(before, Some(c) if c.is_ascii_digit() || c == '.' || c == ',') {
        return false;
    }

    let mut after = text[end..].chars();
    match (after.next(), after.next()) {
        (Some(c), _) if c.is_ascii_digit() => false,
        (Some('.' | ','), Some(d)) if d.is_ascii_digit() => false,
        _ => true,
    }
}

/// Largest amount found in the text.
pub fn largest_amount(text: &str) -> Option<Decimal> {
    AmountExtractor::new()
        .extract_all(text)
        .into_iter()
        .map(|m| m.value)
        .max()
}

/// Last amount on a line.
pub fn last_amount(text: &str) -> Option<Decimal> {
    AmountExtractor::new()
        .extract_all(text)
        .into_iter()
        .next_back()
        .map(|m| m.value)
}

/// Whether a line consists of a single amount and nothing else but currency marks.
pub fn is_amount_only(text: &str) -> bool {
    let matches = AmountExtractor::new().extract_all(text);
    if matches.len() != 1 {
        return false;
    }
    let rest = format!("{}{}", &text[..matches[0].start()], &text[matches[0].end()..]);
    let rest = super::patterns::CURRENCY_TOKEN.replace_all(&rest, "");
    rest.chars().all(|c| c.is_whitespace() || c == ':' || c == '=')
}

/// Parse a user-entered amount (e.g. "1 234,56", "1,234.56", "3.5", "-2").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let negative = s.trim_start().starts_with('-');
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever separator comes last is the decimal one
        match (cleaned.rfind(','), cleaned.rfind('.')) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            _ => cleaned.replace(',', ""),
        }
    } else {
        cleaned
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Format an amount with two decimal places.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn amounts(text: &str) -> Vec<Decimal> {
        AmountExtractor::new()
            .extract_all(text)
            .into_iter()
            .map(|m| m.value)
            .collect()
    }

    #[test]
    fn test_extract_simple_amounts() {
        assert_eq!(amounts("Milk 3.50"), vec![dec("3.50")]);
        assert_eq!(amounts("Хлеб 45,90 руб"), vec![dec("45.90")]);
        assert_eq!(amounts("Cena: 100,00 zł, Razem: 1.234,56 zł"), vec![dec("100.00"), dec("1234.56")]);
        assert_eq!(amounts("TV 1,299.00"), vec![dec("1299.00")]);
    }

    #[test]
    fn test_space_grouped_thousands() {
        assert_eq!(amounts("Телевизор 1 299,00"), vec![dec("1299.00")]);
        assert_eq!(amounts("Razem 12\u{00a0}345,67 zł"), vec![dec("12345.67")]);
        assert_eq!(amounts("Kasa 2024 100,00"), vec![dec("100.00")]);
        assert_eq!(amounts("Milk 2 3.50"), vec![dec("3.50")]);
    }

    #[test]
    fn test_scale_is_preserved() {
        let found = amounts("Bread 2.00");
        assert_eq!(found[0].to_string(), "2.00");
    }

    #[test]
    fn test_dates_and_weights_are_not_money() {
        assert!(amounts("15.01.2024").is_empty());
        assert!(amounts("Date 01.02.24").is_empty());
        assert!(amounts("Cheese 0.500 kg").is_empty());
        assert!(amounts("Qty 3").is_empty());
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(amounts("Coupon -0.99"), vec![dec("-0.99")]);
    }

    #[test]
    fn test_largest_and_last() {
        assert_eq!(largest_amount("1.00 12.50 3.00"), Some(dec("12.50")));
        assert_eq!(last_amount("1.00 12.50 3.00"), Some(dec("3.00")));
        assert_eq!(largest_amount("no money here"), None);
    }

    #[test]
    fn test_is_amount_only() {
        assert!(is_amount_only("5.50"));
        assert!(is_amount_only("$ 5.50"));
        assert!(is_amount_only("= 12,00 PLN"));
        assert!(!is_amount_only("Milk 5.50"));
        assert!(!is_amount_only("1.00 2.00"));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1 234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("3.5"), Some(dec("3.5")));
        assert_eq!(parse_amount("-2"), Some(dec("-2")));
        assert_eq!(parse_amount("$ 7.00"), Some(dec("7.00")));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("3.5")), "3.50");
        assert_eq!(format_amount(dec("1234.567")), "1234.57");
    }
}
