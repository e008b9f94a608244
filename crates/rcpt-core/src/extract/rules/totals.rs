//! Total amount extraction.

use rust_decimal::Decimal;

use super::amounts::{is_amount_only, last_amount};
use super::patterns::{SUBTOTAL_KEYWORD, TOTAL_KEYWORD};
use super::Line;

/// How the total was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalSource {
    /// A line with a total keyword.
    Keyword,
    /// Only a subtotal line was present.
    Subtotal,
    /// Largest amount on the receipt.
    Largest,
}

/// Total amount together with the lines it claims.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalMatch {
    pub value: Option<Decimal>,
    pub source: Option<TotalSource>,
    /// Keyword lines (and amount-only continuation lines); never items.
    pub claimed: Vec<usize>,
}

/// Scan lines for total and subtotal keywords.
///
/// The last total line wins. A keyword line without an amount borrows the
/// amount from the following line when that line holds nothing else.
pub fn extract_total(lines: &[Line<'_>], extra_keywords: &[String]) -> TotalMatch {
    let mut totals = Vec::new();
    let mut subtotals = Vec::new();
    let mut claimed = Vec::new();

    let extra: Vec<String> = extra_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let is_subtotal = SUBTOTAL_KEYWORD.is_match(line.text);
        let is_total = !is_subtotal
            && (TOTAL_KEYWORD.is_match(line.text) || {
                let lower = line.text.to_lowercase();
                extra.iter().any(|k| lower.contains(k.as_str()))
            });

        if is_total || is_subtotal {
            claimed.push(line.index);

            let mut value = last_amount(line.text);
            if value.is_none() {
                if let Some(next) = lines.get(i + 1).filter(|n| is_amount_only(n.text)) {
                    value = last_amount(next.text);
                    claimed.push(next.index);
                    i += 1;
                }
            }

            if let Some(v) = value {
                if is_subtotal {
                    subtotals.push(v);
                } else {
                    totals.push(v);
                }
            }
        }
        i += 1;
    }

    let (value, source) = match (totals.last(), subtotals.last()) {
        (Some(t), _) => (Some(*t), Some(TotalSource::Keyword)),
        (None, Some(s)) => (Some(*s), Some(TotalSource::Subtotal)),
        (None, None) => (None, None),
    };

    TotalMatch {
        value,
        source,
        claimed,
    }
}
