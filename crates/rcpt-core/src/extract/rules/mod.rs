//! Rule-based field extractors for receipts.

pub mod amounts;
pub mod dates;
pub mod items;
pub mod patterns;
pub mod store;
pub mod totals;

pub use amounts::{format_amount, parse_amount, AmountExtractor};
pub use dates::{parse_date, DateExtractor};
pub use items::parse_item_line;
pub use store::extract_store;
pub use totals::{extract_total, TotalMatch, TotalSource};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value with its confidence and location.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte range in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    pub fn start(&self) -> usize {
        self.position.map(|(s, _)| s).unwrap_or(0)
    }

    pub fn end(&self) -> usize {
        self.position.map(|(_, e)| e).unwrap_or(0)
    }
}

/// A trimmed, non-blank input line with its ordinal among such lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub index: usize,
    pub text: &'a str,
}

/// Split text into trimmed, non-blank lines.
pub fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, text)| Line { index, text })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_skips_blank() {
        let lines = split_lines("  Shop  \n\n \t\nMilk 3.50\r\n");
        assert_eq!(
            lines,
            vec![
                Line { index: 0, text: "Shop" },
                Line { index: 1, text: "Milk 3.50" },
            ]
        );
    }
}
