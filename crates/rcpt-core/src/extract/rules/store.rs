//! Store name extraction.

use super::amounts::AmountExtractor;
use super::dates::DateExtractor;
use super::patterns::{STORE_LABEL, SUBTOTAL_KEYWORD, TOTAL_KEYWORD};
use super::{FieldExtractor, Line};

/// Find the store name and the line it came from.
///
/// A labeled line (`Store: Corner Shop`) wins. Otherwise the first line that
/// has a letter and carries no amount, date or total keyword.
pub fn extract_store(lines: &[Line<'_>]) -> Option<(usize, String)> {
    for line in lines {
        if let Some(caps) = STORE_LABEL.captures(line.text) {
            let name = clean_name(&caps[1]);
            if !name.is_empty() {
                return Some((line.index, name));
            }
        }
    }

    let amounts = AmountExtractor::new();
    let dates = DateExtractor::new();

    lines
        .iter()
        .filter(|l| l.text.chars().any(char::is_alphabetic))
        .filter(|l| !TOTAL_KEYWORD.is_match(l.text) && !SUBTOTAL_KEYWORD.is_match(l.text))
        .filter(|l| amounts.extract(l.text).is_none())
        .find(|l| dates.extract(l.text).is_none())
        .map(|l| (l.index, clean_name(l.text)))
        .filter(|(_, name)| !name.is_empty())
}

fn clean_name(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '=' | '-' | '#' | '~'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rules::split_lines;

    #[test]
    fn test_first_line_is_store() {
        let lines = split_lines("Corner Store\n2024-01-15\nMilk 3.50");
        assert_eq!(extract_store(&lines), Some((0, "Corner Store".to_string())));
    }

    #[test]
    fn test_labeled_store_wins() {
        let lines = split_lines("Welcome!\nStore: Fresh Market\nMilk 3.50");
        assert_eq!(extract_store(&lines), Some((1, "Fresh Market".to_string())));
    }

    #[test]
    fn test_skips_decoration_and_dates() {
        let lines = split_lines("********\n15.01.2024\n*** SUPER SAVER ***\nMilk 3.50");
        assert_eq!(extract_store(&lines), Some((2, "SUPER SAVER".to_string())));
    }

    #[test]
    fn test_no_store_candidate() {
        let lines = split_lines("Milk 3.50\nTotal 3.50");
        assert_eq!(extract_store(&lines), None);
    }
}
