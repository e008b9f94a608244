//! Purchase date extraction.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_LONG, DATE_YMD};
use super::{ExtractionMatch, FieldExtractor};

/// Date field extractor.
pub struct DateExtractor {
    /// Read `01/02/2024` as 1 February rather than 2 January.
    day_first: bool,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self { day_first: true }
    }

    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    fn numeric_date(&self, first: u32, second: u32, year: i32) -> Option<NaiveDate> {
        let (day, month) = if self.day_first {
            (first, second)
        } else {
            (second, first)
        };
        NaiveDate::from_ymd_opt(year, month, day)
            .or_else(|| NaiveDate::from_ymd_opt(year, day, month))
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// All dates in the text, ordered by position.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        // YYYY-MM-DD first so its digits are not re-read as DD-MM-YY
        for caps in DATE_YMD.captures_iter(text) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let day: u32 = caps[3].parse().unwrap_or(0);

            if let (Some(date), Some(m)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                push_unique(
                    &mut results,
                    ExtractionMatch::new(date, 0.95, m.as_str()).with_position(m.start(), m.end()),
                );
            }
        }

        // DD.MM.YYYY, DD/MM/YYYY, DD-MM-YY
        for caps in DATE_DMY.captures_iter(text) {
            let first: u32 = caps[1].parse().unwrap_or(0);
            let second: u32 = caps[2].parse().unwrap_or(0);
            let year = parse_year(&caps[3]);

            if let (Some(date), Some(m)) = (self.numeric_date(first, second, year), caps.get(0)) {
                push_unique(
                    &mut results,
                    ExtractionMatch::new(date, 0.9, m.as_str()).with_position(m.start(), m.end()),
                );
            }
        }

        // 15 Jan 2024
        for caps in DATE_LONG.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month = month_to_number(&caps[2]);
            let year: i32 = caps[3].parse().unwrap_or(0);

            if let (Some(date), Some(m)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                push_unique(
                    &mut results,
                    ExtractionMatch::new(date, 0.95, m.as_str()).with_position(m.start(), m.end()),
                );
            }
        }

        results.sort_by_key(|m| m.start());
        results
    }
}

fn push_unique(results: &mut Vec<ExtractionMatch<NaiveDate>>, candidate: ExtractionMatch<NaiveDate>) {
    let (start, end) = (candidate.start(), candidate.end());
    if results.iter().any(|r| r.start() < end && start < r.end()) {
        return;
    }
    results.push(candidate);
}

/// Parse a single date as typed into a form field.
pub fn parse_date(s: &str, day_first: bool) -> Option<NaiveDate> {
    DateExtractor::new()
        .with_day_first(day_first)
        .extract(s.trim())
        .map(|m| m.value)
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: 00-50 is 20xx, 51-99 is 19xx
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

fn month_to_number(month: &str) -> u32 {
    match month.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_date_iso() {
        let result = DateExtractor::new().extract("2024-01-15");
        assert_eq!(result.unwrap().value, ymd(2024, 1, 15));
    }

    #[test]
    fn test_extract_date_dmy() {
        let extractor = DateExtractor::new();
        assert_eq!(extractor.extract("15.01.2024").unwrap().value, ymd(2024, 1, 15));
        assert_eq!(extractor.extract("15/01/2024").unwrap().value, ymd(2024, 1, 15));
        assert_eq!(extractor.extract("Date: 15-01-24").unwrap().value, ymd(2024, 1, 15));
    }

    #[test]
    fn test_day_first_ambiguity() {
        let text = "01/02/2024";
        assert_eq!(DateExtractor::new().extract(text).unwrap().value, ymd(2024, 2, 1));
        assert_eq!(
            DateExtractor::new().with_day_first(false).extract(text).unwrap().value,
            ymd(2024, 1, 2)
        );
    }

    #[test]
    fn test_impossible_day_first_is_swapped() {
        let result = DateExtractor::new().extract("12/31/2023");
        assert_eq!(result.unwrap().value, ymd(2023, 12, 31));
    }

    #[test]
    fn test_extract_long_date() {
        let result = DateExtractor::new().extract("Sold on 15 January 2024");
        assert_eq!(result.unwrap().value, ymd(2024, 1, 15));

        let result = DateExtractor::new().extract("3 Sept. 2023");
        assert_eq!(result.unwrap().value, ymd(2023, 9, 3));
    }

    #[test]
    fn test_first_date_by_position() {
        let text = "Printed 20.02.2024\nPurchased 2024-01-15";
        let all = DateExtractor::new().extract_all(text);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].value, ymd(2024, 2, 20));
    }

    #[test]
    fn test_invalid_dates_ignored() {
        assert!(DateExtractor::new().extract("99.99.2024").is_none());
        assert!(DateExtractor::new().extract("random text").is_none());
    }

    #[test]
    fn test_parse_date_input() {
        assert_eq!(parse_date(" 2024-03-01 ", true), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("01.03.2024", true), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("", true), None);
    }
}
