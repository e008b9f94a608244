//! Heuristic receipt parser.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::receipt::{ExtractionMetadata, LineItemDraft, ReceiptDraft, SourceType};

use super::rules::{
    amounts::largest_amount, extract_store, extract_total, parse_item_line,
    patterns::NON_ITEM_KEYWORD, split_lines, DateExtractor, FieldExtractor, Line, TotalSource,
};

/// Trait for receipt parsing.
///
/// Parsing never fails: unrecognized fields are left empty and reported in
/// the draft metadata.
pub trait ReceiptParser: Send + Sync {
    /// Parse a receipt draft from text.
    fn parse(&self, text: &str) -> ReceiptDraft;
}

/// Rule-based receipt parser.
#[derive(Debug, Clone)]
pub struct HeuristicReceiptParser {
    /// Read ambiguous numeric dates day-first.
    day_first: bool,
    /// Drafts below this confidence get a review warning.
    min_confidence: f32,
    /// Additional total keywords (lowercase substrings).
    extra_total_keywords: Vec<String>,
}

impl HeuristicReceiptParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self {
            day_first: true,
            min_confidence: 0.5,
            extra_total_keywords: Vec::new(),
        }
    }

    /// Build a parser from the extraction section of the configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_day_first(config.day_first)
            .with_min_confidence(config.min_confidence)
            .with_extra_total_keywords(config.extra_total_keywords.clone())
    }

    /// Set day-first date interpretation.
    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    /// Set minimum confidence threshold.
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = confidence;
        self
    }

    /// Add keywords that mark the total line.
    pub fn with_extra_total_keywords(mut self, keywords: Vec<String>) -> Self {
        self.extra_total_keywords = keywords;
        self
    }

    /// First date by position; every line holding a date is claimed.
    fn extract_date(&self, lines: &[Line<'_>], claimed: &mut HashSet<usize>) -> Option<NaiveDate> {
        let extractor = DateExtractor::new().with_day_first(self.day_first);
        let mut first = None;

        for line in lines {
            if let Some(m) = extractor.extract(line.text) {
                claimed.insert(line.index);
                if first.is_none() {
                    debug!("Date {} from line {}", m.value, line.index);
                    first = Some(m.value);
                }
            }
        }

        first
    }

    fn extract_items(&self, lines: &[Line<'_>], claimed: &HashSet<usize>) -> Vec<LineItemDraft> {
        lines
            .iter()
            .filter(|l| !claimed.contains(&l.index))
            .filter(|l| !NON_ITEM_KEYWORD.is_match(l.text))
            .filter_map(|l| {
                let item = parse_item_line(l.text);
                if item.is_none() {
                    debug!("Line {} is not an item: {:?}", l.index, l.text);
                }
                item
            })
            .collect()
    }
}

impl Default for HeuristicReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptParser for HeuristicReceiptParser {
    fn parse(&self, text: &str) -> ReceiptDraft {
        let lines = split_lines(text);
        let mut claimed = HashSet::new();

        info!("Parsing receipt from {} lines of text", lines.len());

        let store = extract_store(&lines);
        if let Some((index, name)) = &store {
            debug!("Store {:?} from line {}", name, index);
            claimed.insert(*index);
        }
        let store_name = store.map(|(_, name)| name);

        let purchase_date = self.extract_date(&lines, &mut claimed);

        let total_match = extract_total(&lines, &self.extra_total_keywords);
        claimed.extend(total_match.claimed.iter().copied());

        let (total, total_source) = match total_match.value {
            Some(value) => (Some(value), total_match.source),
            None => {
                let fallback = lines
                    .iter()
                    .filter(|l| !claimed.contains(&l.index))
                    .filter_map(|l| largest_amount(l.text))
                    .max();
                (fallback, fallback.map(|_| TotalSource::Largest))
            }
        };
        if let (Some(value), Some(source)) = (total, total_source) {
            debug!("Total {} ({:?})", value, source);
        }

        let items = self.extract_items(&lines, &claimed);

        let mut draft = ReceiptDraft {
            store_name,
            purchase_date,
            total,
            items,
            raw_text: text.to_string(),
            metadata: ExtractionMetadata {
                source_type: SourceType::Text,
                ..Default::default()
            },
        };
        self.score(&mut draft, total_source);

        info!(
            "Extracted receipt with {} items, confidence {:.2}",
            draft.items.len(),
            draft.metadata.confidence
        );

        draft
    }
}

impl HeuristicReceiptParser {
    /// Fill confidence, missing fields and warnings.
    fn score(&self, draft: &mut ReceiptDraft, total_source: Option<TotalSource>) {
        let mut confidence = 1.0f32;
        let mut missing = Vec::new();
        let mut warnings = Vec::new();

        if draft.store_name.is_none() {
            confidence -= 0.2;
            missing.push("store_name");
        }
        if draft.purchase_date.is_none() {
            confidence -= 0.2;
            missing.push("purchase_date");
        }
        if draft.total.is_none() {
            confidence -= 0.3;
            missing.push("total");
        }
        if draft.items.is_empty() {
            confidence -= 0.3;
            missing.push("items");
        }

        for field in &missing {
            warnings.push(format!("Could not extract {}", field.replace('_', " ")));
        }

        if total_source == Some(TotalSource::Largest) {
            warnings.push("No total line found; using the largest amount".to_string());
        }

        if let (Some(total), false) = (draft.total, draft.items.is_empty()) {
            let sum = draft.items_total();
            if sum != total {
                warnings.push(format!(
                    "Line items add up to {:.2}, total is {:.2}",
                    sum, total
                ));
            }
        }

        let confidence = confidence.max(0.0);
        if confidence < self.min_confidence {
            warnings.push(format!(
                "Low confidence ({:.2}); review the extracted fields",
                confidence
            ));
        }

        draft.metadata.confidence = confidence;
        draft.metadata.missing_fields = missing.into_iter().map(String::from).collect();
        draft.metadata.warnings = warnings;
    }
}
