//! CLI subcommands.

pub mod config;
pub mod import;
pub mod parse;
pub mod receipts;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use rcpt_core::extract::rules::format_amount;
use rcpt_core::{
    HeuristicReceiptParser, OcrBackend, RcptConfig, ReceiptDraft, ReceiptStore, TesseractOcr,
};
use tracing::debug;

/// Output format shared by commands printing receipts.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (export layout)
    Csv,
    /// Plain text summary
    Text,
}

/// Load configuration from `-c`, the default location, or built-in defaults,
/// then apply environment overrides.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    let config = match config_path {
        Some(path) => RcptConfig::from_file(Path::new(path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Loading config from {}", default_path.display());
                RcptConfig::from_file(&default_path)?
            } else {
                RcptConfig::default()
            }
        }
    };

    Ok(config.with_env_overrides())
}

pub async fn open_store(config: &RcptConfig) -> anyhow::Result<ReceiptStore> {
    debug!("Opening database {}", config.storage.database_path.display());
    Ok(ReceiptStore::connect(&config.storage.database_path).await?)
}

pub fn build_parser(config: &RcptConfig) -> HeuristicReceiptParser {
    HeuristicReceiptParser::from_config(&config.extraction)
}

pub fn build_ocr(config: &RcptConfig) -> Option<Arc<dyn OcrBackend>> {
    TesseractOcr::from_config(&config.ocr).map(|o| Arc::new(o) as Arc<dyn OcrBackend>)
}

/// Human-readable summary of a draft.
pub fn format_text(draft: &ReceiptDraft) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Store: {}\n",
        draft.store_name.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Date:  {}\n",
        draft
            .purchase_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    output.push_str(&format!(
        "Total: {}\n",
        draft.total.map(format_amount).unwrap_or_else(|| "-".to_string())
    ));

    if !draft.items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &draft.items {
            output.push_str(&format!(
                "  {:<30} {:>3} x {:>8} = {:>8}\n",
                item.description,
                item.quantity,
                format_amount(item.unit_price),
                format_amount(item.line_total()),
            ));
        }
        output.push_str(&format!(
            "  {:<30} {:>23}\n",
            "Items total",
            format_amount(draft.items_total())
        ));
    }

    output.push_str(&format!(
        "\nConfidence: {:.1}% ({})\n",
        draft.metadata.confidence * 100.0,
        draft.metadata.source_type.as_str()
    ));

    if !draft.metadata.warnings.is_empty() {
        output.push_str("Warnings:\n");
        for warning in &draft.metadata.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcpt_core::ReceiptParser;

    #[test]
    fn test_format_text() {
        let draft = HeuristicReceiptParser::new()
            .parse("Corner Store\n2024-01-15\nMilk 3.50\nBread 2.00\nTotal 5.50");
        let text = format_text(&draft);

        assert!(text.contains("Store: Corner Store"));
        assert!(text.contains("Date:  2024-01-15"));
        assert!(text.contains("Total: 5.50"));
        assert!(text.contains("Milk"));
        assert!(!text.contains("Warnings:"));
    }

    #[test]
    fn test_format_text_empty_draft() {
        let draft = HeuristicReceiptParser::new().parse("random text");
        let text = format_text(&draft);

        assert!(text.contains("Total: -"));
        assert!(!text.contains("Items:"));
        assert!(text.contains("Warnings:"));
    }
}
