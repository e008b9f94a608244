//! Parse command - extract fields from a single receipt file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use rcpt_core::export::export_drafts;
use rcpt_core::{ingest, ReceiptDraft};

use super::{build_ocr, build_parser, format_text, load_config, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input file (txt, csv, pdf or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Parsing file: {}", args.input.display());

    let data = fs::read(&args.input)?;
    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let parser = build_parser(&config);
    let ocr = build_ocr(&config);
    let drafts = ingest::process_upload(&filename, &data, ocr.as_deref(), &parser);

    let output = format_drafts(&drafts, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    info!(
        "Parsed {} receipt(s) in {}ms",
        drafts.len(),
        start.elapsed().as_millis()
    );

    Ok(())
}

fn format_drafts(drafts: &[ReceiptDraft], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let json = match drafts {
                [draft] => serde_json::to_string_pretty(draft)?,
                _ => serde_json::to_string_pretty(drafts)?,
            };
            Ok(format!("{}\n", json))
        }
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            export_drafts(drafts, &mut buf)?;
            Ok(String::from_utf8(buf)?)
        }
        OutputFormat::Text => Ok(drafts
            .iter()
            .map(format_text)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}
