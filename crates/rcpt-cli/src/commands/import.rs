//! Import command - extract and store multiple receipt files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use rcpt_core::{ingest, OcrBackend, ReceiptParser, ReceiptStore};

use super::{build_ocr, build_parser, load_config, open_store};

/// Arguments for the import command.
#[derive(Args)]
pub struct ImportArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of importing a single file.
struct ImportResult {
    path: PathBuf,
    ids: Vec<i64>,
    needs_review: usize,
    error: Option<String>,
}

pub async fn run(args: ImportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| p.to_str().is_some_and(ingest::is_supported))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to import",
        style("ℹ").blue(),
        files.len()
    );

    let store = open_store(&config).await?;
    let parser = build_parser(&config);
    let ocr = build_ocr(&config);
    let min_confidence = config.extraction.min_confidence;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        match import_file(&path, &store, &parser, ocr.as_deref(), min_confidence).await {
            Ok(result) => results.push(result),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to import {}: {}", path.display(), error_msg);
                    results.push(ImportResult {
                        path,
                        ids: Vec::new(),
                        needs_review: 0,
                        error: Some(error_msg),
                    });
                } else {
                    pb.abandon();
                    error!("Failed to import {}: {}", path.display(), error_msg);
                    anyhow::bail!("Import failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    let stored: usize = results.iter().map(|r| r.ids.len()).sum();
    let needs_review: usize = results.iter().map(|r| r.needs_review).sum();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    for result in results.iter().filter(|r| !r.ids.is_empty()) {
        let ids: Vec<String> = result.ids.iter().map(|id| format!("#{}", id)).collect();
        println!("  {} -> {}", result.path.display(), ids.join(", "));
    }

    println!();
    println!(
        "{} Stored {} receipt(s) from {} file(s) in {:?}",
        style("✓").green(),
        stored,
        results.len() - failed.len(),
        start.elapsed()
    );

    if needs_review > 0 {
        println!(
            "{} {} receipt(s) below {:.0}% confidence need review",
            style("ℹ").blue(),
            needs_review,
            min_confidence * 100.0
        );
    }

    if !failed.is_empty() {
        println!("{} {} file(s) failed:", style("✗").red(), failed.len());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn import_file(
    path: &Path,
    store: &ReceiptStore,
    parser: &dyn ReceiptParser,
    ocr: Option<&dyn OcrBackend>,
    min_confidence: f32,
) -> anyhow::Result<ImportResult> {
    let data = fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let drafts = ingest::process_upload(filename, &data, ocr, parser);

    let mut ids = Vec::with_capacity(drafts.len());
    let mut needs_review = 0;
    for draft in &drafts {
        if draft.metadata.confidence < min_confidence {
            needs_review += 1;
        }
        ids.push(store.insert_draft(draft).await?);
    }
    debug!("Imported {} as {:?}", path.display(), ids);

    Ok(ImportResult {
        path: path.to_path_buf(),
        ids,
        needs_review,
        error: None,
    })
}
