//! Commands working on stored receipts.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::debug;

use rcpt_core::extract::rules::format_amount;
use rcpt_core::{export_csv, Receipt, ReceiptStore};

use super::{build_parser, format_text, load_config, open_store, OutputFormat};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Print the list as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Receipt id
    id: i64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Receipt id
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    id: Option<i64>,

    /// Export every stored receipt
    #[arg(long)]
    all: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Receipt id
    id: i64,
}

/// Arguments for the reparse command.
#[derive(Args)]
pub struct ReparseArgs {
    /// Receipt id
    id: i64,
}

async fn fetch(store: &ReceiptStore, id: i64) -> anyhow::Result<Receipt> {
    match store.get_receipt(id).await? {
        Some(receipt) => Ok(receipt),
        None => anyhow::bail!("Receipt {} not found", id),
    }
}

pub async fn list(args: ListArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;
    let receipts = store.list_receipts().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&receipts)?);
        return Ok(());
    }

    if receipts.is_empty() {
        println!("{} No receipts stored yet.", style("ℹ").blue());
        return Ok(());
    }

    println!(
        "{:>5}  {:<30} {:<10} {:>10} {:>5}  {}",
        "ID", "Store", "Date", "Total", "Items", "Added"
    );
    for r in &receipts {
        println!(
            "{:>5}  {:<30} {:<10} {:>10} {:>5}  {}",
            r.id,
            r.store_name.as_deref().unwrap_or("-"),
            r.purchase_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            r.total.map(format_amount).unwrap_or_else(|| "-".to_string()),
            r.item_count,
            r.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

pub async fn show(args: ShowArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;
    let receipt = fetch(&store, args.id).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Csv => export_csv(&[receipt], io::stdout().lock())?,
        OutputFormat::Text => {
            println!("{}", style(format!("Receipt #{}", receipt.id)).bold());
            print!("{}", format_text(&receipt.to_draft()));
            if !receipt.raw_text.is_empty() {
                println!();
                println!("Source text:");
                for line in receipt.raw_text.lines() {
                    println!("  | {}", line);
                }
            }
        }
    }

    Ok(())
}

pub async fn export(args: ExportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;

    let receipts = match args.id {
        Some(id) => vec![fetch(&store, id).await?],
        None => store.all_receipts().await?,
    };

    match &args.output {
        Some(output_path) => {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = File::create(output_path)?;
            export_csv(&receipts, &mut file)?;
            file.flush()?;
            println!(
                "{} Exported {} receipt(s) to {}",
                style("✓").green(),
                receipts.len(),
                output_path.display()
            );
        }
        None => export_csv(&receipts, io::stdout().lock())?,
    }

    Ok(())
}

pub async fn delete(args: DeleteArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;

    store.delete_receipt(args.id).await?;
    println!("{} Deleted receipt #{}", style("✓").green(), args.id);

    Ok(())
}

pub async fn reparse(args: ReparseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;
    let parser = build_parser(&config);

    let draft = store.reparse_receipt(args.id, &parser).await?;
    debug!("Re-parse confidence {:.2}", draft.metadata.confidence);
    println!("{} Re-parsed receipt #{}", style("✓").green(), args.id);
    print!("{}", format_text(&draft));

    Ok(())
}
