//! CLI application for receipt recognition.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, import, parse, receipts, serve};

/// rcpt - Extract store, date, total and line items from receipts
#[derive(Parser)]
#[command(name = "rcpt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a receipt file without storing it
    Parse(parse::ParseArgs),

    /// Extract and store one or more receipt files
    Import(import::ImportArgs),

    /// List stored receipts
    List(receipts::ListArgs),

    /// Show a stored receipt
    Show(receipts::ShowArgs),

    /// Export stored receipts as CSV
    Export(receipts::ExportArgs),

    /// Delete a stored receipt and its items
    Delete(receipts::DeleteArgs),

    /// Run extraction again on a stored receipt's source text
    Reparse(receipts::ReparseArgs),

    /// Start the web interface
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let mut level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    if matches!(cli.command, Commands::Serve(_)) {
        level = level.max(Level::INFO);
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();

    // Execute command
    match cli.command {
        Commands::Parse(args) => parse::run(args, config_path).await,
        Commands::Import(args) => import::run(args, config_path).await,
        Commands::List(args) => receipts::list(args, config_path).await,
        Commands::Show(args) => receipts::show(args, config_path).await,
        Commands::Export(args) => receipts::export(args, config_path).await,
        Commands::Delete(args) => receipts::delete(args, config_path).await,
        Commands::Reparse(args) => receipts::reparse(args, config_path).await,
        Commands::Serve(args) => serve::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
