//! Serve command - run the web interface.

use clap::Args;
use console::style;

use super::load_config;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    println!(
        "{} Serving receipts from {} on http://{}",
        style("ℹ").blue(),
        config.storage.database_path.display(),
        config.bind_addr()
    );

    rcpt_web::serve(config).await?;

    Ok(())
}
