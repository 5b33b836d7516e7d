use anyhow::Result;
use clap::Parser;
use utr_entry::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
