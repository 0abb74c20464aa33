//! TrendChat CLI: conversational social-media trend discovery.
//!
//! Answers questions about what creators are talking about by letting a
//! language model run semantic searches over video transcripts.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
