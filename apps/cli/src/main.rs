//! jobplanner CLI: rank job opportunities from several analyst
//! perspectives and plan interviews for the best of them.

mod commands;
mod input;

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
