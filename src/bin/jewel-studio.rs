//! Jewelry studio CLI tool
//!
//! Command-line interface for the jewel-studio pipeline.

#[cfg(feature = "cli")]
use jewel_studio::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
