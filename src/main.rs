use anyhow::Result;
use codebuddy::{cli, logger};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logger::init() {
        eprintln!("Failed to initialize logging: {e}");
    }

    cli::main().await
}
