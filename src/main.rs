//! lk-api entry point.

use clap::Parser;

use lk_api::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = lk_api::cli::run(cli).await {
        lk_api::cli::handle_error(&err);
    }
}
