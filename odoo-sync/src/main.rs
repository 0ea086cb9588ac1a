use clap::Parser;
use log::error;

use odoo_sync::cli::{Cli, commands};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = commands::run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
