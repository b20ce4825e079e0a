#![cfg(not(tarpaulin_include))]

use certbook::app;
use certbook::config::Config;

/// Main entry point for the web application
///
/// Reads the configuration from the environment (and `.env`, if present)
/// and serves the certificate form on the configured address.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    log::info!(
        "workbook directory {}, photo directory {}",
        config.workbook_dir.display(),
        config.photo_dir.display()
    );

    app::run(config).await
}
