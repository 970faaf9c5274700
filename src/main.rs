use anyhow::Result;
use log::LevelFilter;
use std::str::FromStr;

use ranger_acquire::cli::build_cli;
use ranger_acquire::config::Config;
use ranger_acquire::services::AcquisitionService;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = Config::from_matches(&matches)?;

    let level = LevelFilter::from_str(&config.log_level)
        .map_err(|_| anyhow::anyhow!("Invalid log level '{}'", config.log_level))?;
    env_logger::Builder::new().filter_level(level).init();

    config.display();

    let service = AcquisitionService::new(config);
    service.run().await?;

    Ok(())
}
