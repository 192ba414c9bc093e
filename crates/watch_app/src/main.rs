mod config;
mod run;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use log::LevelFilter;
use watch_logging::{watch_error, watch_info, LogDestination, DEFAULT_LOG_FILE};

use config::{config_path, Config, CredentialOverrides};

const LOG_DESTINATION_ENV: &str = "LISTING_WATCH_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let destination = LogDestination::from_name(std::env::var(LOG_DESTINATION_ENV).ok().as_deref());
    watch_logging::initialize(destination, LevelFilter::Info, Path::new(DEFAULT_LOG_FILE));

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            watch_error!("{:#}", err);
            return ExitCode::from(2);
        }
    };

    match run::execute(&config).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            watch_error!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let path = config_path();
    let config = Config::load(&path, &CredentialOverrides::from_env())
        .with_context(|| format!("loading {path:?}"))?;
    watch_info!("Loaded {} topics from {:?}", config.topics.len(), path);
    Ok(config)
}
