use std::env;
use log::warn;

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod print;

use crate::cli::args::{Cli, Command};
use crate::cli::commands::{run_print, run_scan};
use crate::config::io::ConfigStore;
use crate::config::types::Config;
use crate::error::AppRunError;

pub fn init_logging() {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

pub async fn run(args: Cli) -> Result<(), AppRunError> {
    let mut store = ConfigStore::open()?;
    let config = match store.load().await {
        Ok(config) => config,
        Err(err) => {
            warn!("Failed to load config, using defaults: {:?}", err);
            Config::default()
        }
    };

    match args.command {
        Command::Scan { window } => run_scan(&config, window).await,
        Command::Print { device, window, delay_ms } => {
            run_print(&mut store, &config, device, window, delay_ms).await
        }
    }
}
