use clap::Parser;
use log::info;
use bleprint::cli::args::Cli;
use bleprint::{init_logging, run};

#[tokio::main]
async fn main() {
    init_logging();
    info!(concat!("bleprint ", env!("CARGO_PKG_VERSION")));

    let args = Cli::parse();

    if let Err(err) = run(args).await {
        eprintln!("bleprint: {}", err);
        std::process::exit(1);
    }
}
