use clap::{Parser, Subcommand};

/// Scan for BLE thermal printers and send them an ESC/POS test receipt.
#[derive(Parser, Debug)]
#[command(name = "bleprint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan for nearby BLE devices and list them
    Scan {
        /// Discovery window in seconds
        #[arg(long)]
        window: Option<u64>,
    },

    /// Connect to a printer and print a test receipt
    Print {
        /// Device identifier, or a case-insensitive fragment of its name.
        /// Defaults to the printer used last.
        #[arg(long)]
        device: Option<String>,

        /// Discovery window in seconds
        #[arg(long)]
        window: Option<u64>,

        /// Pause between segment writes, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
}
