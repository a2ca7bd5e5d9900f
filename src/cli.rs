use std::path::PathBuf;

use clap::{Parser, Subcommand};

use quote_history::fetch::{FuturesContract, Interval};

#[derive(Parser)]
#[command(name = "quote-history")]
#[command(about = "Download historical price bars from the quote feed's websocket")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON file overriding the built-in feed endpoints
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch historical bars for a symbol
    History {
        /// Symbol, optionally qualified as EXCHANGE:SYMBOL
        symbol: String,

        #[arg(short, long, default_value = "NSE")]
        exchange: String,

        /// One of 10S, 1, 3, 5, 15, 30, 45, 1H, 2H, 3H, 4H, 1D, 1W, 1M
        #[arg(short, long, default_value = "1D")]
        interval: Interval,

        #[arg(short = 'n', long = "bars", default_value_t = 10)]
        bars: usize,

        /// Continuous futures contract: 1 for the front month, 2 for the next
        #[arg(long)]
        contract: Option<FuturesContract>,

        /// Request the extended trading session
        #[arg(long)]
        extended: bool,

        /// Write the bars to this CSV file instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write to an auto-named CSV file in the current directory
        #[arg(long, conflicts_with = "output")]
        save: bool,
    },

    /// Search the symbol directory
    Search {
        text: String,

        #[arg(short, long, default_value = "")]
        exchange: String,
    },
}
