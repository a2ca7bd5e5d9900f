mod cli;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use quote_history::config::{Credentials, FeedConfig};
use quote_history::fetch::{search_symbols, HistoryClient, HistoryRequest, Termination};
use quote_history::records::{save_bars_csv, write_bar_table, write_symbol_table};
use quote_history::utils::export_file_name;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config =
        FeedConfig::load(cli.config.as_deref()).context("Failed to load feed configuration")?;

    match cli.command {
        Commands::History {
            symbol,
            exchange,
            interval,
            bars,
            contract,
            extended,
            output,
            save,
        } => {
            let request = HistoryRequest::new(symbol, exchange)
                .interval(interval)
                .bars(bars)
                .futures_contract(contract)
                .extended_session(extended);
            let output = output.or_else(|| {
                save.then(|| PathBuf::from(export_file_name(&request.qualified_symbol())))
            });
            run_history(config, &request, output)?;
        }
        Commands::Search { text, exchange } => {
            let symbols = search_symbols(&config, &text, &exchange);
            let mut out = io::stdout().lock();
            write_symbol_table(&mut out, &symbols)?;
            out.flush()?;
        }
    }

    Ok(())
}

fn run_history(config: FeedConfig, request: &HistoryRequest, output: Option<PathBuf>) -> Result<()> {
    let mut client = HistoryClient::from_credentials(config, &Credentials::from_env());
    let report = client.fetch_history(request)?;

    if let Termination::Failed(reason) = &report.termination {
        log::warn!(
            "fetch for {} stopped early ({reason}); returning {} bars",
            report.symbol,
            report.bars.len()
        );
    }

    match output {
        Some(path) => {
            save_bars_csv(&report.bars, &path)
                .with_context(|| format!("Failed to save bars to {}", path.display()))?;
            println!("Saved {} bars to {}", report.bars.len(), path.display());
        }
        None => {
            let mut out = io::stdout().lock();
            write_bar_table(&mut out, &report.bars)?;
            out.flush()?;
        }
    }

    Ok(())
}
