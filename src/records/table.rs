use std::io::Write;

use crate::error::Result;
use crate::fetch::{Bar, SymbolDescriptor};
use crate::utils::format_bar_timestamp;

/// Render bars as a fixed-width table, one row per bar.
pub fn write_bar_table<W: Write>(out: &mut W, bars: &[Bar]) -> Result<()> {
    writeln!(
        out,
        "{:<19}  {:<20} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "datetime", "symbol", "open", "high", "low", "close", "volume"
    )?;
    for bar in bars {
        writeln!(
            out,
            "{:<19}  {:<20} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>14.2}",
            format_bar_timestamp(&bar.timestamp),
            bar.symbol,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        )?;
    }
    Ok(())
}

pub fn write_symbol_table<W: Write>(out: &mut W, symbols: &[SymbolDescriptor]) -> Result<()> {
    if symbols.is_empty() {
        writeln!(out, "No matching symbols.")?;
        return Ok(());
    }

    for symbol in symbols {
        writeln!(
            out,
            "{:<24} {:<10} {}",
            symbol.qualified(),
            symbol.kind,
            symbol.description
        )?;
    }
    Ok(())
}
