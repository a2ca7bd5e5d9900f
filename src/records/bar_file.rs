use std::path::Path;

use crate::error::{Context, Result};
use crate::fetch::Bar;

const HEADER: [&str; 7] = ["datetime", "symbol", "open", "high", "low", "close", "volume"];

/// Persist bars as CSV in the order given, timestamps in RFC 3339.
pub fn save_bars_csv<P: AsRef<Path>>(bars: &[Bar], file_path: P) -> Result<()> {
    let path = file_path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV writer for {}", path.display()))?;

    writer.write_record(HEADER)?;
    for bar in bars {
        writer.write_record(&[
            bar.timestamp.to_rfc3339(),
            bar.symbol.clone(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
