use chrono::{DateTime, Local, Utc};

/// Bar timestamps shown in the local timezone, to the second.
pub fn format_bar_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Default export file name for a symbol, e.g. `NSE_INFY_2024_01_05_14_30.csv`.
pub fn export_file_name(symbol: &str) -> String {
    let slug: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{slug}_{}.csv", Local::now().format("%Y_%m_%d_%H_%M"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_name_is_filesystem_safe() {
        let name = export_file_name("BITMEX:XBTUSD1!");
        assert!(name.starts_with("BITMEX_XBTUSD1__"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn bar_timestamp_has_second_precision() {
        let formatted = format_bar_timestamp(&DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        assert_eq!(formatted.len(), 19);
    }
}
