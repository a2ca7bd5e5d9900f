use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Position of the epoch-seconds timestamp within a tokenized record.
const TIMESTAMP_FIELD: usize = 4;
/// Positions of open, high, low, close, volume, in that order.
const PRICE_FIELDS: [usize; 5] = [5, 6, 7, 8, 9];
const VOLUME_FIELD: usize = 9;

// An empty `"s":[]` matches the first branch and captures nothing.
static SERIES_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""s":\[(?:\]|(.+?)\}\])"#).expect("series pattern is valid")
});

/// One OHLCV row of a historical series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Extract the bars carried by a `timescale_update` message, in record order.
///
/// The payload is read textually: each `"s":[...]` segment is cut into records
/// on `,{"` and every record is tokenized on `[`, `:`, `,` and `]`. Token 4 is the
/// timestamp, tokens 5..=9 the prices and volume. A price token that fails to
/// parse becomes zero and switches volume parsing off for the rest of the call,
/// since feeds without volume leave that slot empty. A bad timestamp fails the
/// whole call.
pub fn parse_series(raw: &str, symbol: &str) -> Result<Vec<Bar>> {
    let mut bars = Vec::new();
    let mut has_volume = true;

    for segment in SERIES_SEGMENT.captures_iter(raw) {
        let Some(body) = segment.get(1) else {
            continue;
        };

        for record in body.as_str().split(",{\"") {
            let tokens: Vec<&str> = record
                .split(['[', ':', ',', ']'])
                .map(str::trim)
                .collect();

            let timestamp = parse_timestamp(tokens.get(TIMESTAMP_FIELD).copied())?;

            let mut values = [0.0_f64; 5];
            for (slot, index) in values.iter_mut().zip(PRICE_FIELDS) {
                if index == VOLUME_FIELD && !has_volume {
                    continue;
                }
                match tokens.get(index).and_then(|token| token.parse::<f64>().ok()) {
                    Some(value) => *slot = value,
                    None => {
                        if has_volume {
                            log::debug!("no volume data for {symbol}");
                        }
                        has_volume = false;
                    }
                }
            }

            let [open, high, low, close, volume] = values;
            bars.push(Bar {
                timestamp,
                symbol: symbol.to_string(),
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }

    Ok(bars)
}

fn parse_timestamp(token: Option<&str>) -> Result<DateTime<Utc>> {
    let raw = token.ok_or_else(|| AppError::parse("record has no timestamp field"))?;
    let seconds: f64 = raw.parse().map_err(|_| {
        AppError::parse(format!(
            "invalid timestamp `{raw}`; check the exchange and symbol"
        ))
    })?;
    if !seconds.is_finite() {
        return Err(AppError::parse(format!("invalid timestamp `{raw}`")));
    }

    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| AppError::parse(format!("timestamp `{raw}` out of range")))
}

/// Pages merged so far, keeping the first bar seen for every timestamp.
#[derive(Debug, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
    seen: HashSet<DateTime<Utc>>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page, dropping bars whose timestamp already arrived. Returns how many were kept.
    pub fn merge(&mut self, page: Vec<Bar>) -> usize {
        let before = self.bars.len();
        for bar in page {
            if self.seen.insert(bar.timestamp) {
                self.bars.push(bar);
            }
        }
        self.bars.len() - before
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Newest first, at most `limit` bars.
    pub fn into_descending(mut self, limit: usize) -> Vec<Bar> {
        self.bars.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.bars.truncate(limit);
        self.bars
    }
}
