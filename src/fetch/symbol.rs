use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Chart resolution understood by `create_series`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    Seconds10,
    Minute1,
    Minute3,
    Minute5,
    Minute15,
    Minute30,
    Minute45,
    Hour1,
    Hour2,
    Hour3,
    Hour4,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub const ALL: [Interval; 14] = [
        Interval::Seconds10,
        Interval::Minute1,
        Interval::Minute3,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Minute45,
        Interval::Hour1,
        Interval::Hour2,
        Interval::Hour3,
        Interval::Hour4,
        Interval::Daily,
        Interval::Weekly,
        Interval::Monthly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Seconds10 => "10S",
            Interval::Minute1 => "1",
            Interval::Minute3 => "3",
            Interval::Minute5 => "5",
            Interval::Minute15 => "15",
            Interval::Minute30 => "30",
            Interval::Minute45 => "45",
            Interval::Hour1 => "1H",
            Interval::Hour2 => "2H",
            Interval::Hour3 => "3H",
            Interval::Hour4 => "4H",
            Interval::Daily => "1D",
            Interval::Weekly => "1W",
            Interval::Monthly => "1M",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Interval::ALL
            .into_iter()
            .find(|interval| interval.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Interval::ALL.iter().map(|i| i.as_str()).collect();
                AppError::invalid_argument(format!(
                    "unknown interval `{wanted}` (expected one of {})",
                    known.join(", ")
                ))
            })
    }
}

/// Index of a continuous futures contract: 1 for the front month, 2 for the next, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuturesContract(pub u32);

impl FromStr for FuturesContract {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(FuturesContract)
            .map_err(|_| AppError::invalid_argument(format!("not a valid contract: `{s}`")))
    }
}

/// Qualify `symbol` with `exchange` unless it already carries one.
///
/// A contract index turns the symbol into the continuous contract `<EX>:<SYM><N>!`.
pub fn format_symbol(symbol: &str, exchange: &str, contract: Option<FuturesContract>) -> String {
    if symbol.contains(':') {
        return symbol.to_string();
    }
    match contract {
        None => format!("{exchange}:{symbol}"),
        Some(FuturesContract(index)) => format!("{exchange}:{symbol}{index}!"),
    }
}
