pub mod config;
pub mod error;
pub mod fetch;
pub mod observe;
pub mod protocol;
pub mod records;
pub mod utils;

pub use error::{AppError, Result};
pub use fetch::{Bar, HistoryClient, HistoryReport, HistoryRequest, Interval};
