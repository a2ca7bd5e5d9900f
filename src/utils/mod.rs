pub mod time;

pub use time::{export_file_name, format_bar_timestamp};
