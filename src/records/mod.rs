pub mod bar_file;
pub mod table;

pub use bar_file::save_bars_csv;
pub use table::{write_bar_table, write_symbol_table};
