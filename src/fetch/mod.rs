pub mod auth;
pub mod bars;
pub mod history;
pub mod search;
pub mod symbol;
pub mod transport;

pub use auth::login;
pub use bars::{parse_series, Bar, BarSeries};
pub use history::{resolve_token, HistoryClient, HistoryReport, HistoryRequest, Termination};
pub use search::{search_symbols, SymbolDescriptor};
pub use symbol::{format_symbol, FuturesContract, Interval};
pub use transport::{Connector, FeedTransport, WsConnector, WsTransport};
