//! Wire-level pieces of the feed protocol: framing, session identifiers and call encoding.

pub mod frame;
pub mod message;
pub mod session;

pub use frame::{decode, encode, is_heartbeat};
pub use message::build;
pub use session::{new_session_id, AuthToken, SessionIds, SessionKind};
