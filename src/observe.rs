//! Structured events emitted by the history client.
//!
//! The client owns an [`EventSink`]; [`LogSink`] forwards events to the `log` facade.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// No usable token; the feed will serve a reduced data set.
    AuthDegraded { reason: String },
    FetchStarted { symbol: String },
    Connected { url: String },
    CallSent { function: String },
    HeartbeatEchoed { message: String },
    PageMerged { symbol: String, bars: usize, remaining: i64 },
    TargetReached { symbol: String },
    FeedExhausted { symbol: String, bars: usize },
    MoreDataRequested { symbol: String },
    Unhandled { message: String },
    FetchFailed { symbol: String, error: String, transport: bool },
    FetchFinished { symbol: String, bars: usize },
}

pub trait EventSink: Send {
    fn emit(&self, event: FeedEvent);
}

/// Default sink: one log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: FeedEvent) {
        match event {
            FeedEvent::AuthDegraded { reason } => {
                log::warn!("you are using nologin method, data you access may be limited ({reason})")
            }
            FeedEvent::FetchStarted { symbol } => log::info!("Getting data for {symbol}..."),
            FeedEvent::Connected { url } => log::debug!("connected to {url}"),
            FeedEvent::CallSent { function } => log::debug!("sent {function}"),
            FeedEvent::HeartbeatEchoed { message } => log::debug!("heartbeat echoed: {message}"),
            FeedEvent::PageMerged {
                symbol,
                bars,
                remaining,
            } => log::debug!("{symbol}: merged {bars} bars, {remaining} remaining"),
            FeedEvent::TargetReached { symbol } => log::debug!("{symbol}: requested bar count reached"),
            FeedEvent::FeedExhausted { symbol, bars } => {
                log::info!("{symbol}: reached the maximum available data ({bars} bars)")
            }
            FeedEvent::MoreDataRequested { symbol } => log::debug!("{symbol}: requesting more data"),
            FeedEvent::Unhandled { message } => {
                log::trace!("ignoring message without price data: {message}")
            }
            FeedEvent::FetchFailed {
                symbol,
                error,
                transport,
            } => {
                if transport {
                    log::error!("{symbol}: connection failed: {error}");
                } else {
                    log::error!("{symbol}: {error}");
                }
            }
            FeedEvent::FetchFinished { symbol, bars } => log::info!("done for {symbol} ({bars} bars)"),
        }
    }
}

/// Keeps every event in memory; handy for tests and for callers that post-process a fetch.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<FeedEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FeedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: FeedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
